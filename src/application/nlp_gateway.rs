//! NlpGateway - free-text classification with breaker, timeout and fallback.
//!
//! Every call to the external classifier goes through the circuit breaker
//! and a bounded timeout. When the breaker rejects the call, the call times
//! out, or the classifier errors, the deterministic [`LocalClassifier`]
//! answers instead. `process` never fails.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::application::DegradationController;
use crate::domain::nlp::{resolve_follow_up, Classification, Intent, LocalClassifier};
use crate::domain::session::{ContextUpdate, ConversationSession, DEFAULT_CONTEXT_TTL};
use crate::ports::{
    execute, BreakerError, CircuitBreaker, ClassifierError, ClassifyContext, ClassifyRequest,
    Clock, IntentClassifier,
};

/// Gateway settings.
#[derive(Debug, Clone)]
pub struct NlpGatewayConfig {
    /// Upper bound on one classifier call.
    pub timeout: Duration,
    /// Confidence below which a result is flagged as low confidence.
    pub confidence_threshold: f32,
    /// Number of recent queries sent along with the text.
    pub context_window: usize,
    /// Lifetime of conversational context.
    pub context_ttl: Duration,
}

impl Default for NlpGatewayConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2_000),
            confidence_threshold: 0.7,
            context_window: 3,
            context_ttl: DEFAULT_CONTEXT_TTL,
        }
    }
}

/// Why the local classifier answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    BreakerOpen,
    Timeout,
    ClassifierError,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackReason::BreakerOpen => "breaker_open",
            FallbackReason::Timeout => "timeout",
            FallbackReason::ClassifierError => "classifier_error",
        }
    }
}

/// Outcome of processing one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct NlpResult {
    /// Classification after follow-up resolution.
    pub classification: Classification,
    pub used_fallback: bool,
    /// Confidence is below the configured threshold.
    pub low_confidence: bool,
    pub fallback_reason: Option<FallbackReason>,
}

/// Classifies free text and keeps the session's context current.
pub struct NlpGateway {
    classifier: Arc<dyn IntentClassifier>,
    breaker: Arc<dyn CircuitBreaker>,
    degradation: Arc<DegradationController>,
    clock: Arc<dyn Clock>,
    local: LocalClassifier,
    config: NlpGatewayConfig,
}

impl NlpGateway {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        breaker: Arc<dyn CircuitBreaker>,
        degradation: Arc<DegradationController>,
        clock: Arc<dyn Clock>,
        config: NlpGatewayConfig,
    ) -> Self {
        Self {
            classifier,
            breaker,
            degradation,
            clock,
            local: LocalClassifier::new(),
            config,
        }
    }

    pub fn config(&self) -> &NlpGatewayConfig {
        &self.config
    }

    pub fn breaker(&self) -> &Arc<dyn CircuitBreaker> {
        &self.breaker
    }

    /// Classifies `text` against the session's context and merges the
    /// result back into it.
    pub async fn process(&self, text: &str, session: &mut ConversationSession) -> NlpResult {
        let now = self.clock.now();
        let request = self.build_request(text, session);

        let (raw, fallback_reason) = match self.call_classifier(request).await {
            Ok(classification) => (classification, None),
            Err(reason) => (self.local.classify(text), Some(reason)),
        };

        let classification = resolve_follow_up(raw, session.context(now, self.config.context_ttl));

        if classification.intent != Intent::Unknown || !classification.entities.is_empty() {
            session.merge_context(
                ContextUpdate::from(&classification),
                now,
                self.config.context_ttl,
            );
        }

        NlpResult {
            low_confidence: classification.confidence < self.config.confidence_threshold,
            used_fallback: fallback_reason.is_some(),
            fallback_reason,
            classification,
        }
    }

    fn build_request(&self, text: &str, session: &ConversationSession) -> ClassifyRequest {
        let now = self.clock.now();
        let mut request = ClassifyRequest::new(text);
        request.context = session
            .context(now, self.config.context_ttl)
            .map(|ctx| ClassifyContext {
                intent: ctx.intent(),
                entities: ctx.entities().clone(),
            });
        request.recent_queries = session
            .recent_history(self.config.context_window)
            .map(|entry| entry.query.clone())
            .collect();
        request
    }

    async fn call_classifier(&self, request: ClassifyRequest) -> Result<Classification, FallbackReason> {
        let timeout = self.config.timeout;
        let started = Instant::now();

        let result = execute(self.breaker.as_ref(), || async {
            match tokio::time::timeout(timeout, self.classifier.classify(request)).await {
                Ok(result) => result,
                Err(_) => Err(ClassifierError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            }
        })
        .await;

        match result {
            Ok(classification) => {
                self.degradation.report_latency(started.elapsed());
                Ok(classification)
            }
            Err(BreakerError::Open(breaker)) => {
                tracing::warn!(breaker = %breaker, "classifier breaker open, using local fallback");
                Err(FallbackReason::BreakerOpen)
            }
            Err(BreakerError::Inner(err)) => {
                self.degradation.report_latency(started.elapsed());
                tracing::warn!(
                    classifier = self.classifier.name(),
                    error = %err,
                    "classifier call failed, using local fallback"
                );
                if err.is_timeout() {
                    Err(FallbackReason::Timeout)
                } else {
                    Err(FallbackReason::ClassifierError)
                }
            }
        }
    }
}

impl std::fmt::Debug for NlpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NlpGateway")
            .field("classifier", &self.classifier.name())
            .field("breaker", &self.breaker.name())
            .field("config", &self.config)
            .finish()
    }
}
