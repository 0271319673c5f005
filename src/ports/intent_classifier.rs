//! Intent Classifier Port - Interface for the external NLP service.
//!
//! The classifier's internals are opaque; only the call contract matters.
//! Callers wrap every call in a circuit breaker and a timeout, so
//! implementations do not retry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::nlp::{Classification, Entities, Intent};

/// Port for classifying free-text messages.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify one utterance against recent context.
    async fn classify(&self, request: ClassifyRequest) -> Result<Classification, ClassifierError>;

    /// Short identifier for logs and health output.
    fn name(&self) -> &str;
}

/// Request payload sent to the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyRequest {
    /// The text to classify.
    pub text: String,
    /// Prior conversational context, when not expired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ClassifyContext>,
    /// Most recent user queries, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_queries: Vec<String>,
}

impl ClassifyRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: None,
            recent_queries: Vec::new(),
        }
    }
}

/// Context window accompanying a classify request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(default)]
    pub entities: Entities,
}

/// Errors from the classifier.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    /// The call did not finish within the configured timeout.
    #[error("classifier timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The service is unreachable or returned a server error.
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    /// The service answered with something we could not read.
    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),

    /// Credentials were rejected.
    #[error("classifier authentication failed")]
    AuthenticationFailed,
}

impl ClassifierError {
    /// Returns true for timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClassifierError::Timeout { .. })
    }
}
