//! Wiring of adapters and application services from configuration.

use std::sync::Arc;
use std::time::Duration;

use crate::adapters::http::AppState;
use crate::adapters::{
    HttpIntentClassifier, InMemoryCircuitBreaker, InMemoryPriceRepository, InMemoryRateLimiter,
    InMemorySessionStorage, KeywordIntentClassifier, RedisRateLimiter, RedisSessionStorage,
};
use crate::application::router::RegistryError;
use crate::application::{
    builtin_registry, ConcurrencyGuard, DegradationController, HandlerDeps, MessageRouter,
    NlpGateway, SessionStore,
};
use crate::config::{AppConfig, ValidationError};
use crate::domain::wizard::WizardEngine;
use crate::ports::{
    CircuitBreaker, ClassifierError, Clock, IntentClassifier, PriceRepository, RateLimiter,
    SessionStorage,
};

/// Name of the breaker guarding the intent classifier.
pub const CLASSIFIER_BREAKER: &str = "intent_classifier";

/// Errors raised while assembling the service.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("command registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("redis connection timed out")]
    RedisTimeout,

    #[error("classifier: {0}")]
    Classifier(#[from] ClassifierError),
}

/// Port implementations the services are built on.
#[derive(Clone)]
pub struct Backends {
    pub session_storage: Arc<dyn SessionStorage>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub prices: Arc<dyn PriceRepository>,
    /// Set when sessions live in process memory and need periodic purging.
    pub local_sessions: Option<InMemorySessionStorage>,
    pub local_limiter: Option<InMemoryRateLimiter>,
}

impl Backends {
    /// Everything in process memory. The classifier follows configuration.
    pub fn in_memory(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, BootstrapError> {
        let sessions = InMemorySessionStorage::with_clock(clock.clone());
        let limiter =
            InMemoryRateLimiter::with_clock(config.resilience.rate_limit_config(), clock.clone());
        Ok(Self {
            session_storage: Arc::new(sessions.clone()),
            rate_limiter: Arc::new(limiter.clone()),
            classifier: classifier_from(config)?,
            prices: Arc::new(InMemoryPriceRepository::with_sample_data(clock.now())),
            local_sessions: Some(sessions),
            local_limiter: Some(limiter),
        })
    }

    /// Redis-backed sessions and rate limits when `redis` is configured,
    /// in-memory otherwise.
    pub async fn connect(config: &AppConfig, clock: Arc<dyn Clock>) -> Result<Self, BootstrapError> {
        let Some(redis_config) = &config.redis else {
            tracing::info!("no redis configured, using in-memory sessions and rate limits");
            return Self::in_memory(config, clock);
        };

        let client = redis::Client::open(redis_config.url.as_str())?;
        let conn = tokio::time::timeout(
            redis_config.timeout(),
            client.get_multiplexed_tokio_connection(),
        )
        .await
        .map_err(|_| BootstrapError::RedisTimeout)??;
        tracing::info!("connected to redis");

        Ok(Self {
            session_storage: Arc::new(RedisSessionStorage::new(conn.clone(), redis_config.timeout())),
            rate_limiter: Arc::new(RedisRateLimiter::new(conn, config.resilience.rate_limit_config())),
            classifier: classifier_from(config)?,
            prices: Arc::new(InMemoryPriceRepository::with_sample_data(clock.now())),
            local_sessions: None,
            local_limiter: None,
        })
    }
}

fn classifier_from(config: &AppConfig) -> Result<Arc<dyn IntentClassifier>, BootstrapError> {
    match config.classifier.http_config() {
        Some(http) => {
            tracing::info!(endpoint = %http.endpoint, "using http intent classifier");
            Ok(Arc::new(HttpIntentClassifier::new(http)?))
        }
        None => {
            tracing::info!("no classifier endpoint, using keyword classifier");
            Ok(Arc::new(KeywordIntentClassifier::new()))
        }
    }
}

/// The assembled conversation core.
#[derive(Clone)]
pub struct Services {
    pub router: Arc<MessageRouter>,
    pub degradation: Arc<DegradationController>,
    pub breaker: Arc<dyn CircuitBreaker>,
    pub guard: Arc<ConcurrencyGuard>,
    pub sessions: Arc<SessionStore>,
}

impl Services {
    /// Builds the services over `backends`. Validates `config` first.
    pub fn assemble(
        config: &AppConfig,
        backends: &Backends,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BootstrapError> {
        config.validate()?;

        let degradation = Arc::new(DegradationController::new(
            config
                .resilience
                .degradation_config(config.features.nlp_enabled, config.features.analytics_enabled),
        ));
        if let Some(level) = config.features.forced_level()? {
            degradation.force_level(level);
        }

        let breaker: Arc<dyn CircuitBreaker> = Arc::new(
            InMemoryCircuitBreaker::new(
                CLASSIFIER_BREAKER,
                config.resilience.breaker_config(),
                clock.clone(),
            )
            .with_observer(degradation.clone()),
        );

        let context_ttl = config.session.context_ttl();
        let deps = Arc::new(HandlerDeps {
            prices: backends.prices.clone(),
            wizards: WizardEngine::new(config.session.wizard_ttl()),
            degradation: degradation.clone(),
            breaker: breaker.clone(),
            context_ttl,
        });

        let sessions = Arc::new(SessionStore::new(
            backends.session_storage.clone(),
            clock.clone(),
            config.session.store_config(),
        ));
        let guard = Arc::new(ConcurrencyGuard::new(
            backends.rate_limiter.clone(),
            degradation.clone(),
            config.resilience.max_active_conversations,
        ));
        let nlp = Arc::new(NlpGateway::new(
            backends.classifier.clone(),
            breaker.clone(),
            degradation.clone(),
            clock.clone(),
            config.classifier.gateway_config(context_ttl),
        ));

        let router = Arc::new(MessageRouter::new(
            Arc::new(builtin_registry()?),
            deps,
            sessions.clone(),
            guard.clone(),
            nlp,
            clock,
        ));

        Ok(Self {
            router,
            degradation,
            breaker,
            guard,
            sessions,
        })
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            router: self.router.clone(),
            degradation: self.degradation.clone(),
            breaker: self.breaker.clone(),
            guard: self.guard.clone(),
        }
    }
}

/// Periodically prunes idle session locks and expired in-memory entries.
pub async fn run_maintenance(services: Services, backends: Backends, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let locks = services.sessions.prune_locks();
        let mut sessions = 0;
        if let Some(storage) = &backends.local_sessions {
            sessions = storage.purge_expired().await;
        }
        let mut windows = 0;
        if let Some(limiter) = &backends.local_limiter {
            windows = limiter.purge_expired().await;
        }
        tracing::debug!(locks, sessions, windows, "maintenance pass");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ManualClock;
    use crate::domain::foundation::UserKey;
    use crate::domain::messaging::{InboundMessage, TurnOutcome};
    use crate::domain::resilience::DegradationLevel;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::at_epoch_secs(1_700_000_000))
    }

    #[test]
    fn invalid_config_is_rejected_before_wiring() {
        let mut config = AppConfig::default();
        config.resilience.failure_threshold = 0;
        let clock = clock();
        let backends = Backends::in_memory(&config, clock.clone()).unwrap();

        assert!(matches!(
            Services::assemble(&config, &backends, clock),
            Err(BootstrapError::Config(_))
        ));
    }

    #[test]
    fn forced_level_is_applied() {
        let mut config = AppConfig::default();
        config.features.forced_level = Some("minimal".to_string());
        let clock = clock();
        let backends = Backends::in_memory(&config, clock.clone()).unwrap();
        let services = Services::assemble(&config, &backends, clock).unwrap();

        assert_eq!(services.degradation.level(), DegradationLevel::Minimal);
        assert_eq!(services.breaker.name(), CLASSIFIER_BREAKER);
    }

    #[tokio::test]
    async fn assembled_router_answers_help() {
        let config = AppConfig::default();
        let clock = clock();
        let backends = Backends::in_memory(&config, clock.clone()).unwrap();
        let services = Services::assemble(&config, &backends, clock).unwrap();

        let user = UserKey::new("tg:1").unwrap();
        let reply = services.router.route(InboundMessage::text(user, "/help")).await;
        assert_eq!(reply.outcome, TurnOutcome::Handled);
        assert!(reply.first_text().contains("/prices"));
    }
}
