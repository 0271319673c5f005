//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the conversation core and the outside world. Adapters implement these
//! ports.
//!
//! ## Resilience Ports
//!
//! - `CircuitBreaker` - failure isolation around external dependencies
//! - `RateLimiter` - fixed-window request counting
//!
//! ## Collaborator Ports
//!
//! - `SessionStorage` - get / set-with-TTL byte store for sessions
//! - `IntentClassifier` - external NLP classifier
//! - `PriceRepository` - price, station and preference queries
//! - `Clock` - current time

mod circuit_breaker;
mod clock;
mod intent_classifier;
mod price_repository;
mod rate_limiter;
mod session_storage;

pub use circuit_breaker::{
    execute, BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics,
    CircuitBreakerObserver, CircuitState,
};
pub use clock::Clock;
pub use intent_classifier::{ClassifierError, ClassifyContext, ClassifyRequest, IntentClassifier};
pub use price_repository::{FuelPrice, PriceRepository, PriceStats, Station, StoreError};
pub use rate_limiter::{
    RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus,
    RateLimitTier, RateLimiter,
};
pub use session_storage::{SessionStorage, SessionStorageError};
