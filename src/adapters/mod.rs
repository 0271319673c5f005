//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the conversation core to external systems:
//! - `circuit_breaker` - in-process breaker
//! - `classifier` - HTTP, keyword and scripted mock classifiers
//! - `clock` - system and manual clocks
//! - `http` - axum transport and operational endpoints
//! - `prices` - in-memory price store
//! - `rate_limiter` - fixed-window limiters (in-memory, Redis)
//! - `session_storage` - TTL key/value stores (in-memory, Redis)

pub mod circuit_breaker;
pub mod classifier;
pub mod clock;
pub mod http;
pub mod prices;
pub mod rate_limiter;
pub mod session_storage;

pub use circuit_breaker::InMemoryCircuitBreaker;
pub use classifier::{
    HttpClassifierConfig, HttpIntentClassifier, KeywordIntentClassifier, MockIntentClassifier,
};
pub use clock::{ManualClock, SystemClock};
pub use prices::InMemoryPriceRepository;
pub use rate_limiter::{InMemoryRateLimiter, RateLimitConfig, RedisRateLimiter};
pub use session_storage::{InMemorySessionStorage, RedisSessionStorage};
