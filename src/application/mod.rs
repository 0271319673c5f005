//! Application layer - orchestration of one conversation turn.
//!
//! Services here coordinate domain logic with the ports:
//!
//! - `session_store` - per-user locking, load and save of sessions
//! - `concurrency_guard` - rate limiting and the conversation cap
//! - `degradation_controller` - service level and feature flags
//! - `nlp_gateway` - breaker-protected classification with local fallback
//! - `router` - command registry, handlers and the message router

pub mod concurrency_guard;
pub mod degradation_controller;
pub mod nlp_gateway;
pub mod router;
pub mod session_store;

pub use concurrency_guard::{
    Admission, ConcurrencyGuard, ConversationPermit, DEFAULT_MAX_ACTIVE_CONVERSATIONS,
};
pub use degradation_controller::{DegradationConfig, DegradationController, DegradationSnapshot};
pub use nlp_gateway::{FallbackReason, NlpGateway, NlpGatewayConfig, NlpResult};
pub use router::{
    builtin_registry, CommandRegistry, HandlerDeps, HandlerError, MessageRouter,
};
pub use session_store::{SessionStore, SessionStoreConfig};
