//! Domain layer containing conversation logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `session` - Per-user conversation session, context and history
//! - `wizard` - Multi-step wizards and the wizard engine
//! - `nlp` - Intents, entities and the local fallback classifier
//! - `resilience` - Degradation levels and feature flags
//! - `messaging` - Inbound/outbound chat messages

pub mod foundation;
pub mod messaging;
pub mod nlp;
pub mod resilience;
pub mod session;
pub mod wizard;
