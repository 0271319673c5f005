//! Conversation session module.
//!
//! - `ConversationSession` - per-user dialog state (wizard, context, history)
//! - `ConversationContext` - last intent/entities for follow-up resolution

mod context;
mod conversation_session;

pub use context::{ContextUpdate, ConversationContext, DEFAULT_CONTEXT_TTL};
pub use conversation_session::{ConversationSession, HistoryEntry, HISTORY_LIMIT};
