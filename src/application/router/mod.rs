//! Message routing - commands, wizards and free text.
//!
//! - `registry` - command table and typo suggestions
//! - `handlers` - built-in commands
//! - `wizard_flow` - prompts and input handling for active wizards
//! - `message_router` - per-turn dispatch

pub mod handlers;
pub mod message_router;
pub mod registry;
pub mod wizard_flow;

pub use handlers::{
    builtin_registry, command_for_intent, CommandContext, CommandHandler, CommandSource,
    HandlerDeps, HandlerError, DEPENDENCY_FAILURE_REPLY, INTERNAL_FAILURE_REPLY,
};
pub use message_router::{MessageRouter, BUSY_REPLY, NLP_DISABLED_REPLY, NOT_UNDERSTOOD_REPLY};
pub use registry::{
    parse_command, CommandDescriptor, CommandRegistry, RegistryError, DEFAULT_SUGGESTIONS,
};
