//! Messages exchanged with chat transports.

mod message;

pub use message::{Button, InboundMessage, Keyboard, OutboundMessage, TurnOutcome, TurnReply};
