//! Transport-neutral inbound and outbound messages.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserKey;

/// One message received from a chat transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub user_key: UserKey,
    pub text: String,
    /// Payload of a pressed button, when the message is a callback.
    pub callback_payload: Option<String>,
}

impl InboundMessage {
    pub fn text(user_key: UserKey, text: impl Into<String>) -> Self {
        Self {
            user_key,
            text: text.into(),
            callback_payload: None,
        }
    }

    pub fn callback(user_key: UserKey, payload: impl Into<String>) -> Self {
        Self {
            user_key,
            text: String::new(),
            callback_payload: Some(payload.into()),
        }
    }

    /// The callback payload if present, otherwise the trimmed text.
    pub fn input(&self) -> &str {
        match &self.callback_payload {
            Some(payload) => payload.trim(),
            None => self.text.trim(),
        }
    }

    pub fn is_callback(&self) -> bool {
        self.callback_payload.is_some()
    }
}

/// A button with a label and the payload sent back when pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

/// Rows of buttons attached to a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.rows.push(buttons);
        }
        self
    }

    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}

/// One reply message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<Keyboard>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = (!keyboard.is_empty()).then_some(keyboard);
        self
    }
}

/// How a turn ended, reported alongside the replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// A command or wizard step ran.
    Handled,
    /// A command was suggested instead of run.
    Suggested,
    /// A static or local fallback answered.
    Fallback,
    /// Per-user rate limit hit; the session was not touched.
    RateLimited,
    /// No conversation slot was free; the session was not touched.
    Busy,
    /// A handler failed and the user got a generic error.
    Failed,
}

impl TurnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnOutcome::Handled => "handled",
            TurnOutcome::Suggested => "suggested",
            TurnOutcome::Fallback => "fallback",
            TurnOutcome::RateLimited => "rate_limited",
            TurnOutcome::Busy => "busy",
            TurnOutcome::Failed => "failed",
        }
    }
}

/// Replies produced by one routed turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReply {
    pub messages: Vec<OutboundMessage>,
    pub outcome: TurnOutcome,
}

impl TurnReply {
    pub fn new(outcome: TurnOutcome, messages: Vec<OutboundMessage>) -> Self {
        Self { messages, outcome }
    }

    pub fn single(outcome: TurnOutcome, message: OutboundMessage) -> Self {
        Self::new(outcome, vec![message])
    }

    /// Text of the first message, or empty.
    pub fn first_text(&self) -> &str {
        self.messages.first().map(|m| m.text.as_str()).unwrap_or("")
    }
}
