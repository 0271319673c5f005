//! Request and response bodies for chat endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{UserKey, ValidationError};
use crate::domain::messaging::{InboundMessage, OutboundMessage, TurnOutcome, TurnReply};

/// Body of `POST /api/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRequest {
    /// Transport identity of the sender.
    pub user_key: String,
    /// Typed text; ignored when `callback_payload` is present.
    #[serde(default)]
    pub text: String,
    /// Payload of a pressed button.
    #[serde(default)]
    pub callback_payload: Option<String>,
}

impl MessageRequest {
    pub fn into_inbound(self) -> Result<InboundMessage, ValidationError> {
        let user_key = UserKey::new(self.user_key)?;
        Ok(match self.callback_payload {
            Some(payload) => InboundMessage::callback(user_key, payload),
            None => InboundMessage::text(user_key, self.text),
        })
    }
}

/// Replies for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub messages: Vec<OutboundMessage>,
    pub outcome: TurnOutcome,
}

impl From<TurnReply> for MessageResponse {
    fn from(reply: TurnReply) -> Self {
        Self {
            messages: reply.messages,
            outcome: reply.outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_request_becomes_text_message() {
        let request: MessageRequest =
            serde_json::from_value(json!({"user_key": "tg:42", "text": "/help"})).unwrap();
        let inbound = request.into_inbound().unwrap();
        assert_eq!(inbound.input(), "/help");
        assert!(!inbound.is_callback());
    }

    #[test]
    fn callback_payload_wins_over_text() {
        let request: MessageRequest = serde_json::from_value(json!({
            "user_key": "tg:42",
            "text": "ignored",
            "callback_payload": "toggle:diesel"
        }))
        .unwrap();
        let inbound = request.into_inbound().unwrap();
        assert!(inbound.is_callback());
        assert_eq!(inbound.input(), "toggle:diesel");
    }

    #[test]
    fn blank_user_key_is_rejected() {
        let request: MessageRequest =
            serde_json::from_value(json!({"user_key": "  ", "text": "hi"})).unwrap();
        assert!(request.into_inbound().is_err());
    }

    #[test]
    fn response_serializes_outcome_in_snake_case() {
        let response = MessageResponse::from(TurnReply::single(
            TurnOutcome::RateLimited,
            OutboundMessage::text("slow down"),
        ));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["outcome"], "rate_limited");
        assert_eq!(value["messages"][0]["text"], "slow down");
    }
}
