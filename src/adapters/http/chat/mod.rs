//! HTTP adapter for chat traffic.
//!
//! - `POST /api/messages` - route one inbound message and return the replies

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{MessageRequest, MessageResponse};
pub use routes::chat_routes;
