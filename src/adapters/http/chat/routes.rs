//! HTTP routes for chat endpoints.

use axum::{routing::post, Router};

use super::handlers::post_message;
use crate::adapters::http::AppState;

/// Creates the chat router.
pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/api/messages", post(post_message))
}
