//! HTTP handlers for chat endpoints.

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::dto::{MessageRequest, MessageResponse};
use crate::adapters::http::{ApiError, AppState};

/// POST /api/messages - Route one inbound message.
///
/// Rate limiting and overload are normal replies (`outcome`), not HTTP errors.
pub async fn post_message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let inbound = request
        .into_inbound()
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, "INVALID_MESSAGE", err.to_string()))?;

    let reply = state.router.route(inbound).await;
    Ok(Json(MessageResponse::from(reply)))
}
