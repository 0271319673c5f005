//! HTTP handlers for health and operator endpoints.

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::dto::{BreakerResponse, ForceLevelRequest, HealthResponse};
use crate::adapters::http::AppState;

fn breaker_view(state: &AppState) -> BreakerResponse {
    BreakerResponse {
        name: state.breaker.name().to_string(),
        state: state.breaker.state(),
        metrics: state.breaker.metrics(),
    }
}

/// GET /health - Current service level and resilience state.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let degradation = state.degradation.snapshot();
    Json(HealthResponse {
        status: HealthResponse::status_for(degradation.level),
        degradation,
        breaker: breaker_view(&state),
        active_conversations: state.guard.active_count(),
        max_active_conversations: state.guard.capacity(),
    })
}

/// PUT /api/ops/degradation - Pin the service level.
pub async fn force_degradation(
    State(state): State<AppState>,
    Json(request): Json<ForceLevelRequest>,
) -> impl IntoResponse {
    tracing::info!(level = %request.level, "degradation level forced by operator");
    state.degradation.force_level(request.level);
    Json(state.degradation.snapshot())
}

/// DELETE /api/ops/degradation - Drop the manual override.
pub async fn clear_degradation(State(state): State<AppState>) -> impl IntoResponse {
    tracing::info!("degradation override cleared by operator");
    state.degradation.clear_override();
    Json(state.degradation.snapshot())
}

/// POST /api/ops/breaker/reset - Force the classifier breaker closed.
pub async fn reset_breaker(State(state): State<AppState>) -> impl IntoResponse {
    tracing::info!(breaker = state.breaker.name(), "breaker reset by operator");
    state.breaker.reset();
    (StatusCode::OK, Json(breaker_view(&state)))
}
