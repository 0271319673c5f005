//! HTTP routes for health and operator endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{clear_degradation, force_degradation, health, reset_breaker};
use crate::adapters::http::AppState;

/// Creates the ops router.
pub fn ops_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/ops/degradation",
            put(force_degradation).delete(clear_degradation),
        )
        .route("/api/ops/breaker/reset", post(reset_breaker))
}
