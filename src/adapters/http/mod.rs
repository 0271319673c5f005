//! HTTP adapters - axum transport for chat traffic and operations.
//!
//! - `chat` - `POST /api/messages`
//! - `ops` - health, degradation override, breaker reset

pub mod chat;
pub mod ops;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::application::{ConcurrencyGuard, DegradationController, MessageRouter};
use crate::ports::CircuitBreaker;

pub use chat::chat_routes;
pub use ops::ops_routes;

/// Shared state for all handlers; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<MessageRouter>,
    pub degradation: Arc<DegradationController>,
    pub breaker: Arc<dyn CircuitBreaker>,
    pub guard: Arc<ConcurrencyGuard>,
}

/// Full application router with tracing and a request timeout.
pub fn app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .merge(chat_routes())
        .merge(ops_routes())
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

/// Error body returned for transport-level failures.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Transport-level failure with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error_code: error_code.to_string(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ManualClock;
    use crate::bootstrap::{Backends, Services};
    use crate::config::AppConfig;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app() -> (Services, Router) {
        let config = AppConfig::default();
        let clock = Arc::new(ManualClock::at_epoch_secs(1_700_000_000));
        let backends = Backends::in_memory(&config, clock.clone()).unwrap();
        let services = Services::assemble(&config, &backends, clock).unwrap();
        let router = app(services.app_state(), Duration::from_secs(5));
        (services, router)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn post_message_returns_replies() {
        let (_, app) = test_app();
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/messages",
                json!({"user_key": "tg:7", "text": "/start"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["outcome"], "handled");
        assert!(body["messages"][0]["keyboard"].is_object());
    }

    #[tokio::test]
    async fn blank_user_key_is_a_bad_request() {
        let (_, app) = test_app();
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/messages",
                json!({"user_key": "", "text": "hi"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error_code"], "INVALID_MESSAGE");
    }

    #[tokio::test]
    async fn health_reports_level_and_breaker() {
        let (_, app) = test_app();
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["degradation"]["level"], "normal");
        assert_eq!(body["breaker"]["state"], "closed");
        assert_eq!(body["max_active_conversations"], 256);
    }

    #[tokio::test]
    async fn degradation_override_can_be_set_and_cleared() {
        let (services, app) = test_app();

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/ops/degradation",
                json!({"level": "minimal"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["level"], "minimal");
        assert!(services.degradation.is_slow_mode_enabled());

        let response = app
            .oneshot(
                Request::delete("/api/ops/degradation")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["level"], "normal");
    }

    #[tokio::test]
    async fn breaker_reset_closes_the_classifier_breaker() {
        let (services, app) = test_app();
        for _ in 0..5 {
            assert!(services.breaker.try_acquire());
            services.breaker.record_failure();
        }
        assert!(!services.breaker.try_acquire());

        let response = app
            .oneshot(
                Request::post("/api/ops/breaker/reset")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["state"], "closed");
        assert!(services.breaker.try_acquire());
    }
}
