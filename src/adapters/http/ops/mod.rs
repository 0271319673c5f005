//! HTTP adapter for health and operator endpoints.
//!
//! - `GET /health` - service level, features, breaker metrics, load
//! - `PUT /api/ops/degradation` - pin the service level
//! - `DELETE /api/ops/degradation` - return to signal-driven levels
//! - `POST /api/ops/breaker/reset` - force the classifier breaker closed

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{BreakerResponse, ForceLevelRequest, HealthResponse};
pub use routes::ops_routes;
