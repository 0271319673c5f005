//! Request and response bodies for operator endpoints.

use serde::{Deserialize, Serialize};

use crate::application::DegradationSnapshot;
use crate::domain::resilience::DegradationLevel;
use crate::ports::{CircuitBreakerMetrics, CircuitState};

/// Body of `PUT /api/ops/degradation`.
#[derive(Debug, Clone, Deserialize)]
pub struct ForceLevelRequest {
    pub level: DegradationLevel,
}

/// Classifier breaker as reported to operators.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerResponse {
    pub name: String,
    pub state: CircuitState,
    pub metrics: CircuitBreakerMetrics,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub degradation: DegradationSnapshot,
    pub breaker: BreakerResponse,
    pub active_conversations: usize,
    pub max_active_conversations: usize,
}

impl HealthResponse {
    /// `ok` at the normal level, `degraded` otherwise.
    pub fn status_for(level: DegradationLevel) -> &'static str {
        match level {
            DegradationLevel::Normal => "ok",
            DegradationLevel::Degraded | DegradationLevel::Minimal => "degraded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn force_level_request_accepts_snake_case() {
        let request: ForceLevelRequest =
            serde_json::from_value(json!({"level": "minimal"})).unwrap();
        assert_eq!(request.level, DegradationLevel::Minimal);
        assert!(serde_json::from_value::<ForceLevelRequest>(json!({"level": "off"})).is_err());
    }

    #[test]
    fn health_status_reflects_level() {
        assert_eq!(HealthResponse::status_for(DegradationLevel::Normal), "ok");
        assert_eq!(HealthResponse::status_for(DegradationLevel::Minimal), "degraded");
    }
}
