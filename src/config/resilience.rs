//! Resilience configuration - breaker, rate limits and degradation thresholds.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::RateLimitConfig;
use crate::application::DegradationConfig;
use crate::ports::CircuitBreakerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ResilienceConfig {
    /// Consecutive classifier failures before the breaker opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds the breaker stays open before a probe
    #[serde(default = "default_cool_down")]
    pub cool_down_secs: u64,

    /// Probe calls allowed while half-open
    #[serde(default = "default_one")]
    pub half_open_max_requests: u32,

    /// Probe successes needed to close again
    #[serde(default = "default_one")]
    pub success_threshold: u32,

    /// Per-user requests per window
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,

    /// Rate limit window in seconds
    #[serde(default = "default_window")]
    pub window_secs: u32,

    /// Per-user requests per window while slow mode is on
    #[serde(default = "default_slow_mode_requests")]
    pub slow_mode_requests_per_window: u32,

    /// Conversations processed at the same time
    #[serde(default = "default_max_active_conversations")]
    pub max_active_conversations: usize,

    #[serde(default = "default_degraded_load_ratio")]
    pub degraded_load_ratio: f64,

    #[serde(default = "default_minimal_load_ratio")]
    pub minimal_load_ratio: f64,

    #[serde(default = "default_degraded_latency")]
    pub degraded_latency_ms: u64,

    #[serde(default = "default_minimal_latency")]
    pub minimal_latency_ms: u64,
}

impl ResilienceConfig {
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            cool_down: Duration::from_secs(self.cool_down_secs),
            success_threshold: self.success_threshold,
            half_open_max_requests: self.half_open_max_requests,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig::per_user(
            self.requests_per_window,
            self.slow_mode_requests_per_window,
            self.window_secs,
        )
    }

    /// Degradation thresholds combined with the operator feature switches.
    pub fn degradation_config(&self, nlp_enabled: bool, analytics_enabled: bool) -> DegradationConfig {
        DegradationConfig {
            degraded_load_ratio: self.degraded_load_ratio,
            minimal_load_ratio: self.minimal_load_ratio,
            degraded_latency: Duration::from_millis(self.degraded_latency_ms),
            minimal_latency: Duration::from_millis(self.minimal_latency_ms),
            nlp_enabled,
            analytics_enabled,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("resilience.failure_threshold", self.failure_threshold),
            ("resilience.half_open_max_requests", self.half_open_max_requests),
            ("resilience.success_threshold", self.success_threshold),
            ("resilience.requests_per_window", self.requests_per_window),
            ("resilience.window_secs", self.window_secs),
            (
                "resilience.slow_mode_requests_per_window",
                self.slow_mode_requests_per_window,
            ),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ValidationError::MustBePositive(name));
        }
        if self.cool_down_secs == 0 {
            return Err(ValidationError::MustBePositive("resilience.cool_down_secs"));
        }
        if self.max_active_conversations == 0 {
            return Err(ValidationError::MustBePositive(
                "resilience.max_active_conversations",
            ));
        }

        for (name, ratio) in [
            ("resilience.degraded_load_ratio", self.degraded_load_ratio),
            ("resilience.minimal_load_ratio", self.minimal_load_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(ValidationError::InvalidRatio(name));
            }
        }
        if self.minimal_load_ratio < self.degraded_load_ratio {
            return Err(ValidationError::ThresholdOrder("load_ratio"));
        }
        if self.minimal_latency_ms < self.degraded_latency_ms {
            return Err(ValidationError::ThresholdOrder("latency_ms"));
        }
        Ok(())
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cool_down_secs: default_cool_down(),
            half_open_max_requests: default_one(),
            success_threshold: default_one(),
            requests_per_window: default_requests_per_window(),
            window_secs: default_window(),
            slow_mode_requests_per_window: default_slow_mode_requests(),
            max_active_conversations: default_max_active_conversations(),
            degraded_load_ratio: default_degraded_load_ratio(),
            minimal_load_ratio: default_minimal_load_ratio(),
            degraded_latency_ms: default_degraded_latency(),
            minimal_latency_ms: default_minimal_latency(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_cool_down() -> u64 {
    60
}

fn default_one() -> u32 {
    1
}

fn default_requests_per_window() -> u32 {
    60
}

fn default_window() -> u32 {
    60
}

fn default_slow_mode_requests() -> u32 {
    10
}

fn default_max_active_conversations() -> usize {
    crate::application::DEFAULT_MAX_ACTIVE_CONVERSATIONS
}

fn default_degraded_load_ratio() -> f64 {
    0.75
}

fn default_minimal_load_ratio() -> f64 {
    0.95
}

fn default_degraded_latency() -> u64 {
    2000
}

fn default_minimal_latency() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RateLimitTier;

    #[test]
    fn test_defaults_map_to_component_configs() {
        let config = ResilienceConfig::default();
        assert!(config.validate().is_ok());

        let breaker = config.breaker_config();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.cool_down, Duration::from_secs(60));
        assert_eq!(breaker.half_open_max_requests, 1);

        let limits = config.rate_limit_config();
        assert_eq!(limits.limit_for(RateLimitTier::Standard), 60);
        assert_eq!(limits.limit_for(RateLimitTier::SlowMode), 10);
        assert_eq!(limits.window_secs, 60);

        let degradation = config.degradation_config(true, false);
        assert_eq!(degradation.minimal_latency, Duration::from_millis(5000));
        assert!(!degradation.analytics_enabled);
    }

    #[test]
    fn test_zero_threshold_is_rejected() {
        let config = ResilienceConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MustBePositive("resilience.failure_threshold"))
        );
    }

    #[test]
    fn test_threshold_order_is_checked() {
        let config = ResilienceConfig {
            degraded_load_ratio: 0.9,
            minimal_load_ratio: 0.8,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::ThresholdOrder("load_ratio"))
        );

        let config = ResilienceConfig {
            minimal_load_ratio: 1.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidRatio(_))));
    }
}
