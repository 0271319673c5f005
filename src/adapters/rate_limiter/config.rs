//! Rate limit configuration.

use serde::{Deserialize, Serialize};

use crate::ports::RateLimitTier;

/// Per-user fixed-window limits.
///
/// Both tiers share one window; only the ceiling differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Window duration in seconds.
    pub window_secs: u32,
    /// Requests per window in regular operation.
    pub requests_per_window: u32,
    /// Requests per window while slow mode is on.
    pub slow_mode_requests_per_window: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_user(60, 10, 60)
    }
}

impl RateLimitConfig {
    /// Per-user config with a slow mode limit over the same window.
    pub fn per_user(requests_per_window: u32, slow_mode_requests: u32, window_secs: u32) -> Self {
        Self {
            window_secs,
            requests_per_window,
            slow_mode_requests_per_window: slow_mode_requests,
        }
    }

    /// Requests allowed per window under `tier`.
    ///
    /// Slow mode never raises the ceiling above the regular limit.
    pub fn limit_for(&self, tier: RateLimitTier) -> u32 {
        match tier {
            RateLimitTier::Standard => self.requests_per_window,
            RateLimitTier::SlowMode => self
                .slow_mode_requests_per_window
                .min(self.requests_per_window),
        }
    }
}
