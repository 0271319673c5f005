//! Rate limiting port for protecting the conversation core.
//!
//! This port defines the interface for per-user request counting using a
//! fixed-window algorithm. Implementations can use in-memory storage for
//! single-process deployments or Redis when several processes share limits.
//!
//! One window is kept per user. The tier only selects which limit the
//! window's count is compared against, so switching tiers mid-window
//! never grants a fresh budget.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, UserKey};

/// Port for rate limiting operations.
///
/// Implementations must be thread-safe: concurrent `check` calls for the
/// same key never admit more than the limit within one window.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check if request is allowed under `tier`, consuming quota if so.
    ///
    /// Returns `Allowed` with remaining quota or `Denied` with retry info.
    async fn check(
        &self,
        key: RateLimitKey,
        tier: RateLimitTier,
    ) -> Result<RateLimitResult, RateLimitError>;
}

/// Key identifying whose requests are counted.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct RateLimitKey {
    /// Hashed user key.
    pub identifier: String,
}

impl RateLimitKey {
    /// Creates a user-based rate limit key.
    ///
    /// The identifier is the key's digest so transport identities are not
    /// written to shared storage.
    pub fn user(user_key: &UserKey) -> Self {
        Self {
            identifier: user_key.digest(),
        }
    }

    /// Returns the Redis key string for this rate limit key.
    pub fn to_redis_key(&self) -> String {
        format!("ratelimit:user:{}", self.identifier)
    }
}

/// Which per-user limit applies to a check.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitTier {
    /// Regular operation.
    #[default]
    Standard,
    /// Reduced limit while the service is shedding load.
    SlowMode,
}

impl RateLimitTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitTier::Standard => "standard",
            RateLimitTier::SlowMode => "slow_mode",
        }
    }
}

impl fmt::Display for RateLimitTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone)]
pub enum RateLimitResult {
    /// Request is allowed; includes current status.
    Allowed(RateLimitStatus),
    /// Request is denied; includes denial details.
    Denied(RateLimitDenied),
}

impl RateLimitResult {
    /// Returns true if the request was allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }

    /// Returns true if the request was denied.
    pub fn is_denied(&self) -> bool {
        matches!(self, RateLimitResult::Denied(_))
    }
}

/// Current rate limit status.
#[derive(Debug, Clone)]
pub struct RateLimitStatus {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Remaining requests in the current window.
    pub remaining: u32,
    /// When the current window resets.
    pub reset_at: Timestamp,
    /// Window duration in seconds.
    pub window_secs: u32,
}

/// Details of a rate limit denial.
#[derive(Debug, Clone)]
pub struct RateLimitDenied {
    /// Maximum requests allowed in the window.
    pub limit: u32,
    /// Seconds until the client should retry.
    pub retry_after_secs: u32,
    /// The tier whose limit was hit.
    pub tier: RateLimitTier,
    /// Human-readable message explaining the denial.
    pub message: String,
}

/// Errors that can occur during rate limiting operations.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Rate limiter backend is unavailable.
    #[error("rate limiter unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserKey {
        UserKey::new("tg:123").unwrap()
    }

    #[test]
    fn user_key_uses_digest() {
        let key = RateLimitKey::user(&user());
        assert_eq!(key.identifier, user().digest());
        assert!(!key.identifier.contains("tg:123"));
    }

    #[test]
    fn redis_key_is_shared_by_both_tiers() {
        assert_eq!(
            RateLimitKey::user(&user()).to_redis_key(),
            format!("ratelimit:user:{}", user().digest())
        );
    }

    #[test]
    fn rate_limit_result_predicates() {
        let allowed = RateLimitResult::Allowed(RateLimitStatus {
            limit: 60,
            remaining: 10,
            reset_at: Timestamp::from_unix_secs(60),
            window_secs: 60,
        });
        assert!(allowed.is_allowed());

        let denied = RateLimitResult::Denied(RateLimitDenied {
            limit: 10,
            retry_after_secs: 30,
            tier: RateLimitTier::SlowMode,
            message: "Rate limit exceeded".to_string(),
        });
        assert!(denied.is_denied());
    }
}
