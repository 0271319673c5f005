//! Redis-backed rate limiter implementation.
//!
//! Uses a fixed-window counter with Redis INCR + EXPIRE so limits are
//! shared between processes.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::Arc;

use crate::adapters::clock::SystemClock;
use crate::domain::foundation::Timestamp;
use crate::ports::{
    Clock, RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus,
    RateLimitTier, RateLimiter,
};

use super::config::RateLimitConfig;

/// Redis-backed rate limiter for multi-process deployments.
///
/// Uses a fixed-window counter algorithm:
/// 1. INCR the key to increment the counter
/// 2. If count is 1, set EXPIRE for the window duration
/// 3. If count > the tier's limit, deny the request
///
/// INCR is atomic, so concurrent checks never admit more than the limit.
/// A window may briefly run long if the process dies between INCR and
/// EXPIRE on the first request.
#[derive(Clone)]
pub struct RedisRateLimiter {
    conn: MultiplexedConnection,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

fn unavailable(e: redis::RedisError) -> RateLimitError {
    RateLimitError::Unavailable(e.to_string())
}

impl RedisRateLimiter {
    /// Create a new Redis rate limiter.
    pub fn new(conn: MultiplexedConnection, config: RateLimitConfig) -> Self {
        Self {
            conn,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    fn reset_at(&self, ttl: i64, window_secs: u32) -> (Timestamp, u64) {
        let reset_secs = if ttl > 0 { ttl as u64 } else { window_secs as u64 };
        (self.clock.now().plus_secs(reset_secs), reset_secs)
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(
        &self,
        key: RateLimitKey,
        tier: RateLimitTier,
    ) -> Result<RateLimitResult, RateLimitError> {
        let redis_key = key.to_redis_key();
        let limit = self.config.limit_for(tier);
        let window_secs = self.config.window_secs;

        let mut conn = self.conn.clone();

        let count: i64 = conn.incr(&redis_key, 1_i64).await.map_err(unavailable)?;

        // Set expiry on first request in window
        if count == 1 {
            conn.expire::<_, ()>(&redis_key, window_secs as i64)
                .await
                .map_err(unavailable)?;
        }

        let ttl: i64 = conn.ttl(&redis_key).await.map_err(unavailable)?;
        let (reset_at, reset_secs) = self.reset_at(ttl, window_secs);

        if count > limit as i64 {
            let retry_after = (reset_secs as u32).max(1);
            return Ok(RateLimitResult::Denied(RateLimitDenied {
                limit,
                retry_after_secs: retry_after,
                tier,
                message: format!(
                    "Rate limit exceeded ({}). Retry after {} seconds.",
                    tier, retry_after
                ),
            }));
        }

        Ok(RateLimitResult::Allowed(RateLimitStatus {
            limit,
            remaining: limit.saturating_sub(count as u32),
            reset_at,
            window_secs,
        }))
    }
}

impl std::fmt::Debug for RedisRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisRateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
