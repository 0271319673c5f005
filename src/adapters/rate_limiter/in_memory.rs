//! In-memory rate limiter implementation.
//!
//! Uses a fixed-window counter algorithm with an in-memory HashMap.
//! Limits are per process; use the Redis limiter to share them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::adapters::clock::SystemClock;
use crate::domain::foundation::Timestamp;
use crate::ports::{
    Clock, RateLimitDenied, RateLimitError, RateLimitKey, RateLimitResult, RateLimitStatus,
    RateLimitTier, RateLimiter,
};

use super::config::RateLimitConfig;

/// In-memory rate limiter for single-process deployments and tests.
///
/// Each window tracks the count of requests and resets when the window
/// expires. The whole check-and-increment runs under one write lock, so
/// concurrent checks for the same key are serialized.
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    windows: Arc<RwLock<HashMap<String, WindowState>>>,
    clock: Arc<dyn Clock>,
}

/// State for a single rate limit window.
#[derive(Debug, Clone)]
struct WindowState {
    /// Number of requests in the current window.
    count: u32,
    /// When the current window started.
    window_start: u64,
    /// Window duration in seconds.
    window_secs: u32,
}

impl InMemoryRateLimiter {
    /// Create a new in-memory rate limiter on the system clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }

    /// Number of tracked windows, expired ones included.
    pub async fn tracked_keys(&self) -> usize {
        self.windows.read().await.len()
    }

    /// Drops windows that have expired.
    pub async fn purge_expired(&self) -> usize {
        let now = self.now_secs();
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, state| now < state.window_start + state.window_secs as u64);
        before - windows.len()
    }

    fn now_secs(&self) -> u64 {
        self.clock.now().as_unix_secs()
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check(
        &self,
        key: RateLimitKey,
        tier: RateLimitTier,
    ) -> Result<RateLimitResult, RateLimitError> {
        let redis_key = key.to_redis_key();
        let limit = self.config.limit_for(tier);
        let window_secs = self.config.window_secs;
        let now = self.now_secs();

        let mut windows = self.windows.write().await;

        let state = windows.entry(redis_key).or_insert_with(|| WindowState {
            count: 0,
            window_start: now,
            window_secs,
        });

        let window_end = state.window_start + state.window_secs as u64;
        if now >= window_end {
            state.count = 0;
            state.window_start = now;
            state.window_secs = window_secs;
        }

        if state.count >= limit {
            let retry_after = (state.window_start + state.window_secs as u64)
                .saturating_sub(now) as u32;

            return Ok(RateLimitResult::Denied(RateLimitDenied {
                limit,
                retry_after_secs: retry_after.max(1),
                tier,
                message: format!(
                    "Rate limit exceeded ({}). Retry after {} seconds.",
                    tier,
                    retry_after.max(1)
                ),
            }));
        }

        state.count += 1;
        let remaining = limit.saturating_sub(state.count);
        let reset_at = Timestamp::from_unix_secs(state.window_start + state.window_secs as u64);

        Ok(RateLimitResult::Allowed(RateLimitStatus {
            limit,
            remaining,
            reset_at,
            window_secs,
        }))
    }
}

impl std::fmt::Debug for InMemoryRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::domain::foundation::UserKey;
    use std::time::Duration;

    const STANDARD: RateLimitTier = RateLimitTier::Standard;
    const SLOW: RateLimitTier = RateLimitTier::SlowMode;

    fn user(id: &str) -> UserKey {
        UserKey::new(id).unwrap()
    }

    fn limiter(per_user: u32, slow: u32) -> (Arc<ManualClock>, InMemoryRateLimiter) {
        let clock = Arc::new(ManualClock::at_epoch_secs(1_700_000_000));
        let config = RateLimitConfig::per_user(per_user, slow, 60);
        (clock.clone(), InMemoryRateLimiter::with_clock(config, clock))
    }

    // ─── Basic Functionality Tests ───────────────────────────────────

    #[tokio::test]
    async fn denies_requests_at_limit() {
        let (_, limiter) = limiter(5, 2);
        let key = RateLimitKey::user(&user("tg:1"));

        for _ in 0..5 {
            assert!(limiter.check(key.clone(), STANDARD).await.unwrap().is_allowed());
        }

        let result = limiter.check(key.clone(), STANDARD).await.unwrap();
        match result {
            RateLimitResult::Denied(denied) => {
                assert_eq!(denied.limit, 5);
                assert_eq!(denied.retry_after_secs, 60);
                assert_eq!(denied.tier, STANDARD);
            }
            RateLimitResult::Allowed(_) => panic!("sixth request should be denied"),
        }
    }

    #[tokio::test]
    async fn allowed_reports_remaining_quota() {
        let (_, limiter) = limiter(10, 2);
        let key = RateLimitKey::user(&user("tg:2"));

        for _ in 0..2 {
            limiter.check(key.clone(), STANDARD).await.unwrap();
        }
        match limiter.check(key, STANDARD).await.unwrap() {
            RateLimitResult::Allowed(status) => {
                assert_eq!(status.limit, 10);
                assert_eq!(status.remaining, 7);
                assert_eq!(status.window_secs, 60);
            }
            RateLimitResult::Denied(_) => panic!("third request should be allowed"),
        }
    }

    #[tokio::test]
    async fn window_expiry_restores_quota() {
        let (clock, limiter) = limiter(2, 1);
        let key = RateLimitKey::user(&user("tg:1"));

        limiter.check(key.clone(), STANDARD).await.unwrap();
        limiter.check(key.clone(), STANDARD).await.unwrap();
        assert!(limiter.check(key.clone(), STANDARD).await.unwrap().is_denied());

        clock.advance(Duration::from_secs(60));
        assert!(limiter.check(key.clone(), STANDARD).await.unwrap().is_allowed());
    }

    // ─── Tiers ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn slow_mode_uses_reduced_limit() {
        let (_, limiter) = limiter(10, 2);
        let key = RateLimitKey::user(&user("tg:4"));

        assert!(limiter.check(key.clone(), SLOW).await.unwrap().is_allowed());
        assert!(limiter.check(key.clone(), SLOW).await.unwrap().is_allowed());
        assert!(limiter.check(key, SLOW).await.unwrap().is_denied());
    }

    #[tokio::test]
    async fn slow_mode_counts_requests_made_before_it_started() {
        let (_, limiter) = limiter(3, 2);
        let key = RateLimitKey::user(&user("tg:5"));

        for _ in 0..3 {
            assert!(limiter.check(key.clone(), STANDARD).await.unwrap().is_allowed());
        }
        assert!(limiter.check(key.clone(), STANDARD).await.unwrap().is_denied());
        assert!(limiter.check(key.clone(), SLOW).await.unwrap().is_denied());
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn different_users_have_independent_limits() {
        let (_, limiter) = limiter(1, 1);
        let a = RateLimitKey::user(&user("tg:a"));
        let b = RateLimitKey::user(&user("tg:b"));

        limiter.check(a.clone(), STANDARD).await.unwrap();
        assert!(limiter.check(a, STANDARD).await.unwrap().is_denied());
        assert!(limiter.check(b, STANDARD).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn purge_drops_only_expired_windows() {
        let (clock, limiter) = limiter(5, 1);
        limiter
            .check(RateLimitKey::user(&user("tg:old")), STANDARD)
            .await
            .unwrap();
        clock.advance(Duration::from_secs(30));
        limiter
            .check(RateLimitKey::user(&user("tg:new")), STANDARD)
            .await
            .unwrap();
        clock.advance(Duration::from_secs(30));

        assert_eq!(limiter.purge_expired().await, 1);
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    // ─── Concurrency ─────────────────────────────────────────────────

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_checks_never_exceed_limit() {
        let (_, limiter) = limiter(10, 2);
        let limiter = Arc::new(limiter);
        let key = RateLimitKey::user(&user("tg:burst"));

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let limiter = limiter.clone();
                let key = key.clone();
                tokio::spawn(async move { limiter.check(key, STANDARD).await.unwrap().is_allowed() })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 10);
    }
}
