//! ConcurrencyGuard - admission control for inbound turns.
//!
//! Two checks run before any session work: the per-user fixed-window rate
//! limit (tightened while slow mode is on) and a bound on conversations in
//! flight. Admitted turns hold a [`ConversationPermit`] until they finish.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::application::DegradationController;
use crate::domain::foundation::UserKey;
use crate::ports::{RateLimitKey, RateLimitResult, RateLimitTier, RateLimiter};

/// Default bound on conversations handled at once.
pub const DEFAULT_MAX_ACTIVE_CONVERSATIONS: usize = 256;

/// Result of asking to start a turn.
#[derive(Debug)]
pub enum Admission {
    /// The turn may run while the permit is held.
    Admitted(ConversationPermit),
    /// The user exceeded their per-window quota.
    RateLimited { retry_after_secs: u32 },
    /// Every conversation slot is taken.
    Busy,
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }
}

/// Holds one conversation slot. Releasing it reports the new load.
#[derive(Debug)]
pub struct ConversationPermit {
    permit: Option<OwnedSemaphorePermit>,
    slots: Arc<Semaphore>,
    capacity: usize,
    degradation: Arc<DegradationController>,
}

impl Drop for ConversationPermit {
    fn drop(&mut self) {
        drop(self.permit.take());
        let active = self.capacity.saturating_sub(self.slots.available_permits());
        self.degradation.report_load(active, self.capacity);
    }
}

/// Per-user rate limiting plus a global in-flight bound.
pub struct ConcurrencyGuard {
    limiter: Arc<dyn RateLimiter>,
    degradation: Arc<DegradationController>,
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGuard {
    pub fn new(
        limiter: Arc<dyn RateLimiter>,
        degradation: Arc<DegradationController>,
        max_active_conversations: usize,
    ) -> Self {
        Self {
            limiter,
            degradation,
            slots: Arc::new(Semaphore::new(max_active_conversations)),
            capacity: max_active_conversations,
        }
    }

    /// Decides whether a turn for `user` may run now.
    ///
    /// A limiter failure admits the turn; losing throttling for a moment
    /// is preferred over refusing everyone.
    pub async fn try_acquire(&self, user: &UserKey) -> Admission {
        let tier = if self.degradation.is_slow_mode_enabled() {
            RateLimitTier::SlowMode
        } else {
            RateLimitTier::Standard
        };

        match self.limiter.check(RateLimitKey::user(user), tier).await {
            Ok(RateLimitResult::Denied(denied)) => {
                tracing::debug!(
                    tier = %denied.tier,
                    retry_after_secs = denied.retry_after_secs,
                    "turn rate limited"
                );
                return Admission::RateLimited {
                    retry_after_secs: denied.retry_after_secs,
                };
            }
            Ok(RateLimitResult::Allowed(_)) => {}
            Err(err) => {
                tracing::warn!(error = %err, "rate limiter unavailable, admitting turn");
            }
        }

        match self.slots.clone().try_acquire_owned() {
            Ok(permit) => {
                self.degradation
                    .report_load(self.active_count(), self.capacity);
                Admission::Admitted(ConversationPermit {
                    permit: Some(permit),
                    slots: self.slots.clone(),
                    capacity: self.capacity,
                    degradation: self.degradation.clone(),
                })
            }
            Err(_) => {
                tracing::warn!(capacity = self.capacity, "no conversation slot available");
                self.degradation.report_load(self.capacity, self.capacity);
                Admission::Busy
            }
        }
    }

    /// Conversations currently holding a permit.
    pub fn active_count(&self) -> usize {
        self.capacity.saturating_sub(self.slots.available_permits())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for ConcurrencyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyGuard")
            .field("capacity", &self.capacity)
            .field("active", &self.active_count())
            .finish_non_exhaustive()
    }
}
