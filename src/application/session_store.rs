//! SessionStore - load/save of conversation sessions with per-user locking.
//!
//! Sessions are serialised as JSON and written through the
//! [`SessionStorage`] port under `"{prefix}:{sha256(user_key)}"`. Every save
//! refreshes the inactivity TTL, so abandoned sessions expire on their own.
//!
//! Loading never fails: a missing, unreadable or corrupt payload yields a
//! fresh session. Callers that read-modify-write a session must hold the
//! user's lock from [`SessionStore::lock`] for the whole turn.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::UserKey;
use crate::domain::session::ConversationSession;
use crate::ports::{Clock, SessionStorage};

/// Default inactivity TTL applied on every save.
pub const DEFAULT_INACTIVITY_TTL: Duration = Duration::from_secs(30 * 60);

/// Default storage key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "session";

/// Settings for the session store.
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    pub key_prefix: String,
    pub inactivity_ttl: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            inactivity_ttl: DEFAULT_INACTIVITY_TTL,
        }
    }
}

/// Loads and saves sessions, serialising access per user.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    clock: Arc<dyn Clock>,
    config: SessionStoreConfig,
    locks: DashMap<UserKey, Arc<Mutex<()>>>,
}

impl SessionStore {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        clock: Arc<dyn Clock>,
        config: SessionStoreConfig,
    ) -> Self {
        Self {
            storage,
            clock,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &SessionStoreConfig {
        &self.config
    }

    /// Storage key for a user. The raw identity never reaches the store.
    pub fn storage_key(&self, user: &UserKey) -> String {
        format!("{}:{}", self.config.key_prefix, user.digest())
    }

    /// Acquires the user's session lock.
    ///
    /// Different users never contend; two turns from the same user run one
    /// after the other.
    pub async fn lock(&self, user: &UserKey) -> OwnedMutexGuard<()> {
        let mutex = self
            .locks
            .entry(user.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        mutex.lock_owned().await
    }

    /// Drops lock entries nobody is holding or waiting on.
    ///
    /// Returns the number of entries removed.
    pub fn prune_locks(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        before.saturating_sub(self.locks.len())
    }

    /// Number of users with a lock entry.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Loads the user's session, or a fresh one.
    pub async fn load(&self, user: &UserKey) -> ConversationSession {
        let key = self.storage_key(user);
        let now = self.clock.now();

        let bytes = match self.storage.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return ConversationSession::new(user.clone(), now),
            Err(err) => {
                tracing::warn!(error = %err, "session storage read failed, starting fresh session");
                return ConversationSession::new(user.clone(), now);
            }
        };

        match serde_json::from_slice::<ConversationSession>(&bytes) {
            Ok(session) if session.user_key() == user => session,
            Ok(_) => {
                tracing::warn!("stored session belongs to another user, starting fresh session");
                ConversationSession::new(user.clone(), now)
            }
            Err(err) => {
                tracing::warn!(error = %err, "stored session is corrupt, starting fresh session");
                ConversationSession::new(user.clone(), now)
            }
        }
    }

    /// Persists the session with a refreshed inactivity TTL.
    ///
    /// Failures are logged and swallowed; the turn's changes are lost but
    /// the conversation carries on.
    pub async fn save(&self, session: &ConversationSession) {
        let key = self.storage_key(session.user_key());

        let bytes = match serde_json::to_vec(session) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialise session");
                return;
            }
        };

        if let Err(err) = self
            .storage
            .set_with_ttl(&key, bytes, self.config.inactivity_ttl)
            .await
        {
            tracing::warn!(error = %err, "session storage write failed");
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.config)
            .field("locks", &self.locks.len())
            .finish()
    }
}
