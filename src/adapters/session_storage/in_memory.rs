//! In-Memory Session Storage Adapter
//!
//! Stores session payloads in memory with per-entry expiry.
//! Used for development, the console transport, and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::adapters::clock::SystemClock;
use crate::domain::foundation::Timestamp;
use crate::ports::{Clock, SessionStorage, SessionStorageError};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Timestamp,
}

/// In-memory storage with TTL
#[derive(Clone)]
pub struct InMemorySessionStorage {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    clock: Arc<dyn Clock>,
    unavailable: Arc<AtomicBool>,
}

impl InMemorySessionStorage {
    /// Create a new in-memory storage on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            clock,
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Makes every subsequent call fail with `Unavailable` (or succeed
    /// again). Simulates an outage of the backing cache.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live (unexpired) entries
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| now.is_before(&e.expires_at))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Keys of all live entries
    pub async fn keys(&self) -> Vec<String> {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .iter()
            .filter(|(_, e)| now.is_before(&e.expires_at))
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Drops expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| now.is_before(&e.expires_at));
        before - entries.len()
    }

    /// Clear all stored data (useful for tests)
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    fn check_available(&self) -> Result<(), SessionStorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(SessionStorageError::Unavailable(
                "in-memory storage marked unavailable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionStorageError> {
        self.check_available()?;
        let now = self.clock.now();

        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if now.is_before(&entry.expires_at) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), SessionStorageError> {
        self.check_available()?;
        let expires_at = self.clock.now().plus(ttl);
        self.entries
            .write()
            .await
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }
}

impl std::fmt::Debug for InMemorySessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionStorage")
            .field("unavailable", &self.unavailable.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
