//! Session Storage Port - minimal key/value store with expiry.
//!
//! Any store that can get a value and set one with a TTL satisfies it;
//! the session layer owns key naming and serialisation.

use async_trait::async_trait;
use std::time::Duration;

/// Errors that can occur during session storage operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionStorageError {
    #[error("session storage unavailable: {0}")]
    Unavailable(String),

    #[error("session storage operation timed out")]
    Timeout,
}

/// Port for storing opaque session payloads.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Returns the bytes stored under `key`, `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionStorageError>;

    /// Stores `value` under `key`, replacing any previous value and
    /// resetting its expiry to `ttl`.
    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), SessionStorageError>;
}
