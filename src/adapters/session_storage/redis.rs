//! Redis Session Storage Adapter
//!
//! GET / SET EX over a multiplexed connection. Every call is bounded by
//! the configured timeout.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;

use crate::ports::{SessionStorage, SessionStorageError};

/// Redis-backed session storage.
#[derive(Clone)]
pub struct RedisSessionStorage {
    conn: MultiplexedConnection,
    timeout: Duration,
}

impl RedisSessionStorage {
    pub fn new(conn: MultiplexedConnection, timeout: Duration) -> Self {
        Self { conn, timeout }
    }

    /// Opens a multiplexed connection to `url`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, SessionStorageError> {
        let client = redis::Client::open(url)
            .map_err(|e| SessionStorageError::Unavailable(e.to_string()))?;
        let conn = tokio::time::timeout(timeout, client.get_multiplexed_tokio_connection())
            .await
            .map_err(|_| SessionStorageError::Timeout)?
            .map_err(|e| SessionStorageError::Unavailable(e.to_string()))?;
        Ok(Self::new(conn, timeout))
    }

    /// Shares the underlying connection (e.g. with the rate limiter).
    pub fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

#[async_trait]
impl SessionStorage for RedisSessionStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionStorageError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        let query = cmd.query_async::<_, Option<Vec<u8>>>(&mut conn);

        tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| SessionStorageError::Timeout)?
            .map_err(|e| SessionStorageError::Unavailable(e.to_string()))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), SessionStorageError> {
        let mut conn = self.conn.clone();
        let secs = ttl.as_secs().max(1);
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(secs);
        let query = cmd.query_async::<_, ()>(&mut conn);

        tokio::time::timeout(self.timeout, query)
            .await
            .map_err(|_| SessionStorageError::Timeout)?
            .map_err(|e| SessionStorageError::Unavailable(e.to_string()))
    }
}

impl std::fmt::Debug for RedisSessionStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStorage")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
