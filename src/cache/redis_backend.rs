//! Redis Backend
//!
//! Shared connection established once at startup. A failed connect leaves
//! the backend disconnected so the response cache passes requests through.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{error, info};

use super::backend::{CacheBackend, CacheBackendError};

/// Redis-backed [`CacheBackend`].
///
/// The connection manager reconnects on its own after transient failures;
/// this type only tracks whether a connection was ever opened and not closed.
pub struct RedisBackend {
    connection: ArcSwapOption<ConnectionManager>,
}

impl RedisBackend {
    /// Creates a backend with no connection.
    pub fn disconnected() -> Self {
        Self {
            connection: ArcSwapOption::empty(),
        }
    }

    /// Connects to `url`, logging and staying disconnected on failure.
    pub async fn open(url: &str) -> Self {
        let backend = Self::disconnected();
        match Self::connect(url).await {
            Ok(manager) => {
                backend.connection.store(Some(Arc::new(manager)));
                info!("Connected to Redis successfully");
            }
            Err(e) => {
                error!(error = %e, "Connection to Redis failed, response caching disabled");
            }
        }
        backend
    }

    async fn connect(url: &str) -> Result<ConnectionManager, CacheBackendError> {
        let client = redis::Client::open(url)?;
        Ok(ConnectionManager::new(client).await?)
    }

    /// Drops the shared connection. Subsequent requests bypass the cache.
    pub fn close(&self) {
        if self.connection.swap(None).is_some() {
            info!("Redis connection closed");
        }
    }

    fn connection(&self) -> Result<ConnectionManager, CacheBackendError> {
        self.connection
            .load_full()
            .map(|manager| (*manager).clone())
            .ok_or(CacheBackendError::Disconnected)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn is_connected(&self) -> bool {
        self.connection.load().is_some()
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError> {
        let mut conn = self.connection()?;
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheBackendError> {
        if ttl_secs == 0 {
            return Err(CacheBackendError::Rejected("ttl must be positive".into()));
        }
        let mut conn = self.connection()?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disconnected_backend() {
        let backend = RedisBackend::disconnected();
        assert!(!backend.is_connected());
        assert!(matches!(
            backend.get("k").await,
            Err(CacheBackendError::Disconnected)
        ));
        assert!(matches!(
            backend.set("k", "v", 10).await,
            Err(CacheBackendError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn test_open_invalid_url_stays_disconnected() {
        let backend = RedisBackend::open("not a url").await;
        assert!(!backend.is_connected());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let backend = RedisBackend::disconnected();
        backend.close();
        backend.close();
        assert!(!backend.is_connected());
    }
}
