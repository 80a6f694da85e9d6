//! Cache Backend Seam
//!
//! The key-value capability the response cache sits on. Implementations are
//! shared process-wide behind an `Arc` and never held locked across I/O.

use async_trait::async_trait;
use thiserror::Error;

use super::memory::MemoryStats;

/// Errors raised by a backend. They never leave the response cache.
#[derive(Error, Debug)]
pub enum CacheBackendError {
    /// No live connection to the store
    #[error("cache backend is not connected")]
    Disconnected,

    /// Store-level failure reported by Redis
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Write refused by the store (size limits, zero TTL)
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Minimal key-value contract: `get`, `set` with expiry, and a liveness flag.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Short backend name reported in statistics.
    fn name(&self) -> &'static str;

    /// Whether the backend currently has a usable connection.
    fn is_connected(&self) -> bool;

    /// Reads the raw value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError>;

    /// Stores `value` under `key`, replacing any previous value and resetting
    /// its expiry to `ttl_secs`.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheBackendError>;

    /// Eviction and expiry counters kept by the store itself. Redis reports
    /// none.
    async fn memory_stats(&self) -> Option<MemoryStats> {
        None
    }
}
