//! Memory Backend
//!
//! In-process TTL store with least-recently-used eviction, used when no
//! Redis server is configured and in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use super::backend::{CacheBackend, CacheBackendError};

// == Limits ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 1024;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

// == Stored Value ==
#[derive(Debug, Clone)]
struct StoredValue {
    value: String,
    expires_at: Instant,
}

impl StoredValue {
    /// Expired once the deadline has been reached, not only passed.
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Counters kept by the memory store.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MemoryStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired: u64,
    pub entries: usize,
}

// == Memory Store ==
/// Key-value map with per-entry deadlines and a bounded size.
///
/// `recency` holds keys from most recently used (front) to least (back).
#[derive(Debug)]
pub struct MemoryStore {
    values: HashMap<String, StoredValue>,
    recency: VecDeque<String>,
    capacity: usize,
    stats: MemoryStats,
}

impl MemoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: HashMap::new(),
            recency: VecDeque::new(),
            capacity: capacity.max(1),
            stats: MemoryStats::default(),
        }
    }

    // == Set ==
    /// Inserts or overwrites `key`; an overwrite resets the deadline.
    pub fn set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheBackendError> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheBackendError::Rejected(format!(
                "key exceeds {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheBackendError::Rejected(format!(
                "value exceeds {} bytes",
                MAX_VALUE_SIZE
            )));
        }
        if ttl.is_zero() {
            return Err(CacheBackendError::Rejected("ttl must be positive".into()));
        }

        if !self.values.contains_key(key) && self.values.len() >= self.capacity {
            if let Some(oldest) = self.recency.pop_back() {
                self.values.remove(&oldest);
                self.stats.evictions += 1;
            }
        }

        self.values.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        self.touch(key);
        Ok(())
    }

    // == Get ==
    /// Returns the live value for `key`, dropping it if its deadline passed.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = Instant::now();
        let expired = self
            .values
            .get(key)
            .is_some_and(|stored| stored.is_expired(now));
        if expired {
            self.forget(key);
            self.stats.expired += 1;
        }

        match self.values.get(key).map(|stored| stored.value.clone()) {
            Some(value) => {
                self.stats.hits += 1;
                self.touch(key);
                Some(value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    // == Cleanup Expired ==
    /// Removes every expired entry and returns how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .values
            .iter()
            .filter(|(_, stored)| stored.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.forget(key);
        }
        self.stats.expired += expired.len() as u64;
        expired.len()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            entries: self.values.len(),
            ..self.stats.clone()
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn touch(&mut self, key: &str) {
        self.recency.retain(|k| k != key);
        self.recency.push_front(key.to_string());
    }

    fn forget(&mut self, key: &str) {
        self.values.remove(key);
        self.recency.retain(|k| k != key);
    }
}

// == Memory Backend ==
/// [`CacheBackend`] over a shared [`MemoryStore`].
///
/// The connected flag can be toggled to simulate an unreachable store.
pub struct MemoryBackend {
    store: Arc<RwLock<MemoryStore>>,
    connected: AtomicBool,
}

impl MemoryBackend {
    pub fn new(capacity: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new(capacity))),
            connected: AtomicBool::new(true),
        }
    }

    /// Shared handle used by the cleanup task.
    pub fn store(&self) -> Arc<RwLock<MemoryStore>> {
        Arc::clone(&self.store)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub async fn stats(&self) -> MemoryStats {
        self.store.read().await.stats()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheBackendError> {
        if !self.is_connected() {
            return Err(CacheBackendError::Disconnected);
        }
        Ok(self.store.write().await.get(key))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheBackendError> {
        if !self.is_connected() {
            return Err(CacheBackendError::Disconnected);
        }
        self.store
            .write()
            .await
            .set(key, value, Duration::from_secs(ttl_secs))
    }

    async fn memory_stats(&self) -> Option<MemoryStats> {
        Some(self.stats().await)
    }
}
