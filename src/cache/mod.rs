//! Cache Module
//!
//! Read-through response caching over a pluggable key-value backend.

mod backend;
mod key;
mod memory;
mod middleware;
mod redis_backend;
mod response;
mod stats;


// Re-export public types
pub use backend::{CacheBackend, CacheBackendError};
pub use key::compute_key;
pub use memory::{MemoryBackend, MemoryStats, MemoryStore, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
pub use middleware::cache_response;
pub use redis_backend::RedisBackend;
pub use response::{
    CachedPayload, CapturedResponse, Intercepted, RequestShape, ResponseCache, DEFAULT_TTL_SECS,
};
pub use stats::{CacheStats, StatsSnapshot};
