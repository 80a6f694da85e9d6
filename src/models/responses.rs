//! Response DTOs for the account API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{MemoryStats, ResponseCache, StatsSnapshot};

/// Success envelope shared by every account endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Response body for the cache stats endpoint (GET /api/v1/cache/stats)
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub backend: &'static str,
    pub connected: bool,
    pub ttl_secs: u64,
    #[serde(flatten)]
    pub counters: StatsSnapshot,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Entry, eviction and expiry counts; only the memory backend has them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<MemoryStats>,
}

impl CacheStatsResponse {
    pub async fn from_cache(cache: &ResponseCache) -> Self {
        let counters = cache.stats();
        Self {
            backend: cache.backend_name(),
            connected: cache.is_connected(),
            ttl_secs: cache.ttl_secs(),
            hit_rate: counters.hit_rate(),
            counters,
            store: cache.memory_stats().await,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Whether the response cache backend is reachable
    pub cache_connected: bool,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(cache_connected: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            cache_connected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBackend, MemoryBackend, RedisBackend};
    use std::sync::Arc;

    #[test]
    fn test_api_response_serialize() {
        let resp = ApiResponse::ok("users list fetched successfully", vec![1, 2]);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "users list fetched successfully");
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }

    #[tokio::test]
    async fn test_cache_stats_flattened() {
        let cache = ResponseCache::new(Arc::new(MemoryBackend::new(4)));
        let json = serde_json::to_value(CacheStatsResponse::from_cache(&cache).await).unwrap();

        assert_eq!(json["backend"], "memory");
        assert_eq!(json["connected"], true);
        assert_eq!(json["hits"], 0);
        assert_eq!(json["hit_rate"], 0.0);
        assert_eq!(json["store"]["evictions"], 0);
        assert_eq!(json["store"]["entries"], 0);
    }

    #[tokio::test]
    async fn test_cache_stats_store_counters() {
        let backend = Arc::new(MemoryBackend::new(1));
        backend.set("a", "1", 60).await.unwrap();
        backend.set("b", "2", 60).await.unwrap();
        let cache = ResponseCache::new(backend);

        let stats = CacheStatsResponse::from_cache(&cache).await;
        let store = stats.store.unwrap();
        assert_eq!(store.evictions, 1);
        assert_eq!(store.entries, 1);
    }

    #[tokio::test]
    async fn test_cache_stats_without_store_counters() {
        let cache = ResponseCache::new(Arc::new(RedisBackend::disconnected()));
        let json = serde_json::to_value(CacheStatsResponse::from_cache(&cache).await).unwrap();

        assert_eq!(json["backend"], "redis");
        assert!(json.get("store").is_none());
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(false);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
        assert!(json.contains("\"cache_connected\":false"));
    }
}
