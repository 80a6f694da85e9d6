//! Response Cache
//!
//! Read-through cache in front of expensive handlers. The wrapped handler is
//! passed in as a continuation and its buffered output comes back as a value,
//! so a miss can be stored without touching the response the caller receives.
//!
//! Every backend interaction fails open: a disconnected backend means pass
//! through, a failed read is a miss, and a failed write is logged and dropped.

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header::CONTENT_TYPE, response::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::backend::CacheBackend;
use super::key::compute_key;
use super::memory::MemoryStats;
use super::stats::{CacheStats, StatsSnapshot};

/// Expiry applied when an installation point does not pick its own.
pub const DEFAULT_TTL_SECS: u64 = 300;

// == Request Shape ==
/// The parts of a request that identify a cached response.
#[derive(Debug, Clone)]
pub struct RequestShape {
    pub path: String,
    pub query: Value,
    pub body: Value,
}

impl RequestShape {
    pub fn cache_key(&self) -> String {
        compute_key(&self.path, &self.query, &self.body)
    }
}

// == Captured Response ==
/// A handler response with its body fully buffered.
#[derive(Debug)]
pub struct CapturedResponse {
    pub parts: Parts,
    pub body: Bytes,
}

impl CapturedResponse {
    /// Buffers `response`. A body that cannot be read becomes a 500.
    pub async fn capture(response: Response) -> Self {
        let (parts, body) = response.into_parts();
        match to_bytes(body, usize::MAX).await {
            Ok(body) => Self { parts, body },
            Err(e) => {
                error!(error = %e, "failed to buffer handler response");
                let (mut parts, ()) = axum::http::Response::new(()).into_parts();
                parts.status = StatusCode::INTERNAL_SERVER_ERROR;
                parts
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Self {
                    parts,
                    body: Bytes::from_static(
                        br#"{"success":false,"message":"Internal error: response body unavailable"}"#,
                    ),
                }
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts.status
    }
}

impl IntoResponse for CapturedResponse {
    fn into_response(self) -> Response {
        Response::from_parts(self.parts, Body::from(self.body))
    }
}

// == Cached Payload ==
/// A stored payload as replayed to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedPayload {
    Json(Value),
    Text(String),
}

impl CachedPayload {
    /// JSON when the stored string parses as JSON, raw text otherwise.
    pub fn from_raw(raw: String) -> Self {
        match serde_json::from_str(&raw) {
            Ok(value) => CachedPayload::Json(value),
            Err(_) => CachedPayload::Text(raw),
        }
    }
}

impl IntoResponse for CachedPayload {
    fn into_response(self) -> Response {
        match self {
            CachedPayload::Json(value) => Json(value).into_response(),
            CachedPayload::Text(text) => text.into_response(),
        }
    }
}

// == Outcome ==
/// Result of one pass through the cache.
#[derive(Debug)]
pub enum Intercepted {
    /// Served from the backend; the handler did not run
    Cached(CachedPayload),
    /// Produced by the handler
    Fresh(CapturedResponse),
}

impl IntoResponse for Intercepted {
    fn into_response(self) -> Response {
        match self {
            Intercepted::Cached(payload) => payload.into_response(),
            Intercepted::Fresh(response) => response.into_response(),
        }
    }
}

// == Response Cache ==
/// Process-wide handle on the cache backend plus the TTL for one
/// installation point. Cloning shares the backend and counters.
#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
    stats: Arc<CacheStats>,
    ttl_secs: u64,
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            stats: Arc::new(CacheStats::new()),
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    /// Same backend and counters with a different expiry.
    pub fn with_ttl(&self, ttl_secs: u64) -> Self {
        Self {
            ttl_secs,
            ..self.clone()
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn is_connected(&self) -> bool {
        self.backend.is_connected()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Counts a request that reached the handler without a backend lookup.
    pub fn note_bypass(&self) {
        self.stats.record_bypass();
    }

    /// Store-level counters, for backends that keep them.
    pub async fn memory_stats(&self) -> Option<MemoryStats> {
        self.backend.memory_stats().await
    }

    // == Intercept ==
    /// Serves `shape` from the cache, or runs `proceed` and stores its
    /// payload when the status is 2xx.
    ///
    /// Concurrent misses on one key may all run `proceed`; the last write wins.
    pub async fn intercept<F, Fut>(&self, shape: &RequestShape, proceed: F) -> Intercepted
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CapturedResponse>,
    {
        if !self.backend.is_connected() {
            self.stats.record_bypass();
            return Intercepted::Fresh(proceed().await);
        }

        let key = shape.cache_key();
        if let Some(payload) = self.lookup(&key).await {
            return Intercepted::Cached(payload);
        }

        let response = proceed().await;
        if response.status().is_success() {
            match std::str::from_utf8(&response.body) {
                Ok("") => debug!(key = %key, "empty response body, not cached"),
                Ok(payload) => {
                    self.spawn_write(key, payload.to_owned());
                }
                Err(_) => debug!(key = %key, "response body is not UTF-8, not cached"),
            }
        }

        Intercepted::Fresh(response)
    }

    async fn lookup(&self, key: &str) -> Option<CachedPayload> {
        match self.backend.get(key).await {
            Ok(Some(raw)) if !raw.is_empty() => {
                self.stats.record_hit();
                debug!(key = %key, "response cache hit");
                Some(CachedPayload::from_raw(raw))
            }
            Ok(_) => {
                self.stats.record_miss();
                debug!(key = %key, "response cache miss");
                None
            }
            Err(e) => {
                self.stats.record_miss();
                warn!(key = %key, error = %e, "response cache read failed, treating as miss");
                None
            }
        }
    }

    /// Stores `payload` in a detached task. Failures are logged and counted,
    /// never returned.
    fn spawn_write(&self, key: String, payload: String) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let stats = Arc::clone(&self.stats);
        let ttl_secs = self.ttl_secs;

        tokio::spawn(async move {
            match backend.set(&key, &payload, ttl_secs).await {
                Ok(()) => {
                    stats.record_write();
                    debug!(key = %key, ttl_secs, "response cached");
                }
                Err(e) => {
                    stats.record_write_failure();
                    error!(key = %key, error = %e, "Failed to cache response");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::backend::CacheBackendError;
    use crate::cache::memory::MemoryBackend;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn users_shape() -> RequestShape {
        RequestShape {
            path: "/users".to_string(),
            query: json!({"page": "1"}),
            body: json!({}),
        }
    }

    fn json_response(status: StatusCode, body: Value) -> CapturedResponse {
        let (mut parts, ()) = axum::http::Response::new(()).into_parts();
        parts.status = status;
        CapturedResponse {
            parts,
            body: Bytes::from(body.to_string()),
        }
    }

    async fn wait_for(cache: &ResponseCache, settled: impl Fn(&StatsSnapshot) -> bool) {
        for _ in 0..100 {
            if settled(&cache.stats()) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("cache write did not settle: {:?}", cache.stats());
    }

    /// Backend whose every call fails.
    struct BrokenBackend;

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn is_connected(&self) -> bool {
            true
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheBackendError> {
            Err(CacheBackendError::Rejected("read refused".into()))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: u64) -> Result<(), CacheBackendError> {
            Err(CacheBackendError::Rejected("write refused".into()))
        }
    }

    #[tokio::test]
    async fn test_success_is_cached_and_replayed() {
        let cache = ResponseCache::new(Arc::new(MemoryBackend::new(16)));
        let calls = AtomicUsize::new(0);
        let payload = json!({"success": true, "message": "ok", "data": [1, 2]});

        let first = cache
            .intercept(&users_shape(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                json_response(StatusCode::OK, payload.clone())
            })
            .await;
        assert!(matches!(first, Intercepted::Fresh(_)));
        wait_for(&cache, |s| s.writes == 1).await;

        let second = cache
            .intercept(&users_shape(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                json_response(StatusCode::OK, json!({"other": true}))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match second {
            Intercepted::Cached(CachedPayload::Json(value)) => assert_eq!(value, payload),
            other => panic!("expected cached JSON, got {:?}", other),
        }
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_error_status_is_not_cached() {
        let cache = ResponseCache::new(Arc::new(MemoryBackend::new(16)));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let outcome = cache
                .intercept(&users_shape(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({"success": false}))
                })
                .await;
            match outcome {
                Intercepted::Fresh(response) => {
                    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR)
                }
                other => panic!("expected fresh response, got {:?}", other),
            }
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.stats().writes, 0);
    }

    #[tokio::test]
    async fn test_disconnected_backend_passes_through() {
        let backend = Arc::new(MemoryBackend::new(16));
        backend.set_connected(false);
        let cache = ResponseCache::new(backend);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let outcome = cache
                .intercept(&users_shape(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    json_response(StatusCode::OK, json!({"success": true}))
                })
                .await;
            assert!(matches!(outcome, Intercepted::Fresh(_)));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let stats = cache.stats();
        assert_eq!(stats.bypasses, 2);
        assert_eq!(stats.hits + stats.misses + stats.writes, 0);
    }

    #[tokio::test]
    async fn test_backend_failures_stay_inside() {
        let cache = ResponseCache::new(Arc::new(BrokenBackend));

        let outcome = cache
            .intercept(&users_shape(), || async {
                json_response(StatusCode::OK, json!({"success": true}))
            })
            .await;

        match outcome {
            Intercepted::Fresh(response) => assert_eq!(response.status(), StatusCode::OK),
            other => panic!("expected fresh response, got {:?}", other),
        }
        wait_for(&cache, |s| s.write_failures == 1).await;
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_plain_text_payload_replayed_as_text() {
        let backend = Arc::new(MemoryBackend::new(16));
        let cache = ResponseCache::new(backend.clone());
        let shape = users_shape();
        backend
            .set(&shape.cache_key(), "hello there", 60)
            .await
            .unwrap();

        let outcome = cache
            .intercept(&shape, || async { panic!("handler must not run on a hit") })
            .await;

        match outcome {
            Intercepted::Cached(CachedPayload::Text(text)) => assert_eq!(text, "hello there"),
            other => panic!("expected cached text, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_with_ttl_shares_counters() {
        let cache = ResponseCache::new(Arc::new(MemoryBackend::new(16)));
        let short = cache.with_ttl(5);

        assert_eq!(cache.ttl_secs(), DEFAULT_TTL_SECS);
        assert_eq!(short.ttl_secs(), 5);

        short
            .intercept(&users_shape(), || async {
                json_response(StatusCode::OK, json!({"success": true}))
            })
            .await;
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_payload_from_raw() {
        assert_eq!(
            CachedPayload::from_raw(r#"{"a":1}"#.to_string()),
            CachedPayload::Json(json!({"a": 1}))
        );
        assert_eq!(
            CachedPayload::from_raw("plain".to_string()),
            CachedPayload::Text("plain".to_string())
        );
    }
}
