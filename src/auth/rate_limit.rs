//! Request rate limits for auth endpoints.
//!
//! Fixed-window counters keyed by client address: a client gets `max`
//! requests per window, counted from its first request in that window.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;

/// Message returned with 429 responses.
pub const RATE_LIMITED: &str = "Too many requests, please try again later.";

/// Windows are swept once this many clients are tracked.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    /// Counts one request from `client` and decides whether it may proceed.
    fn check(&self, client: &str) -> RateLimitDecision;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// In-process fixed-window limiter. `max == 0` disables limiting.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, client: &str) -> RateLimitDecision {
        if self.max == 0 {
            return RateLimitDecision::Allowed;
        }

        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(|p| p.into_inner());
        if windows.len() >= SWEEP_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < self.window);
        }

        let window = windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        if window.count >= self.max {
            RateLimitDecision::Limited
        } else {
            window.count += 1;
            RateLimitDecision::Allowed
        }
    }
}

/// Address a request is attributed to.
///
/// Forwarding headers are only honored when `trust_proxy` is set; otherwise
/// the socket peer is used. Requests with neither share one bucket.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = forwarded_ip(headers) {
            return ip;
        }
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
