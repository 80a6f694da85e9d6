//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Which key-value store backs the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    /// Remote Redis server
    Redis,
    /// In-process TTL store
    Memory,
}

impl CacheBackendKind {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "redis" => Some(Self::Redis),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// SMTP settings; mail is only logged when `host` is unset.
#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub sender: String,
    pub default_cc: Option<String>,
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Redis connection URL
    pub redis_url: String,
    /// Response cache store
    pub cache_backend: CacheBackendKind,
    /// Response cache TTL in seconds
    pub cache_ttl: u64,
    /// Maximum number of entries held by the memory backend
    pub cache_max_entries: usize,
    /// Memory backend cleanup interval in seconds
    pub cleanup_interval: u64,
    /// HMAC secret for signing tokens
    pub jwt_secret: String,
    /// Token lifetime in hours
    pub jwt_expiry_hours: i64,
    /// Directory receiving local uploads
    pub upload_dir: PathBuf,
    /// Maximum files accepted per upload request
    pub max_upload_files: usize,
    /// Prefix of the account verification link sent at sign-up
    pub verification_base_url: String,
    /// Login attempts allowed per client per window (0 disables the limit)
    pub login_rate_limit_max: u32,
    /// Login rate limit window in milliseconds
    pub login_rate_limit_window_ms: u64,
    /// Attribute requests to `X-Forwarded-For` / `X-Real-IP` instead of the peer
    pub trust_proxy_headers: bool,
    /// Outgoing mail settings
    pub mail: MailConfig,
}

fn var_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `REDIS_URI` - Redis URL (default: redis://localhost:6379)
    /// - `CACHE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `CACHE_TTL` - Response cache TTL in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Memory backend capacity (default: 1000)
    /// - `CLEANUP_INTERVAL` - Memory backend cleanup frequency in seconds (default: 1)
    /// - `JWT_SECRET` / `JWT_EXPIRY_HOURS` - Token signing (default expiry: 8)
    /// - `UPLOAD_DIR` / `MAX_UPLOAD_FILES` - Local uploads (default: uploads, 10)
    /// - `VERIFICATION_BASE_URL` - Verification link prefix
    /// - `LOGIN_RATE_LIMIT_MAX` / `LOGIN_RATE_LIMIT_WINDOW_MS` - Login attempts
    ///   per client per window (default: 1 per 6000 ms)
    /// - `TRUST_PROXY_HEADERS` - Key rate limits on forwarding headers (default: false)
    /// - `EMAIL_HOST`, `EMAIL_PORT`, `EMAIL_AUTH_NAME`, `EMAIL_AUTH_PW`,
    ///   `SENDERS_EMAIL`, `DEFAULT_CC` - SMTP delivery
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: var_or("SERVER_PORT", defaults.server_port),
            redis_url: optional_var("REDIS_URI").unwrap_or(defaults.redis_url),
            cache_backend: env::var("CACHE_BACKEND")
                .ok()
                .and_then(|v| CacheBackendKind::parse(&v))
                .unwrap_or(defaults.cache_backend),
            cache_ttl: var_or("CACHE_TTL", defaults.cache_ttl),
            cache_max_entries: var_or("CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            cleanup_interval: var_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            jwt_secret: optional_var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiry_hours: var_or("JWT_EXPIRY_HOURS", defaults.jwt_expiry_hours),
            upload_dir: optional_var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_files: var_or("MAX_UPLOAD_FILES", defaults.max_upload_files),
            verification_base_url: optional_var("VERIFICATION_BASE_URL")
                .unwrap_or(defaults.verification_base_url),
            login_rate_limit_max: var_or("LOGIN_RATE_LIMIT_MAX", defaults.login_rate_limit_max),
            login_rate_limit_window_ms: var_or(
                "LOGIN_RATE_LIMIT_WINDOW_MS",
                defaults.login_rate_limit_window_ms,
            ),
            trust_proxy_headers: var_or("TRUST_PROXY_HEADERS", defaults.trust_proxy_headers),
            mail: MailConfig {
                host: optional_var("EMAIL_HOST"),
                port: var_or("EMAIL_PORT", defaults.mail.port),
                username: optional_var("EMAIL_AUTH_NAME"),
                password: optional_var("EMAIL_AUTH_PW"),
                sender: optional_var("SENDERS_EMAIL").unwrap_or(defaults.mail.sender),
                default_cc: optional_var("DEFAULT_CC"),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            redis_url: "redis://localhost:6379".to_string(),
            cache_backend: CacheBackendKind::Redis,
            cache_ttl: 300,
            cache_max_entries: 1000,
            cleanup_interval: 1,
            jwt_secret: "development-secret-change-me".to_string(),
            jwt_expiry_hours: 8,
            upload_dir: PathBuf::from("uploads"),
            max_upload_files: 10,
            verification_base_url: "http://localhost:4200/verify-account".to_string(),
            login_rate_limit_max: 1,
            login_rate_limit_window_ms: 6000,
            trust_proxy_headers: false,
            mail: MailConfig {
                port: 587,
                sender: "no-reply@localhost".to_string(),
                ..MailConfig::default()
            },
        }
    }
}
