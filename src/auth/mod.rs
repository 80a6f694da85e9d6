//! Authentication Module
//!
//! Password hashing, signed session tokens and login rate limits.

pub mod jwt;
pub mod password;
pub mod rate_limit;

pub use jwt::{require_auth, AuthUser, Claims, JwtKeys};
pub use password::{hash_password, verify_password};
pub use rate_limit::{
    client_key, FixedWindowLimiter, RateLimitDecision, RateLimiter, RATE_LIMITED,
};
