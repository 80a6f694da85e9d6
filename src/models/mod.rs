//! Request and Response models for the account API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{LoginRequest, PasswordResetRequest, ResetPasswordRequest, SignUpRequest};
pub use responses::{ApiResponse, CacheStatsResponse, HealthResponse};
