//! Request DTOs for the account API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::validation::{check_email, check_password, check_username, summarize};

/// Request body for `POST /signup`
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignUpRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        let mut errors = Vec::new();
        check_username(&self.username, &mut errors);
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        summarize(errors)
    }
}

/// Request body for `POST /login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Option<String> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        summarize(errors)
    }
}

/// Request body for `POST /verifyEmailForPasswordReset`
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

impl PasswordResetRequest {
    pub fn validate(&self) -> Option<String> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        summarize(errors)
    }
}

/// Request body for `POST /resetUserPassword`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub verification_code: u32,
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Option<String> {
        let mut errors = Vec::new();
        check_email(&self.email, &mut errors);
        check_password(&self.new_password, &mut errors);
        summarize(errors)
    }
}
