//! Error types for the account server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == App Error Enum ==
/// Unified error type for request handling.
#[derive(Error, Debug)]
pub enum AppError {
    /// Requested record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Record already exists (e.g. email in use)
    #[error("{0}")]
    Conflict(String),

    /// Invalid request data
    #[error("{0}")]
    InvalidRequest(String),

    /// Bad credentials or missing/invalid token
    #[error("{0}")]
    Unauthorized(String),

    /// Client exceeded its request allowance
    #[error("{0}")]
    TooManyRequests(String),

    /// Key derivation could not complete
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Outgoing mail could not be built or delivered
    #[error("Mail delivery failed: {0}")]
    Mail(String),

    /// Uploaded files could not be read or stored
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status reported for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Hashing(_) | AppError::Mail(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the account server.
pub type Result<T> = std::result::Result<T, AppError>;
