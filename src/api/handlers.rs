//! API Handlers
//!
//! HTTP request handlers for the account endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, FromRef, Multipart, Path, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use crate::auth::{
    client_key, AuthUser, FixedWindowLimiter, JwtKeys, RateLimitDecision, RateLimiter,
    RATE_LIMITED,
};
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::mail::Mailer;
use crate::models::{
    ApiResponse, CacheStatsResponse, HealthResponse, LoginRequest, PasswordResetRequest,
    ResetPasswordRequest, SignUpRequest,
};
use crate::uploads::{IncomingFile, UploadStore};
use crate::users::{Session, StoredFile, User, UserService, UserStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserService>,
    pub cache: ResponseCache,
    pub jwt: JwtKeys,
    pub uploads: Arc<UploadStore>,
    pub login_limiter: Arc<dyn RateLimiter>,
    pub trust_proxy_headers: bool,
}

impl AppState {
    /// Wires the services from configuration and the collaborators built at
    /// startup.
    pub fn from_config(
        config: &Config,
        cache: ResponseCache,
        store: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let jwt = JwtKeys::from_secret(&config.jwt_secret, config.jwt_expiry_hours);
        let users = UserService::new(store, mailer, jwt.clone(), &config.verification_base_url);
        let login_limiter = FixedWindowLimiter::new(
            config.login_rate_limit_max,
            Duration::from_millis(config.login_rate_limit_window_ms),
        );

        Self {
            users: Arc::new(users),
            cache: cache.with_ttl(config.cache_ttl),
            jwt,
            uploads: Arc::new(UploadStore::new(&config.upload_dir, config.max_upload_files)),
            login_limiter: Arc::new(login_limiter),
            trust_proxy_headers: config.trust_proxy_headers,
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

fn parse_user_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::InvalidRequest(format!("Invalid user id: {}", raw)))
}

/// Handler for POST /signup
pub async fn sign_up_handler(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<Json<ApiResponse<Session>>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let session = state.users.sign_up(req).await?;
    Ok(Json(ApiResponse::ok("signup successful", session)))
}

/// Handler for POST /login
///
/// Every well-formed attempt counts against the caller's login allowance.
pub async fn login_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<Session>>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    let client = client_key(&headers, peer.map(|c| c.0), state.trust_proxy_headers);
    if state.login_limiter.check(&client) == RateLimitDecision::Limited {
        tracing::warn!(client = %client, "login rate limit exceeded");
        return Err(AppError::TooManyRequests(RATE_LIMITED.to_string()));
    }

    let session = state.users.login(req).await?;
    Ok(Json(ApiResponse::ok("login successful", session)))
}

/// Handler for GET /users
///
/// Mounted behind `require_auth` and the response cache.
pub async fn list_users_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<User>>>> {
    let users = state.users.list_users().await?;
    Ok(Json(ApiResponse::ok("users list fetched successfully", users)))
}

/// Handler for GET /user/:user_id
pub async fn fetch_user_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<User>>> {
    let user = state.users.fetch_user(parse_user_id(&user_id)?).await?;
    Ok(Json(ApiResponse::ok("User Info Found", user)))
}

/// Handler for GET /verifyUserAccountStatus/:id
pub async fn verify_account_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<bool>>> {
    let verified = state.users.verify_account(parse_user_id(&id)?).await?;
    Ok(Json(ApiResponse::ok("user verification success", verified)))
}

/// Handler for POST /uploadFiles
///
/// Multipart form with `files` parts and an optional `userId` text part;
/// without `userId` the files are attached to the caller.
pub async fn upload_files_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Vec<StoredFile>>>> {
    let mut user_id = auth.user_id;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        match field.name() {
            Some("userId") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Upload(e.to_string()))?;
                user_id = parse_user_id(raw.trim())?;
            }
            Some("files") => {
                if files.len() == state.uploads.max_files() {
                    return Err(AppError::Upload(format!(
                        "At most {} files may be uploaded at once.",
                        state.uploads.max_files()
                    )));
                }
                let field_name = "files".to_string();
                let original_name = field.file_name().unwrap_or("file").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Upload(e.to_string()))?;
                files.push(IncomingFile {
                    field_name,
                    original_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            _ => {}
        }
    }

    let all_files = attach_uploads(&state, user_id, files).await?;
    Ok(Json(ApiResponse::ok("File Uploaded successfully!", all_files)))
}

/// Writes `files` and records them on the user. Files already on disk are
/// removed again if the record cannot be updated.
async fn attach_uploads(
    state: &AppState,
    user_id: Uuid,
    files: Vec<IncomingFile>,
) -> Result<Vec<StoredFile>> {
    // Reject unknown users before anything touches the disk
    state.users.fetch_user(user_id).await?;
    let stored = state.uploads.save_all(files).await?;

    match state.users.append_files(user_id, stored.clone()).await {
        Ok(all_files) => Ok(all_files),
        Err(e) => {
            state.uploads.discard(&stored).await;
            Err(e)
        }
    }
}

/// Handler for POST /verifyEmailForPasswordReset
pub async fn request_password_reset_handler(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<Json<ApiResponse<()>>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    state.users.request_password_reset(&req.email).await?;
    Ok(Json(ApiResponse::ok("email verification success", ())))
}

/// Handler for POST /resetUserPassword
pub async fn reset_password_handler(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse<()>>> {
    if let Some(error_msg) = req.validate() {
        return Err(AppError::InvalidRequest(error_msg));
    }

    state.users.reset_password(req).await?;
    Ok(Json(ApiResponse::ok("password reset success", ())))
}

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse::from_cache(&state.cache).await)
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.is_connected()))
}
