//! API Routes
//!
//! Configures the Axum router with the account endpoints.

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, fetch_user_handler, health_handler, list_users_handler, login_handler,
    request_password_reset_handler, reset_password_handler, sign_up_handler, upload_files_handler,
    verify_account_handler, AppState,
};
use crate::auth::require_auth;
use crate::cache::cache_response;

/// Multipart bodies for `/uploadFiles` may exceed axum's 2 MB default.
const UPLOAD_BODY_LIMIT: usize = 50 * 1024 * 1024;

/// Creates the main router.
///
/// Account endpoints live under `/api/v1`; `/health` stays at the root.
/// `GET /users` runs the token check before the response cache so a cached
/// list is never served to an anonymous caller.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let list_users = get(list_users_handler)
        .layer(from_fn_with_state(state.cache.clone(), cache_response))
        .layer(from_fn_with_state(state.jwt.clone(), require_auth));

    let api = Router::new()
        .route("/signup", post(sign_up_handler))
        .route("/login", post(login_handler))
        .route("/users", list_users)
        .route("/user/:user_id", get(fetch_user_handler))
        .route("/verifyUserAccountStatus/:id", get(verify_account_handler))
        .route(
            "/uploadFiles",
            post(upload_files_handler).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/verifyEmailForPasswordReset",
            post(request_password_reset_handler),
        )
        .route("/resetUserPassword", post(reset_password_handler))
        .route("/cache/stats", get(cache_stats_handler));

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
