//! Account operations
//!
//! Orchestrates the user store, credential hasher, token keys and mailer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::model::{StoredFile, User};
use super::store::UserStore;
use crate::auth::{hash_password, verify_password, JwtKeys};
use crate::error::{AppError, Result};
use crate::mail::{Mailer, OutgoingMail, Template};
use crate::models::{LoginRequest, ResetPasswordRequest, SignUpRequest};

/// How long a password reset code stays valid.
pub const RESET_CODE_TTL: Duration = Duration::from_secs(15 * 60);

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const USER_NOT_FOUND: &str = "User not found.";

/// Verified against when the email is unknown so both login failures cost
/// one key derivation.
const DECOY_HASH: &str = "0000000000000000:\
    00000000000000000000000000000000000000000000000000000000000000000000\
    000000000000000000000000000000000000000000000000000000000000";

/// Token plus the account it was issued for.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Copy)]
struct PendingReset {
    code: u32,
    expires_at: Instant,
}

pub struct UserService {
    store: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    jwt: JwtKeys,
    verification_base_url: String,
    pending_resets: Mutex<HashMap<Uuid, PendingReset>>,
}

impl UserService {
    pub fn new(
        store: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        jwt: JwtKeys,
        verification_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            jwt,
            verification_base_url: verification_base_url.into(),
            pending_resets: Mutex::new(HashMap::new()),
        }
    }

    // == Sign Up ==
    /// Creates an account and sends the verification link.
    ///
    /// A mail failure is logged; the account still exists and the caller
    /// still gets a token.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<Session> {
        let email = normalize_email(&request.email);
        if self.store.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email is already in use.".to_string()));
        }

        let password_hash = hash_password(&request.password).await?;
        let user = self
            .store
            .create(User::new(request.username.trim(), email, password_hash))
            .await?;
        let token = self.jwt.issue(user.id)?;

        let template = Template::EmailVerification {
            username: user.username.clone(),
            link: format!(
                "{}/{}",
                self.verification_base_url.trim_end_matches('/'),
                user.id
            ),
        };
        match self.notify(&user, &template).await {
            Ok(()) => info!(user_id = %user.id, "Email verification request sent"),
            Err(e) => warn!(user_id = %user.id, error = %e, "Verification email not sent"),
        }

        Ok(Session { token, user })
    }

    // == Login ==
    pub async fn login(&self, request: LoginRequest) -> Result<Session> {
        let email = normalize_email(&request.email);
        let Some(mut user) = self.store.find_by_email(&email).await? else {
            verify_password(&request.password, DECOY_HASH).await?;
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&request.password, &user.password).await? {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        user.last_logged_in_at = Some(Utc::now());
        user.touch();
        let user = self.store.update(user).await?;
        let token = self.jwt.issue(user.id)?;
        info!(user_id = %user.id, "User logged in");

        Ok(Session { token, user })
    }

    // == Queries ==
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.store.list().await
    }

    pub async fn fetch_user(&self, id: Uuid) -> Result<User> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))
    }

    // == Verify Account ==
    /// Marks the email as verified. The confirmation mail goes out only on
    /// the first verification.
    pub async fn verify_account(&self, id: Uuid) -> Result<bool> {
        let mut user = self.fetch_user(id).await?;
        if user.is_email_verified {
            return Ok(true);
        }

        user.is_email_verified = true;
        user.touch();
        let user = self.store.update(user).await?;

        let template = Template::EmailVerified {
            username: user.username.clone(),
        };
        match self.notify(&user, &template).await {
            Ok(()) => info!(user_id = %user.id, "Email verification success"),
            Err(e) => warn!(user_id = %user.id, error = %e, "Verification confirmation not sent"),
        }

        Ok(user.is_email_verified)
    }

    // == Files ==
    /// Appends file metadata and returns the user's full file list.
    pub async fn append_files(&self, id: Uuid, files: Vec<StoredFile>) -> Result<Vec<StoredFile>> {
        let mut user = self.fetch_user(id).await?;
        user.files.extend(files);
        user.touch();
        Ok(self.store.update(user).await?.files)
    }

    // == Password Reset ==
    /// Mails a six-digit code to the account owner. Delivery failures are
    /// returned since the flow cannot continue without the code.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let user = self
            .store
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

        let code = rand::thread_rng().gen_range(100_000..=999_999);
        self.pending_resets.lock().await.insert(
            user.id,
            PendingReset {
                code,
                expires_at: Instant::now() + RESET_CODE_TTL,
            },
        );

        let template = Template::PasswordResetCode {
            username: user.username.clone(),
            code,
        };
        self.notify(&user, &template).await?;
        info!(user_id = %user.id, "Password reset code sent");
        Ok(())
    }

    /// Replaces the password after checking the mailed code. The code is
    /// consumed on success.
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<()> {
        let mut user = self
            .store
            .find_by_email(&normalize_email(&request.email))
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.to_string()))?;

        {
            let mut pending = self.pending_resets.lock().await;
            let valid = pending.get(&user.id).is_some_and(|reset| {
                reset.code == request.verification_code && Instant::now() < reset.expires_at
            });
            if !valid {
                return Err(AppError::Unauthorized(
                    "Invalid or expired verification code.".to_string(),
                ));
            }
            pending.remove(&user.id);
        }

        user.password = hash_password(&request.new_password).await?;
        user.touch();
        let user = self.store.update(user).await?;
        info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    async fn notify(&self, user: &User, template: &Template) -> Result<()> {
        self.mailer
            .send(OutgoingMail::from_template(user.email.clone(), template))
            .await
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
