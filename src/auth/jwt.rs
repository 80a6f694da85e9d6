//! Token issuance and verification
//!
//! HS256 tokens carrying the user id. The `Authorization` header holds the
//! token itself; a `Bearer ` prefix is tolerated.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

const UNAUTHORIZED: &str = "Unauthorized Access";

/// Token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Signing and verification keys derived from the shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl JwtKeys {
    pub fn from_secret(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expiry_hours),
        }
    }

    /// Signs a token for `user_id` valid for the configured lifetime.
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))
    }

    /// Validates signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AppError::Unauthorized(UNAUTHORIZED.to_string())
            })
    }
}

// == Extractor ==
/// Caller identity taken from a valid `Authorization` token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl AuthUser {
    fn from_headers(headers: &HeaderMap, keys: &JwtKeys) -> Result<Self> {
        let raw = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(UNAUTHORIZED.to_string()))?;
        let token = raw.strip_prefix("Bearer ").unwrap_or(raw).trim();

        let claims = keys.verify(token)?;
        Ok(AuthUser {
            user_id: claims.user_id,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }
        AuthUser::from_headers(&parts.headers, &JwtKeys::from_ref(state))
    }
}

/// Rejects requests without a valid token before they reach inner layers
/// (such as the response cache) and records the caller for the handler.
pub async fn require_auth(
    State(keys): State<JwtKeys>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let user = AuthUser::from_headers(request.headers(), &keys)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let keys = JwtKeys::from_secret("secret", 8);
        let id = Uuid::new_v4();

        let token = keys.issue(id).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.user_id, id);
        assert_eq!(claims.exp - claims.iat, 8 * 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtKeys::from_secret("secret", 8)
            .issue(Uuid::new_v4())
            .unwrap();
        let result = JwtKeys::from_secret("other", 8).verify(&token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = JwtKeys::from_secret("secret", -2);
        let token = keys.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_bearer_prefix_accepted() {
        let keys = JwtKeys::from_secret("secret", 8);
        let id = Uuid::new_v4();
        let token = keys.issue(id).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {}", token).parse().unwrap());
        assert_eq!(AuthUser::from_headers(&headers, &keys).unwrap().user_id, id);

        headers.insert(AUTHORIZATION, token.parse().unwrap());
        assert_eq!(AuthUser::from_headers(&headers, &keys).unwrap().user_id, id);
    }

    #[test]
    fn test_missing_header_rejected() {
        let keys = JwtKeys::from_secret("secret", 8);
        let result = AuthUser::from_headers(&HeaderMap::new(), &keys);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        let keys = JwtKeys::from_secret("secret", 8);
        assert!(keys.verify("not-a-token").is_err());
    }
}
