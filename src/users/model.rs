//! User records
//!
//! The `password` field holds the `salt:derivedKey` string produced by the
//! credential hasher and is never serialized to clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Metadata of a file stored for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub field_name: String,
    pub original_name: String,
    pub file_name: String,
    pub path: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub last_logged_in_at: Option<DateTime<Utc>>,
    pub is_email_verified: bool,
    pub files: Vec<StoredFile>,
}

impl User {
    /// A fresh, unverified account with the default role.
    pub fn new(username: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password: password_hash,
            role: Role::default(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            last_logged_in_at: None,
            is_email_verified: false,
            files: Vec::new(),
        }
    }

    /// Bumps `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_never_serialized() {
        let user = User::new("jane", "jane@example.com", "salt:key".to_string());
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "jane");
        assert_eq!(json["role"], "user");
        assert_eq!(json["isEmailVerified"], false);
        assert!(json["files"].as_array().unwrap().is_empty());
    }
}
