//! User persistence seam
//!
//! The document database is an external collaborator; the service only sees
//! this trait. `InMemoryUserStore` is the bundled implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::User;
use crate::error::{AppError, Result};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Email comparison is ASCII case-insensitive.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    /// All accounts, oldest first.
    async fn list(&self) -> Result<Vec<User>>;
    /// Fails with `Conflict` when the email is already registered.
    async fn create(&self, user: User) -> Result<User>;
    /// Replaces the stored record with the same id; `NotFound` if absent.
    async fn update(&self, user: User) -> Result<User>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|user| user.created_at);
        Ok(users)
    }

    async fn create(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::Conflict("Email is already in use.".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(user)
            }
            None => Err(AppError::NotFound("User not found.".to_string())),
        }
    }
}
