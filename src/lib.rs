//! Account Server - user accounts behind a JSON API
//!
//! Salted PBKDF2 credentials, signed session tokens and a fail-open
//! response cache in front of the user list.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod mail;
pub mod models;
pub mod tasks;
pub mod uploads;
pub mod users;
pub mod validation;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{AppError, Result};
pub use tasks::spawn_cleanup_task;
