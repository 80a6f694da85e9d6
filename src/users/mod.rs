//! Users Module
//!
//! Account records, their storage seam and the account operations.

mod model;
mod service;
mod store;

pub use model::{Role, StoredFile, User};
pub use service::{Session, UserService, RESET_CODE_TTL};
pub use store::{InMemoryUserStore, UserStore};
