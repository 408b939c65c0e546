//! Persistence layer contract for credential records.
//!
//! The relational store lives outside this crate; services only see
//! [`UserRepository`].

pub mod memory;

pub use memory::MemoryUserStore;

use crate::models::{NewUser, User, UserUpdate};
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Operations the auth core needs from the user store.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    /// Create an account. Fails with [`RepoError::Conflict`] if the email is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, RepoError>;

    /// Apply a partial update and return the stored record.
    async fn update(&self, id: Uuid, changes: UserUpdate) -> Result<User, RepoError>;
}
