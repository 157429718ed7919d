//! User directory
//!
//! The auth and profile services only see the [`UserDirectory`] trait; the
//! Postgres and in-memory implementations live in the submodules.

pub mod memory;
pub mod user;

use crate::auth::Credential;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use innotaxi_shared::{AccountId, UserStatus};
use thiserror::Error;

pub use memory::MemoryUserDirectory;
pub use user::UserRepository;

/// Errors raised by a user directory
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("user already exists")]
    UserAlreadyExists,

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub credential: Credential,
}

/// Stored credential of a live user
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: AccountId,
    pub credential: Credential,
}

/// Profile fields of a user
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: AccountId,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub rating: f64,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

/// Partial profile update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

/// Rating given to new accounts
pub const DEFAULT_RATING: f64 = 4.0;

/// Store of user accounts
///
/// "Live" users are those whose status is not `deleted`.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Create a user; fails with `UserAlreadyExists` when a live user has
    /// the same phone number or email
    async fn create_user(&self, user: NewUser) -> RepositoryResult<AccountId>;

    /// Credential of the live user with this phone number
    async fn find_active_by_phone(&self, phone_number: &str) -> RepositoryResult<Option<UserCredentials>>;

    /// Profile of a live user
    async fn find_profile(&self, id: AccountId) -> RepositoryResult<Option<UserRecord>>;

    /// Apply a partial update to a live user, returning the new profile
    async fn update_profile(&self, id: AccountId, update: UpdateProfile) -> RepositoryResult<Option<UserRecord>>;

    /// Soft-delete a live user; `false` when there was none
    async fn delete_user(&self, id: AccountId) -> RepositoryResult<bool>;

    /// Check the backing store is reachable
    async fn health_check(&self) -> RepositoryResult<()>;
}
