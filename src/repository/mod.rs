//! Database repository layer

pub mod memory;
pub mod user_repo;

pub use memory::InMemoryUserStore;
pub use user_repo::PgUserStore;

use crate::{error::AppError, models::User};
use async_trait::async_trait;
use uuid::Uuid;

/// Storage for user accounts
///
/// `update` is a compare-and-swap on `User::version`: it fails with
/// `AppError::Conflict` if the stored record changed since it was read, and
/// returns the stored record with the bumped version on success.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by phone number
    async fn find_by_phone(&self, phone: &str) -> Result<Option<User>, AppError>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Insert a new user; duplicate phone numbers are a conflict
    async fn insert(&self, user: &User) -> Result<User, AppError>;

    /// Persist every mutable field of the user
    async fn update(&self, user: &User) -> Result<User, AppError>;
}
