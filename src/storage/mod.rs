use async_trait::async_trait;

use crate::auth::repo_types::{App, NewUser, User};

mod memory;
mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    AlreadyExists,

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::AlreadyExists,
            other => StorageError::Unavailable(other.to_string()),
        }
    }
}

/// Persistence of users and applications. Every call is atomic on its own.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn find_user_by_phone(&self, phone: &str) -> Result<User, StorageError>;
    async fn find_user_by_id(&self, id: i64) -> Result<User, StorageError>;
    async fn find_app_by_id(&self, id: i32) -> Result<App, StorageError>;

    /// Inserts a non-admin user and returns its id. A taken phone is `AlreadyExists`.
    async fn insert_user(&self, user: NewUser) -> Result<i64, StorageError>;

    /// Overwrites phone, password hash, name and email of `user.id`.
    async fn update_user(&self, user: &User) -> Result<(), StorageError>;

    async fn delete_user(&self, id: i64) -> Result<(), StorageError>;
}
