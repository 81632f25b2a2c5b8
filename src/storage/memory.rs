use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Storage, StorageError};
use crate::auth::repo_types::{App, NewUser, User};

#[derive(Default)]
struct Tables {
    users: HashMap<i64, User>,
    apps: HashMap<i32, App>,
    last_user_id: i64,
}

impl Tables {
    fn phone_taken(&self, phone: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.phone == phone && Some(u.id) != except)
    }
}

/// In-process storage with the same uniqueness rules as the Postgres schema.
/// Backs tests and local runs without a database.
#[derive(Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apps(apps: impl IntoIterator<Item = App>) -> Self {
        let tables = Tables {
            apps: apps.into_iter().map(|a| (a.id, a)).collect(),
            ..Tables::default()
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or(StorageError::NotFound)?;
        user.is_admin = is_admin;
        Ok(())
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn find_user_by_phone(&self, phone: &str) -> Result<User, StorageError> {
        self.tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.phone == phone)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<User, StorageError> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn find_app_by_id(&self, id: i32) -> Result<App, StorageError> {
        self.tables
            .read()
            .await
            .apps
            .get(&id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn insert_user(&self, user: NewUser) -> Result<i64, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.phone_taken(&user.phone, None) {
            return Err(StorageError::AlreadyExists);
        }
        tables.last_user_id += 1;
        let id = tables.last_user_id;
        tables.users.insert(
            id,
            User {
                id,
                phone: user.phone,
                password_hash: user.password_hash,
                name: None,
                email: None,
                is_admin: false,
            },
        );
        Ok(id)
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        if tables.phone_taken(&user.phone, Some(user.id)) {
            return Err(StorageError::AlreadyExists);
        }
        let stored = tables
            .users
            .get_mut(&user.id)
            .ok_or(StorageError::NotFound)?;
        stored.phone = user.phone.clone();
        stored.password_hash = user.password_hash.clone();
        stored.name = user.name.clone();
        stored.email = user.email.clone();
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StorageError> {
        self.tables
            .write()
            .await
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}
