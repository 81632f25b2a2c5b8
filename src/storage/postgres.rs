use async_trait::async_trait;
use sqlx::PgPool;

use super::{Storage, StorageError};
use crate::auth::repo_types::{App, NewUser, User};

#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Administrative pathway: flips the admin flag outside of the auth service.
    pub async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<(), StorageError> {
        let res = sqlx::query(r#"UPDATE users SET is_admin = $1 WHERE id = $2"#)
            .bind(is_admin)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    /// Provisions a calling application.
    pub async fn insert_app(&self, app: &App) -> Result<(), StorageError> {
        sqlx::query(r#"INSERT INTO apps (id, name, secret) VALUES ($1, $2, $3)"#)
            .bind(app.id)
            .bind(&app.name)
            .bind(&app.secret)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn find_user_by_phone(&self, phone: &str) -> Result<User, StorageError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, phone, password_hash, name, email, is_admin
            FROM users
            WHERE phone = $1
            "#,
        )
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<User, StorageError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, phone, password_hash, name, email, is_admin
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_app_by_id(&self, id: i32) -> Result<App, StorageError> {
        let app = sqlx::query_as::<_, App>(r#"SELECT id, name, secret FROM apps WHERE id = $1"#)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(app)
    }

    async fn insert_user(&self, user: NewUser) -> Result<i64, StorageError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (phone, password_hash)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(&user.phone)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET phone = $1, password_hash = $2, name = $3, email = $4
            WHERE id = $5
            "#,
        )
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.id)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StorageError> {
        let res = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
