use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::{
    claims::Claims,
    errors::AuthError,
    jwt::TokenCodec,
    password::{hash_password, verify_password},
    repo_types::NewUser,
};
use crate::storage::{Storage, StorageError};

/// Profile returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub name: String,
    pub email: String,
    pub token: String,
    pub user_id: i64,
}

/// Requested profile changes. An empty field leaves the stored value as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Business rules of registration, login and token-gated profile changes.
/// Holds no per-request state; all durable state lives behind [`Storage`].
#[derive(Clone)]
pub struct AuthService {
    storage: Arc<dyn Storage>,
    tokens: TokenCodec,
}

fn user_lookup(err: StorageError) -> AuthError {
    match err {
        StorageError::NotFound => AuthError::UserNotFound,
        other => other.into(),
    }
}

fn user_write(err: StorageError) -> AuthError {
    match err {
        StorageError::AlreadyExists => AuthError::UserExists,
        StorageError::NotFound => AuthError::UserNotFound,
        other => other.into(),
    }
}

impl AuthService {
    pub fn new(storage: Arc<dyn Storage>, tokens: TokenCodec) -> Self {
        Self { storage, tokens }
    }

    #[instrument(skip(self, password))]
    pub async fn register_new_user(&self, phone: &str, password: &str) -> Result<i64, AuthError> {
        match self.storage.find_user_by_phone(phone).await {
            Ok(_) => return Err(AuthError::UserExists),
            Err(StorageError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let password_hash = hash_password(password)?;
        let user_id = self
            .storage
            .insert_user(NewUser {
                phone: phone.to_string(),
                password_hash,
            })
            .await
            .map_err(user_write)?;

        info!(user_id, "user registered");
        Ok(user_id)
    }

    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        phone: &str,
        password: &str,
        app_id: i32,
    ) -> Result<LoginOutcome, AuthError> {
        let user = self
            .storage
            .find_user_by_phone(phone)
            .await
            .map_err(user_lookup)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let app = self
            .storage
            .find_app_by_id(app_id)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => AuthError::AppNotFound,
                other => other.into(),
            })?;

        let token = self.tokens.issue(user.id, app.id, &app.secret)?;

        info!(user_id = user.id, app_id, "user logged in");
        Ok(LoginOutcome {
            name: user.name.unwrap_or_default(),
            email: user.email.unwrap_or_default(),
            token,
            user_id: user.id,
        })
    }

    #[instrument(skip(self))]
    pub async fn is_admin(&self, user_id: i64) -> Result<bool, AuthError> {
        let user = self
            .storage
            .find_user_by_id(user_id)
            .await
            .map_err(user_lookup)?;
        Ok(user.is_admin)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, phone: &str) -> Result<String, AuthError> {
        let user = self
            .storage
            .find_user_by_phone(phone)
            .await
            .map_err(user_lookup)?;
        Ok(user.name.unwrap_or_default())
    }

    #[instrument(skip(self, update, token))]
    pub async fn update_user(
        &self,
        user_id: i64,
        update: ProfileUpdate,
        token: &str,
    ) -> Result<bool, AuthError> {
        let claims = self.verify_token(token).await?;
        if claims.user_id()? != user_id {
            return Err(AuthError::Unauthorized);
        }

        let mut user = self
            .storage
            .find_user_by_id(user_id)
            .await
            .map_err(user_lookup)?;

        if !update.phone.is_empty() && update.phone != user.phone {
            match self.storage.find_user_by_phone(&update.phone).await {
                Ok(_) => return Err(AuthError::UserExists),
                Err(StorageError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
            user.phone = update.phone;
        }
        if !update.name.is_empty() {
            user.name = Some(update.name);
        }
        if !update.email.is_empty() {
            user.email = Some(update.email);
        }
        if !update.password.is_empty() {
            user.password_hash = hash_password(&update.password)?;
        }

        self.storage.update_user(&user).await.map_err(user_write)?;

        info!(user_id, "user updated");
        Ok(true)
    }

    #[instrument(skip(self, token))]
    pub async fn delete_user(&self, phone: &str, token: &str) -> Result<bool, AuthError> {
        let user = self
            .storage
            .find_user_by_phone(phone)
            .await
            .map_err(user_lookup)?;

        let claims = self.verify_token(token).await?;
        if claims.user_id()? != user.id {
            return Err(AuthError::Unauthorized);
        }

        self.storage
            .delete_user(user.id)
            .await
            .map_err(user_lookup)?;

        info!(user_id = user.id, "user deleted");
        Ok(true)
    }

    /// Checks a token against the current secret of the app it names.
    async fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let app_id = TokenCodec::app_id_of(token)?;
        let app = match self.storage.find_app_by_id(app_id).await {
            Ok(app) => Some(app),
            Err(StorageError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let claims = self
            .tokens
            .validate(token, |id| app.filter(|a| a.id == id).map(|a| a.secret))?;
        Ok(claims)
    }
}
