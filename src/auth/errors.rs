use crate::auth::{jwt::TokenError, password::PasswordError};
use crate::storage::StorageError;

/// Failures of auth service operations. The service returns them untouched;
/// the RPC layer decides what the caller gets to see.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user already exists")]
    UserExists,

    #[error("user not found")]
    UserNotFound,

    #[error("app not found")]
    AppNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token does not belong to this user")]
    Unauthorized,

    #[error("token expired")]
    TokenExpired,

    #[error("malformed token")]
    MalformedToken,

    #[error("token signature mismatch")]
    SignatureMismatch,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => AuthError::MalformedToken,
            TokenError::SignatureMismatch => AuthError::SignatureMismatch,
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Encoding(e) => AuthError::Internal(e),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// Storage failures without a more specific meaning at the call site.
impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(e) => AuthError::StorageUnavailable(e),
            other => AuthError::Internal(other.to_string()),
        }
    }
}
