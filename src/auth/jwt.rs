use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::auth::claims::Claims;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    SignatureMismatch,

    #[error("token expired")]
    Expired,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::SignatureMismatch,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Signs and checks session tokens. Holds no key material: every call is given the
/// secret (or a way to look it up) of the application the token belongs to.
#[derive(Debug, Clone, Copy)]
pub struct TokenCodec {
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    pub fn issue(&self, user_id: i64, app_id: i32, app_secret: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, app_id, app_secret, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        user_id: i64,
        app_id: i32,
        app_secret: &str,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
            .ok_or_else(|| TokenError::Encoding("token expiry out of range".into()))?;
        let claims = Claims {
            sub: user_id.to_string(),
            app: app_id,
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(app_secret.as_bytes()),
        )
        .map_err(|e| TokenError::Encoding(e.to_string()))?;
        debug!(user_id, app_id, "jwt signed");
        Ok(token)
    }

    /// Reads the application id out of a token without checking its signature.
    /// Only useful to pick the secret that [`TokenCodec::validate`] will check against.
    pub fn app_id_of(token: &str) -> Result<i32, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)?;
        Ok(data.claims.app)
    }

    pub fn validate<F>(&self, token: &str, secret_lookup: F) -> Result<Claims, TokenError>
    where
        F: FnOnce(i32) -> Option<String>,
    {
        self.validate_at(token, secret_lookup, OffsetDateTime::now_utc())
    }

    pub fn validate_at<F>(
        &self,
        token: &str,
        secret_lookup: F,
        now: OffsetDateTime,
    ) -> Result<Claims, TokenError>
    where
        F: FnOnce(i32) -> Option<String>,
    {
        let app_id = Self::app_id_of(token)?;
        let secret = secret_lookup(app_id).ok_or(TokenError::SignatureMismatch)?;

        // Expiry is checked below against `now`, not the wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )?;

        if now.unix_timestamp() > data.claims.exp {
            return Err(TokenError::Expired);
        }
        let user_id = data.claims.user_id()?;
        debug!(user_id, app_id = data.claims.app, "jwt verified");
        Ok(data.claims)
    }
}
