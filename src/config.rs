use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;
use serde::Deserialize;

/// Longest session a token may be issued for (one year).
pub const MAX_TOKEN_TTL_MINUTES: u64 = 365 * 24 * 60;

/// Deployment flavour; picks log format and verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => anyhow::bail!("unknown APP_ENV {other:?}, expected local, dev or prod"),
        }
    }
}

/// PEM certificate chain and private key the listener terminates TLS with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: Environment,
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub token_ttl_minutes: u64,
    pub tls: Option<TlsConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let var = |key: &str| std::env::var(key).ok();
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        Ok(Self {
            env: var("APP_ENV")
                .map(|v| v.parse::<Environment>())
                .unwrap_or(Ok(Environment::Local))?,
            database_url,
            db_max_connections: parsed_or("DB_MAX_CONNECTIONS", var("DB_MAX_CONNECTIONS"), 10)?,
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed_or("APP_PORT", var("APP_PORT"), 44044)?,
            token_ttl_minutes: checked_ttl_minutes(parsed_or(
                "TOKEN_TTL_MINUTES",
                var("TOKEN_TTL_MINUTES"),
                60,
            )?)?,
            tls: tls_from(var("TLS_CERT_PATH"), var("TLS_KEY_PATH"))?,
        })
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_minutes.min(MAX_TOKEN_TTL_MINUTES) * 60)
    }
}

/// Unset means `default`; a value that is set but doesn't parse is an error.
fn parsed_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key} {v:?}: {e}")),
    }
}

fn checked_ttl_minutes(minutes: u64) -> anyhow::Result<u64> {
    if minutes == 0 || minutes > MAX_TOKEN_TTL_MINUTES {
        anyhow::bail!(
            "TOKEN_TTL_MINUTES must be between 1 and {MAX_TOKEN_TTL_MINUTES}, got {minutes}"
        );
    }
    Ok(minutes)
}

fn tls_from(cert: Option<String>, key: Option<String>) -> anyhow::Result<Option<TlsConfig>> {
    match (cert, key) {
        (None, None) => Ok(None),
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: cert.into(),
            key_path: key.into(),
        })),
        _ => anyhow::bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together"),
    }
}
