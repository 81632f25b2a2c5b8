use tracing_subscriber::EnvFilter;

use crate::config::Environment;

fn default_filter(env: Environment) -> &'static str {
    match env {
        Environment::Local | Environment::Dev => "sso=debug,tower_http=debug,sqlx=warn",
        Environment::Prod => "sso=info,tower_http=info,sqlx=warn",
    }
}

/// Installs the global subscriber: plain text locally, JSON elsewhere.
/// `RUST_LOG` overrides the per-environment filter.
pub fn init(env: Environment) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(env)));

    match env {
        Environment::Local => tracing_subscriber::fmt().with_env_filter(env_filter).init(),
        Environment::Dev | Environment::Prod => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prod_is_quieter_than_dev() {
        assert!(default_filter(Environment::Dev).contains("sso=debug"));
        assert!(default_filter(Environment::Prod).contains("sso=info"));
    }
}
