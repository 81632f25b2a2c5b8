use sso::{app, config::AppConfig, logging, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    logging::init(config.env);
    tracing::info!(env = ?config.env, "starting application");

    let (host, port, tls) = (config.host.clone(), config.port, config.tls.clone());
    let app_state = AppState::init(config).await?;

    app::serve(app::build_app(app_state), &host, port, tls.as_ref()).await?;

    tracing::info!("application stopped");
    Ok(())
}
