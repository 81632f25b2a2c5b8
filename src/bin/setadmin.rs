//! Administrative CLI working directly against the database.
//!
//! Admin rights and applications are managed here rather than through the
//! auth service, so nothing in this binary is reachable over RPC.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sso::{
    auth::repo_types::App,
    config::{AppConfig, Environment},
    db, logging,
    storage::PgStorage,
};

#[derive(Parser)]
#[command(name = "setadmin")]
#[command(about = "Grant or revoke admin rights and provision applications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mark a user as admin
    Grant { user_id: i64 },

    /// Remove admin rights from a user
    Revoke { user_id: i64 },

    /// Register an application allowed to request tokens
    AddApp {
        id: i32,
        name: String,
        secret: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_env()?;
    logging::init(Environment::Local);

    let pool = db::connect(&config).await?;
    db::migrate(&pool).await?;
    let storage = PgStorage::new(pool);

    match cli.command {
        Commands::Grant { user_id } => {
            storage
                .set_admin(user_id, true)
                .await
                .with_context(|| format!("grant admin to user {user_id}"))?;
            tracing::info!(user_id, "admin granted");
        }
        Commands::Revoke { user_id } => {
            storage
                .set_admin(user_id, false)
                .await
                .with_context(|| format!("revoke admin from user {user_id}"))?;
            tracing::info!(user_id, "admin revoked");
        }
        Commands::AddApp { id, name, secret } => {
            storage
                .insert_app(&App { id, name, secret })
                .await
                .with_context(|| format!("add app {id}"))?;
            tracing::info!(app_id = id, "app added");
        }
    }

    Ok(())
}
