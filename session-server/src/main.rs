//! session-server - credential-to-session authentication service
//!
//! Serves login/logout and the identity query endpoints, backed by
//! PostgreSQL (users, revoked tokens, audit trail) or in-memory stores
//! in development.

use anyhow::Context;
use session_server::{Config, Server, init_logger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    init_logger();

    let config = Config::from_env().context("invalid configuration")?;

    tracing::info!(
        environment = %config.environment,
        identity_strategy = %config.identity_strategy,
        "Starting session-server"
    );

    Server::new(config).run().await?;

    tracing::info!("session-server stopped");
    Ok(())
}
