use anyhow::Context;
use backend::api::{self, AppState};
use backend::archive::Archive;
use backend::config::ServerConfig;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let archive = Archive::connect(&config.database_url)
        .await
        .with_context(|| format!("opening archive at {}", config.database_url))?;

    let state = AppState::new(&config, archive);
    state.spawn_sweeper(Duration::from_secs(30));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("draughts server listening on {}", config.bind_addr);
    axum::serve(listener, api::router(state)).await?;
    Ok(())
}
