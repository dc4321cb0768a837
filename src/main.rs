use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use chat_relay::core::config::{AppPaths, ConfigService};
use chat_relay::core::logging;
use chat_relay::server;
use chat_relay::state::error::InitializationError;
use chat_relay::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let config = ConfigService::new(paths.clone())
        .load()
        .map_err(|e| InitializationError::Config(e.into()))?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::initialize(&paths, config).await?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on http://{}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
