//! API Server Binary Entry Point

use anyhow::Context;
use emotion_api_server::{start_server_with_shutdown, ApiState, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "emotion_api_server=info,emotion_orchestrator=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::load().context("Failed to load configuration")?;
    tracing::info!(
        "Starting emotion analysis API server (analyzer mode: {})",
        config.analyzer_mode.as_str()
    );

    let state = ApiState::from_config(&config);
    let orchestrator = state.orchestrator.clone();
    let sweeper = orchestrator.spawn_sweeper();

    start_server_with_shutdown(&config.bind_addr, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    })
    .await
    .with_context(|| format!("Server on {} failed", config.bind_addr))?;

    orchestrator.shutdown().await;
    sweeper.await.context("Eviction sweeper panicked")?;

    Ok(())
}
