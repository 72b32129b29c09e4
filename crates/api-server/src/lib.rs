//! REST API server for multi-modal emotion analysis
//!
//! Thin HTTP layer over [`Orchestrator`]: synchronous text, audio and video
//! analysis plus background video tasks.

pub mod config;
pub mod error;
mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use emotion_analyzers::AnalyzerSet;
use emotion_media::FfmpegBackend;
use emotion_orchestrator::Orchestrator;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use error::ApiError;
pub use handlers::*;
pub use types::*;

/// API server state shared across handlers
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

impl ApiState {
    #[must_use]
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// FFmpeg media backend plus the analyzers selected by `analyzer_mode`
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        let media = Arc::new(FfmpegBackend::new(config.media.clone()));
        let analyzers = AnalyzerSet::for_mode(config.analyzer_mode);
        Self::new(Orchestrator::new(
            config.orchestrator.clone(),
            config.fusion,
            media,
            analyzers,
        ))
    }
}

/// Build the API router with all endpoints
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/ping", get(ping))
        .route("/api/status", get(api_status))
        // Synchronous analysis
        .route("/api/analyze", post(analyze_text))
        .route("/api/audio", post(analyze_audio))
        .route("/api/video", post(analyze_video))
        // Background tasks
        .route("/api/tasks/video", post(submit_video_task))
        .route("/api/tasks/{task_id}", get(get_task_status))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server
pub async fn start_server(addr: &str, state: ApiState) -> Result<(), std::io::Error> {
    start_server_with_shutdown(addr, state, std::future::pending()).await
}

/// Start the API server, stopping once `shutdown` resolves
pub async fn start_server_with_shutdown<F>(
    addr: &str,
    state: ApiState,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!("Starting API server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotion_analyzers::AnalyzerMode;

    #[tokio::test]
    async fn test_state_from_default_config() {
        let state = ApiState::from_config(&ServerConfig::default());
        let status = state.orchestrator.analyzer_status();
        assert_eq!(status.mode, AnalyzerMode::Unavailable);
        assert!(!status.all_ready());
    }

    #[tokio::test]
    async fn test_state_from_demo_config() {
        let config = ServerConfig {
            analyzer_mode: AnalyzerMode::Demo,
            ..ServerConfig::default()
        };
        let state = ApiState::from_config(&config);
        assert!(state.orchestrator.analyzer_status().all_ready());
    }

    #[tokio::test]
    async fn test_router_builds() {
        let state = ApiState::from_config(&ServerConfig::default());
        let _router = build_router(state);
    }
}
