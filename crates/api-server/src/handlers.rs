//! HTTP request handlers for API endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use emotion_orchestrator::{TaskId, TaskStatus};
use std::path::Path as FsPath;
use tracing::{info, warn};

use crate::{
    error::ApiError,
    types::{
        AnalyzeTextRequest, AudioAnalysisResponse, HealthResponse, MediaRequest, PingResponse,
        StatusResponse, TaskAcceptedResponse, TaskStatusResponse, TextAnalysisResponse,
        VideoAnalysisResponse,
    },
    ApiState,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(request)| request).map_err(|rejection| {
        warn!("Rejected request body: {}", rejection.body_text());
        ApiError::BadRequest(format!("invalid request body: {}", rejection.body_text()))
    })
}

async fn require_file(path: &FsPath) -> Result<(), ApiError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(ApiError::BadRequest(format!(
            "file not found: {}",
            path.display()
        ))),
    }
}

/// Health check endpoint
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        analyzers_ready: state.orchestrator.analyzer_status().all_ready(),
        timestamp: chrono::Utc::now(),
    })
}

pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        success: true,
        message: "pong".to_string(),
    })
}

/// Analyzer readiness plus task counts
pub async fn api_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let orchestrator = &state.orchestrator;
    Json(StatusResponse {
        success: true,
        analyzers: orchestrator.analyzer_status(),
        tasks: orchestrator.registry().counts(),
        pending: orchestrator.runner().pending(),
    })
}

/// Classify the sentiment of a piece of text
pub async fn analyze_text(
    State(state): State<ApiState>,
    body: Result<Json<AnalyzeTextRequest>, JsonRejection>,
) -> ApiResult<TextAnalysisResponse> {
    let request = parse_body(body)?;
    info!("Text analysis request: {} chars", request.text.chars().count());

    let analysis = state.orchestrator.analyze_text(&request.text).await?;
    Ok(Json(analysis.into()))
}

/// Transcribe an audio file and classify the transcript
pub async fn analyze_audio(
    State(state): State<ApiState>,
    body: Result<Json<MediaRequest>, JsonRejection>,
) -> ApiResult<AudioAnalysisResponse> {
    let request = parse_body(body)?;
    require_file(&request.path).await?;
    info!("Audio analysis request: {}", request.path.display());

    let analysis = state
        .orchestrator
        .analyze_audio(&request.path, &request.language_hint())
        .await?;
    Ok(Json(analysis.into()))
}

/// Analyze a video and wait for the result
pub async fn analyze_video(
    State(state): State<ApiState>,
    body: Result<Json<MediaRequest>, JsonRejection>,
) -> ApiResult<VideoAnalysisResponse> {
    let request = parse_body(body)?;
    require_file(&request.path).await?;
    info!("Video analysis request: {}", request.path.display());

    let result = state
        .orchestrator
        .analyze_video(&request.path, &request.language_hint())
        .await?;
    Ok(Json(result.into()))
}

/// Start a background video analysis
pub async fn submit_video_task(
    State(state): State<ApiState>,
    body: Result<Json<MediaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskAcceptedResponse>), ApiError> {
    let request = parse_body(body)?;
    require_file(&request.path).await?;

    let language = request.language_hint();
    let task_id = state
        .orchestrator
        .submit_video_task(request.path, language)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(TaskAcceptedResponse {
            success: true,
            task_id: task_id.to_string(),
            status: TaskStatus::Processing,
        }),
    ))
}

/// Look up a task; unknown and evicted ids are 404
pub async fn get_task_status(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
) -> ApiResult<TaskStatusResponse> {
    let id: TaskId = task_id.parse()?;
    let snapshot = state.orchestrator.task_status(&id)?;
    Ok(Json(snapshot.into()))
}
