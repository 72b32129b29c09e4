//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use emotion_orchestrator::{PipelineError, RegistryError, SubmitError};
use thiserror::Error;
use tracing::error;

use crate::types::ErrorResponse;

const INTERNAL_MESSAGE: &str = "internal server error";

/// Errors returned by handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    /// Detail is logged, never returned
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => INTERNAL_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!("Request failed: {}", detail);
        }
        let body = ErrorResponse {
            success: false,
            error: self.public_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidInput(_) | PipelineError::EmptyText => {
                ApiError::BadRequest(err.user_message())
            }
            PipelineError::AnalyzerUnavailable(_) | PipelineError::Cancelled => {
                ApiError::Unavailable(err.user_message())
            }
            PipelineError::AnalysisFailed(_) | PipelineError::Internal(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => ApiError::NotFound(format!("task not found: {id}")),
            RegistryError::AlreadyTerminal(_) => ApiError::Internal(err.to_string()),
        }
    }
}
