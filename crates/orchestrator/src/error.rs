use emotion_analyzers::AnalyzerError;
use emotion_common::ProcessingError;
use thiserror::Error;

/// Hard failures of an analysis
///
/// Modality problems never show up here; they degrade inside the result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Text is empty")]
    EmptyText,

    #[error("{0} analyzer is not available")]
    AnalyzerUnavailable(&'static str),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Short message safe to show to the caller
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::InvalidInput(_) => "the input file could not be read".to_string(),
            PipelineError::EmptyText => "text must not be empty".to_string(),
            PipelineError::AnalyzerUnavailable(modality) => {
                format!("{modality} analyzer is not available")
            }
            PipelineError::AnalysisFailed(_) => "analysis failed".to_string(),
            PipelineError::Cancelled => "cancelled".to_string(),
            PipelineError::Internal(_) => "internal error".to_string(),
        }
    }

    /// Whether the caller supplied bad input (as opposed to a server-side fault)
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(self, PipelineError::InvalidInput(_) | PipelineError::EmptyText)
    }

    /// Only an unreadable container is the caller's fault; a broken
    /// toolchain is a server fault
    pub(crate) fn from_probe(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Cancelled => PipelineError::Cancelled,
            ProcessingError::CorruptedFile(_) | ProcessingError::NoVideoStream => {
                PipelineError::InvalidInput(err.to_string())
            }
            other => PipelineError::Internal(format!("reading metadata failed: {other}")),
        }
    }
}

impl From<AnalyzerError> for PipelineError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::Cancelled => PipelineError::Cancelled,
            AnalyzerError::Unavailable(msg) | AnalyzerError::Failed(msg) => {
                PipelineError::AnalysisFailed(msg)
            }
        }
    }
}

/// Task registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task {0} already reached a terminal state")]
    AlreadyTerminal(String),
}

/// Reasons a task submission is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Too many pending tasks (limit {0})")]
    QueueFull(usize),

    #[error("Task runner is shutting down")]
    ShuttingDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_hide_details() {
        let err = PipelineError::InvalidInput("ffprobe exited 1 on /secret/path.mp4".to_string());
        assert!(!err.user_message().contains("/secret"));
        assert!(err.is_input_error());

        let err = PipelineError::Internal("mutex poisoned".to_string());
        assert_eq!(err.user_message(), "internal error");
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_metadata_cancellation_is_preserved() {
        assert!(matches!(
            PipelineError::from_probe(ProcessingError::Cancelled),
            PipelineError::Cancelled
        ));
        assert!(matches!(
            PipelineError::from_probe(ProcessingError::NoVideoStream),
            PipelineError::InvalidInput(_)
        ));
        assert!(matches!(
            PipelineError::from_probe(ProcessingError::CorruptedFile("moov atom".into())),
            PipelineError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_metadata_tool_failure_is_internal() {
        let err = PipelineError::from_probe(ProcessingError::FFmpegError(
            "Failed to execute ffprobe: No such file or directory".into(),
        ));
        assert!(matches!(err, PipelineError::Internal(_)));
        assert!(!err.is_input_error());
        assert_eq!(err.user_message(), "internal error");

        let err = PipelineError::from_probe(ProcessingError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        )));
        assert!(matches!(err, PipelineError::Internal(_)));
    }

    #[test]
    fn test_analyzer_error_conversion() {
        assert!(matches!(
            PipelineError::from(AnalyzerError::Cancelled),
            PipelineError::Cancelled
        ));
        assert!(matches!(
            PipelineError::from(AnalyzerError::Failed("boom".into())),
            PipelineError::AnalysisFailed(_)
        ));
    }
}
