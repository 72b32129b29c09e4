/// Common types and utilities for multi-modal emotion analysis
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod emotion;
pub mod sentiment;

pub use emotion::{EmotionDistribution, EmotionLabel, UNKNOWN_EMOTION, UNKNOWN_EMOTION_ZH};
pub use sentiment::{SentimentClass, SentimentScores, SentimentVerdict};

/// Processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Corrupted file: {0}")]
    CorruptedFile(String),

    #[error("No audio stream found")]
    NoAudioStream,

    #[error("No video stream found")]
    NoVideoStream,

    #[error("Frame {index} could not be decoded: {reason}")]
    FrameUnavailable { index: u64, reason: String },

    #[error("FFmpeg error: {0}")]
    FFmpegError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Other error: {0}")]
    Other(String),
}

impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        ProcessingError::ImageError(err.to_string())
    }
}

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Video metadata reported alongside every analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Total number of decodable frames
    pub frame_count: u64,
    /// Average frame rate (0.0 when the container does not report one)
    pub fps: f64,
    /// Whether the container carries an audio stream
    pub has_audio: bool,
}

impl VideoInfo {
    /// Build video info from frame count and frame rate, deriving the duration
    #[must_use]
    pub fn from_frames(frame_count: u64, fps: f64, has_audio: bool) -> Self {
        let duration = if fps > 0.0 {
            frame_count as f64 / fps
        } else {
            0.0
        };
        Self {
            duration,
            frame_count,
            fps,
            has_audio,
        }
    }
}
