//! Analysis results

use emotion_analyzers::AnalyzerMode;
use emotion_common::{EmotionDistribution, EmotionLabel, SentimentVerdict, VideoInfo};
use emotion_frame_sampler::{FaceAggregate, FrameTally};
use emotion_fusion::FusionResult;
use serde::{Deserialize, Serialize};

/// Face modality slot of a video analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FaceOutcome {
    /// At least one sampled frame contained a face
    Detected {
        distribution: EmotionDistribution,
        dominant_emotion: EmotionLabel,
        frames: FrameTally,
    },
    /// Frames were analyzed but none contained a face
    NoDetection { frames: FrameTally },
    /// Every sampled frame failed to decode or analyze
    Failed { error: String, frames: FrameTally },
    /// No face analyzer installed
    Unavailable,
}

impl FaceOutcome {
    pub(crate) fn from_aggregate(aggregate: FaceAggregate, frames: FrameTally) -> Self {
        match aggregate {
            FaceAggregate::Detected {
                distribution,
                dominant_emotion,
                ..
            } => FaceOutcome::Detected {
                distribution,
                dominant_emotion,
                frames,
            },
            FaceAggregate::NoDetection => FaceOutcome::NoDetection { frames },
        }
    }

    #[must_use]
    pub fn distribution(&self) -> Option<&EmotionDistribution> {
        match self {
            FaceOutcome::Detected { distribution, .. } => Some(distribution),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, FaceOutcome::Detected { .. })
    }

    /// Short reason for a degraded slot
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        match self {
            FaceOutcome::Detected { .. } => None,
            FaceOutcome::NoDetection { frames } => Some(format!(
                "no face detected in {} sampled frames",
                frames.analyzed()
            )),
            FaceOutcome::Failed { error, .. } => Some(format!("face analysis failed: {error}")),
            FaceOutcome::Unavailable => Some("face emotion analyzer unavailable".to_string()),
        }
    }
}

/// Speech modality slot: transcription followed by sentiment classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SpeechOutcome {
    Analyzed {
        transcript: String,
        sentiment: SentimentVerdict,
    },
    /// Transcript available but sentiment classification failed or is unavailable
    TranscribedOnly { transcript: String, error: String },
    /// Recognizer returned no words
    NoSpeech,
    /// The container has no audio stream
    NoAudioTrack,
    /// Audio extraction or transcription failed
    Failed { error: String },
    /// No speech recognizer installed
    Unavailable,
}

impl SpeechOutcome {
    #[must_use]
    pub fn sentiment(&self) -> Option<&SentimentVerdict> {
        match self {
            SpeechOutcome::Analyzed { sentiment, .. } => Some(sentiment),
            _ => None,
        }
    }

    #[must_use]
    pub fn transcript(&self) -> Option<&str> {
        match self {
            SpeechOutcome::Analyzed { transcript, .. }
            | SpeechOutcome::TranscribedOnly { transcript, .. } => Some(transcript),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, SpeechOutcome::Analyzed { .. })
    }

    #[must_use]
    pub fn warning(&self) -> Option<String> {
        match self {
            SpeechOutcome::Analyzed { .. } => None,
            SpeechOutcome::TranscribedOnly { error, .. } => {
                Some(format!("text sentiment unavailable: {error}"))
            }
            SpeechOutcome::NoSpeech => Some("no speech recognized".to_string()),
            SpeechOutcome::NoAudioTrack => Some("video has no audio track".to_string()),
            SpeechOutcome::Failed { error } => Some(format!("speech analysis failed: {error}")),
            SpeechOutcome::Unavailable => Some("speech recognizer unavailable".to_string()),
        }
    }
}

/// Wall-clock time spent per pipeline stage, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub probe_ms: u64,
    pub audio_extraction_ms: u64,
    pub transcription_ms: u64,
    pub text_analysis_ms: u64,
    pub frame_analysis_ms: u64,
    pub fusion_ms: u64,
}

/// Outcome of analyzing one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysisResult {
    pub video_info: VideoInfo,
    pub face: FaceOutcome,
    pub speech: SpeechOutcome,
    pub fusion: FusionResult,
    /// True when any modality did not contribute
    pub partial: bool,
    pub warnings: Vec<String>,
    pub analyzer_mode: AnalyzerMode,
    pub timings: StageTimings,
    pub processing_time_ms: u64,
}

/// Outcome of classifying a piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub sentiment: SentimentVerdict,
    pub fusion: FusionResult,
    pub analyzer_mode: AnalyzerMode,
    pub warnings: Vec<String>,
    pub processing_time_ms: u64,
}

/// Outcome of transcribing and classifying an audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechAnalysis {
    pub transcript: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentVerdict>,
    /// Set when the transcript could not be classified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fusion: Option<FusionResult>,
    pub analyzer_mode: AnalyzerMode,
    pub warnings: Vec<String>,
    pub processing_time_ms: u64,
}
