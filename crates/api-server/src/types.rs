//! API request and response types
//!
//! Every response body carries a `success` flag; failures are
//! [`ErrorResponse`].

use chrono::{DateTime, Utc};
use emotion_analyzers::{AnalyzerMode, AnalyzerStatus, LanguageHint};
use emotion_common::{SentimentScores, SentimentVerdict, UNKNOWN_EMOTION_ZH};
use emotion_fusion::FusionResult;
use emotion_orchestrator::{
    SpeechAnalysis, TaskCounts, TaskSnapshot, TaskStatus, TextAnalysis, VideoAnalysisResult,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Text sentiment request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeTextRequest {
    pub text: String,
}

/// Request naming a media file on the server's filesystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRequest {
    pub path: PathBuf,
    /// Locale such as `zh-CN`; empty for auto-detect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl MediaRequest {
    #[must_use]
    pub fn language_hint(&self) -> LanguageHint {
        self.language
            .as_deref()
            .map_or_else(LanguageHint::default, LanguageHint::new)
    }
}

/// Error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub status: String,
    pub version: String,
    pub analyzers_ready: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub success: bool,
    pub message: String,
}

/// Analyzer readiness and task counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub analyzers: AnalyzerStatus,
    pub tasks: TaskCounts,
    /// Tasks admitted but not finished
    pub pending: usize,
}

/// Fused emotion with display names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionView {
    pub dominant_emotion: String,
    pub dominant_emotion_zh: String,
    pub confidence: f32,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_emotion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_emotion_zh: Option<String>,
}

impl From<&FusionResult> for EmotionView {
    fn from(fusion: &FusionResult) -> Self {
        Self {
            dominant_emotion: fusion.dominant_name().to_string(),
            dominant_emotion_zh: fusion
                .dominant_emotion
                .map_or(UNKNOWN_EMOTION_ZH, |label| label.zh_name())
                .to_string(),
            confidence: fusion.confidence,
            source: fusion.source.as_str().to_string(),
            secondary_emotion: fusion.secondary_emotion.map(|l| l.as_str().to_string()),
            secondary_emotion_zh: fusion.secondary_emotion.map(|l| l.zh_name().to_string()),
        }
    }
}

/// Sentiment verdict with display names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentView {
    pub label: String,
    pub label_zh: String,
    pub class_index: usize,
    pub scores: SentimentScores,
}

impl From<&SentimentVerdict> for SentimentView {
    fn from(verdict: &SentimentVerdict) -> Self {
        Self {
            label: verdict.class.as_str().to_string(),
            label_zh: verdict.class.zh_name().to_string(),
            class_index: verdict.class_index(),
            scores: verdict.scores,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextAnalysisResponse {
    pub success: bool,
    pub sentiment: SentimentView,
    pub emotion: EmotionView,
    pub analyzer_mode: AnalyzerMode,
    pub warnings: Vec<String>,
    pub processing_time_ms: u64,
}

impl From<TextAnalysis> for TextAnalysisResponse {
    fn from(analysis: TextAnalysis) -> Self {
        Self {
            success: true,
            sentiment: SentimentView::from(&analysis.sentiment),
            emotion: EmotionView::from(&analysis.fusion),
            analyzer_mode: analysis.analyzer_mode,
            warnings: analysis.warnings,
            processing_time_ms: analysis.processing_time_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioAnalysisResponse {
    pub success: bool,
    pub transcript: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<EmotionView>,
    pub analyzer_mode: AnalyzerMode,
    pub warnings: Vec<String>,
    pub processing_time_ms: u64,
}

impl From<SpeechAnalysis> for AudioAnalysisResponse {
    fn from(analysis: SpeechAnalysis) -> Self {
        Self {
            success: true,
            sentiment: analysis.sentiment.as_ref().map(SentimentView::from),
            emotion: analysis.fusion.as_ref().map(EmotionView::from),
            transcript: analysis.transcript,
            language: analysis.language,
            sentiment_error: analysis.sentiment_error,
            analyzer_mode: analysis.analyzer_mode,
            warnings: analysis.warnings,
            processing_time_ms: analysis.processing_time_ms,
        }
    }
}

/// Full video result plus display views of its fused emotion and speech sentiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAnalysisResponse {
    pub success: bool,
    pub emotion: EmotionView,
    /// Present only when the speech track was classified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_sentiment: Option<SentimentView>,
    #[serde(flatten)]
    pub result: VideoAnalysisResult,
}

impl From<VideoAnalysisResult> for VideoAnalysisResponse {
    fn from(result: VideoAnalysisResult) -> Self {
        Self {
            success: true,
            emotion: EmotionView::from(&result.fusion),
            speech_sentiment: result.speech.sentiment().map(SentimentView::from),
            result,
        }
    }
}

/// Returned when a video task is accepted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAcceptedResponse {
    pub success: bool,
    pub task_id: String,
    pub status: TaskStatus,
}

/// Task lookup response
///
/// `success` reports that the lookup worked; a failed task is
/// `status: "failed"` with its `error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub success: bool,
    pub task_id: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<VideoAnalysisResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<TaskSnapshot> for TaskStatusResponse {
    fn from(snapshot: TaskSnapshot) -> Self {
        Self {
            success: true,
            task_id: snapshot.id.to_string(),
            status: snapshot.status,
            created_at: snapshot.created_at,
            finished_at: snapshot.finished_at,
            result: snapshot
                .result
                .map(|result| VideoAnalysisResponse::from((*result).clone())),
            error: snapshot.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotion_common::{EmotionLabel, SentimentClass};
    use emotion_fusion::FusionSource;

    fn face_priority() -> FusionResult {
        FusionResult {
            source: FusionSource::FacePriority,
            dominant_emotion: Some(EmotionLabel::Happy),
            confidence: 0.7,
            secondary_emotion: Some(EmotionLabel::Sad),
            error: None,
        }
    }

    #[test]
    fn test_media_request_language_default() {
        let request: MediaRequest = serde_json::from_str(r#"{"path": "/tmp/a.mp4"}"#).unwrap();
        assert_eq!(request.language_hint().locale(), "zh-CN");

        let request: MediaRequest =
            serde_json::from_str(r#"{"path": "/tmp/a.mp4", "language": "en-US"}"#).unwrap();
        assert_eq!(request.language_hint().language_code().as_deref(), Some("en"));
    }

    #[test]
    fn test_emotion_view_display_names() {
        let view = EmotionView::from(&face_priority());
        assert_eq!(view.dominant_emotion, "happy");
        assert_eq!(view.dominant_emotion_zh, "快乐");
        assert_eq!(view.source, "face_priority");
        assert_eq!(view.secondary_emotion.as_deref(), Some("sad"));
        assert_eq!(view.secondary_emotion_zh.as_deref(), Some("悲伤"));
    }

    #[test]
    fn test_emotion_view_unknown() {
        let fusion = FusionResult {
            source: FusionSource::Error,
            dominant_emotion: None,
            confidence: 0.5,
            secondary_emotion: None,
            error: Some("no modality available".into()),
        };
        let json = serde_json::to_value(EmotionView::from(&fusion)).unwrap();
        assert_eq!(json["dominant_emotion"], "unknown");
        assert_eq!(json["dominant_emotion_zh"], "未知");
        assert_eq!(json["source"], "error");
        assert!(json.get("secondary_emotion").is_none());
    }

    #[test]
    fn test_sentiment_view() {
        let verdict = SentimentVerdict::new(SentimentClass::Positive, [0.05, 0.05, 0.05, 0.8, 0.05]);
        let view = SentimentView::from(&verdict);
        assert_eq!(view.class_index, 3);
        assert_eq!(view.label_zh, "积极");
    }

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_value(ErrorResponse {
            success: false,
            error: "text must not be empty".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "text must not be empty"}));
    }
}
