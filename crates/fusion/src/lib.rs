//! Fusion Engine - Cross-Modal Emotion Verdict
//!
//! Combines the aggregated facial emotion of a video with the sentiment of its
//! transcribed speech into one verdict with a confidence score and explicit
//! provenance.
//!
//! ## Rules
//!
//! 1. **Face only**: the face's dominant emotion, confidence 0.7
//! 2. **Text only**: the sentiment class mapped to an emotion, confidence 0.8
//! 3. **Agreement**: the shared emotion, confidence 0.9
//! 4. **Disagreement**: the face wins, the text emotion is kept as secondary, confidence 0.7
//! 5. **Neither, or invalid input**: `unknown`, confidence 0.5
//!
//! Fusion never fails; invalid input is reported as [`FusionSource::Error`].
//!
//! ## Example
//!
//! ```rust
//! use emotion_common::{EmotionDistribution, EmotionLabel, SentimentClass, SentimentVerdict};
//! use emotion_fusion::{fuse, FusionConfig, FusionSource};
//!
//! let face = EmotionDistribution::from_scores([(EmotionLabel::Happy, 0.8), (EmotionLabel::Neutral, 0.2)]);
//! let text = SentimentVerdict::new(SentimentClass::Positive, [0.0, 0.05, 0.15, 0.7, 0.1]);
//!
//! let result = fuse(&FusionConfig::default(), Some(&face), Some(&text));
//! assert_eq!(result.source, FusionSource::Combined);
//! assert_eq!(result.dominant_emotion, Some(EmotionLabel::Happy));
//! assert_eq!(result.confidence, 0.9);
//! ```

use emotion_common::{EmotionDistribution, EmotionLabel, SentimentVerdict};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Fusion errors
///
/// Input errors never leave [`fuse`]; they are folded into an error-sourced
/// result. Config errors come from [`FusionConfig::validate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid fusion config: {0}")]
    InvalidConfig(String),
}

/// Which modalities produced the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionSource {
    Face,
    Text,
    Combined,
    FacePriority,
    Error,
}

impl FusionSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FusionSource::Face => "face",
            FusionSource::Text => "text",
            FusionSource::Combined => "combined",
            FusionSource::FacePriority => "face_priority",
            FusionSource::Error => "error",
        }
    }
}

/// Confidence assigned to each fusion outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub face_only: f32,
    pub text_only: f32,
    pub combined: f32,
    pub face_priority: f32,
    pub fallback: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            face_only: 0.7,
            text_only: 0.8,
            combined: 0.9,
            face_priority: 0.7,
            fallback: 0.5,
        }
    }
}

impl FusionConfig {
    /// Check every confidence is a finite value in `[0, 1]`
    pub fn validate(&self) -> Result<(), FusionError> {
        let fields = [
            ("face_only", self.face_only),
            ("text_only", self.text_only),
            ("combined", self.combined),
            ("face_priority", self.face_priority),
            ("fallback", self.fallback),
        ];
        for (name, value) in fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(FusionError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Fused verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub source: FusionSource,
    /// `None` is reported as `"unknown"`
    #[serde(with = "label_or_unknown")]
    pub dominant_emotion: Option<EmotionLabel>,
    pub confidence: f32,
    /// Text emotion that lost to the face (face_priority only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_emotion: Option<EmotionLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FusionResult {
    fn unknown(confidence: f32, error: impl Into<String>) -> Self {
        Self {
            source: FusionSource::Error,
            dominant_emotion: None,
            confidence,
            secondary_emotion: None,
            error: Some(error.into()),
        }
    }

    /// Dominant emotion name, `"unknown"` when fusion produced none
    #[must_use]
    pub fn dominant_name(&self) -> &'static str {
        self.dominant_emotion
            .map_or(emotion_common::UNKNOWN_EMOTION, |label| label.as_str())
    }
}

/// Fuse a face distribution and a text verdict, either of which may be absent
#[must_use]
pub fn fuse(
    config: &FusionConfig,
    face: Option<&EmotionDistribution>,
    text: Option<&SentimentVerdict>,
) -> FusionResult {
    match try_fuse(config, face, text) {
        Ok(result) => {
            debug!(
                "Fused verdict: source={}, emotion={}, confidence={:.2}",
                result.source.as_str(),
                result.dominant_name(),
                result.confidence
            );
            result
        }
        Err(e) => {
            warn!("Fusion fell back to unknown: {}", e);
            FusionResult::unknown(config.fallback, e.to_string())
        }
    }
}

fn try_fuse(
    config: &FusionConfig,
    face: Option<&EmotionDistribution>,
    text: Option<&SentimentVerdict>,
) -> Result<FusionResult, FusionError> {
    if let Some(face) = face {
        if !face.is_finite() {
            return Err(FusionError::InvalidInput(
                "face distribution contains non-finite scores".to_string(),
            ));
        }
    }

    let result = match (face, text) {
        (Some(face), None) => FusionResult {
            source: FusionSource::Face,
            dominant_emotion: Some(face.dominant()),
            confidence: config.face_only,
            secondary_emotion: None,
            error: None,
        },
        (None, Some(text)) => FusionResult {
            source: FusionSource::Text,
            dominant_emotion: Some(text.mapped_emotion()),
            confidence: config.text_only,
            secondary_emotion: None,
            error: None,
        },
        (Some(face), Some(text)) => {
            let face_emotion = face.dominant();
            let text_emotion = text.mapped_emotion();
            if face_emotion == text_emotion {
                FusionResult {
                    source: FusionSource::Combined,
                    dominant_emotion: Some(face_emotion),
                    confidence: config.combined,
                    secondary_emotion: None,
                    error: None,
                }
            } else {
                FusionResult {
                    source: FusionSource::FacePriority,
                    dominant_emotion: Some(face_emotion),
                    confidence: config.face_priority,
                    secondary_emotion: Some(text_emotion),
                    error: None,
                }
            }
        }
        (None, None) => FusionResult::unknown(config.fallback, "no modality available"),
    };

    Ok(result)
}

mod label_or_unknown {
    use emotion_common::{EmotionLabel, UNKNOWN_EMOTION};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        label: &Option<EmotionLabel>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(label.map_or(UNKNOWN_EMOTION, |l| l.as_str()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<EmotionLabel>, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name == UNKNOWN_EMOTION {
            return Ok(None);
        }
        name.parse().map(Some).map_err(serde::de::Error::custom)
    }
}
