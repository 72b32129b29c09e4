//! Inference collaborators for emotion analysis
//!
//! The pipeline never talks to a model directly. Speech recognition, sentiment
//! classification and facial emotion detection are reached through the
//! [`Transcriber`], [`SentimentClassifier`] and [`FaceEmotionDetector`] traits,
//! and an [`AnalyzerSet`] carries whichever of them are installed. A missing
//! analyzer is a normal condition: the affected modality degrades to absent.
//!
//! [`AnalyzerMode::Demo`] installs the deterministic stand-ins from [`demo`].
//! Nothing else in the workspace fabricates analysis output.

pub mod demo;

use async_trait::async_trait;
use emotion_common::{EmotionDistribution, SentimentVerdict};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Analyzer errors
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Analyzer unavailable: {0}")]
    Unavailable(String),

    #[error("Analysis failed: {0}")]
    Failed(String),

    #[error("Analysis cancelled")]
    Cancelled,
}

/// Result type for analyzer calls
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Language hint for speech recognition
///
/// Callers pass a locale such as `zh-CN`; recognizers only take the two-letter
/// language code. An empty hint means auto-detect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageHint(String);

impl LanguageHint {
    pub const DEFAULT_LOCALE: &'static str = "zh-CN";

    pub fn new(locale: impl Into<String>) -> Self {
        Self(locale.into().trim().to_string())
    }

    /// Hint that lets the recognizer detect the language
    #[must_use]
    pub fn auto() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.0
    }

    /// Two-letter lowercase language code, `None` for auto-detect
    #[must_use]
    pub fn language_code(&self) -> Option<String> {
        let code: String = self
            .0
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .chars()
            .take(2)
            .collect();
        if code.is_empty() {
            None
        } else {
            Some(code.to_ascii_lowercase())
        }
    }
}

impl Default for LanguageHint {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LOCALE)
    }
}

impl fmt::Display for LanguageHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("auto")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Outcome of running face emotion detection on one frame
#[derive(Debug, Clone, PartialEq)]
pub enum FaceDetection {
    /// A face was found; scores for the most prominent face
    Face(EmotionDistribution),
    /// The frame contains no detectable face
    NoFace,
}

/// Speech-to-text
#[async_trait]
pub trait Transcriber: Send + Sync {
    fn name(&self) -> &str;

    /// Transcribe an audio file
    async fn transcribe(
        &self,
        audio: &Path,
        language: &LanguageHint,
        cancel: &CancellationToken,
    ) -> Result<String>;
}

/// Five-class text sentiment
#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, text: &str, cancel: &CancellationToken) -> Result<SentimentVerdict>;
}

/// Facial emotion recognition on a single frame
#[async_trait]
pub trait FaceEmotionDetector: Send + Sync {
    fn name(&self) -> &str;

    async fn detect(&self, frame: &DynamicImage, cancel: &CancellationToken)
        -> Result<FaceDetection>;
}

/// How analyzers are provisioned when no real model is installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerMode {
    /// Missing analyzers stay missing; their modality degrades to absent
    #[default]
    Unavailable,
    /// Missing analyzers are filled with deterministic demo stand-ins
    Demo,
}

impl AnalyzerMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerMode::Unavailable => "unavailable",
            AnalyzerMode::Demo => "demo",
        }
    }
}

impl std::str::FromStr for AnalyzerMode {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unavailable" | "none" | "" => Ok(AnalyzerMode::Unavailable),
            "demo" => Ok(AnalyzerMode::Demo),
            other => Err(AnalyzerError::Failed(format!(
                "Unknown analyzer mode: {other}"
            ))),
        }
    }
}

/// Readiness of the installed analyzers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerStatus {
    pub mode: AnalyzerMode,
    pub speech_recognition: bool,
    pub text_sentiment: bool,
    pub face_emotion: bool,
}

impl AnalyzerStatus {
    /// True when every modality has an analyzer
    #[must_use]
    pub fn all_ready(&self) -> bool {
        self.speech_recognition && self.text_sentiment && self.face_emotion
    }
}

/// The analyzers available to a pipeline
#[derive(Clone, Default)]
pub struct AnalyzerSet {
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub classifier: Option<Arc<dyn SentimentClassifier>>,
    pub face_detector: Option<Arc<dyn FaceEmotionDetector>>,
    mode: AnalyzerMode,
}

impl AnalyzerSet {
    /// No analyzers installed
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Analyzers for the given mode with nothing else installed
    #[must_use]
    pub fn for_mode(mode: AnalyzerMode) -> Self {
        Self::empty().with_mode(mode)
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn SentimentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_face_detector(mut self, detector: Arc<dyn FaceEmotionDetector>) -> Self {
        self.face_detector = Some(detector);
        self
    }

    /// Switch mode; in demo mode any empty slot gets its demo stand-in
    #[must_use]
    pub fn with_mode(mut self, mode: AnalyzerMode) -> Self {
        self.mode = mode;
        if mode == AnalyzerMode::Demo {
            if self.transcriber.is_none() {
                self.transcriber = Some(Arc::new(demo::DemoTranscriber));
            }
            if self.classifier.is_none() {
                self.classifier = Some(Arc::new(demo::KeywordSentiment));
            }
            if self.face_detector.is_none() {
                self.face_detector = Some(Arc::new(demo::BrightnessFaceDetector));
            }
        }
        self
    }

    #[must_use]
    pub fn mode(&self) -> AnalyzerMode {
        self.mode
    }

    #[must_use]
    pub fn status(&self) -> AnalyzerStatus {
        AnalyzerStatus {
            mode: self.mode,
            speech_recognition: self.transcriber.is_some(),
            text_sentiment: self.classifier.is_some(),
            face_emotion: self.face_detector.is_some(),
        }
    }
}

impl fmt::Debug for AnalyzerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerSet")
            .field("transcriber", &self.transcriber.as_ref().map(|t| t.name()))
            .field("classifier", &self.classifier.as_ref().map(|c| c.name()))
            .field(
                "face_detector",
                &self.face_detector.as_ref().map(|d| d.name()),
            )
            .field("mode", &self.mode)
            .finish()
    }
}
