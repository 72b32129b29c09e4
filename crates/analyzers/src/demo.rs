//! Deterministic stand-in analyzers for [`AnalyzerMode::Demo`](crate::AnalyzerMode::Demo)
//!
//! These produce plausible output without any model so the service can be
//! exercised end to end. Results derived from them are always labelled as
//! demo output by the orchestrator.

use crate::{
    AnalyzerError, FaceDetection, FaceEmotionDetector, LanguageHint, Result, SentimentClassifier,
    Transcriber,
};
use async_trait::async_trait;
use emotion_common::{EmotionDistribution, EmotionLabel, SentimentClass, SentimentVerdict};
use image::DynamicImage;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const NEGATIVE_KEYWORDS: &[&str] = &[
    "不", "没", "难过", "伤心", "失望", "痛苦", "焦虑", "担心", "害怕", "讨厌", "生气", "烦",
    "sad", "angry", "hate", "bad", "terrible", "awful", "worried", "afraid",
];

const POSITIVE_KEYWORDS: &[&str] = &[
    "喜欢", "开心", "高兴", "快乐", "满意", "感谢", "幸福", "棒", "好", "爱",
    "happy", "glad", "love", "great", "good", "thanks", "wonderful", "excellent",
];

/// Score given to the predicted class; the rest is spread evenly
const PEAK_SCORE: f32 = 0.8;

/// Keyword-counting sentiment classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordSentiment;

impl KeywordSentiment {
    /// Classify by counting positive and negative keywords
    #[must_use]
    pub fn classify_text(text: &str) -> SentimentVerdict {
        let lower = text.to_lowercase();
        let negative = NEGATIVE_KEYWORDS
            .iter()
            .filter(|word| lower.contains(*word))
            .count() as i64;
        let positive = POSITIVE_KEYWORDS
            .iter()
            .filter(|word| lower.contains(*word))
            .count() as i64;

        let class = match positive - negative {
            d if d <= -3 => SentimentClass::VeryNegative,
            d if d < 0 => SentimentClass::Negative,
            0 => SentimentClass::Neutral,
            1 => SentimentClass::Positive,
            _ => SentimentClass::VeryPositive,
        };

        let rest = (1.0 - PEAK_SCORE) / 4.0;
        let mut probabilities = [rest; 5];
        probabilities[class.index()] = PEAK_SCORE;
        SentimentVerdict::new(class, probabilities)
    }
}

#[async_trait]
impl SentimentClassifier for KeywordSentiment {
    fn name(&self) -> &str {
        "demo-keyword-sentiment"
    }

    async fn classify(&self, text: &str, cancel: &CancellationToken) -> Result<SentimentVerdict> {
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }
        let verdict = Self::classify_text(text);
        debug!(
            "Demo sentiment for {} chars: {}",
            text.chars().count(),
            verdict.class.as_str()
        );
        Ok(verdict)
    }
}

/// Transcriber that returns a fixed sentence for any audio that exists
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoTranscriber;

impl DemoTranscriber {
    pub const TRANSCRIPT_ZH: &'static str = "今天天气很好，我很开心。";
    pub const TRANSCRIPT_EN: &'static str = "The weather is nice today and I am happy.";
}

#[async_trait]
impl Transcriber for DemoTranscriber {
    fn name(&self) -> &str {
        "demo-transcriber"
    }

    async fn transcribe(
        &self,
        audio: &Path,
        language: &LanguageHint,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }
        if !tokio::fs::try_exists(audio).await.unwrap_or(false) {
            return Err(AnalyzerError::Failed(format!(
                "Audio file not found: {}",
                audio.display()
            )));
        }
        let transcript = match language.language_code().as_deref() {
            Some("en") => Self::TRANSCRIPT_EN,
            _ => Self::TRANSCRIPT_ZH,
        };
        Ok(transcript.to_string())
    }
}

/// Face detector driven by frame brightness
///
/// A frame with no luminance variation is treated as containing no face.
/// Otherwise bright frames read as happy, dark frames as sad, and anything in
/// between as neutral.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrightnessFaceDetector;

impl BrightnessFaceDetector {
    #[must_use]
    pub fn detect_frame(frame: &DynamicImage) -> FaceDetection {
        let luma = frame.to_luma8();
        let mut min = u8::MAX;
        let mut max = u8::MIN;
        let mut sum: u64 = 0;
        for pixel in luma.pixels() {
            let value = pixel.0[0];
            min = min.min(value);
            max = max.max(value);
            sum += u64::from(value);
        }

        let count = u64::from(luma.width()) * u64::from(luma.height());
        if count == 0 || min == max {
            return FaceDetection::NoFace;
        }

        let mean = sum as f32 / count as f32 / 255.0;
        let dominant = if mean > 0.6 {
            EmotionLabel::Happy
        } else if mean < 0.3 {
            EmotionLabel::Sad
        } else {
            EmotionLabel::Neutral
        };

        let rest = 0.4 / 6.0;
        let distribution = EmotionDistribution::from_scores(
            EmotionLabel::ALL
                .iter()
                .map(|&label| (label, if label == dominant { 0.6 } else { rest })),
        );
        FaceDetection::Face(distribution)
    }
}

#[async_trait]
impl FaceEmotionDetector for BrightnessFaceDetector {
    fn name(&self) -> &str {
        "demo-brightness-face"
    }

    async fn detect(
        &self,
        frame: &DynamicImage,
        cancel: &CancellationToken,
    ) -> Result<FaceDetection> {
        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }
        Ok(Self::detect_frame(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn gradient(base: u8) -> DynamicImage {
        let img = GrayImage::from_fn(16, 16, |x, _| Luma([base.saturating_add(x as u8)]));
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_keyword_sentiment_classes() {
        assert_eq!(
            KeywordSentiment::classify_text("今天很开心").class,
            SentimentClass::Positive
        );
        assert_eq!(
            KeywordSentiment::classify_text("I love this, great and wonderful").class,
            SentimentClass::VeryPositive
        );
        assert_eq!(
            KeywordSentiment::classify_text("我很难过").class,
            SentimentClass::Negative
        );
        assert_eq!(
            KeywordSentiment::classify_text("sad, angry and worried").class,
            SentimentClass::VeryNegative
        );
        assert_eq!(
            KeywordSentiment::classify_text("桌子上有一本书").class,
            SentimentClass::Neutral
        );
    }

    #[test]
    fn test_keyword_sentiment_is_deterministic() {
        let a = KeywordSentiment::classify_text("我喜欢这个");
        let b = KeywordSentiment::classify_text("我喜欢这个");
        assert_eq!(a, b);
        assert!((a.scores.to_array().iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_uniform_frame_has_no_face() {
        let flat = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([128])));
        assert_eq!(
            BrightnessFaceDetector::detect_frame(&flat),
            FaceDetection::NoFace
        );
    }

    #[test]
    fn test_brightness_selects_emotion() {
        let dominant = |img: &DynamicImage| match BrightnessFaceDetector::detect_frame(img) {
            FaceDetection::Face(d) => d.dominant(),
            FaceDetection::NoFace => panic!("expected a face"),
        };
        assert_eq!(dominant(&gradient(220)), EmotionLabel::Happy);
        assert_eq!(dominant(&gradient(10)), EmotionLabel::Sad);
        assert_eq!(dominant(&gradient(110)), EmotionLabel::Neutral);
    }

    #[tokio::test]
    async fn test_cancelled_calls_fail() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = KeywordSentiment.classify("好", &cancel).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Cancelled));
    }

    #[tokio::test]
    async fn test_demo_transcriber_follows_language() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let file = file.path();
        let cancel = CancellationToken::new();
        let en = DemoTranscriber
            .transcribe(file, &LanguageHint::new("en-US"), &cancel)
            .await
            .unwrap();
        assert_eq!(en, DemoTranscriber::TRANSCRIPT_EN);
        let zh = DemoTranscriber
            .transcribe(file, &LanguageHint::default(), &cancel)
            .await
            .unwrap();
        assert_eq!(zh, DemoTranscriber::TRANSCRIPT_ZH);
    }

    #[tokio::test]
    async fn test_demo_transcriber_missing_audio() {
        let err = DemoTranscriber
            .transcribe(
                Path::new("/no/such/audio.wav"),
                &LanguageHint::default(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Failed(_)));
    }
}
