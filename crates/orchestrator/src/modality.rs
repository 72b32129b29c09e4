//! Single-modality analyses (text, speech) shared by the video pipeline

use crate::error::PipelineError;
use crate::result::{SpeechAnalysis, SpeechOutcome, TextAnalysis};
use emotion_analyzers::{AnalyzerMode, AnalyzerSet, LanguageHint};
use emotion_fusion::{fuse, FusionConfig};
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub(crate) const DEMO_WARNING: &str = "demo analyzers in use: results are not real model output";

/// Await `fut` unless `cancel` fires first
pub(crate) async fn with_cancel<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        value = fut => Ok(value),
    }
}

pub(crate) fn mode_warnings(mode: AnalyzerMode) -> Vec<String> {
    match mode {
        AnalyzerMode::Demo => vec![DEMO_WARNING.to_string()],
        AnalyzerMode::Unavailable => Vec::new(),
    }
}

/// Transcription step outcome
pub(crate) enum Transcript {
    Text(String),
    /// Speech slot is final; nothing to classify
    Missing(SpeechOutcome),
}

pub(crate) async fn run_transcriber(
    analyzers: &AnalyzerSet,
    audio: &Path,
    language: &LanguageHint,
    cancel: &CancellationToken,
) -> Result<Transcript, PipelineError> {
    let Some(transcriber) = analyzers.transcriber.as_ref() else {
        return Ok(Transcript::Missing(SpeechOutcome::Unavailable));
    };

    match with_cancel(cancel, transcriber.transcribe(audio, language, cancel)).await? {
        Ok(text) => {
            let text = text.trim();
            if text.is_empty() {
                Ok(Transcript::Missing(SpeechOutcome::NoSpeech))
            } else {
                debug!("Transcribed {} characters", text.chars().count());
                Ok(Transcript::Text(text.to_string()))
            }
        }
        Err(emotion_analyzers::AnalyzerError::Cancelled) => Err(PipelineError::Cancelled),
        Err(e) => {
            warn!("Transcription with {} failed: {}", transcriber.name(), e);
            Ok(Transcript::Missing(SpeechOutcome::Failed {
                error: e.to_string(),
            }))
        }
    }
}

pub(crate) async fn run_classifier(
    analyzers: &AnalyzerSet,
    transcript: String,
    cancel: &CancellationToken,
) -> Result<SpeechOutcome, PipelineError> {
    let Some(classifier) = analyzers.classifier.as_ref() else {
        return Ok(SpeechOutcome::TranscribedOnly {
            transcript,
            error: "text sentiment analyzer unavailable".to_string(),
        });
    };

    match with_cancel(cancel, classifier.classify(&transcript, cancel)).await? {
        Ok(sentiment) => Ok(SpeechOutcome::Analyzed {
            transcript,
            sentiment,
        }),
        Err(emotion_analyzers::AnalyzerError::Cancelled) => Err(PipelineError::Cancelled),
        Err(e) => {
            warn!("Sentiment classification with {} failed: {}", classifier.name(), e);
            Ok(SpeechOutcome::TranscribedOnly {
                transcript,
                error: e.to_string(),
            })
        }
    }
}

/// Classify a piece of text and derive its emotion
pub async fn analyze_text(
    analyzers: &AnalyzerSet,
    fusion: &FusionConfig,
    text: &str,
    cancel: &CancellationToken,
) -> Result<TextAnalysis, PipelineError> {
    let start = Instant::now();
    let text = text.trim();
    if text.is_empty() {
        return Err(PipelineError::EmptyText);
    }

    let classifier = analyzers
        .classifier
        .as_ref()
        .ok_or(PipelineError::AnalyzerUnavailable("text sentiment"))?;
    let sentiment = with_cancel(cancel, classifier.classify(text, cancel)).await??;
    let fusion = fuse(fusion, None, Some(&sentiment));

    info!(
        "Text analysis: {} chars → {} ({})",
        text.chars().count(),
        sentiment.class.as_str(),
        fusion.dominant_name()
    );

    Ok(TextAnalysis {
        sentiment,
        fusion,
        analyzer_mode: analyzers.mode(),
        warnings: mode_warnings(analyzers.mode()),
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}

/// Transcribe an audio file and classify the transcript
///
/// A classification failure still returns the transcript, with the failure in
/// `sentiment_error`.
pub async fn analyze_audio(
    analyzers: &AnalyzerSet,
    fusion: &FusionConfig,
    audio: &Path,
    language: &LanguageHint,
    cancel: &CancellationToken,
) -> Result<SpeechAnalysis, PipelineError> {
    let start = Instant::now();
    if !tokio::fs::try_exists(audio).await.unwrap_or(false) {
        return Err(PipelineError::InvalidInput(format!(
            "audio file not found: {}",
            audio.display()
        )));
    }
    if analyzers.transcriber.is_none() {
        return Err(PipelineError::AnalyzerUnavailable("speech recognition"));
    }

    let outcome = match run_transcriber(analyzers, audio, language, cancel).await? {
        Transcript::Text(transcript) => run_classifier(analyzers, transcript, cancel).await?,
        Transcript::Missing(SpeechOutcome::Failed { error }) => {
            return Err(PipelineError::AnalysisFailed(error));
        }
        Transcript::Missing(outcome) => outcome,
    };

    let mut warnings = mode_warnings(analyzers.mode());
    warnings.extend(outcome.warning());

    let (transcript, sentiment, sentiment_error) = match outcome {
        SpeechOutcome::Analyzed {
            transcript,
            sentiment,
        } => (transcript, Some(sentiment), None),
        SpeechOutcome::TranscribedOnly { transcript, error } => (transcript, None, Some(error)),
        _ => (String::new(), None, Some("no speech recognized".to_string())),
    };
    let fusion = sentiment.as_ref().map(|s| fuse(fusion, None, Some(s)));

    info!(
        "Audio analysis of {}: {} chars, sentiment={}",
        audio.display(),
        transcript.chars().count(),
        sentiment.map_or("none", |s| s.class.as_str())
    );

    Ok(SpeechAnalysis {
        transcript,
        language: language.to_string(),
        sentiment,
        sentiment_error,
        fusion,
        analyzer_mode: analyzers.mode(),
        warnings,
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotion_analyzers::{AnalyzerError, SentimentClassifier};
    use emotion_common::{EmotionLabel, SentimentClass, SentimentVerdict};
    use emotion_fusion::FusionSource;
    use std::sync::Arc;

    struct FailingClassifier;

    #[async_trait::async_trait]
    impl SentimentClassifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        async fn classify(
            &self,
            _text: &str,
            _cancel: &CancellationToken,
        ) -> emotion_analyzers::Result<SentimentVerdict> {
            Err(AnalyzerError::Failed("model crashed".to_string()))
        }
    }

    #[tokio::test]
    async fn test_analyze_text_rejects_empty() {
        let analyzers = AnalyzerSet::for_mode(AnalyzerMode::Demo);
        let err = analyze_text(&analyzers, &FusionConfig::default(), "   ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyText));
    }

    #[tokio::test]
    async fn test_analyze_text_demo() {
        let analyzers = AnalyzerSet::for_mode(AnalyzerMode::Demo);
        let analysis = analyze_text(
            &analyzers,
            &FusionConfig::default(),
            "今天很开心",
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(analysis.sentiment.class, SentimentClass::Positive);
        assert_eq!(analysis.fusion.source, FusionSource::Text);
        assert_eq!(analysis.fusion.dominant_emotion, Some(EmotionLabel::Happy));
        assert_eq!(analysis.fusion.confidence, 0.8);
        assert_eq!(analysis.analyzer_mode, AnalyzerMode::Demo);
        assert_eq!(analysis.warnings, vec![DEMO_WARNING.to_string()]);
    }

    #[tokio::test]
    async fn test_analyze_text_without_classifier() {
        let err = analyze_text(
            &AnalyzerSet::empty(),
            &FusionConfig::default(),
            "hello",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::AnalyzerUnavailable(_)));
    }

    #[tokio::test]
    async fn test_analyze_audio_keeps_transcript_when_classifier_fails() {
        let audio = tempfile::NamedTempFile::new().unwrap();
        let analyzers = AnalyzerSet::empty()
            .with_classifier(Arc::new(FailingClassifier))
            .with_mode(AnalyzerMode::Demo);

        let analysis = analyze_audio(
            &analyzers,
            &FusionConfig::default(),
            audio.path(),
            &LanguageHint::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(!analysis.transcript.is_empty());
        assert!(analysis.sentiment.is_none());
        assert!(analysis.fusion.is_none());
        assert!(analysis
            .sentiment_error
            .as_deref()
            .unwrap()
            .contains("model crashed"));
        assert_eq!(analysis.language, "zh-CN");
    }

    #[tokio::test]
    async fn test_analyze_audio_missing_file() {
        let err = analyze_audio(
            &AnalyzerSet::for_mode(AnalyzerMode::Demo),
            &FusionConfig::default(),
            Path::new("/missing/audio.wav"),
            &LanguageHint::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.is_input_error());
    }

    #[tokio::test]
    async fn test_cancelled_before_classification() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = analyze_text(
            &AnalyzerSet::for_mode(AnalyzerMode::Demo),
            &FusionConfig::default(),
            "好",
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled));
    }
}
