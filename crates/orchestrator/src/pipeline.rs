//! Video pipeline
//!
//! Sequences audio extraction, transcription, text sentiment, frame sampling,
//! face emotion and fusion for one video. Each stage degrades on its own; the
//! only hard failures are an unreadable input and cancellation.

use crate::error::PipelineError;
use crate::modality::{mode_warnings, run_classifier, run_transcriber, with_cancel, Transcript};
use crate::result::{FaceOutcome, SpeechOutcome, StageTimings, VideoAnalysisResult};
use emotion_analyzers::{AnalyzerError, AnalyzerSet, FaceDetection, LanguageHint};
use emotion_common::{EmotionDistribution, ProcessingError, VideoInfo};
use emotion_frame_sampler::{aggregate, select_indices, FrameTally, DEFAULT_SAMPLE_BUDGET};
use emotion_fusion::{fuse, FusionConfig};
use emotion_media::{MediaBackend, ScratchDir};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pipeline progress, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Started,
    AudioExtracted,
    Transcribed,
    TextAnalyzed,
    FramesSampled,
    FacesAnalyzed,
    Fused,
    Done,
}

impl PipelineStage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Started => "started",
            PipelineStage::AudioExtracted => "audio_extracted",
            PipelineStage::Transcribed => "transcribed",
            PipelineStage::TextAnalyzed => "text_analyzed",
            PipelineStage::FramesSampled => "frames_sampled",
            PipelineStage::FacesAnalyzed => "faces_analyzed",
            PipelineStage::Fused => "fused",
            PipelineStage::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Frames sampled per video
    pub frame_budget: usize,
    pub fusion: FusionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_budget: DEFAULT_SAMPLE_BUDGET,
            fusion: FusionConfig::default(),
        }
    }
}

/// Tracks the current stage and how long each one took
struct StageClock<'a> {
    video: &'a Path,
    stage: PipelineStage,
    stage_start: Instant,
}

impl<'a> StageClock<'a> {
    fn start(video: &'a Path) -> Self {
        debug!("Pipeline {} for {}", PipelineStage::Started, video.display());
        Self {
            video,
            stage: PipelineStage::Started,
            stage_start: Instant::now(),
        }
    }

    /// Move to `next`, returning elapsed milliseconds for the stage just finished
    fn advance(&mut self, next: PipelineStage) -> u64 {
        let elapsed = self.stage_start.elapsed().as_millis() as u64;
        debug!(
            "Pipeline {} → {} for {} ({}ms)",
            self.stage,
            next,
            self.video.display(),
            elapsed
        );
        self.stage = next;
        self.stage_start = Instant::now();
        elapsed
    }
}

/// Runs the full analysis of one video
pub struct VideoPipeline {
    media: Arc<dyn MediaBackend>,
    analyzers: AnalyzerSet,
    config: PipelineConfig,
}

impl VideoPipeline {
    pub fn new(media: Arc<dyn MediaBackend>, analyzers: AnalyzerSet, config: PipelineConfig) -> Self {
        Self {
            media,
            analyzers,
            config,
        }
    }

    #[must_use]
    pub fn analyzers(&self) -> &AnalyzerSet {
        &self.analyzers
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Analyze `video`, writing temporary artifacts into `scratch`
    pub async fn run(
        &self,
        video: &Path,
        language: &LanguageHint,
        scratch: &ScratchDir,
        cancel: &CancellationToken,
    ) -> Result<VideoAnalysisResult, PipelineError> {
        let start = Instant::now();
        let mut timings = StageTimings::default();

        info!(
            "Analyzing video {} (language={}, media={})",
            video.display(),
            language,
            self.media.name()
        );

        let probe_start = Instant::now();
        let video_info = with_cancel(cancel, self.media.probe(video))
            .await?
            .map_err(PipelineError::from_probe)?;
        timings.probe_ms = probe_start.elapsed().as_millis() as u64;

        // Metadata time is reported on its own
        let mut clock = StageClock::start(video);

        // Speech modality
        let audio = self.extract_audio(video, &video_info, scratch, cancel).await?;
        timings.audio_extraction_ms = clock.advance(PipelineStage::AudioExtracted);

        let transcript = match audio {
            Ok(audio_path) => run_transcriber(&self.analyzers, &audio_path, language, cancel).await?,
            Err(outcome) => Transcript::Missing(outcome),
        };
        timings.transcription_ms = clock.advance(PipelineStage::Transcribed);

        let speech = match transcript {
            Transcript::Text(text) => run_classifier(&self.analyzers, text, cancel).await?,
            Transcript::Missing(outcome) => outcome,
        };
        timings.text_analysis_ms = clock.advance(PipelineStage::TextAnalyzed);

        // Face modality
        let indices = if self.analyzers.face_detector.is_some() {
            select_indices(video_info.frame_count, self.config.frame_budget)
        } else {
            Vec::new()
        };
        clock.advance(PipelineStage::FramesSampled);

        let face = self.analyze_frames(video, &indices, cancel).await?;
        timings.frame_analysis_ms = clock.advance(PipelineStage::FacesAnalyzed);

        let fusion = fuse(&self.config.fusion, face.distribution(), speech.sentiment());
        timings.fusion_ms = clock.advance(PipelineStage::Fused);

        let mut warnings = mode_warnings(self.analyzers.mode());
        warnings.extend(speech.warning());
        warnings.extend(face.warning());
        let partial = !(face.is_success() && speech.is_success());

        clock.advance(PipelineStage::Done);
        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Video {} analyzed in {}ms: {} ({}, confidence {:.2}){}",
            video.display(),
            processing_time_ms,
            fusion.dominant_name(),
            fusion.source.as_str(),
            fusion.confidence,
            if partial { " [partial]" } else { "" }
        );

        Ok(VideoAnalysisResult {
            video_info,
            face,
            speech,
            fusion,
            partial,
            warnings,
            analyzer_mode: self.analyzers.mode(),
            timings,
            processing_time_ms,
        })
    }

    /// Extract the audio track, or the final speech outcome when there is none
    async fn extract_audio(
        &self,
        video: &Path,
        info: &VideoInfo,
        scratch: &ScratchDir,
        cancel: &CancellationToken,
    ) -> Result<Result<std::path::PathBuf, SpeechOutcome>, PipelineError> {
        if !info.has_audio {
            debug!("{} has no audio stream", video.display());
            return Ok(Err(SpeechOutcome::NoAudioTrack));
        }
        if self.analyzers.transcriber.is_none() {
            return Ok(Err(SpeechOutcome::Unavailable));
        }

        match with_cancel(cancel, self.media.extract_audio(video, &scratch.audio_path())).await? {
            Ok(path) => Ok(Ok(path)),
            Err(ProcessingError::NoAudioStream) => Ok(Err(SpeechOutcome::NoAudioTrack)),
            Err(ProcessingError::Cancelled) => Err(PipelineError::Cancelled),
            Err(e) => {
                warn!("Audio extraction failed for {}: {}", video.display(), e);
                Ok(Err(SpeechOutcome::Failed {
                    error: "audio extraction failed".to_string(),
                }))
            }
        }
    }

    /// Decode and analyze the sampled frames, skipping frames that fail
    async fn analyze_frames(
        &self,
        video: &Path,
        indices: &[u64],
        cancel: &CancellationToken,
    ) -> Result<FaceOutcome, PipelineError> {
        let Some(detector) = self.analyzers.face_detector.as_ref() else {
            return Ok(FaceOutcome::Unavailable);
        };

        let mut tally = FrameTally::new(indices.len());
        let mut detections: Vec<EmotionDistribution> = Vec::with_capacity(indices.len());
        if indices.is_empty() {
            return Ok(FaceOutcome::from_aggregate(aggregate(&detections), tally));
        }

        let frames = match with_cancel(cancel, self.media.read_frames(video, indices)).await? {
            Ok(frames) => frames,
            Err(ProcessingError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(e) => {
                warn!("Frame decoding failed for {}: {}", video.display(), e);
                Vec::new()
            }
        };
        // Indices the backend returned nothing for count as failed
        tally.failed += indices.len().saturating_sub(frames.len());

        for (&index, frame) in indices.iter().zip(frames) {
            let frame = match frame {
                Ok(frame) => frame,
                Err(ProcessingError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(e) => {
                    debug!("Skipping frame {}: {}", index, e);
                    tally.failed += 1;
                    continue;
                }
            };

            match with_cancel(cancel, detector.detect(&frame, cancel)).await? {
                Ok(FaceDetection::Face(distribution)) => {
                    tally.with_face += 1;
                    detections.push(distribution);
                }
                Ok(FaceDetection::NoFace) => tally.without_face += 1,
                Err(AnalyzerError::Cancelled) => return Err(PipelineError::Cancelled),
                Err(e) => {
                    debug!("Face analysis failed on frame {}: {}", index, e);
                    tally.failed += 1;
                }
            }
        }

        if tally.failed > 0 {
            warn!(
                "{} of {} sampled frames could not be analyzed in {}",
                tally.failed,
                tally.sampled,
                video.display()
            );
        }

        if tally.sampled > 0 && tally.analyzed() == 0 {
            return Ok(FaceOutcome::Failed {
                error: "no sampled frame could be analyzed".to_string(),
                frames: tally,
            });
        }

        Ok(FaceOutcome::from_aggregate(aggregate(&detections), tally))
    }
}
