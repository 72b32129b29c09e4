//! Emotion Analysis Orchestrator
//!
//! Coordinates multi-modal emotion analysis: the video pipeline, the task
//! registry and the background task runner, behind one [`Orchestrator`] facade
//! used by the transport layer.
//!
//! ## Architecture
//!
//! 1. **Registry**: concurrency-safe task store ([`TaskRegistry`])
//! 2. **Runner**: bounded background execution of video tasks ([`TaskRunner`])
//! 3. **Pipeline**: staged analysis of one video with per-stage degradation ([`VideoPipeline`])
//! 4. **Modalities**: standalone text and audio analysis

pub mod error;
pub mod modality;
pub mod pipeline;
pub mod registry;
pub mod result;
pub mod runner;

pub use error::{PipelineError, RegistryError, SubmitError};
pub use pipeline::{PipelineConfig, PipelineStage, VideoPipeline};
pub use registry::{
    EvictionConfig, TaskCounts, TaskId, TaskRegistry, TaskSnapshot, TaskStatus,
};
pub use result::{
    FaceOutcome, SpeechAnalysis, SpeechOutcome, StageTimings, TextAnalysis, VideoAnalysisResult,
};
pub use runner::{RunnerConfig, TaskRunner};

use emotion_analyzers::{AnalyzerSet, AnalyzerStatus, LanguageHint};
use emotion_frame_sampler::DEFAULT_SAMPLE_BUDGET;
use emotion_fusion::FusionConfig;
use emotion_media::{MediaBackend, ScratchDir};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Frames sampled per video
    pub frame_budget: usize,
    /// Video pipelines running at once
    pub max_concurrent_tasks: usize,
    /// Tasks admitted but not finished before submissions are rejected
    pub max_pending_tasks: usize,
    /// Parent directory for per-task scratch space
    pub scratch_dir: Option<PathBuf>,
    pub eviction: EvictionConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            frame_budget: DEFAULT_SAMPLE_BUDGET,
            max_concurrent_tasks: 4,
            max_pending_tasks: 64,
            scratch_dir: None,
            eviction: EvictionConfig::default(),
        }
    }
}

/// Entry point for all analysis operations
#[derive(Clone)]
pub struct Orchestrator {
    pipeline: Arc<VideoPipeline>,
    runner: TaskRunner,
    fusion: FusionConfig,
    scratch_dir: Option<PathBuf>,
}

impl Orchestrator {
    /// Create an orchestrator with its own task registry
    pub fn new(
        config: OrchestratorConfig,
        fusion: FusionConfig,
        media: Arc<dyn MediaBackend>,
        analyzers: AnalyzerSet,
    ) -> Self {
        let registry = TaskRegistry::new(config.eviction);
        Self::with_registry(config, fusion, media, analyzers, registry)
    }

    /// Create an orchestrator around an existing registry
    pub fn with_registry(
        config: OrchestratorConfig,
        fusion: FusionConfig,
        media: Arc<dyn MediaBackend>,
        analyzers: AnalyzerSet,
        registry: TaskRegistry,
    ) -> Self {
        info!(
            "Creating orchestrator: media={}, analyzers={:?}, frame_budget={}, max_concurrent={}",
            media.name(),
            analyzers,
            config.frame_budget,
            config.max_concurrent_tasks
        );

        let pipeline = Arc::new(VideoPipeline::new(
            media,
            analyzers,
            PipelineConfig {
                frame_budget: config.frame_budget,
                fusion,
            },
        ));
        let runner = TaskRunner::new(
            registry,
            Arc::clone(&pipeline),
            RunnerConfig {
                max_concurrent: config.max_concurrent_tasks,
                max_pending: config.max_pending_tasks,
                scratch_root: config.scratch_dir.clone(),
            },
        );

        Self {
            pipeline,
            runner,
            fusion,
            scratch_dir: config.scratch_dir,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &TaskRegistry {
        self.runner.registry()
    }

    #[must_use]
    pub fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Start analyzing a video in the background
    pub fn submit_video_task(
        &self,
        video: impl Into<PathBuf>,
        language: LanguageHint,
    ) -> Result<TaskId, SubmitError> {
        self.runner.submit(video.into(), language)
    }

    /// Current state of a task
    pub fn task_status(&self, id: &TaskId) -> Result<TaskSnapshot, RegistryError> {
        self.registry().get(id)
    }

    /// Analyze a video and wait for the result
    pub async fn analyze_video(
        &self,
        video: &Path,
        language: &LanguageHint,
    ) -> Result<VideoAnalysisResult, PipelineError> {
        let scratch = ScratchDir::new_in(self.scratch_dir.as_deref(), "emotion-sync-")
            .map_err(|e| PipelineError::Internal(format!("scratch dir: {e}")))?;
        let cancel = self.runner.shutdown_token().child_token();
        self.pipeline.run(video, language, &scratch, &cancel).await
    }

    /// Classify text sentiment and derive its emotion
    pub async fn analyze_text(&self, text: &str) -> Result<TextAnalysis, PipelineError> {
        let cancel = self.runner.shutdown_token().child_token();
        modality::analyze_text(self.pipeline.analyzers(), &self.fusion, text, &cancel).await
    }

    /// Transcribe an audio file and classify the transcript
    pub async fn analyze_audio(
        &self,
        audio: &Path,
        language: &LanguageHint,
    ) -> Result<SpeechAnalysis, PipelineError> {
        let cancel = self.runner.shutdown_token().child_token();
        modality::analyze_audio(
            self.pipeline.analyzers(),
            &self.fusion,
            audio,
            language,
            &cancel,
        )
        .await
    }

    #[must_use]
    pub fn analyzer_status(&self) -> AnalyzerStatus {
        self.pipeline.analyzers().status()
    }

    /// Start the background eviction sweeper
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        self.runner.spawn_sweeper()
    }

    /// Cancel in-flight work and wait for every task to reach a terminal state
    pub async fn shutdown(&self) {
        self.runner.shutdown().await;
    }
}
