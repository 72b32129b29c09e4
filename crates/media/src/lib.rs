//! Media boundary for the analysis pipeline
//!
//! Everything the pipeline needs from a video container goes through
//! [`MediaBackend`]: metadata probing, audio track extraction, and decoding
//! single frames by index. The production backend shells out to the FFmpeg
//! command-line tools; tests substitute in-memory fakes.

pub mod ffmpeg;
pub mod probe;
pub mod scratch;

use async_trait::async_trait;
use emotion_common::{Result, VideoInfo};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use ffmpeg::{FfmpegBackend, MediaConfig};
pub use probe::{MediaInfo, StreamInfo, StreamType};
pub use scratch::ScratchDir;

/// Access to the contents of a video container
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Backend identifier (for logs)
    fn name(&self) -> &str;

    /// Read container metadata
    ///
    /// Fails with an input error when the file cannot be opened as a video.
    async fn probe(&self, video: &Path) -> Result<VideoInfo>;

    /// Extract the audio track to `output` (extension is chosen by the backend)
    ///
    /// Returns the path actually written. Fails with
    /// [`emotion_common::ProcessingError::NoAudioStream`] when there is no audio.
    async fn extract_audio(&self, video: &Path, output: &Path) -> Result<PathBuf>;

    /// Decode the frame at `index` (0-based, in presentation order)
    async fn read_frame(&self, video: &Path, index: u64) -> Result<DynamicImage>;

    /// Decode several frames, one entry per requested index in request order
    ///
    /// A frame that cannot be decoded is an `Err` entry and does not affect the
    /// others. The outer error means the backend could not run at all.
    /// Backends that can decode in one pass should override this.
    async fn read_frames(
        &self,
        video: &Path,
        indices: &[u64],
    ) -> Result<Vec<Result<DynamicImage>>> {
        let mut frames = Vec::with_capacity(indices.len());
        for &index in indices {
            frames.push(self.read_frame(video, index).await);
        }
        Ok(frames)
    }
}

/// Audio extraction configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Target sample rate (16000 for speech models)
    pub sample_rate: u32,
    /// Number of channels (1 for mono, 2 for stereo)
    pub channels: u8,
    /// Apply EBU R128 normalization to -23 LUFS
    pub normalize: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            normalize: false,
        }
    }
}

impl AudioConfig {
    /// Create config for speech recognition with loudness normalization
    #[must_use]
    pub fn for_speech() -> Self {
        Self {
            normalize: true,
            ..Self::default()
        }
    }
}
