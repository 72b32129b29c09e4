//! Frame sampling and per-frame emotion aggregation
//!
//! A video is never analyzed frame by frame. [`select_indices`] picks an evenly
//! spaced, deterministic subset of frame indices, and [`aggregate`] averages the
//! facial emotion scores of those frames that actually contained a face.

use emotion_common::{EmotionDistribution, EmotionLabel};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Number of frames analyzed per video unless configured otherwise
pub const DEFAULT_SAMPLE_BUDGET: usize = 20;

/// Select which frame indices to analyze
///
/// Videos with at most `budget` frames are analyzed exhaustively. Longer videos
/// get exactly `budget` indices `floor(i * total / budget)`, which are strictly
/// increasing and all below `total`. A zero budget selects nothing.
#[must_use]
pub fn select_indices(total_frames: u64, budget: usize) -> Vec<u64> {
    if budget == 0 {
        return Vec::new();
    }
    let budget_frames = budget as u64;
    if total_frames <= budget_frames {
        return (0..total_frames).collect();
    }

    // u128 keeps i * total from overflowing for absurd frame counts
    let total = u128::from(total_frames);
    let budget = u128::from(budget_frames);
    (0..budget)
        .map(|i| (i * total / budget) as u64)
        .collect()
}

/// Result of aggregating the sampled frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FaceAggregate {
    /// Mean distribution over the frames in which a face was detected
    Detected {
        distribution: EmotionDistribution,
        dominant_emotion: EmotionLabel,
        frames_with_face: usize,
    },
    /// No sampled frame contained a face
    NoDetection,
}

impl FaceAggregate {
    #[must_use]
    pub fn distribution(&self) -> Option<&EmotionDistribution> {
        match self {
            FaceAggregate::Detected { distribution, .. } => Some(distribution),
            FaceAggregate::NoDetection => None,
        }
    }
}

/// Per-label arithmetic mean over frames that yielded a detection
///
/// Frames without a face must be filtered out by the caller (they are not
/// zeros). An empty input is the explicit no-detection outcome.
#[must_use]
pub fn aggregate<'a, I>(detections: I) -> FaceAggregate
where
    I: IntoIterator<Item = &'a EmotionDistribution>,
{
    let mut sums = [0.0f64; EmotionLabel::ALL.len()];
    let mut count = 0usize;

    for distribution in detections {
        for (slot, label) in sums.iter_mut().zip(EmotionLabel::ALL) {
            *slot += f64::from(distribution.get(label));
        }
        count += 1;
    }

    if count == 0 {
        return FaceAggregate::NoDetection;
    }

    let distribution = EmotionDistribution::from_scores(
        EmotionLabel::ALL
            .into_iter()
            .zip(sums)
            .map(|(label, sum)| (label, (sum / count as f64) as f32)),
    );
    let dominant_emotion = distribution.dominant();
    debug!(
        "Aggregated {} face detections, dominant={}",
        count, dominant_emotion
    );

    FaceAggregate::Detected {
        distribution,
        dominant_emotion,
        frames_with_face: count,
    }
}

/// Counters for one sampling pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTally {
    /// Indices selected for analysis
    pub sampled: usize,
    /// Frames in which a face was found
    pub with_face: usize,
    /// Frames decoded and analyzed but without a face
    pub without_face: usize,
    /// Frames skipped because decoding or detection failed
    pub failed: usize,
}

impl FrameTally {
    #[must_use]
    pub fn new(sampled: usize) -> Self {
        Self {
            sampled,
            ..Self::default()
        }
    }

    /// Frames that reached a verdict (face or no face)
    #[must_use]
    pub fn analyzed(&self) -> usize {
        self.with_face + self.without_face
    }
}
