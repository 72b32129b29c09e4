//! Facial emotion labels and per-label probability distributions.
//!
//! The label set is fixed (angry, disgust, fear, happy, sad, surprise,
//! neutral). Declaration order doubles as the tie-break priority when two
//! labels share the highest probability.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire name used when no emotion could be determined
pub const UNKNOWN_EMOTION: &str = "unknown";

/// Chinese display name for [`UNKNOWN_EMOTION`]
pub const UNKNOWN_EMOTION_ZH: &str = "未知";

/// Emotion classes in tie-break priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl EmotionLabel {
    /// All labels, in tie-break priority order
    pub const ALL: [EmotionLabel; 7] = [
        EmotionLabel::Angry,
        EmotionLabel::Disgust,
        EmotionLabel::Fear,
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Surprise,
        EmotionLabel::Neutral,
    ];

    /// Get emotion label as string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Angry => "angry",
            EmotionLabel::Disgust => "disgust",
            EmotionLabel::Fear => "fear",
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Surprise => "surprise",
            EmotionLabel::Neutral => "neutral",
        }
    }

    /// Chinese display name
    #[must_use]
    pub fn zh_name(&self) -> &'static str {
        match self {
            EmotionLabel::Angry => "愤怒",
            EmotionLabel::Disgust => "厌恶",
            EmotionLabel::Fear => "恐惧",
            EmotionLabel::Happy => "快乐",
            EmotionLabel::Sad => "悲伤",
            EmotionLabel::Surprise => "惊讶",
            EmotionLabel::Neutral => "中性",
        }
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a detector emits a label outside the fixed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown emotion label: {0}")]
pub struct UnknownEmotionLabel(pub String);

impl FromStr for EmotionLabel {
    type Err = UnknownEmotionLabel;

    /// Accepts both the short labels and the FER+ style nouns
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "angry" | "anger" => Ok(EmotionLabel::Angry),
            "disgust" => Ok(EmotionLabel::Disgust),
            "fear" => Ok(EmotionLabel::Fear),
            "happy" | "happiness" => Ok(EmotionLabel::Happy),
            "sad" | "sadness" => Ok(EmotionLabel::Sad),
            "surprise" => Ok(EmotionLabel::Surprise),
            "neutral" => Ok(EmotionLabel::Neutral),
            other => Err(UnknownEmotionLabel(other.to_string())),
        }
    }
}

/// Probability per emotion label
///
/// Values are expected in `[0, 1]` and to sum to roughly one, but neither is
/// enforced: detectors differ in how carefully they normalize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionDistribution {
    #[serde(default)]
    pub angry: f32,
    #[serde(default)]
    pub disgust: f32,
    #[serde(default)]
    pub fear: f32,
    #[serde(default)]
    pub happy: f32,
    #[serde(default)]
    pub sad: f32,
    #[serde(default)]
    pub surprise: f32,
    #[serde(default)]
    pub neutral: f32,
}

impl EmotionDistribution {
    /// Build a distribution from `(label, probability)` pairs; missing labels are 0.0
    pub fn from_scores<I>(scores: I) -> Self
    where
        I: IntoIterator<Item = (EmotionLabel, f32)>,
    {
        let mut distribution = Self::default();
        for (label, score) in scores {
            distribution.set(label, score);
        }
        distribution
    }

    /// Build a distribution from raw model logits (softmax over the fixed label order)
    #[must_use]
    pub fn from_logits(logits: &[f32; 7]) -> Self {
        let probabilities = softmax(logits);
        Self::from_scores(EmotionLabel::ALL.into_iter().zip(probabilities))
    }

    /// Probability for a label
    #[must_use]
    pub fn get(&self, label: EmotionLabel) -> f32 {
        match label {
            EmotionLabel::Angry => self.angry,
            EmotionLabel::Disgust => self.disgust,
            EmotionLabel::Fear => self.fear,
            EmotionLabel::Happy => self.happy,
            EmotionLabel::Sad => self.sad,
            EmotionLabel::Surprise => self.surprise,
            EmotionLabel::Neutral => self.neutral,
        }
    }

    /// Set the probability for a label
    pub fn set(&mut self, label: EmotionLabel, score: f32) {
        let slot = match label {
            EmotionLabel::Angry => &mut self.angry,
            EmotionLabel::Disgust => &mut self.disgust,
            EmotionLabel::Fear => &mut self.fear,
            EmotionLabel::Happy => &mut self.happy,
            EmotionLabel::Sad => &mut self.sad,
            EmotionLabel::Surprise => &mut self.surprise,
            EmotionLabel::Neutral => &mut self.neutral,
        };
        *slot = score;
    }

    /// Iterate `(label, probability)` in priority order
    pub fn iter(&self) -> impl Iterator<Item = (EmotionLabel, f32)> + '_ {
        EmotionLabel::ALL.into_iter().map(|label| (label, self.get(label)))
    }

    /// Highest-probability label; on ties the earliest label in priority order wins
    #[must_use]
    pub fn dominant(&self) -> EmotionLabel {
        let mut best = EmotionLabel::ALL[0];
        let mut best_score = self.get(best);
        for (label, score) in self.iter().skip(1) {
            if score > best_score {
                best = label;
                best_score = score;
            }
        }
        best
    }

    /// Sum of all probabilities
    #[must_use]
    pub fn total(&self) -> f32 {
        self.iter().map(|(_, score)| score).sum()
    }

    /// Whether every probability is a finite number
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.iter().all(|(_, score)| score.is_finite())
    }
}

/// Apply softmax function to convert logits to probabilities
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let mut exps = Vec::with_capacity(logits.len());
    exps.extend(logits.iter().map(|&x| (x - max_logit).exp()));
    let sum_exps: f32 = exps.iter().sum();
    let mut probs = Vec::with_capacity(exps.len());
    probs.extend(exps.iter().map(|&x| x / sum_exps));
    probs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_from_str_accepts_fer_names() {
        assert_eq!("happy".parse::<EmotionLabel>(), Ok(EmotionLabel::Happy));
        assert_eq!("Happiness".parse::<EmotionLabel>(), Ok(EmotionLabel::Happy));
        assert_eq!("anger".parse::<EmotionLabel>(), Ok(EmotionLabel::Angry));
        assert_eq!("sadness".parse::<EmotionLabel>(), Ok(EmotionLabel::Sad));
        assert!("contempt".parse::<EmotionLabel>().is_err());
    }

    #[test]
    fn test_label_serialization() {
        let json = serde_json::to_string(&EmotionLabel::Surprise).unwrap();
        assert_eq!(json, "\"surprise\"");
        assert_eq!(EmotionLabel::Fear.zh_name(), "恐惧");
    }

    #[test]
    fn test_dominant_picks_maximum() {
        let dist = EmotionDistribution::from_scores([
            (EmotionLabel::Sad, 0.6),
            (EmotionLabel::Neutral, 0.3),
            (EmotionLabel::Happy, 0.1),
        ]);
        assert_eq!(dist.dominant(), EmotionLabel::Sad);
    }

    #[test]
    fn test_dominant_tie_prefers_priority_order() {
        let dist = EmotionDistribution::from_scores([
            (EmotionLabel::Neutral, 0.4),
            (EmotionLabel::Happy, 0.4),
            (EmotionLabel::Surprise, 0.2),
        ]);
        assert_eq!(dist.dominant(), EmotionLabel::Happy);

        let uniform = EmotionDistribution::from_scores(
            EmotionLabel::ALL.into_iter().map(|label| (label, 1.0 / 7.0)),
        );
        assert_eq!(uniform.dominant(), EmotionLabel::Angry);
    }

    #[test]
    fn test_distribution_serializes_as_label_map() {
        let dist = EmotionDistribution::from_scores([(EmotionLabel::Happy, 0.75)]);
        let json = serde_json::to_value(dist).unwrap();
        assert_eq!(json["happy"], 0.75);
        assert_eq!(json["angry"], 0.0);
        assert_eq!(json.as_object().unwrap().len(), 7);
    }

    #[test]
    fn test_from_logits_normalizes() {
        let dist = EmotionDistribution::from_logits(&[0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 1.0]);
        assert!((dist.total() - 1.0).abs() < 1e-5);
        assert_eq!(dist.dominant(), EmotionLabel::Happy);
    }

    #[test]
    fn test_is_finite() {
        let mut dist = EmotionDistribution::default();
        assert!(dist.is_finite());
        dist.set(EmotionLabel::Fear, f32::NAN);
        assert!(!dist.is_finite());
    }
}
