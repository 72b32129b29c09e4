//! Five-class text sentiment verdicts.

use crate::emotion::EmotionLabel;
use serde::{Deserialize, Serialize};

/// Ordinal sentiment class (0 = very negative ... 4 = very positive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentClass {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

impl SentimentClass {
    /// All classes in ordinal order
    pub const ALL: [SentimentClass; 5] = [
        SentimentClass::VeryNegative,
        SentimentClass::Negative,
        SentimentClass::Neutral,
        SentimentClass::Positive,
        SentimentClass::VeryPositive,
    ];

    /// Get class from ordinal index
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Ordinal index (0..=4)
    #[must_use]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Get class label as string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentClass::VeryNegative => "very_negative",
            SentimentClass::Negative => "negative",
            SentimentClass::Neutral => "neutral",
            SentimentClass::Positive => "positive",
            SentimentClass::VeryPositive => "very_positive",
        }
    }

    /// Chinese display name
    #[must_use]
    pub fn zh_name(&self) -> &'static str {
        match self {
            SentimentClass::VeryNegative => "非常消极",
            SentimentClass::Negative => "消极",
            SentimentClass::Neutral => "中性",
            SentimentClass::Positive => "积极",
            SentimentClass::VeryPositive => "非常积极",
        }
    }

    /// Facial emotion a sentiment class corresponds to
    ///
    /// Both positive classes collapse onto `happy`.
    #[must_use]
    pub fn mapped_emotion(&self) -> EmotionLabel {
        match self {
            SentimentClass::VeryNegative => EmotionLabel::Angry,
            SentimentClass::Negative => EmotionLabel::Sad,
            SentimentClass::Neutral => EmotionLabel::Neutral,
            SentimentClass::Positive | SentimentClass::VeryPositive => EmotionLabel::Happy,
        }
    }
}

/// Probability per sentiment class
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub very_negative: f32,
    pub negative: f32,
    pub neutral: f32,
    pub positive: f32,
    pub very_positive: f32,
}

impl SentimentScores {
    /// Build scores from a probability vector in ordinal order
    #[must_use]
    pub fn from_array(probabilities: [f32; 5]) -> Self {
        let [very_negative, negative, neutral, positive, very_positive] = probabilities;
        Self {
            very_negative,
            negative,
            neutral,
            positive,
            very_positive,
        }
    }

    /// Probability vector in ordinal order
    #[must_use]
    pub fn to_array(&self) -> [f32; 5] {
        [
            self.very_negative,
            self.negative,
            self.neutral,
            self.positive,
            self.very_positive,
        ]
    }
}

/// Classifier verdict: ordinal class plus the probability vector behind it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentVerdict {
    /// Predicted class
    pub class: SentimentClass,
    /// Probabilities over all five classes
    pub scores: SentimentScores,
}

impl SentimentVerdict {
    /// Create a verdict with an explicit class
    #[must_use]
    pub fn new(class: SentimentClass, probabilities: [f32; 5]) -> Self {
        Self {
            class,
            scores: SentimentScores::from_array(probabilities),
        }
    }

    /// Create a verdict whose class is the argmax of the probabilities
    ///
    /// Ties go to the lower ordinal class.
    #[must_use]
    pub fn from_probabilities(probabilities: [f32; 5]) -> Self {
        let mut best = 0;
        for (idx, &p) in probabilities.iter().enumerate().skip(1) {
            if p > probabilities[best] {
                best = idx;
            }
        }
        let class = SentimentClass::from_index(best).unwrap_or(SentimentClass::Neutral);
        Self::new(class, probabilities)
    }

    /// Ordinal class index (0..=4)
    #[must_use]
    pub fn class_index(&self) -> usize {
        self.class.index()
    }

    /// Facial emotion this verdict maps onto
    #[must_use]
    pub fn mapped_emotion(&self) -> EmotionLabel {
        self.class.mapped_emotion()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_from_index() {
        assert_eq!(SentimentClass::from_index(0), Some(SentimentClass::VeryNegative));
        assert_eq!(SentimentClass::from_index(4), Some(SentimentClass::VeryPositive));
        assert_eq!(SentimentClass::from_index(5), None);
        assert_eq!(SentimentClass::Positive.index(), 3);
    }

    #[test]
    fn test_mapped_emotion_table() {
        assert_eq!(SentimentClass::VeryNegative.mapped_emotion(), EmotionLabel::Angry);
        assert_eq!(SentimentClass::Negative.mapped_emotion(), EmotionLabel::Sad);
        assert_eq!(SentimentClass::Neutral.mapped_emotion(), EmotionLabel::Neutral);
        assert_eq!(SentimentClass::Positive.mapped_emotion(), EmotionLabel::Happy);
        assert_eq!(SentimentClass::VeryPositive.mapped_emotion(), EmotionLabel::Happy);
    }

    #[test]
    fn test_from_probabilities_argmax() {
        let verdict = SentimentVerdict::from_probabilities([0.05, 0.1, 0.15, 0.6, 0.1]);
        assert_eq!(verdict.class, SentimentClass::Positive);
        assert_eq!(verdict.class_index(), 3);
        assert_eq!(verdict.scores.positive, 0.6);
    }

    #[test]
    fn test_from_probabilities_tie_prefers_lower_class() {
        let verdict = SentimentVerdict::from_probabilities([0.1, 0.4, 0.4, 0.05, 0.05]);
        assert_eq!(verdict.class, SentimentClass::Negative);
    }

    #[test]
    fn test_verdict_serialization() {
        let verdict = SentimentVerdict::new(SentimentClass::VeryNegative, [0.8, 0.1, 0.05, 0.03, 0.02]);
        let json = serde_json::to_value(verdict).unwrap();
        assert_eq!(json["class"], "very_negative");
        assert_eq!(json["scores"]["very_negative"], serde_json::json!(0.8_f32));
        assert_eq!(verdict.scores.to_array()[0], 0.8);
    }
}
