use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::mood::MoodLabel;

/// A published mood reading for one message. Never mutated after publication;
/// a refinement produces a new reading with the same sequence number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    pub mood: MoodLabel,
    pub confidence: f64,
    /// Unix seconds.
    pub timestamp: u64,
    pub source_text: String,
    pub sequence: u64,
}

impl SentimentReading {
    pub fn new(mood: MoodLabel, confidence: f64, source_text: &str, sequence: u64) -> Self {
        Self {
            mood,
            confidence: confidence.clamp(0.0, 1.0),
            timestamp: now_unix_secs(),
            source_text: source_text.to_string(),
            sequence,
        }
    }

    /// Same message, new verdict. Keeps text, sequence and timestamp.
    pub fn refined(&self, mood: MoodLabel, confidence: f64) -> Self {
        Self {
            mood,
            confidence: confidence.clamp(0.0, 1.0),
            ..self.clone()
        }
    }
}

/// Where a vote came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteSource {
    Lexical,
    Phrase,
    Negation,
    Structural,
    QuestionFloor,
    Polarity,
    Carryover,
    Context,
    Personalization,
    Gateway,
    Cache,
}

/// One (mood, weight, source) contribution to the ensemble.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightedVote {
    pub mood: MoodLabel,
    pub weight: f64,
    pub source: VoteSource,
}

impl WeightedVote {
    /// Negative weights are clamped to zero.
    pub fn new(mood: MoodLabel, weight: f64, source: VoteSource) -> Self {
        Self {
            mood,
            weight: weight.max(0.0),
            source,
        }
    }
}

/// Current UTC time as Unix seconds.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped() {
        let r = SentimentReading::new(MoodLabel::Happy, 1.7, "hi", 1);
        assert_eq!(r.confidence, 1.0);
        let r = SentimentReading::new(MoodLabel::Happy, -0.2, "hi", 1);
        assert_eq!(r.confidence, 0.0);
    }

    #[test]
    fn test_refined_keeps_identity() {
        let r = SentimentReading::new(MoodLabel::Neutral, 0.2, "some text", 7);
        let refined = r.refined(MoodLabel::Sad, 0.8);
        assert_eq!(refined.sequence, 7);
        assert_eq!(refined.source_text, "some text");
        assert_eq!(refined.timestamp, r.timestamp);
        assert_eq!(refined.mood, MoodLabel::Sad);
        // the original is untouched
        assert_eq!(r.mood, MoodLabel::Neutral);
    }

    #[test]
    fn test_vote_weight_non_negative() {
        let v = WeightedVote::new(MoodLabel::Sad, -3.0, VoteSource::Lexical);
        assert_eq!(v.weight, 0.0);
    }
}
