//! Presentation intensity and the transition rule.

use std::fmt;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::mood::MoodLabel;

/// How strongly a presentation layer should render the current mood.
///
/// `Subtle` is part of the vocabulary a renderer understands, but
/// [`IntensityRules::classify`] never produces it: everything between the
/// low and high thresholds is `Confident`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "level", content = "mood", rename_all = "snake_case")]
pub enum UiIntensity {
    Neutral,
    Subtle(MoodLabel),
    Confident(MoodLabel),
    Dramatic(MoodLabel),
}

impl UiIntensity {
    pub fn mood(&self) -> Option<MoodLabel> {
        match self {
            UiIntensity::Neutral => None,
            UiIntensity::Subtle(m) | UiIntensity::Confident(m) | UiIntensity::Dramatic(m) => {
                Some(*m)
            }
        }
    }

    pub fn level(&self) -> &'static str {
        match self {
            UiIntensity::Neutral => "neutral",
            UiIntensity::Subtle(_) => "subtle",
            UiIntensity::Confident(_) => "confident",
            UiIntensity::Dramatic(_) => "dramatic",
        }
    }
}

impl fmt::Display for UiIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mood() {
            Some(m) => write!(f, "{}({m})", self.level()),
            None => f.write_str(self.level()),
        }
    }
}

/// Threshold rules shared by intensity derivation and transition detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntensityRules {
    pub low: f64,
    pub high: f64,
    pub jump: f64,
}

impl Default for IntensityRules {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl IntensityRules {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            low: config.low_confidence_threshold,
            high: config.high_confidence_threshold,
            jump: config.transition_jump,
        }
    }

    pub fn classify(&self, mood: MoodLabel, confidence: f64) -> UiIntensity {
        if confidence < self.low {
            UiIntensity::Neutral
        } else if confidence < self.high {
            UiIntensity::Confident(mood)
        } else {
            UiIntensity::Dramatic(mood)
        }
    }

    /// A change is significant when the mood changes and the new confidence
    /// clears the high threshold, or when confidence jumps by more than
    /// `jump` regardless of mood.
    pub fn is_significant(
        &self,
        previous: (MoodLabel, f64),
        next: (MoodLabel, f64),
    ) -> bool {
        let (prev_mood, prev_conf) = previous;
        let (next_mood, next_conf) = next;
        (next_mood != prev_mood && next_conf > self.high) || (next_conf - prev_conf > self.jump)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_thresholds() {
        let rules = IntensityRules::default();
        assert_eq!(rules.classify(MoodLabel::Happy, 0.05), UiIntensity::Neutral);
        assert_eq!(
            rules.classify(MoodLabel::Happy, 0.1),
            UiIntensity::Confident(MoodLabel::Happy)
        );
        assert_eq!(
            rules.classify(MoodLabel::Sad, 0.29),
            UiIntensity::Confident(MoodLabel::Sad)
        );
        assert_eq!(
            rules.classify(MoodLabel::Sad, 0.3),
            UiIntensity::Dramatic(MoodLabel::Sad)
        );
    }

    #[test]
    fn test_subtle_never_produced() {
        let rules = IntensityRules::default();
        for i in 0..=100 {
            let c = f64::from(i) / 100.0;
            assert!(!matches!(
                rules.classify(MoodLabel::Anxious, c),
                UiIntensity::Subtle(_)
            ));
        }
    }

    #[test]
    fn test_mood_change_needs_confidence() {
        let rules = IntensityRules::default();
        assert!(rules.is_significant((MoodLabel::Neutral, 0.0), (MoodLabel::Happy, 0.5)));
        assert!(!rules.is_significant((MoodLabel::Sad, 0.25), (MoodLabel::Happy, 0.3)));
    }

    #[test]
    fn test_confidence_jump_same_mood() {
        let rules = IntensityRules::default();
        assert!(rules.is_significant((MoodLabel::Happy, 0.4), (MoodLabel::Happy, 0.7)));
        assert!(!rules.is_significant((MoodLabel::Happy, 0.5), (MoodLabel::Happy, 0.7)));
        assert!(!rules.is_significant((MoodLabel::Happy, 0.9), (MoodLabel::Happy, 0.4)));
    }

    #[test]
    fn test_display() {
        assert_eq!(UiIntensity::Neutral.to_string(), "neutral");
        assert_eq!(
            UiIntensity::Dramatic(MoodLabel::Angry).to_string(),
            "dramatic(angry)"
        );
    }
}
