//! Continuous base polarity in [-1, 1].
//!
//! The extractor only needs *some* valence estimate to anchor its base vote,
//! so the scorer sits behind a trait. The default is a small AFINN-style word
//! list squashed through `tanh`.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::lexicon::{NEGATION_SCOPE, is_negator};
use crate::mood::MoodLabel;
use crate::tokenizer::tokenize;

/// Produces a continuous valence score for a text.
pub trait PolarityScorer: Send + Sync {
    /// Valence in [-1.0, 1.0]; 0.0 when nothing is known.
    fn valence(&self, text: &str) -> f64;
}

/// Weight given to a Neutral base vote.
pub const NEUTRAL_BASE_WEIGHT: f64 = 0.25;

/// Map a continuous valence onto a base mood and vote weight.
///
/// | valence        | mood        |
/// |----------------|-------------|
/// | ≥ 0.5          | happy       |
/// | [0.15, 0.5)    | peaceful    |
/// | (-0.15, 0.15)  | neutral     |
/// | (-0.5, -0.15]  | frustrated  |
/// | ≤ -0.5         | sad         |
pub fn base_mood(valence: f64) -> (MoodLabel, f64) {
    let v = valence.clamp(-1.0, 1.0);
    let mood = if v >= 0.5 {
        MoodLabel::Happy
    } else if v >= 0.15 {
        MoodLabel::Peaceful
    } else if v > -0.15 {
        MoodLabel::Neutral
    } else if v > -0.5 {
        MoodLabel::Frustrated
    } else {
        MoodLabel::Sad
    };
    let weight = if mood == MoodLabel::Neutral {
        NEUTRAL_BASE_WEIGHT
    } else {
        v.abs()
    };
    (mood, weight)
}

/// Word-list valence scorer.
#[derive(Clone, Copy, Debug, Default)]
pub struct LexiconPolarity;

/// Divisor applied before `tanh`; four points of evidence ≈ 0.76.
const SQUASH: f64 = 4.0;

/// Fraction of a negated word's score that survives, with flipped sign.
const NEGATED_FACTOR: f64 = -0.5;

static WORD_SCORES: LazyLock<HashMap<&'static str, i8>> = LazyLock::new(|| {
    [
        ("good", 3), ("great", 3), ("happy", 3), ("wonderful", 4), ("amazing", 4),
        ("fantastic", 4), ("awesome", 4), ("love", 3), ("loved", 3), ("excellent", 3),
        ("nice", 3), ("glad", 3), ("excited", 3), ("perfect", 3), ("beautiful", 3),
        ("fun", 4), ("best", 3), ("brilliant", 4), ("calm", 2), ("relaxed", 2),
        ("peaceful", 2), ("thanks", 2), ("thank", 2), ("grateful", 3), ("enjoy", 2),
        ("like", 2), ("yay", 3), ("wow", 4), ("lovely", 3), ("delighted", 3),
        ("thrilled", 5), ("adore", 3), ("cool", 1), ("safe", 1), ("hope", 2),
        ("bad", -3), ("sad", -2), ("terrible", -3), ("awful", -3), ("horrible", -3),
        ("hate", -3), ("angry", -3), ("mad", -3), ("furious", -3), ("upset", -2),
        ("worried", -3), ("anxious", -2), ("scared", -2), ("afraid", -2), ("depressed", -2),
        ("miserable", -3), ("lonely", -2), ("cry", -1), ("hurt", -2), ("annoyed", -2),
        ("frustrated", -2), ("stressed", -2), ("tired", -2), ("confused", -2), ("sick", -2),
        ("worst", -3), ("boring", -3), ("disappointed", -2), ("ugh", -2), ("stupid", -2),
        ("fail", -2), ("failed", -2), ("problem", -2), ("pain", -2), ("broken", -1),
        ("lost", -3), ("nervous", -2), ("hopeless", -2), ("disgusting", -3), ("useless", -2),
        ("alone", -2), ("wrong", -2), ("sorry", -1),
    ]
    .into_iter()
    .collect()
});

impl PolarityScorer for LexiconPolarity {
    fn valence(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut sum = 0.0;
        for (i, token) in tokens.iter().enumerate() {
            let Some(score) = WORD_SCORES.get(token.as_str()) else {
                continue;
            };
            let start = i.saturating_sub(NEGATION_SCOPE);
            let negated = tokens[start..i].iter().any(|t| is_negator(t));
            let score = f64::from(*score);
            sum += if negated { score * NEGATED_FACTOR } else { score };
        }
        (sum / SQUASH).tanh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unknown_words_are_zero() {
        assert_eq!(LexiconPolarity.valence("How are you?"), 0.0);
        assert_eq!(LexiconPolarity.valence(""), 0.0);
    }

    #[test]
    fn test_positive_and_negative() {
        assert!(LexiconPolarity.valence("what a wonderful day") > 0.5);
        assert!(LexiconPolarity.valence("this is terrible and awful") < -0.5);
    }

    #[test]
    fn test_negation_flips_and_dampens() {
        let plain = LexiconPolarity.valence("good");
        let negated = LexiconPolarity.valence("not good");
        assert!(plain > 0.0);
        assert!(negated < 0.0);
        assert!(negated.abs() < plain.abs());
    }

    #[test]
    fn test_bounded() {
        let v = LexiconPolarity.valence(&"amazing ".repeat(50));
        assert!(v <= 1.0);
        let v = LexiconPolarity.valence(&"awful ".repeat(50));
        assert!(v >= -1.0);
    }

    #[test]
    fn test_base_mood_thresholds() {
        assert_eq!(base_mood(0.9).0, MoodLabel::Happy);
        assert_eq!(base_mood(0.5).0, MoodLabel::Happy);
        assert_eq!(base_mood(0.3).0, MoodLabel::Peaceful);
        assert_eq!(base_mood(0.0).0, MoodLabel::Neutral);
        assert_eq!(base_mood(-0.3).0, MoodLabel::Frustrated);
        assert_eq!(base_mood(-0.5).0, MoodLabel::Sad);
        assert_eq!(base_mood(-1.0).0, MoodLabel::Sad);
    }

    #[test]
    fn test_base_weight() {
        assert_relative_eq!(base_mood(0.0).1, NEUTRAL_BASE_WEIGHT);
        assert_relative_eq!(base_mood(-0.7).1, 0.7);
    }
}
