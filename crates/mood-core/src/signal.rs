//! Text → weighted mood votes.
//!
//! Three passes over one message:
//! 1. **Lexical/structural**: phrase and keyword tables per sentence,
//!    intensifiers, negation mapping, and the question floor.
//! 2. **Base polarity**: a continuous valence thresholded into one base vote.
//! 3. **Arousal**: exclamation density and capitalization push toward
//!    excited or angry, depending on which way the message already leans.
//!
//! Short replies with no emotional content ("not really", "yeah") borrow
//! the dominant mood of the most recent prior message.
//!
//! Extraction is a pure function of its inputs.

use crate::constants::PRIOR_TEXT_LIMIT;
use crate::lexicon::{
    LexicalMatch, is_affirmation, is_interrogative, is_negator, negate, scan,
};
use crate::mood::{MoodLabel, ValenceFamily};
use crate::polarity::{LexiconPolarity, PolarityScorer, base_mood};
use crate::reading::{VoteSource, WeightedVote};
use crate::tokenizer::{split_sentences, tokenize};

/// Weight of the Neutral vote forced by an emotionless question.
pub const QUESTION_FLOOR_WEIGHT: f64 = 0.5;

/// Emotional words inside a question count for half.
pub const QUESTION_DAMPING: f64 = 0.5;

/// Per-exclamation-mark arousal weight.
pub const EXCLAMATION_WEIGHT: f64 = 0.25;

/// Exclamation marks beyond this add nothing.
pub const EXCLAMATION_CAP: usize = 4;

/// Uppercase share of letters that counts as shouting.
pub const CAPS_RATIO_THRESHOLD: f64 = 0.6;

/// Shouting weight per unit of caps ratio.
pub const CAPS_WEIGHT: f64 = 0.8;

/// Messages need at least this many letters before caps are judged.
const CAPS_MIN_LETTERS: usize = 4;

/// Replies at most this long may borrow mood from prior messages.
const CARRYOVER_MAX_TOKENS: usize = 4;

const CARRYOVER_NEGATED_WEIGHT: f64 = 0.5;
const CARRYOVER_AFFIRMED_WEIGHT: f64 = 0.4;

/// Polarity magnitude that counts as emotional evidence on its own.
const POLARITY_EVIDENCE: f64 = 0.15;

/// Everything the extractor learned about one message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignalReport {
    pub votes: Vec<WeightedVote>,
    /// True when the message carries no emotional content and is made up
    /// only of questions (or is empty). The ensemble resolves these to
    /// Neutral regardless of context.
    pub forced_neutral: bool,
    /// True when any non-neutral lexical match, carryover, or strong
    /// polarity was found.
    pub emotional: bool,
    pub polarity: f64,
    pub exclamations: usize,
    pub caps_ratio: f64,
    pub tokens: Vec<String>,
}

impl SignalReport {
    /// Report for empty or unusable input: one Neutral vote of weight zero.
    pub fn empty() -> Self {
        Self {
            votes: vec![WeightedVote::new(MoodLabel::Neutral, 0.0, VoteSource::Structural)],
            forced_neutral: true,
            ..Self::default()
        }
    }

    /// Total vote weight.
    pub fn mass(&self) -> f64 {
        self.votes.iter().map(|v| v.weight).sum()
    }
}

/// Pure text-to-votes extractor. The polarity scorer is injected so tests
/// and callers can swap the base valence source.
pub struct SignalExtractor {
    polarity: Box<dyn PolarityScorer>,
}

impl Default for SignalExtractor {
    fn default() -> Self {
        Self::new(Box::new(LexiconPolarity))
    }
}

impl SignalExtractor {
    pub fn new(polarity: Box<dyn PolarityScorer>) -> Self {
        Self { polarity }
    }

    /// Extract votes for `text`. `prior_texts` is ordered oldest to newest;
    /// only the last [`PRIOR_TEXT_LIMIT`] are consulted.
    pub fn extract(&self, text: &str, prior_texts: &[String]) -> SignalReport {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return SignalReport::empty();
        }

        let mut votes = Vec::new();
        let mut emotional = false;
        let mut all_questions = true;

        for sentence in split_sentences(text) {
            let sentence_tokens = tokenize(&sentence);
            if sentence_tokens.is_empty() {
                continue;
            }
            let question = is_question(&sentence, &sentence_tokens);
            if !question {
                all_questions = false;
            }

            let matches = scan(&sentence_tokens);
            if matches.iter().any(|m| m.mood != MoodLabel::Neutral) {
                emotional = true;
            }

            if matches.is_empty() {
                if question {
                    votes.push(WeightedVote::new(
                        MoodLabel::Neutral,
                        QUESTION_FLOOR_WEIGHT,
                        VoteSource::QuestionFloor,
                    ));
                }
                continue;
            }

            let damping = if question { QUESTION_DAMPING } else { 1.0 };
            votes.extend(
                matches
                    .iter()
                    .map(|m| WeightedVote::new(m.mood, m.weight * damping, m.source)),
            );
        }

        let polarity = self.polarity.valence(text).clamp(-1.0, 1.0);
        let (base, base_weight) = base_mood(polarity);
        votes.push(WeightedVote::new(base, base_weight, VoteSource::Polarity));
        if polarity.abs() >= POLARITY_EVIDENCE {
            emotional = true;
        }

        if !emotional
            && tokens.len() <= CARRYOVER_MAX_TOKENS
            && let Some(vote) = carryover(&tokens, prior_texts)
        {
            votes.push(vote);
            emotional = true;
        }

        let forced_neutral = !emotional && all_questions;

        let exclamations = text.chars().filter(|c| *c == '!').count();
        let caps_ratio = caps_ratio(text);
        if !forced_neutral {
            let (positive, negative) = lean(&votes);
            if exclamations > 0 {
                let mood = if negative > positive {
                    MoodLabel::Angry
                } else {
                    MoodLabel::Excited
                };
                let weight = EXCLAMATION_WEIGHT * exclamations.min(EXCLAMATION_CAP) as f64;
                votes.push(WeightedVote::new(mood, weight, VoteSource::Structural));
            }
            if caps_ratio >= CAPS_RATIO_THRESHOLD {
                let mood = if positive > negative {
                    MoodLabel::Excited
                } else {
                    MoodLabel::Angry
                };
                votes.push(WeightedVote::new(
                    mood,
                    CAPS_WEIGHT * caps_ratio,
                    VoteSource::Structural,
                ));
            }
        }

        SignalReport {
            votes,
            forced_neutral,
            emotional,
            polarity,
            exclamations,
            caps_ratio,
            tokens,
        }
    }
}

/// A sentence is a question if it ends with `?`, or opens with an
/// interrogative and is not an exclamation.
fn is_question(sentence: &str, tokens: &[String]) -> bool {
    let trimmed = sentence.trim_end();
    if trimmed.ends_with('?') {
        return true;
    }
    !trimmed.ends_with('!') && tokens.first().is_some_and(|t| is_interrogative(t))
}

/// Uppercase share of alphabetic characters; 0 for very short texts.
fn caps_ratio(text: &str) -> f64 {
    let (letters, upper) = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(l, u), c| {
            (l + 1, u + usize::from(c.is_uppercase()))
        });
    if letters < CAPS_MIN_LETTERS {
        return 0.0;
    }
    upper as f64 / letters as f64
}

/// Positive and negative family mass of the votes so far.
fn lean(votes: &[WeightedVote]) -> (f64, f64) {
    votes.iter().fold((0.0, 0.0), |(pos, neg), v| match v.mood.family() {
        ValenceFamily::Positive => (pos + v.weight, neg),
        ValenceFamily::Negative => (pos, neg + v.weight),
        ValenceFamily::Neutral => (pos, neg),
    })
}

/// Strongest non-neutral mood among a set of lexical matches.
fn dominant_mood(matches: &[LexicalMatch]) -> Option<MoodLabel> {
    let mut totals = [0.0f64; 10];
    for m in matches.iter().filter(|m| m.mood != MoodLabel::Neutral) {
        totals[m.mood.index()] += m.weight;
    }
    MoodLabel::ALL
        .into_iter()
        .filter(|m| totals[m.index()] > 0.0)
        .max_by(|a, b| totals[a.index()].total_cmp(&totals[b.index()]))
}

/// Borrow mood from the newest prior message that has any: a leading
/// negator flips it through the negation table, an affirmation keeps it.
fn carryover(tokens: &[String], prior_texts: &[String]) -> Option<WeightedVote> {
    let first = tokens.first()?;
    let negated = is_negator(first);
    let affirmed = is_affirmation(first) || tokens == ["me", "too"];
    if !negated && !affirmed {
        return None;
    }

    let prior_mood = prior_texts
        .iter()
        .rev()
        .take(PRIOR_TEXT_LIMIT)
        .find_map(|t| dominant_mood(&scan(&tokenize(t))))?;

    if negated {
        let (mood, factor) = negate(prior_mood);
        Some(WeightedVote::new(
            mood,
            CARRYOVER_NEGATED_WEIGHT * factor,
            VoteSource::Carryover,
        ))
    } else {
        Some(WeightedVote::new(
            prior_mood,
            CARRYOVER_AFFIRMED_WEIGHT,
            VoteSource::Carryover,
        ))
    }
}
