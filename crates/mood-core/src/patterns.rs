//! Learned per-user vocabulary.
//!
//! Words that keep showing up in confidently classified messages, and that
//! the fixed lexicon does not already know, accumulate per-mood counts. The
//! table outlives conversations: resetting a conversation never clears it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::lexicon::{is_intensifier, is_interrogative, is_negator, keyword_mood};
use crate::mood::MoodLabel;
use crate::reading::{VoteSource, WeightedVote};

/// A word needs this many observations before it votes.
pub const MIN_OBSERVATIONS: u32 = 2;

/// Words shorter than this are never learned.
const MIN_WORD_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "the", "and", "but", "for", "with", "this", "that", "you", "your", "are", "was", "were",
    "have", "has", "had", "just", "about", "from", "they", "them", "then", "there", "what",
    "been", "its", "it's", "i'm", "me", "my", "our", "out", "all", "get", "got", "too", "today",
    "really", "some", "into", "than", "when", "will", "would", "could", "should",
];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternTable {
    counts: BTreeMap<String, [u32; 10]>,
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct learned words.
    pub fn pattern_count(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Add `count` observations of `word` under `mood`. Used when loading a
    /// persisted table; bypasses the learnability filter.
    pub fn insert(&mut self, word: &str, mood: MoodLabel, count: u32) {
        let entry = self.counts.entry(word.to_string()).or_insert([0; 10]);
        entry[mood.index()] = entry[mood.index()].saturating_add(count);
    }

    /// Observations of `word` under `mood`.
    pub fn count(&self, word: &str, mood: MoodLabel) -> u32 {
        self.counts.get(word).map_or(0, |c| c[mood.index()])
    }

    /// Learn from a finalized message. Neutral readings teach nothing.
    /// Returns the words that were recorded, deduplicated, in first-seen order.
    pub fn learn(&mut self, tokens: &[String], mood: MoodLabel) -> Vec<String> {
        if mood == MoodLabel::Neutral {
            return Vec::new();
        }
        let mut learned: Vec<String> = Vec::new();
        for token in tokens {
            if !is_learnable(token) || learned.iter().any(|w| w == token) {
                continue;
            }
            self.insert(token, mood, 1);
            learned.push(token.clone());
        }
        learned
    }

    /// Personalization votes for a message: each known word votes for every
    /// mood it has been seen with, in proportion to its observations.
    pub fn votes(&self, tokens: &[String]) -> Vec<WeightedVote> {
        let mut votes = Vec::new();
        for token in tokens {
            let Some(counts) = self.counts.get(token) else {
                continue;
            };
            let total: u32 = counts.iter().sum();
            if total < MIN_OBSERVATIONS {
                continue;
            }
            for mood in MoodLabel::ALL {
                let c = counts[mood.index()];
                if c > 0 {
                    votes.push(WeightedVote::new(
                        mood,
                        f64::from(c) / f64::from(total),
                        VoteSource::Personalization,
                    ));
                }
            }
        }
        votes
    }

    /// (word, mood, count) triples, for persistence.
    pub fn entries(&self) -> impl Iterator<Item = (&str, MoodLabel, u32)> {
        self.counts.iter().flat_map(|(word, counts)| {
            MoodLabel::ALL
                .into_iter()
                .filter(move |m| counts[m.index()] > 0)
                .map(move |m| (word.as_str(), m, counts[m.index()]))
        })
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

fn is_learnable(token: &str) -> bool {
    token.chars().count() >= MIN_WORD_LEN
        && token.chars().all(|c| c.is_alphabetic() || c == '\'')
        && !STOPWORDS.contains(&token)
        && keyword_mood(token).is_none()
        && !is_negator(token)
        && !is_intensifier(token)
        && !is_interrogative(token)
}
