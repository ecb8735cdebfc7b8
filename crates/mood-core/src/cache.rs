//! Bounded memo from normalized text to mood.
//!
//! Keyed purely on the literal normalized text: the same text maps to the
//! same mood wherever it appears in a conversation. Eviction is true FIFO
//! over insertion order, so the entry that leaves is always predictable.
//! The confidence of the stored result rides along so a hit can never claim
//! more certainty than the analysis that produced it.

use std::collections::{HashMap, VecDeque};

use crate::constants::CACHE_CAPACITY;
use crate::mood::MoodLabel;

#[derive(Clone, Debug)]
pub struct ResultCache {
    entries: HashMap<String, (MoodLabel, f64)>,
    order: VecDeque<String>,
    capacity: usize,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CACHE_CAPACITY)
    }
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn get(&self, normalized_text: &str) -> Option<MoodLabel> {
        self.entries.get(normalized_text).map(|&(mood, _)| mood)
    }

    /// Confidence of the result stored under `normalized_text`.
    pub fn confidence(&self, normalized_text: &str) -> Option<f64> {
        self.entries.get(normalized_text).map(|&(_, confidence)| confidence)
    }

    /// Insert or update. Updating an existing key keeps its original
    /// insertion position; a new key evicts the oldest entry when full.
    /// Empty keys are ignored.
    pub fn put(&mut self, normalized_text: &str, mood: MoodLabel, confidence: f64) {
        if normalized_text.is_empty() {
            return;
        }
        let entry = (mood, confidence.clamp(0.0, 1.0));
        if let Some(slot) = self.entries.get_mut(normalized_text) {
            *slot = entry;
            return;
        }
        while self.order.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(normalized_text.to_string());
        self.entries.insert(normalized_text.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
