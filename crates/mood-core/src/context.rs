//! Bounded rolling history of readings and the features derived from it.

use std::collections::VecDeque;

use crate::constants::{COHERENCE_RATIO, WINDOW_CAPACITY};
use crate::mood::MoodLabel;
use crate::reading::{SentimentReading, VoteSource, WeightedVote};

/// FIFO window over the most recent readings. `len() <= capacity` always.
#[derive(Clone, Debug)]
pub struct ContextWindow {
    readings: VecDeque<SentimentReading>,
    capacity: usize,
    coherence_ratio: f64,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(WINDOW_CAPACITY)
    }
}

impl ContextWindow {
    /// A zero capacity is bumped to one so the window can hold the latest reading.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
            coherence_ratio: COHERENCE_RATIO,
        }
    }

    pub fn with_coherence_ratio(mut self, ratio: f64) -> Self {
        self.coherence_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SentimentReading> {
        self.readings.iter()
    }

    /// Append a reading, evicting the oldest when full.
    pub fn append(&mut self, reading: SentimentReading) {
        while self.readings.len() >= self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    /// Swap in a refined reading for the entry with the same sequence number.
    /// Returns false when that entry has already been evicted.
    pub fn replace(&mut self, reading: SentimentReading) -> bool {
        match self
            .readings
            .iter_mut()
            .rev()
            .find(|r| r.sequence == reading.sequence)
        {
            Some(slot) => {
                *slot = reading;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    pub fn last_mood(&self) -> Option<MoodLabel> {
        self.readings.back().map(|r| r.mood)
    }

    /// Fraction of entries equal to `mood`; 0 for an empty window.
    pub fn consistency(&self, mood: MoodLabel) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        let matching = self.readings.iter().filter(|r| r.mood == mood).count();
        matching as f64 / self.readings.len() as f64
    }

    /// Mean valence of the second half minus the first half (positive means
    /// improving). With an odd length the middle entry joins the second half.
    pub fn trend(&self) -> f64 {
        let n = self.readings.len();
        if n < 2 {
            return 0.0;
        }
        let mid = n / 2;
        let first = mean_valence(self.readings.iter().take(mid));
        let second = mean_valence(self.readings.iter().skip(mid));
        second - first
    }

    /// True when enough length-3 sliding sub-windows stay within a single
    /// valence family. Fewer than three readings have nothing erratic to
    /// penalize and count as coherent.
    pub fn coherence(&self) -> bool {
        let families: Vec<_> = self.readings.iter().map(|r| r.mood.family()).collect();
        if families.len() < 3 {
            return true;
        }
        let total = families.len() - 2;
        let steady = families
            .windows(3)
            .filter(|w| w[0] == w[1] && w[1] == w[2])
            .count();
        steady as f64 / total as f64 >= self.coherence_ratio
    }

    /// Among `candidates`, the one seen most recently in the window.
    pub fn most_recent_of(&self, candidates: &[MoodLabel]) -> Option<MoodLabel> {
        self.readings
            .iter()
            .rev()
            .map(|r| r.mood)
            .find(|m| candidates.contains(m))
    }

    /// Context votes: one per mood present, weighted by its share.
    pub fn votes(&self) -> Vec<WeightedVote> {
        MoodLabel::ALL
            .into_iter()
            .map(|m| (m, self.consistency(m)))
            .filter(|(_, share)| *share > 0.0)
            .map(|(m, share)| WeightedVote::new(m, share, VoteSource::Context))
            .collect()
    }
}

fn mean_valence<'a>(readings: impl Iterator<Item = &'a SentimentReading>) -> f64 {
    let (sum, count) = readings.fold((0.0, 0usize), |(sum, count), r| {
        (sum + r.mood.valence(), count + 1)
    });
    if count == 0 { 0.0 } else { sum / count as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reading(mood: MoodLabel, seq: u64) -> SentimentReading {
        SentimentReading::new(mood, 0.5, "msg", seq)
    }

    fn window_of(moods: &[MoodLabel]) -> ContextWindow {
        let mut w = ContextWindow::default();
        for (i, m) in moods.iter().enumerate() {
            w.append(reading(*m, i as u64));
        }
        w
    }

    #[test]
    fn test_fifo_eviction() {
        let mut w = ContextWindow::new(15);
        for i in 0..20 {
            w.append(reading(MoodLabel::Happy, i));
            assert!(w.len() <= 15);
        }
        assert_eq!(w.len(), 15);
        let sequences: Vec<u64> = w.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, (5..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_capacity_bumped() {
        let mut w = ContextWindow::new(0);
        w.append(reading(MoodLabel::Sad, 1));
        w.append(reading(MoodLabel::Sad, 2));
        assert_eq!(w.len(), 1);
        assert_eq!(w.capacity(), 1);
    }

    #[test]
    fn test_consistency() {
        let w = window_of(&[MoodLabel::Happy, MoodLabel::Happy, MoodLabel::Sad, MoodLabel::Happy]);
        assert_relative_eq!(w.consistency(MoodLabel::Happy), 0.75);
        assert_relative_eq!(w.consistency(MoodLabel::Sad), 0.25);
        assert_relative_eq!(w.consistency(MoodLabel::Angry), 0.0);
        assert_eq!(ContextWindow::default().consistency(MoodLabel::Happy), 0.0);
    }

    #[test]
    fn test_trend_improving_and_worsening() {
        let improving = window_of(&[MoodLabel::Sad, MoodLabel::Sad, MoodLabel::Happy, MoodLabel::Happy]);
        assert_relative_eq!(improving.trend(), 3.0);
        let worsening = window_of(&[MoodLabel::Happy, MoodLabel::Angry]);
        assert_relative_eq!(worsening.trend(), -3.5);
        assert_eq!(window_of(&[MoodLabel::Happy]).trend(), 0.0);
    }

    #[test]
    fn test_trend_odd_length_middle_in_second_half() {
        let w = window_of(&[MoodLabel::Neutral, MoodLabel::Happy, MoodLabel::Happy]);
        // first = [neutral] = 0.0, second = [happy, happy] = 1.5
        assert_relative_eq!(w.trend(), 1.5);
    }

    #[test]
    fn test_coherence_steady() {
        let w = window_of(&[
            MoodLabel::Happy,
            MoodLabel::Excited,
            MoodLabel::Loving,
            MoodLabel::Peaceful,
        ]);
        assert!(w.coherence());
    }

    #[test]
    fn test_coherence_flip_flop() {
        let w = window_of(&[
            MoodLabel::Happy,
            MoodLabel::Angry,
            MoodLabel::Happy,
            MoodLabel::Sad,
            MoodLabel::Excited,
        ]);
        assert!(!w.coherence());
    }

    #[test]
    fn test_coherence_threshold_boundary() {
        // windows: [P,P,P] [P,P,N] [P,N,N] [N,N,N] [N,N,N] → 3/5 = 0.6
        let w = window_of(&[
            MoodLabel::Happy,
            MoodLabel::Happy,
            MoodLabel::Happy,
            MoodLabel::Sad,
            MoodLabel::Sad,
            MoodLabel::Sad,
            MoodLabel::Sad,
        ]);
        assert!(w.coherence());
    }

    #[test]
    fn test_coherence_vacuous_for_short_windows() {
        assert!(ContextWindow::default().coherence());
        assert!(window_of(&[MoodLabel::Happy, MoodLabel::Angry]).coherence());
    }

    #[test]
    fn test_replace_by_sequence() {
        let mut w = window_of(&[MoodLabel::Neutral, MoodLabel::Neutral]);
        let refined = reading(MoodLabel::Happy, 1);
        assert!(w.replace(refined));
        assert_eq!(w.last_mood(), Some(MoodLabel::Happy));
        assert!(!w.replace(reading(MoodLabel::Happy, 99)));
    }

    #[test]
    fn test_most_recent_of() {
        let w = window_of(&[MoodLabel::Sad, MoodLabel::Happy, MoodLabel::Angry]);
        assert_eq!(
            w.most_recent_of(&[MoodLabel::Sad, MoodLabel::Happy]),
            Some(MoodLabel::Happy)
        );
        assert_eq!(w.most_recent_of(&[MoodLabel::Loving]), None);
    }

    #[test]
    fn test_votes_are_shares() {
        let w = window_of(&[MoodLabel::Sad, MoodLabel::Sad, MoodLabel::Happy, MoodLabel::Happy]);
        let votes = w.votes();
        assert_eq!(votes.len(), 2);
        let total: f64 = votes.iter().map(|v| v.weight).sum();
        assert_relative_eq!(total, 1.0);
        assert!(votes.iter().all(|v| v.source == VoteSource::Context));
    }
}
