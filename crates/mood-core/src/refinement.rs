//! Per-message refinement bookkeeping.
//!
//! Every analyzed message gets a sequence number. The fast estimate is
//! published immediately; the deep estimate arrives later and may only be
//! published if nothing newer has been published in the meantime and the
//! conversation has not been reset since the message arrived. Stale deep
//! results are dropped, never cancelled.

use std::collections::BTreeMap;

use serde::Serialize;

/// Phases are kept for at most this many recent sequences.
const PHASE_HISTORY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefinementPhase {
    Idle,
    FastPublished,
    DeepInFlight,
    RefinedPublished,
    /// The fast estimate is the final word: cache hit, forced neutral,
    /// classifier timeout, or superseded by a newer message.
    Settled,
}

impl RefinementPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RefinementPhase::RefinedPublished | RefinementPhase::Settled)
    }
}

#[derive(Clone, Debug, Default)]
pub struct RefinementTracker {
    phases: BTreeMap<u64, RefinementPhase>,
    latest_fast: Option<u64>,
    latest_refined: Option<u64>,
    floor: u64,
}

impl RefinementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, sequence: u64) -> RefinementPhase {
        self.phases
            .get(&sequence)
            .copied()
            .unwrap_or(RefinementPhase::Idle)
    }

    pub fn latest_fast(&self) -> Option<u64> {
        self.latest_fast
    }

    pub fn latest_refined(&self) -> Option<u64> {
        self.latest_refined
    }

    /// Sequences below this were analyzed before the last reset.
    pub fn floor(&self) -> u64 {
        self.floor
    }

    /// Record that the fast estimate for `sequence` was published. `settled`
    /// marks it final, with no deep pass to follow.
    pub fn fast_published(&mut self, sequence: u64, settled: bool) {
        if self.latest_fast.is_none_or(|s| sequence > s) {
            self.latest_fast = Some(sequence);
        }
        let phase = if settled {
            RefinementPhase::Settled
        } else {
            RefinementPhase::FastPublished
        };
        self.set(sequence, phase);
    }

    pub fn deep_started(&mut self, sequence: u64) {
        if self.phase(sequence) == RefinementPhase::FastPublished {
            self.set(sequence, RefinementPhase::DeepInFlight);
        }
    }

    /// Whether a refined result for `sequence` may be published now.
    pub fn may_publish_refined(&self, sequence: u64) -> bool {
        sequence >= self.floor
            && self.latest_fast == Some(sequence)
            && self.latest_refined.is_none_or(|r| r < sequence)
            && !self.phase(sequence).is_terminal()
    }

    pub fn refined_published(&mut self, sequence: u64) {
        self.latest_refined = Some(sequence);
        self.set(sequence, RefinementPhase::RefinedPublished);
    }

    /// The deep pass for `sequence` finished without publishing.
    pub fn settle(&mut self, sequence: u64) {
        if !self.phase(sequence).is_terminal() {
            self.set(sequence, RefinementPhase::Settled);
        }
    }

    /// Forget everything before `next_sequence`; deep passes for older
    /// messages will be refused.
    pub fn reset(&mut self, next_sequence: u64) {
        self.floor = next_sequence;
        self.latest_fast = None;
        self.latest_refined = None;
        self.phases.clear();
    }

    /// Number of messages whose deep pass is still running.
    pub fn in_flight(&self) -> usize {
        self.phases
            .values()
            .filter(|p| **p == RefinementPhase::DeepInFlight)
            .count()
    }

    fn set(&mut self, sequence: u64, phase: RefinementPhase) {
        self.phases.insert(sequence, phase);
        while self.phases.len() > PHASE_HISTORY {
            self.phases.pop_first();
        }
    }
}
