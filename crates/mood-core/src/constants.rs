//! Default tuning constants. Every value here can be overridden through
//! [`crate::config::EngineConfig`].

/// Rolling context capacity, in readings.
pub const WINDOW_CAPACITY: usize = 15;

/// Result cache capacity, in normalized texts.
pub const CACHE_CAPACITY: usize = 50;

/// Below this confidence the presentation layer shows no mood at all.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.1;

/// At or above this confidence the presentation layer goes dramatic.
/// Also the confidence a mood change needs before it counts as a transition.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Confidence jump that counts as a transition even without a mood change.
pub const TRANSITION_JUMP: f64 = 0.2;

/// Ceiling on fast-pass confidence.
pub const FAST_CONFIDENCE_CAP: f64 = 0.7;

/// Ceiling on any Neutral result. Neutral means "no emotional evidence",
/// which should never read as a confident mood.
pub const NEUTRAL_CONFIDENCE_CEILING: f64 = 0.25;

/// Deep pass: context consistency above this earns [`CONSISTENCY_BONUS`].
pub const CONSISTENCY_BONUS_THRESHOLD: f64 = 0.7;
pub const CONSISTENCY_BONUS: f64 = 0.2;

/// Deep pass: a coherent context earns this bonus.
pub const COHERENCE_BONUS: f64 = 0.15;

/// Fraction of length-3 sub-windows that must stay in one valence family.
pub const COHERENCE_RATIO: f64 = 0.6;

/// Upper bound on the context source weight.
pub const MAX_CONTEXT_WEIGHT: f64 = 0.3;

/// Upper bound on the personalization source weight.
pub const MAX_PERSONALIZATION_WEIGHT: f64 = 0.2;

/// Learned-pattern count at which personalization reaches its full weight.
pub const PATTERN_SATURATION: usize = 50;

/// Share of the remaining weight given to the gateway vote when present.
pub const GATEWAY_SHARE: f64 = 0.4;

/// Minimum refined confidence before a reading teaches the pattern table.
pub const LEARN_THRESHOLD: f64 = 0.6;

/// How many prior raw texts the signal extractor may look at.
pub const PRIOR_TEXT_LIMIT: usize = 3;

/// Connectivity probe budget (hard limit).
pub const PROBE_TIMEOUT_MS: u64 = 500;

/// Full classification budget (hard limit).
pub const CLASSIFY_TIMEOUT_MS: u64 = 15_000;

/// Numerical epsilon for score comparisons.
pub const EPSILON: f64 = 1e-9;
