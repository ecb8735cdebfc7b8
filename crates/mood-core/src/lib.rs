//! Progressive mood inference, pure half.
//!
//! Turns short text messages into one of ten mood labels with a confidence.
//! Everything here is deterministic and synchronous: signal extraction,
//! the rolling context window, the result cache, learned patterns, the
//! ensemble scorer, and the bookkeeping that decides whether a late deep
//! result may still be published.
//!
//! Zero I/O. Async orchestration and the external classifier live in
//! `mood-engine`; persistence lives in `mood-store`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod ensemble;
pub mod intensity;
pub mod lexicon;
pub mod mood;
pub mod patterns;
pub mod polarity;
pub mod reading;
pub mod refinement;
pub mod signal;
pub mod sink;
pub mod tokenizer;

pub use cache::ResultCache;
pub use config::{ConfigError, EngineConfig, GatewayConfig};
pub use context::ContextWindow;
pub use ensemble::{EnsembleInput, EnsembleResult, EnsembleScorer, Pass, SourceWeights};
pub use intensity::{IntensityRules, UiIntensity};
pub use mood::{MoodLabel, ValenceFamily};
pub use patterns::PatternTable;
pub use polarity::{LexiconPolarity, PolarityScorer};
pub use reading::{SentimentReading, VoteSource, WeightedVote};
pub use refinement::{RefinementPhase, RefinementTracker};
pub use signal::{SignalExtractor, SignalReport};
pub use sink::{MemorySink, ReadingSink, SinkError};
pub use tokenizer::{normalize, tokenize};
