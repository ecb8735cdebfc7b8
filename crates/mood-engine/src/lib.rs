//! Async half of the mood engine: the external classifier gateway and the
//! progressive refinement coordinator built on `mood-core`.

pub mod coordinator;
pub mod gateway;

pub use coordinator::{EngineStats, MoodEngine, MoodEngineBuilder, MoodSnapshot, MoodTransition};
pub use gateway::{
    ClassifierBackend, Gateway, GatewayError, GatewayOutcome, HttpClassifier, build_prompt,
    parse_mood_response,
};
