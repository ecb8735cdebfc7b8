//! Engine tuning, loadable from TOML.
//!
//! Every field has a default, so a config file only names what it changes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Default model name sent to the external classifier.
pub const DEFAULT_MODEL: &str = "llama3.2";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window_capacity: usize,
    pub cache_capacity: usize,
    pub low_confidence_threshold: f64,
    pub high_confidence_threshold: f64,
    pub transition_jump: f64,
    pub fast_confidence_cap: f64,
    pub neutral_confidence_ceiling: f64,
    pub consistency_bonus_threshold: f64,
    pub consistency_bonus: f64,
    pub coherence_bonus: f64,
    pub coherence_ratio: f64,
    pub max_context_weight: f64,
    pub max_personalization_weight: f64,
    pub pattern_saturation: usize,
    pub gateway_share: f64,
    pub learn_threshold: f64,
    pub prior_text_limit: usize,
    pub gateway: GatewayConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_capacity: WINDOW_CAPACITY,
            cache_capacity: CACHE_CAPACITY,
            low_confidence_threshold: LOW_CONFIDENCE_THRESHOLD,
            high_confidence_threshold: HIGH_CONFIDENCE_THRESHOLD,
            transition_jump: TRANSITION_JUMP,
            fast_confidence_cap: FAST_CONFIDENCE_CAP,
            neutral_confidence_ceiling: NEUTRAL_CONFIDENCE_CEILING,
            consistency_bonus_threshold: CONSISTENCY_BONUS_THRESHOLD,
            consistency_bonus: CONSISTENCY_BONUS,
            coherence_bonus: COHERENCE_BONUS,
            coherence_ratio: COHERENCE_RATIO,
            max_context_weight: MAX_CONTEXT_WEIGHT,
            max_personalization_weight: MAX_PERSONALIZATION_WEIGHT,
            pattern_saturation: PATTERN_SATURATION,
            gateway_share: GATEWAY_SHARE,
            learn_threshold: LEARN_THRESHOLD,
            prior_text_limit: PRIOR_TEXT_LIMIT,
            gateway: GatewayConfig::default(),
        }
    }
}

/// External classifier settings. No endpoint means no classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub endpoint: Option<String>,
    pub model: String,
    pub probe_timeout_ms: u64,
    pub classify_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: DEFAULT_MODEL.to_string(),
            probe_timeout_ms: PROBE_TIMEOUT_MS,
            classify_timeout_ms: CLASSIFY_TIMEOUT_MS,
        }
    }
}

impl GatewayConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroCapacity(&'static str),
    OutOfRange { field: &'static str, value: f64 },
    ThresholdOrder { low: f64, high: f64 },
    TimeoutTooLong { field: &'static str, ms: u64, limit: u64 },
    /// The config source could not be read or parsed.
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroCapacity(field) => write!(f, "{field} must be at least 1"),
            ConfigError::OutOfRange { field, value } => {
                write!(f, "{field} must be within [0, 1], got {value}")
            }
            ConfigError::ThresholdOrder { low, high } => write!(
                f,
                "low_confidence_threshold ({low}) must be below high_confidence_threshold ({high})"
            ),
            ConfigError::TimeoutTooLong { field, ms, limit } => {
                write!(f, "{field} is {ms}ms, the limit is {limit}ms")
            }
            ConfigError::Parse(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("window_capacity"));
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("cache_capacity"));
        }
        if self.pattern_saturation == 0 {
            return Err(ConfigError::ZeroCapacity("pattern_saturation"));
        }

        let unit_fields = [
            ("low_confidence_threshold", self.low_confidence_threshold),
            ("high_confidence_threshold", self.high_confidence_threshold),
            ("transition_jump", self.transition_jump),
            ("fast_confidence_cap", self.fast_confidence_cap),
            ("neutral_confidence_ceiling", self.neutral_confidence_ceiling),
            ("consistency_bonus_threshold", self.consistency_bonus_threshold),
            ("consistency_bonus", self.consistency_bonus),
            ("coherence_bonus", self.coherence_bonus),
            ("coherence_ratio", self.coherence_ratio),
            ("max_context_weight", self.max_context_weight),
            ("max_personalization_weight", self.max_personalization_weight),
            ("gateway_share", self.gateway_share),
            ("learn_threshold", self.learn_threshold),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        if self.max_context_weight + self.max_personalization_weight >= 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "max_context_weight + max_personalization_weight",
                value: self.max_context_weight + self.max_personalization_weight,
            });
        }

        if self.low_confidence_threshold >= self.high_confidence_threshold {
            return Err(ConfigError::ThresholdOrder {
                low: self.low_confidence_threshold,
                high: self.high_confidence_threshold,
            });
        }

        if self.gateway.probe_timeout_ms > PROBE_TIMEOUT_MS {
            return Err(ConfigError::TimeoutTooLong {
                field: "gateway.probe_timeout_ms",
                ms: self.gateway.probe_timeout_ms,
                limit: PROBE_TIMEOUT_MS,
            });
        }
        if self.gateway.classify_timeout_ms > CLASSIFY_TIMEOUT_MS {
            return Err(ConfigError::TimeoutTooLong {
                field: "gateway.classify_timeout_ms",
                ms: self.gateway.classify_timeout_ms,
                limit: CLASSIFY_TIMEOUT_MS,
            });
        }
        Ok(())
    }
}
