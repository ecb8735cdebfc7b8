use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of mood categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodLabel {
    Happy,
    Sad,
    Excited,
    Angry,
    Neutral,
    Anxious,
    Loving,
    Frustrated,
    Peaceful,
    Confused,
}

/// Coarse grouping of moods by the sign of their valence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValenceFamily {
    Positive,
    Negative,
    Neutral,
}

/// Valences within this distance of zero belong to the neutral family.
const FAMILY_BAND: f64 = 0.25;

impl MoodLabel {
    pub const ALL: [MoodLabel; 10] = [
        MoodLabel::Happy,
        MoodLabel::Sad,
        MoodLabel::Excited,
        MoodLabel::Angry,
        MoodLabel::Neutral,
        MoodLabel::Anxious,
        MoodLabel::Loving,
        MoodLabel::Frustrated,
        MoodLabel::Peaceful,
        MoodLabel::Confused,
    ];

    /// Fixed valence in [-2.0, 2.0], used for trend and family math.
    pub fn valence(self) -> f64 {
        match self {
            MoodLabel::Happy => 1.5,
            MoodLabel::Sad => -1.5,
            MoodLabel::Excited => 2.0,
            MoodLabel::Angry => -2.0,
            MoodLabel::Neutral => 0.0,
            MoodLabel::Anxious => -1.0,
            MoodLabel::Loving => 1.8,
            MoodLabel::Frustrated => -1.2,
            MoodLabel::Peaceful => 1.0,
            MoodLabel::Confused => -0.5,
        }
    }

    pub fn family(self) -> ValenceFamily {
        let v = self.valence();
        if v > FAMILY_BAND {
            ValenceFamily::Positive
        } else if v < -FAMILY_BAND {
            ValenceFamily::Negative
        } else {
            ValenceFamily::Neutral
        }
    }

    /// High-arousal moods are the ones exclamation and shouting push toward.
    pub fn is_high_arousal(self) -> bool {
        matches!(self, MoodLabel::Excited | MoodLabel::Angry)
    }

    /// Stable position in [`MoodLabel::ALL`], for dense score arrays.
    pub fn index(self) -> usize {
        match self {
            MoodLabel::Happy => 0,
            MoodLabel::Sad => 1,
            MoodLabel::Excited => 2,
            MoodLabel::Angry => 3,
            MoodLabel::Neutral => 4,
            MoodLabel::Anxious => 5,
            MoodLabel::Loving => 6,
            MoodLabel::Frustrated => 7,
            MoodLabel::Peaceful => 8,
            MoodLabel::Confused => 9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MoodLabel::Happy => "happy",
            MoodLabel::Sad => "sad",
            MoodLabel::Excited => "excited",
            MoodLabel::Angry => "angry",
            MoodLabel::Neutral => "neutral",
            MoodLabel::Anxious => "anxious",
            MoodLabel::Loving => "loving",
            MoodLabel::Frustrated => "frustrated",
            MoodLabel::Peaceful => "peaceful",
            MoodLabel::Confused => "confused",
        }
    }

    /// Parse a single mood token, case-insensitively.
    /// Surrounding whitespace is ignored; anything else must match exactly.
    pub fn parse_token(token: &str) -> Option<MoodLabel> {
        let token = token.trim();
        MoodLabel::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
