//! Fixed mood vocabulary: per-mood keyword and phrase tables, negation,
//! intensifier and interrogative markers, and the negation mapping table.
//!
//! Tables are static and never learned. Learned vocabulary lives in
//! [`crate::patterns::PatternTable`] and votes through its own source.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::mood::MoodLabel;
use crate::reading::VoteSource;

/// Weight of a single keyword match.
pub const KEYWORD_WEIGHT: f64 = 1.0;

/// Weight of a multi-word phrase match.
pub const PHRASE_WEIGHT: f64 = 1.6;

/// Multiplier when an intensifier directly precedes a match.
pub const INTENSIFIER_BOOST: f64 = 1.5;

/// How many tokens before a match a negator may sit and still apply.
pub const NEGATION_SCOPE: usize = 3;

const KEYWORDS: &[(MoodLabel, &[&str])] = &[
    (
        MoodLabel::Happy,
        &[
            "happy", "glad", "good", "great", "wonderful", "fantastic", "awesome", "delighted",
            "cheerful", "joy", "joyful", "pleased", "nice", "fun", "smile", "smiling", "yay",
            "lovely", "excellent", "blessed", "grateful", "thankful", "enjoy", "enjoyed",
            "enjoying", "hooray", "haha", "lol", "pleasant", "brilliant", "superb", "perfect",
        ],
    ),
    (
        MoodLabel::Excited,
        &[
            "excited", "amazing", "thrilled", "pumped", "stoked", "incredible", "wow", "omg",
            "ecstatic", "hyped", "exciting", "woohoo", "eager", "unbelievable", "epic",
        ],
    ),
    (
        MoodLabel::Sad,
        &[
            "sad", "unhappy", "depressed", "miserable", "lonely", "heartbroken", "cry", "crying",
            "cried", "tears", "upset", "gloomy", "sorrow", "grief", "grieving", "hopeless",
            "hurt", "hurts", "disappointed", "devastated", "miss", "sadly",
        ],
    ),
    (
        MoodLabel::Angry,
        &[
            "angry", "mad", "furious", "hate", "hated", "rage", "livid", "outraged", "pissed",
            "irate", "infuriating", "disgusted", "disgusting", "resent", "hostile",
        ],
    ),
    (
        MoodLabel::Anxious,
        &[
            "anxious", "worried", "worry", "worrying", "nervous", "scared", "afraid", "fear",
            "panic", "panicking", "stressed", "stress", "tense", "uneasy", "overwhelmed",
            "dread", "terrified", "frightened",
        ],
    ),
    (
        MoodLabel::Loving,
        &[
            "love", "loving", "loved", "adore", "adorable", "sweetheart", "darling", "cherish",
            "affection", "hug", "hugs", "kiss", "kisses", "xoxo", "caring", "romantic",
            "beloved",
        ],
    ),
    (
        MoodLabel::Frustrated,
        &[
            "frustrated", "frustrating", "annoyed", "annoying", "irritated", "irritating", "ugh",
            "argh", "stuck", "useless", "ridiculous", "sucks", "bothered", "impatient",
        ],
    ),
    (
        MoodLabel::Peaceful,
        &[
            "peaceful", "calm", "relaxed", "relaxing", "serene", "tranquil", "chill", "content",
            "rested", "soothing", "zen", "mellow", "comfortable", "cozy", "restful",
        ],
    ),
    (
        MoodLabel::Confused,
        &[
            "confused", "confusing", "puzzled", "unsure", "baffled", "perplexed", "huh",
            "unclear", "bewildered", "hmm", "dunno",
        ],
    ),
    (
        MoodLabel::Neutral,
        &["ok", "okay", "fine", "alright", "sure", "whatever", "meh"],
    ),
];

const PHRASES: &[(MoodLabel, &[&str])] = &[
    (
        MoodLabel::Happy,
        &[
            "feel good", "feeling good", "made my day", "good mood", "cloud nine",
            "over the moon", "couldn't be happier",
        ],
    ),
    (
        MoodLabel::Excited,
        &["can't wait", "cannot wait", "looking forward", "let's go", "this is huge"],
    ),
    (
        MoodLabel::Sad,
        &[
            "feel down", "feeling down", "feel low", "feeling low", "broke my heart",
            "want to cry", "bad day", "let down",
        ],
    ),
    (
        MoodLabel::Angry,
        &["pissed off", "sick of", "how dare", "can't stand", "hate it"],
    ),
    (
        MoodLabel::Anxious,
        &[
            "freaking out", "on edge", "can't sleep", "what if", "stressed out",
            "worried about", "panic attack",
        ],
    ),
    (
        MoodLabel::Loving,
        &["love you", "miss you", "thinking of you", "care about", "mean the world"],
    ),
    (
        MoodLabel::Frustrated,
        &[
            "fed up", "give up", "doesn't work", "does not work", "not working",
            "drives me crazy", "waste of time",
        ],
    ),
    (
        MoodLabel::Peaceful,
        &[
            "at peace", "feel calm", "taking it easy", "deep breath", "all good", "no worries",
            "not bad",
        ],
    ),
    (
        MoodLabel::Confused,
        &[
            "don't understand", "do not understand", "doesn't make sense", "makes no sense",
            "not sure", "no idea", "what do you mean", "i'm lost", "don't get it",
        ],
    ),
    (MoodLabel::Neutral, &["i guess", "no problem"]),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "don't", "dont", "doesn't", "doesnt", "didn't", "didnt", "isn't",
    "isnt", "wasn't", "wasnt", "aren't", "arent", "weren't", "can't", "cant", "cannot",
    "won't", "wont", "couldn't", "wouldn't", "shouldn't", "hardly", "barely", "neither", "nor",
    "nothing", "without", "ain't", "haven't", "hasn't", "hadn't", "nope",
];

const INTENSIFIERS: &[&str] = &[
    "so", "very", "really", "extremely", "super", "totally", "incredibly", "truly",
    "absolutely", "completely", "utterly", "deeply", "soo", "sooo",
];

const INTERROGATIVES: &[&str] = &[
    "how", "what", "why", "when", "where", "who", "whom", "whose", "which", "is", "are", "am",
    "do", "does", "did", "can", "could", "would", "will", "should", "shall", "may", "might",
    "was", "were", "how's", "what's", "where's", "who's",
];

const AFFIRMATIONS: &[&str] = &[
    "yes", "yeah", "yep", "yup", "totally", "absolutely", "definitely", "exactly", "same",
    "indeed", "true", "agreed",
];

static KEYWORD_INDEX: LazyLock<HashMap<&'static str, MoodLabel>> = LazyLock::new(|| {
    KEYWORDS
        .iter()
        .flat_map(|(mood, words)| words.iter().map(move |w| (*w, *mood)))
        .collect()
});

/// Phrases pre-split into tokens, longest first so longer phrases win overlaps.
static PHRASE_INDEX: LazyLock<Vec<(MoodLabel, Vec<&'static str>)>> = LazyLock::new(|| {
    let mut phrases: Vec<(MoodLabel, Vec<&'static str>)> = PHRASES
        .iter()
        .flat_map(|(mood, phrases)| {
            phrases
                .iter()
                .map(move |p| (*mood, p.split(' ').collect::<Vec<_>>()))
        })
        .collect();
    phrases.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
    phrases
});

pub fn keyword_mood(token: &str) -> Option<MoodLabel> {
    KEYWORD_INDEX.get(token).copied()
}

pub fn is_negator(token: &str) -> bool {
    NEGATORS.contains(&token)
}

pub fn is_intensifier(token: &str) -> bool {
    INTENSIFIERS.contains(&token)
}

pub fn is_interrogative(token: &str) -> bool {
    INTERROGATIVES.contains(&token)
}

pub fn is_affirmation(token: &str) -> bool {
    AFFIRMATIONS.contains(&token)
}

/// Deterministic negation mapping: what a negated mood becomes, and how much
/// of the original weight survives.
pub fn negate(mood: MoodLabel) -> (MoodLabel, f64) {
    match mood {
        MoodLabel::Happy => (MoodLabel::Sad, 0.8),
        MoodLabel::Excited => (MoodLabel::Sad, 0.5),
        MoodLabel::Loving => (MoodLabel::Sad, 0.6),
        MoodLabel::Peaceful => (MoodLabel::Anxious, 0.6),
        MoodLabel::Sad => (MoodLabel::Peaceful, 0.5),
        MoodLabel::Angry => (MoodLabel::Peaceful, 0.5),
        MoodLabel::Frustrated => (MoodLabel::Peaceful, 0.4),
        MoodLabel::Anxious => (MoodLabel::Peaceful, 0.6),
        MoodLabel::Confused => (MoodLabel::Neutral, 0.5),
        MoodLabel::Neutral => (MoodLabel::Neutral, 1.0),
    }
}

/// One emotional match inside a token run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LexicalMatch {
    pub mood: MoodLabel,
    pub weight: f64,
    pub source: VoteSource,
    /// Index of the first matched token.
    pub position: usize,
}

/// Scan one sentence's tokens against the phrase and keyword tables.
///
/// Phrases are matched first and consume their tokens, so the words inside
/// "can't wait" neither match as keywords nor act as negators. Intensifiers
/// and negators are then applied to each remaining match.
pub fn scan(tokens: &[String]) -> Vec<LexicalMatch> {
    let mut consumed = vec![false; tokens.len()];
    let mut matches = Vec::new();

    for (mood, words) in PHRASE_INDEX.iter() {
        let len = words.len();
        if len > tokens.len() {
            continue;
        }
        let mut i = 0;
        while i + len <= tokens.len() {
            let hit = (0..len).all(|k| !consumed[i + k] && tokens[i + k] == words[k]);
            if hit {
                consumed[i..i + len].iter_mut().for_each(|c| *c = true);
                matches.push(LexicalMatch {
                    mood: *mood,
                    weight: PHRASE_WEIGHT,
                    source: VoteSource::Phrase,
                    position: i,
                });
                i += len;
            } else {
                i += 1;
            }
        }
    }

    for (i, token) in tokens.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        if let Some(mood) = keyword_mood(token) {
            matches.push(LexicalMatch {
                mood,
                weight: KEYWORD_WEIGHT,
                source: VoteSource::Lexical,
                position: i,
            });
        }
    }

    for m in &mut matches {
        if m.position > 0 && !consumed[m.position - 1] && is_intensifier(&tokens[m.position - 1])
        {
            m.weight *= INTENSIFIER_BOOST;
        }

        let scope_start = m.position.saturating_sub(NEGATION_SCOPE);
        let negated = (scope_start..m.position).any(|k| !consumed[k] && is_negator(&tokens[k]));
        if negated {
            let (mood, factor) = negate(m.mood);
            m.mood = mood;
            m.weight *= factor;
            m.source = VoteSource::Negation;
        }
    }

    matches.sort_by_key(|m| m.position);
    matches
}
