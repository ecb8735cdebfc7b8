use regex::Regex;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s']").unwrap());
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+\s+").unwrap());
static APOSTROPHE_TRIM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^'+|'+$").unwrap());

/// Tokenize text into lowercase words.
/// Apostrophes inside words survive ("don't"); typographic apostrophes are
/// folded to ASCII first so "don’t" and "don't" match the same tables.
pub fn tokenize(text: &str) -> Vec<String> {
    let folded = text.replace(['\u{2019}', '\u{2018}'], "'");
    let cleaned = NON_WORD.replace_all(&folded, " ");
    cleaned
        .to_lowercase()
        .split_whitespace()
        .map(|t| APOSTROPHE_TRIM.replace_all(t, "").to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Canonical cache key: tokens joined by single spaces.
/// Punctuation, case and spacing differences all collapse to the same key.
pub fn normalize(text: &str) -> String {
    tokenize(text).join(" ")
}

/// Split text into sentences. The terminating punctuation run stays
/// attached to its sentence ("Wow!!! Nice." → ["Wow!!!", "Nice."]).
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last = 0;

    for m in SENTENCE_END.find_iter(text) {
        let sentence = text[last..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last = m.end();
    }

    let remainder = text[last..].trim();
    if !remainder.is_empty() {
        sentences.push(remainder.to_string());
    }

    sentences
}
