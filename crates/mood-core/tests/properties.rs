//! Cross-module tests: extractor → context → ensemble, driven the way the
//! async engine drives them, plus property checks over arbitrary input.

use mood_core::{
    ContextWindow, EnsembleInput, EnsembleScorer, MoodLabel, Pass, PatternTable, ResultCache,
    SentimentReading, SignalExtractor, normalize,
};
use proptest::prelude::*;

/// Synchronous stand-in for one conversation: fast pass, append, deep pass
/// on the pre-append snapshot, replace.
struct Conversation {
    extractor: SignalExtractor,
    scorer: EnsembleScorer,
    context: ContextWindow,
    cache: ResultCache,
    patterns: PatternTable,
    prior: Vec<String>,
    seq: u64,
}

impl Conversation {
    fn new() -> Self {
        Self {
            extractor: SignalExtractor::default(),
            scorer: EnsembleScorer::default(),
            context: ContextWindow::default(),
            cache: ResultCache::default(),
            patterns: PatternTable::new(),
            prior: Vec::new(),
            seq: 0,
        }
    }

    /// Returns (fast, final) readings.
    fn analyze(&mut self, text: &str) -> (SentimentReading, SentimentReading) {
        let seq = self.seq;
        self.seq += 1;
        let key = normalize(text);
        if let Some(mood) = self.cache.get(&key) {
            let ceiling = if mood == MoodLabel::Neutral {
                self.scorer.neutral_confidence_ceiling()
            } else {
                self.scorer.fast_confidence_cap()
            };
            let conf = self.cache.confidence(&key).unwrap_or(ceiling).min(ceiling);
            let reading = SentimentReading::new(mood, conf, text, seq);
            self.context.append(reading.clone());
            return (reading.clone(), reading);
        }

        let signal = self.extractor.extract(text, &self.prior);
        let personal = self.patterns.votes(&signal.tokens);
        let snapshot = self.context.clone();
        let input = EnsembleInput {
            signal: &signal,
            context: &snapshot,
            personalization: &personal,
            pattern_count: self.patterns.pattern_count(),
            gateway: None,
        };
        let fast = self.scorer.score(&input, Pass::Fast);
        let fast_reading = SentimentReading::new(fast.mood, fast.confidence, text, seq);
        self.context.append(fast_reading.clone());
        self.cache.put(&key, fast.mood, fast.confidence);
        self.prior.push(text.to_string());
        if signal.forced_neutral {
            return (fast_reading.clone(), fast_reading);
        }

        let deep = self.scorer.score(&input, Pass::Deep);
        let refined = fast_reading.refined(deep.mood, deep.confidence);
        self.context.replace(refined.clone());
        self.cache.put(&key, deep.mood, deep.confidence);
        (fast_reading, refined)
    }
}

#[test]
fn empty_input_is_neutral() {
    let mut conv = Conversation::new();
    for text in ["", "   ", "\n\t"] {
        let (fast, last) = conv.analyze(text);
        assert_eq!(fast.mood, MoodLabel::Neutral);
        assert_eq!(last.mood, MoodLabel::Neutral);
        assert!(last.confidence <= 0.3);
    }
}

#[test]
fn strongly_positive_words() {
    let mut conv = Conversation::new();
    let (fast, last) = conv.analyze("wonderful amazing fantastic");
    assert!(fast.confidence <= 0.7);
    assert!(matches!(
        last.mood,
        MoodLabel::Happy | MoodLabel::Excited | MoodLabel::Loving
    ));
    assert!(last.confidence > 0.6);
}

#[test]
fn exclaimed_happiness() {
    let mut conv = Conversation::new();
    let (_, last) = conv.analyze("I am so happy today!!!");
    assert!(matches!(last.mood, MoodLabel::Happy | MoodLabel::Excited));
    assert!(last.confidence >= 0.7);
}

#[test]
fn plain_question_after_strong_history() {
    let mut conv = Conversation::new();
    for _ in 0..6 {
        conv.analyze("I am furious, I hate this so much!!!");
    }
    let (fast, last) = conv.analyze("How are you?");
    assert_eq!(fast.mood, MoodLabel::Neutral);
    assert_eq!(last.mood, MoodLabel::Neutral);
    assert!(last.confidence <= 0.3);
}

#[test]
fn cache_is_idempotent_across_positions() {
    let mut conv = Conversation::new();
    let (_, first) = conv.analyze("I am so tired of this, ugh");
    conv.analyze("wonderful amazing fantastic");
    conv.analyze("what a lovely afternoon");
    let (_, second) = conv.analyze("i am SO tired of this... ugh!");
    // different punctuation and case, same normalized text
    assert_eq!(first.mood, second.mood);
    assert!(second.confidence <= first.confidence);
}

#[test]
fn context_stays_bounded() {
    let mut conv = Conversation::new();
    for i in 0..40 {
        conv.analyze(&format!("message number {i} is fine"));
        assert!(conv.context.len() <= 15);
    }
    assert_eq!(conv.context.len(), 15);
    let first = conv.context.iter().next().map(|r| r.sequence);
    assert_eq!(first, Some(25));
}

#[test]
fn negated_reply_borrows_prior_mood() {
    let mut conv = Conversation::new();
    conv.analyze("Are you excited about the trip?");
    let (_, last) = conv.analyze("not really");
    assert_ne!(last.mood, MoodLabel::Excited);
}

proptest! {
    #[test]
    fn confidence_is_bounded(text in ".{0,120}") {
        let mut conv = Conversation::new();
        let (fast, last) = conv.analyze(&text);
        prop_assert!((0.0..=0.7 + 1e-12).contains(&fast.confidence));
        prop_assert!((0.0..=1.0).contains(&last.confidence));
    }

    #[test]
    fn neutral_never_exceeds_ceiling(text in "[a-zA-Z ?!.,']{0,80}") {
        let mut conv = Conversation::new();
        let (fast, last) = conv.analyze(&text);
        for r in [fast, last] {
            if r.mood == MoodLabel::Neutral {
                prop_assert!(r.confidence <= 0.25 + 1e-12);
            }
        }
    }

    #[test]
    fn whitespace_only_is_neutral(text in "[ \t\n]{0,20}") {
        let mut conv = Conversation::new();
        let (_, last) = conv.analyze(&text);
        prop_assert_eq!(last.mood, MoodLabel::Neutral);
        prop_assert!(last.confidence <= 0.3);
    }

    #[test]
    fn window_never_exceeds_capacity(moods in prop::collection::vec(0usize..10, 0..60), cap in 1usize..20) {
        let mut window = ContextWindow::new(cap);
        for (i, m) in moods.iter().enumerate() {
            window.append(SentimentReading::new(MoodLabel::ALL[*m], 0.5, "x", i as u64));
            prop_assert!(window.len() <= cap);
        }
        prop_assert_eq!(window.len(), moods.len().min(cap));
    }

    #[test]
    fn cache_never_exceeds_capacity(keys in prop::collection::vec("[a-z]{1,4}", 0..120)) {
        let mut cache = ResultCache::new(50);
        for k in &keys {
            cache.put(k, MoodLabel::Happy, 0.5);
            prop_assert!(cache.len() <= 50);
        }
        if let Some(last) = keys.last() {
            prop_assert_eq!(cache.get(last), Some(MoodLabel::Happy));
        }
    }

    #[test]
    fn extraction_is_deterministic(text in ".{0,80}") {
        let extractor = SignalExtractor::default();
        prop_assert_eq!(extractor.extract(&text, &[]), extractor.extract(&text, &[]));
    }
}
