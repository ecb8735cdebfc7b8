//! Weighted vote combination.
//!
//! Four vote sources feed one score vector: the signal report, the context
//! window, learned personalization patterns, and (deep pass only) the
//! external classifier. Each source's votes are normalized to unit mass and
//! then scaled by the source weight, so a chatty source cannot drown out a
//! terse one.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::constants::EPSILON;
use crate::context::ContextWindow;
use crate::mood::MoodLabel;
use crate::reading::{VoteSource, WeightedVote};
use crate::signal::SignalReport;

/// Trend magnitude is divided by this to become a vote weight.
const TREND_DIVISOR: f64 = 4.0;

/// Which pass is scoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    Fast,
    Deep,
}

/// Everything the ensemble looks at for one message.
#[derive(Clone, Copy, Debug)]
pub struct EnsembleInput<'a> {
    pub signal: &'a SignalReport,
    pub context: &'a ContextWindow,
    pub personalization: &'a [WeightedVote],
    pub pattern_count: usize,
    /// Only read on the deep pass.
    pub gateway: Option<MoodLabel>,
}

/// How much each source counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SourceWeights {
    pub signal: f64,
    pub context: f64,
    pub personalization: f64,
    pub gateway: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnsembleResult {
    pub mood: MoodLabel,
    /// Final confidence after pass caps, bonuses and the neutral ceiling.
    pub confidence: f64,
    /// top / Σ scores before any adjustment.
    pub raw_confidence: f64,
    /// Indexed by [`MoodLabel::index`].
    pub scores: [f64; 10],
    pub weights: SourceWeights,
    pub tie_broken: bool,
    pub forced_neutral: bool,
}

#[derive(Clone, Debug)]
pub struct EnsembleScorer {
    max_context_weight: f64,
    max_personalization_weight: f64,
    pattern_saturation: usize,
    gateway_share: f64,
    fast_confidence_cap: f64,
    neutral_confidence_ceiling: f64,
    consistency_bonus_threshold: f64,
    consistency_bonus: f64,
    coherence_bonus: f64,
}

impl Default for EnsembleScorer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl EnsembleScorer {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_context_weight: config.max_context_weight,
            max_personalization_weight: config.max_personalization_weight,
            pattern_saturation: config.pattern_saturation.max(1),
            gateway_share: config.gateway_share,
            fast_confidence_cap: config.fast_confidence_cap,
            neutral_confidence_ceiling: config.neutral_confidence_ceiling,
            consistency_bonus_threshold: config.consistency_bonus_threshold,
            consistency_bonus: config.consistency_bonus,
            coherence_bonus: config.coherence_bonus,
        }
    }

    pub fn fast_confidence_cap(&self) -> f64 {
        self.fast_confidence_cap
    }

    pub fn neutral_confidence_ceiling(&self) -> f64 {
        self.neutral_confidence_ceiling
    }

    /// Source weights for a given context fill, pattern count and gateway
    /// presence. They always sum to 1.
    pub fn source_weights(
        &self,
        context: &ContextWindow,
        pattern_count: usize,
        has_gateway: bool,
    ) -> SourceWeights {
        let context_w =
            (context.len() as f64 / context.capacity() as f64).min(self.max_context_weight);
        let personalization_w = (pattern_count as f64 / self.pattern_saturation as f64)
            .min(self.max_personalization_weight);
        let remainder = (1.0 - context_w - personalization_w).max(0.0);
        let (signal_w, gateway_w) = if has_gateway {
            (
                remainder * (1.0 - self.gateway_share),
                remainder * self.gateway_share,
            )
        } else {
            (remainder, 0.0)
        };
        SourceWeights {
            signal: signal_w,
            context: context_w,
            personalization: personalization_w,
            gateway: gateway_w,
        }
    }

    pub fn score(&self, input: &EnsembleInput<'_>, pass: Pass) -> EnsembleResult {
        let gateway = match pass {
            Pass::Deep => input.gateway,
            Pass::Fast => None,
        };
        let weights = self.source_weights(input.context, input.pattern_count, gateway.is_some());

        let mut context_votes = input.context.votes();
        if pass == Pass::Deep {
            let trend = input.context.trend();
            if trend.abs() > EPSILON {
                let mood = if trend > 0.0 {
                    MoodLabel::Happy
                } else {
                    MoodLabel::Sad
                };
                context_votes.push(WeightedVote::new(
                    mood,
                    trend.abs() / TREND_DIVISOR,
                    VoteSource::Context,
                ));
            }
        }
        let gateway_votes: Vec<WeightedVote> = gateway
            .map(|m| WeightedVote::new(m, 1.0, VoteSource::Gateway))
            .into_iter()
            .collect();

        let mut scores = [0.0f64; 10];
        accumulate(&mut scores, &input.signal.votes, weights.signal);
        accumulate(&mut scores, &context_votes, weights.context);
        accumulate(&mut scores, input.personalization, weights.personalization);
        accumulate(&mut scores, &gateway_votes, weights.gateway);

        let total: f64 = scores.iter().sum();

        if input.signal.forced_neutral {
            let share = if total > EPSILON {
                scores[MoodLabel::Neutral.index()] / total
            } else {
                0.0
            };
            return EnsembleResult {
                mood: MoodLabel::Neutral,
                confidence: share.min(self.neutral_confidence_ceiling),
                raw_confidence: share,
                scores,
                weights,
                tie_broken: false,
                forced_neutral: true,
            };
        }

        if total <= EPSILON {
            return EnsembleResult {
                mood: MoodLabel::Neutral,
                confidence: 0.0,
                raw_confidence: 0.0,
                scores,
                weights,
                tie_broken: false,
                forced_neutral: false,
            };
        }

        let top = scores.iter().copied().fold(f64::MIN, f64::max);
        let tied: Vec<MoodLabel> = MoodLabel::ALL
            .into_iter()
            .filter(|m| (scores[m.index()] - top).abs() <= EPSILON)
            .collect();
        let (mood, tie_broken) = match tied.as_slice() {
            [only] => (*only, false),
            _ => (
                input
                    .context
                    .most_recent_of(&tied)
                    .unwrap_or(MoodLabel::Neutral),
                true,
            ),
        };

        let raw = top / total;
        let mut confidence = match pass {
            Pass::Fast => raw.min(self.fast_confidence_cap),
            Pass::Deep => {
                let mut c = raw;
                if input.context.consistency(mood) > self.consistency_bonus_threshold {
                    c += self.consistency_bonus;
                }
                if input.context.coherence() {
                    c += self.coherence_bonus;
                }
                c.min(1.0)
            }
        };
        if mood == MoodLabel::Neutral {
            confidence = confidence.min(self.neutral_confidence_ceiling);
        }

        EnsembleResult {
            mood,
            confidence: confidence.clamp(0.0, 1.0),
            raw_confidence: raw,
            scores,
            weights,
            tie_broken,
            forced_neutral: false,
        }
    }
}

/// Add one source's votes, normalized to unit mass, scaled by `weight`.
fn accumulate(scores: &mut [f64; 10], votes: &[WeightedVote], weight: f64) {
    if weight <= 0.0 {
        return;
    }
    let mass: f64 = votes.iter().map(|v| v.weight).sum();
    if mass <= EPSILON {
        return;
    }
    for vote in votes {
        scores[vote.mood.index()] += weight * vote.weight / mass;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::SentimentReading;
    use crate::signal::SignalExtractor;
    use approx::assert_relative_eq;

    fn report(votes: Vec<WeightedVote>) -> SignalReport {
        SignalReport {
            votes,
            ..SignalReport::default()
        }
    }

    fn vote(mood: MoodLabel, weight: f64) -> WeightedVote {
        WeightedVote::new(mood, weight, VoteSource::Lexical)
    }

    fn window_of(moods: &[MoodLabel]) -> ContextWindow {
        let mut w = ContextWindow::default();
        for (i, m) in moods.iter().enumerate() {
            w.append(SentimentReading::new(*m, 0.6, "earlier", i as u64));
        }
        w
    }

    fn score_text(text: &str, pass: Pass) -> EnsembleResult {
        let signal = SignalExtractor::default().extract(text, &[]);
        let context = ContextWindow::default();
        EnsembleScorer::default().score(
            &EnsembleInput {
                signal: &signal,
                context: &context,
                personalization: &[],
                pattern_count: 0,
                gateway: None,
            },
            pass,
        )
    }

    #[test]
    fn test_weights_sum_to_one() {
        let scorer = EnsembleScorer::default();
        for len in [0usize, 3, 8, 15] {
            let moods = vec![MoodLabel::Happy; len];
            let w = window_of(&moods);
            for patterns in [0usize, 10, 200] {
                for gw in [false, true] {
                    let sw = scorer.source_weights(&w, patterns, gw);
                    assert_relative_eq!(
                        sw.signal + sw.context + sw.personalization + sw.gateway,
                        1.0,
                        epsilon = 1e-12
                    );
                    assert!(sw.context <= 0.3 + 1e-12);
                    assert!(sw.personalization <= 0.2 + 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_gateway_split() {
        let sw = EnsembleScorer::default().source_weights(&ContextWindow::default(), 0, true);
        assert_relative_eq!(sw.signal, 0.6);
        assert_relative_eq!(sw.gateway, 0.4);
    }

    #[test]
    fn test_empty_text_is_neutral_low() {
        let r = score_text("", Pass::Fast);
        assert_eq!(r.mood, MoodLabel::Neutral);
        assert!(r.confidence <= 0.3);
        let r = score_text("   ", Pass::Deep);
        assert_eq!(r.mood, MoodLabel::Neutral);
        assert!(r.confidence <= 0.3);
    }

    #[test]
    fn test_positive_words_fast_and_deep() {
        let fast = score_text("wonderful amazing fantastic", Pass::Fast);
        assert_eq!(fast.mood, MoodLabel::Happy);
        assert!(fast.confidence <= 0.7 + 1e-12);
        assert!(fast.raw_confidence > 0.6);
        let deep = score_text("wonderful amazing fantastic", Pass::Deep);
        assert_eq!(deep.mood, MoodLabel::Happy);
        assert!(deep.confidence > 0.6);
    }

    #[test]
    fn test_exclaimed_happiness_confidence() {
        let fast = score_text("I am so happy today!!!", Pass::Fast);
        assert_eq!(fast.mood, MoodLabel::Happy);
        assert_relative_eq!(fast.confidence, 0.7);
        let deep = score_text("I am so happy today!!!", Pass::Deep);
        assert!(deep.confidence >= 0.7);
    }

    #[test]
    fn test_question_is_neutral_regardless_of_history() {
        let signal = SignalExtractor::default().extract("How are you?", &[]);
        let context = window_of(&[MoodLabel::Angry; 15]);
        for pass in [Pass::Fast, Pass::Deep] {
            let r = EnsembleScorer::default().score(
                &EnsembleInput {
                    signal: &signal,
                    context: &context,
                    personalization: &[],
                    pattern_count: 0,
                    gateway: Some(MoodLabel::Angry),
                },
                pass,
            );
            assert_eq!(r.mood, MoodLabel::Neutral);
            assert!(r.confidence <= 0.3);
            assert!(r.forced_neutral);
        }
    }

    #[test]
    fn test_exact_tie_empty_context_is_neutral() {
        let signal = report(vec![vote(MoodLabel::Happy, 1.0), vote(MoodLabel::Sad, 1.0)]);
        let context = ContextWindow::default();
        let r = EnsembleScorer::default().score(
            &EnsembleInput {
                signal: &signal,
                context: &context,
                personalization: &[],
                pattern_count: 0,
                gateway: None,
            },
            Pass::Fast,
        );
        assert_eq!(r.mood, MoodLabel::Neutral);
        assert!(r.tie_broken);
        assert!(r.confidence <= 0.25);
    }

    #[test]
    fn test_tie_prefers_most_recent_in_context() {
        let signal = report(vec![vote(MoodLabel::Happy, 1.0), vote(MoodLabel::Sad, 1.0)]);
        // context votes must not break the tie themselves: equal shares
        let context = window_of(&[MoodLabel::Sad, MoodLabel::Happy]);
        let r = EnsembleScorer::default().score(
            &EnsembleInput {
                signal: &signal,
                context: &context,
                personalization: &[],
                pattern_count: 0,
                gateway: None,
            },
            Pass::Fast,
        );
        assert!(r.tie_broken);
        assert_eq!(r.mood, MoodLabel::Happy);
    }

    #[test]
    fn test_gateway_ignored_on_fast_pass() {
        let signal = report(vec![vote(MoodLabel::Sad, 1.0)]);
        let context = ContextWindow::default();
        let input = EnsembleInput {
            signal: &signal,
            context: &context,
            personalization: &[],
            pattern_count: 0,
            gateway: Some(MoodLabel::Happy),
        };
        let fast = EnsembleScorer::default().score(&input, Pass::Fast);
        assert_eq!(fast.weights.gateway, 0.0);
        assert_eq!(fast.mood, MoodLabel::Sad);
        let deep = EnsembleScorer::default().score(&input, Pass::Deep);
        assert_relative_eq!(deep.weights.gateway, 0.4);
        assert_relative_eq!(deep.scores[MoodLabel::Happy.index()], 0.4);
        assert_eq!(deep.mood, MoodLabel::Sad);
    }

    #[test]
    fn test_consistency_bonus() {
        let signal = report(vec![vote(MoodLabel::Sad, 1.0)]);
        let context = window_of(&[MoodLabel::Sad; 10]);
        let r = EnsembleScorer::default().score(
            &EnsembleInput {
                signal: &signal,
                context: &context,
                personalization: &[],
                pattern_count: 0,
                gateway: None,
            },
            Pass::Deep,
        );
        assert_eq!(r.mood, MoodLabel::Sad);
        // raw is 1.0 already, bonuses saturate at the cap
        assert_relative_eq!(r.confidence, 1.0);
    }

    #[test]
    fn test_deep_trend_vote() {
        let signal = report(vec![vote(MoodLabel::Neutral, 1.0)]);
        let context = window_of(&[MoodLabel::Sad, MoodLabel::Sad, MoodLabel::Happy, MoodLabel::Happy]);
        let input = EnsembleInput {
            signal: &signal,
            context: &context,
            personalization: &[],
            pattern_count: 0,
            gateway: None,
        };
        let fast = EnsembleScorer::default().score(&input, Pass::Fast);
        let deep = EnsembleScorer::default().score(&input, Pass::Deep);
        let happy = MoodLabel::Happy.index();
        assert!(deep.scores[happy] > fast.scores[happy]);
    }

    #[test]
    fn test_personalization_weight_grows_with_patterns() {
        let signal = report(vec![vote(MoodLabel::Happy, 1.0)]);
        let context = ContextWindow::default();
        let personal = vec![WeightedVote::new(
            MoodLabel::Frustrated,
            1.0,
            VoteSource::Personalization,
        )];
        let score_with = |count| {
            EnsembleScorer::default().score(
                &EnsembleInput {
                    signal: &signal,
                    context: &context,
                    personalization: &personal,
                    pattern_count: count,
                    gateway: None,
                },
                Pass::Fast,
            )
        };
        let few = score_with(5);
        let many = score_with(500);
        assert_relative_eq!(few.weights.personalization, 0.1);
        assert_relative_eq!(many.weights.personalization, 0.2);
        assert!(
            many.scores[MoodLabel::Frustrated.index()] > few.scores[MoodLabel::Frustrated.index()]
        );
    }

    #[test]
    fn test_neutral_ceiling() {
        let signal = report(vec![vote(MoodLabel::Neutral, 3.0)]);
        let context = ContextWindow::default();
        let r = EnsembleScorer::default().score(
            &EnsembleInput {
                signal: &signal,
                context: &context,
                personalization: &[],
                pattern_count: 0,
                gateway: None,
            },
            Pass::Deep,
        );
        assert_eq!(r.mood, MoodLabel::Neutral);
        assert_relative_eq!(r.raw_confidence, 1.0);
        assert_relative_eq!(r.confidence, 0.25);
    }
}
