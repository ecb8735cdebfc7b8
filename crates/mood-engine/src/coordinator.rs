//! Progressive refinement coordinator.
//!
//! `analyze` publishes a fast estimate before it returns and leaves a deep
//! pass running on a tracked background task. The deep pass works on the
//! context snapshot taken at fast time, consults the external classifier,
//! and publishes only if no newer message has been published since.
//!
//! All session state sits behind one async mutex. The gateway call is the
//! only await that happens outside it.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use mood_core::{
    ConfigError, ContextWindow, EngineConfig, EnsembleInput, EnsembleScorer, IntensityRules,
    MoodLabel, Pass, PatternTable, ReadingSink, RefinementPhase, RefinementTracker, ResultCache,
    SentimentReading, SignalExtractor, SignalReport, UiIntensity, WeightedVote, normalize,
};
use serde::Serialize;
use tokio::sync::{Mutex, broadcast, watch};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::gateway::{Gateway, GatewayOutcome};

/// Transition events buffered per subscriber before the slowest lags.
const TRANSITION_BUFFER: usize = 64;

/// The published mood state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MoodSnapshot {
    pub mood: MoodLabel,
    pub confidence: f64,
    pub intensity: UiIntensity,
    /// Sequence of the message this state came from, if any.
    pub sequence: Option<u64>,
    pub refined: bool,
}

impl Default for MoodSnapshot {
    fn default() -> Self {
        Self {
            mood: MoodLabel::Neutral,
            confidence: 0.0,
            intensity: UiIntensity::Neutral,
            sequence: None,
            refined: false,
        }
    }
}

/// A significant change of published state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MoodTransition {
    pub from: MoodLabel,
    pub to: MoodLabel,
    pub previous_confidence: f64,
    pub confidence: f64,
    pub intensity: UiIntensity,
    pub sequence: u64,
    pub refined: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EngineStats {
    pub analyzed: u64,
    pub cache_hits: u64,
    pub refined_published: u64,
    pub superseded: u64,
    pub gateway_votes: u64,
    pub gateway_no_votes: u64,
    pub gateway_unavailable: u64,
    pub gateway_timeouts: u64,
    pub sink_failures: u64,
    pub context_len: usize,
    pub cache_len: usize,
    pub pattern_count: usize,
    pub in_flight: usize,
}

struct Session {
    context: ContextWindow,
    cache: ResultCache,
    patterns: PatternTable,
    recent_texts: VecDeque<String>,
    next_sequence: u64,
    refinement: RefinementTracker,
    published: (MoodLabel, f64),
    /// Fast readings whose deep pass has not reported back yet.
    pending: BTreeMap<u64, SentimentReading>,
    /// Bumped whenever the cache is cleared.
    cache_generation: u64,
    sink: Option<Box<dyn ReadingSink>>,
    stats: EngineStats,
}

impl Session {
    fn remember_text(&mut self, text: &str, limit: usize) {
        if limit == 0 {
            return;
        }
        while self.recent_texts.len() >= limit {
            self.recent_texts.pop_front();
        }
        self.recent_texts.push_back(text.to_string());
    }

    fn record(&mut self, reading: &SentimentReading) {
        if let Some(sink) = self.sink.as_mut()
            && let Err(e) = sink.record_reading(reading)
        {
            warn!(sequence = reading.sequence, "failed to record reading: {e}");
            self.stats.sink_failures += 1;
        }
    }

    fn learn(&mut self, tokens: &[String], mood: MoodLabel) {
        let learned = self.patterns.learn(tokens, mood);
        if learned.is_empty() {
            return;
        }
        debug!(count = learned.len(), %mood, "learned patterns");
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        for word in &learned {
            if let Err(e) = sink.record_pattern(word, mood) {
                warn!(word = %word, "failed to record pattern: {e}");
                self.stats.sink_failures += 1;
            }
        }
    }
}

/// Everything the deep pass needs, captured at fast time.
struct DeepJob {
    key: String,
    fast: SentimentReading,
    signal: SignalReport,
    personalization: Vec<WeightedVote>,
    pattern_count: usize,
    snapshot: ContextWindow,
    cache_generation: u64,
}

struct EngineInner {
    config: EngineConfig,
    extractor: SignalExtractor,
    scorer: EnsembleScorer,
    rules: IntensityRules,
    gateway: Gateway,
    session: Mutex<Session>,
    state: watch::Sender<MoodSnapshot>,
    transitions: broadcast::Sender<MoodTransition>,
    tracker: TaskTracker,
}

/// Builder for [`MoodEngine`]. Every collaborator is optional.
pub struct MoodEngineBuilder {
    config: EngineConfig,
    extractor: Option<SignalExtractor>,
    gateway: Gateway,
    sink: Option<Box<dyn ReadingSink>>,
    patterns: PatternTable,
}

impl MoodEngineBuilder {
    pub fn extractor(mut self, extractor: SignalExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn gateway(mut self, gateway: Gateway) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn sink(mut self, sink: Box<dyn ReadingSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Seed the learned pattern table, typically loaded from storage.
    pub fn patterns(mut self, patterns: PatternTable) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn build(self) -> Result<MoodEngine, ConfigError> {
        self.config.validate()?;
        let (state, _) = watch::channel(MoodSnapshot::default());
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        let session = Session {
            context: ContextWindow::new(self.config.window_capacity)
                .with_coherence_ratio(self.config.coherence_ratio),
            cache: ResultCache::new(self.config.cache_capacity),
            patterns: self.patterns,
            recent_texts: VecDeque::new(),
            next_sequence: 0,
            refinement: RefinementTracker::new(),
            published: (MoodLabel::Neutral, 0.0),
            pending: BTreeMap::new(),
            cache_generation: 0,
            sink: self.sink,
            stats: EngineStats::default(),
        };
        Ok(MoodEngine {
            inner: Arc::new(EngineInner {
                scorer: EnsembleScorer::from_config(&self.config),
                rules: IntensityRules::from_config(&self.config),
                extractor: self.extractor.unwrap_or_default(),
                gateway: self.gateway,
                session: Mutex::new(session),
                state,
                transitions,
                tracker: TaskTracker::new(),
                config: self.config,
            }),
        })
    }
}

/// The engine. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct MoodEngine {
    inner: Arc<EngineInner>,
}

impl MoodEngine {
    pub fn builder(config: EngineConfig) -> MoodEngineBuilder {
        MoodEngineBuilder {
            config,
            extractor: None,
            gateway: Gateway::disabled(),
            sink: None,
            patterns: PatternTable::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn gateway_enabled(&self) -> bool {
        self.inner.gateway.is_enabled()
    }

    /// Analyze one message. The fast estimate is published before this
    /// returns; the refinement, if any, is published later.
    pub async fn analyze(&self, text: &str) {
        let inner = &self.inner;
        let key = normalize(text);

        let mut guard = inner.session.lock().await;
        let session = &mut *guard;
        let sequence = session.next_sequence;
        session.next_sequence += 1;
        session.stats.analyzed += 1;

        if let Some(mood) = session.cache.get(&key) {
            let ceiling = if mood == MoodLabel::Neutral {
                inner.scorer.neutral_confidence_ceiling()
            } else {
                inner.scorer.fast_confidence_cap()
            };
            // A hit replays the stored result and never claims more than it did.
            let confidence = session
                .cache
                .confidence(&key)
                .unwrap_or(ceiling)
                .min(ceiling);
            let reading = SentimentReading::new(mood, confidence, text, sequence);
            debug!(sequence, %mood, "cache hit");
            session.stats.cache_hits += 1;
            session.refinement.fast_published(sequence, true);
            self.publish(session, &reading, false);
            session.context.append(reading.clone());
            session.remember_text(text, inner.config.prior_text_limit);
            session.record(&reading);
            return;
        }

        let prior: Vec<String> = session.recent_texts.iter().cloned().collect();
        let signal = inner.extractor.extract(text, &prior);
        let personalization = session.patterns.votes(&signal.tokens);
        let pattern_count = session.patterns.pattern_count();
        let snapshot = session.context.clone();

        let fast = inner.scorer.score(
            &EnsembleInput {
                signal: &signal,
                context: &snapshot,
                personalization: &personalization,
                pattern_count,
                gateway: None,
            },
            Pass::Fast,
        );
        let reading = SentimentReading::new(fast.mood, fast.confidence, text, sequence);
        let settled = signal.forced_neutral;
        debug!(
            sequence,
            mood = %fast.mood,
            confidence = fast.confidence,
            settled,
            "fast estimate"
        );

        session.refinement.fast_published(sequence, settled);
        self.publish(session, &reading, false);
        session.context.append(reading.clone());
        session.cache.put(&key, fast.mood, fast.confidence);
        session.remember_text(text, inner.config.prior_text_limit);

        if settled {
            session.record(&reading);
            return;
        }

        session.refinement.deep_started(sequence);
        session.pending.insert(sequence, reading.clone());
        let cache_generation = session.cache_generation;
        drop(guard);

        let job = DeepJob {
            key,
            fast: reading,
            signal,
            personalization,
            pattern_count,
            snapshot,
            cache_generation,
        };
        let engine = self.clone();
        inner.tracker.spawn(async move {
            engine.refine(job).await;
        });
    }

    async fn refine(&self, job: DeepJob) {
        let inner = &self.inner;
        let sequence = job.fast.sequence;
        let outcome = inner.gateway.consult(&job.fast.source_text).await;

        let mut guard = inner.session.lock().await;
        let session = &mut *guard;
        match outcome {
            GatewayOutcome::Vote(_) => session.stats.gateway_votes += 1,
            GatewayOutcome::NoVote => session.stats.gateway_no_votes += 1,
            GatewayOutcome::Unavailable => session.stats.gateway_unavailable += 1,
            GatewayOutcome::TimedOut => session.stats.gateway_timeouts += 1,
        }

        if session.pending.remove(&sequence).is_none() {
            // reset_conversation already recorded the fast reading
            debug!(sequence, "dropping deep pass from a finished conversation");
            return;
        }

        if sequence < session.refinement.floor() {
            debug!(sequence, "context reset during deep pass, fast estimate stands");
            session.record(&job.fast);
            return;
        }

        if outcome == GatewayOutcome::TimedOut {
            info!(sequence, "classifier timed out, fast estimate stands");
            session.refinement.settle(sequence);
            session.record(&job.fast);
            return;
        }

        let deep = inner.scorer.score(
            &EnsembleInput {
                signal: &job.signal,
                context: &job.snapshot,
                personalization: &job.personalization,
                pattern_count: job.pattern_count,
                gateway: outcome.vote(),
            },
            Pass::Deep,
        );
        let refined = job.fast.refined(deep.mood, deep.confidence);
        debug!(
            sequence,
            mood = %deep.mood,
            confidence = deep.confidence,
            gateway = ?outcome,
            "deep estimate"
        );

        session.context.replace(refined.clone());
        if job.cache_generation == session.cache_generation {
            session.cache.put(&job.key, deep.mood, deep.confidence);
        }
        if deep.confidence >= inner.config.learn_threshold && deep.mood != MoodLabel::Neutral {
            session.learn(&job.signal.tokens, deep.mood);
        }
        session.record(&refined);

        if session.refinement.may_publish_refined(sequence) {
            self.publish(session, &refined, true);
            session.refinement.refined_published(sequence);
            session.stats.refined_published += 1;
        } else {
            debug!(sequence, "refinement superseded");
            session.refinement.settle(sequence);
            session.stats.superseded += 1;
        }
    }

    fn publish(&self, session: &mut Session, reading: &SentimentReading, refined: bool) {
        let inner = &self.inner;
        let previous = session.published;
        let next = (reading.mood, reading.confidence);
        let intensity = inner.rules.classify(reading.mood, reading.confidence);

        if inner.rules.is_significant(previous, next) {
            // no subscribers is fine
            let _ = inner.transitions.send(MoodTransition {
                from: previous.0,
                to: next.0,
                previous_confidence: previous.1,
                confidence: next.1,
                intensity,
                sequence: reading.sequence,
                refined,
            });
        }
        session.published = next;
        inner.state.send_replace(MoodSnapshot {
            mood: reading.mood,
            confidence: reading.confidence,
            intensity,
            sequence: Some(reading.sequence),
            refined,
        });
    }

    /// Current published state.
    pub fn snapshot(&self) -> MoodSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Watch the published state.
    pub fn subscribe(&self) -> watch::Receiver<MoodSnapshot> {
        self.inner.state.subscribe()
    }

    /// Receive significant transitions.
    pub fn transitions(&self) -> broadcast::Receiver<MoodTransition> {
        self.inner.transitions.subscribe()
    }

    /// Wait until every deep pass started so far has finished.
    pub async fn settle(&self) {
        let tracker = &self.inner.tracker;
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
    }

    /// Refinement phase of a message, by sequence.
    pub async fn phase(&self, sequence: u64) -> RefinementPhase {
        self.inner.session.lock().await.refinement.phase(sequence)
    }

    /// Clear the rolling context. In-flight deep passes will not publish.
    pub async fn reset_context(&self) {
        let mut session = self.inner.session.lock().await;
        let next = session.next_sequence;
        session.context.clear();
        session.recent_texts.clear();
        session.refinement.reset(next);
    }

    /// Forget remembered results. Deep passes already running will not
    /// write theirs back.
    pub async fn clear_cache(&self) {
        let mut session = self.inner.session.lock().await;
        session.cache.clear();
        session.cache_generation += 1;
    }

    /// Start over: context, cache and published state are cleared, and the
    /// sink is told a new conversation began. Learned patterns survive.
    /// Messages still being refined keep their fast reading, recorded under
    /// the conversation they belong to.
    pub async fn reset_conversation(&self) {
        let mut guard = self.inner.session.lock().await;
        let session = &mut *guard;
        let next = session.next_sequence;
        for reading in std::mem::take(&mut session.pending).into_values() {
            session.record(&reading);
        }
        session.context.clear();
        session.cache.clear();
        session.cache_generation += 1;
        session.recent_texts.clear();
        session.refinement.reset(next);
        session.published = (MoodLabel::Neutral, 0.0);
        if let Some(sink) = session.sink.as_mut()
            && let Err(e) = sink.begin_conversation()
        {
            warn!("failed to begin conversation: {e}");
            session.stats.sink_failures += 1;
        }
        self.inner.state.send_replace(MoodSnapshot::default());
        info!("conversation reset");
    }

    /// Context entries, oldest first.
    pub async fn context(&self) -> Vec<SentimentReading> {
        self.inner.session.lock().await.context.iter().cloned().collect()
    }

    pub async fn stats(&self) -> EngineStats {
        let session = self.inner.session.lock().await;
        EngineStats {
            context_len: session.context.len(),
            cache_len: session.cache.len(),
            pattern_count: session.patterns.pattern_count(),
            in_flight: session.refinement.in_flight(),
            ..session.stats.clone()
        }
    }
}
