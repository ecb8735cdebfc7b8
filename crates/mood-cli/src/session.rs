//! Wiring between the data directory, the store, and the engine.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use mood_core::{EngineConfig, MoodLabel, ReadingSink, SentimentReading, SinkError};
use mood_engine::{Gateway, MoodEngine};
use mood_store::Store;

/// Overrides the `endpoint` from `config.toml`.
pub const CLASSIFIER_URL_ENV: &str = "MOOD_CLASSIFIER_URL";

/// A store shared between the engine (as its sink) and the command surface.
#[derive(Clone)]
pub struct SharedStore(Arc<Mutex<Store>>);

impl SharedStore {
    pub fn new(store: Store) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, Store>> {
        self.0.lock().map_err(|_| anyhow!("store lock poisoned"))
    }
}

impl ReadingSink for SharedStore {
    fn record_reading(&mut self, reading: &SentimentReading) -> Result<(), SinkError> {
        let store = self.0.lock().map_err(|_| "store lock poisoned")?;
        store.save_reading(reading)?;
        Ok(())
    }

    fn record_pattern(&mut self, word: &str, mood: MoodLabel) -> Result<(), SinkError> {
        let store = self.0.lock().map_err(|_| "store lock poisoned")?;
        store.increment_pattern(word, mood)?;
        Ok(())
    }

    fn begin_conversation(&mut self) -> Result<(), SinkError> {
        let mut store = self.0.lock().map_err(|_| "store lock poisoned")?;
        store.begin_conversation();
        Ok(())
    }
}

pub struct Session {
    pub engine: MoodEngine,
    pub store: SharedStore,
}

/// The data directory and the database path inside it.
fn data_paths() -> Result<(PathBuf, PathBuf)> {
    let base = mood_store::resolve_base_dir();
    let db = mood_store::prepare_data_dir(&base)
        .with_context(|| format!("failed to prepare data dir {}", base.display()))?;
    Ok((base, db))
}

/// Load `config.toml` and apply the classifier override, flag first then env.
pub fn load_config(classifier_url: Option<&str>) -> Result<EngineConfig> {
    let (dir, _) = data_paths()?;
    let mut config = mood_store::load_config(&dir).context("failed to load config")?;
    let env_url = std::env::var(CLASSIFIER_URL_ENV).ok();
    if let Some(url) = classifier_url.map(str::to_string).or(env_url)
        && !url.trim().is_empty()
    {
        config.gateway.endpoint = Some(url);
    }
    Ok(config)
}

pub fn open_store() -> Result<Store> {
    let (_, db) = data_paths()?;
    Store::open(&db).context("failed to open mood database")
}

/// Open the store and build an engine that records into it.
pub fn open(classifier_url: Option<&str>) -> Result<Session> {
    let config = load_config(classifier_url)?;
    let store = open_store()?;
    let patterns = store
        .load_patterns()
        .context("failed to load learned patterns")?;
    tracing::debug!(patterns = patterns.pattern_count(), "loaded learned patterns");

    let gateway = Gateway::from_config(&config.gateway).context("failed to set up classifier")?;
    let store = SharedStore::new(store);
    let engine = MoodEngine::builder(config)
        .gateway(gateway)
        .patterns(patterns)
        .sink(Box::new(store.clone()))
        .build()
        .context("invalid engine configuration")?;
    Ok(Session { engine, store })
}
