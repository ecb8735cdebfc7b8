//! External AI classifier, consulted under hard timeouts.
//!
//! The classifier is optional and unreliable by assumption. Every failure
//! mode collapses into a [`GatewayOutcome`]; nothing here is ever surfaced
//! to the caller as an error.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use mood_core::constants::{CLASSIFY_TIMEOUT_MS, PROBE_TIMEOUT_MS};
use mood_core::{GatewayConfig, MoodLabel};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug)]
pub enum GatewayError {
    Http(reqwest::Error),
    Status(u16),
    Backend(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Http(e) => write!(f, "HTTP error: {e}"),
            GatewayError::Status(code) => write!(f, "classifier returned status {code}"),
            GatewayError::Backend(msg) => write!(f, "classifier error: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Http(e)
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Transport to an external classifier: prompt text in, free text out.
pub trait ClassifierBackend: Send + Sync {
    /// Cheap reachability check.
    fn probe(&self) -> BoxFuture<'_, Result<()>>;

    fn classify<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "mood", rename_all = "snake_case")]
pub enum GatewayOutcome {
    Vote(MoodLabel),
    /// The classifier answered, but not with a single mood word.
    NoVote,
    /// No classifier, probe failed, or the call errored.
    Unavailable,
    /// The classification call exceeded its budget.
    TimedOut,
}

impl GatewayOutcome {
    pub fn vote(self) -> Option<MoodLabel> {
        match self {
            GatewayOutcome::Vote(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct Gateway {
    backend: Option<Arc<dyn ClassifierBackend>>,
    probe_timeout: Duration,
    classify_timeout: Duration,
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("enabled", &self.backend.is_some())
            .field("probe_timeout", &self.probe_timeout)
            .field("classify_timeout", &self.classify_timeout)
            .finish()
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::disabled()
    }
}

impl Gateway {
    /// Timeouts above the hard limits are clamped down to them.
    pub fn new(backend: Arc<dyn ClassifierBackend>, config: &GatewayConfig) -> Self {
        Self {
            backend: Some(backend),
            probe_timeout: config
                .probe_timeout()
                .min(Duration::from_millis(PROBE_TIMEOUT_MS)),
            classify_timeout: config
                .classify_timeout()
                .min(Duration::from_millis(CLASSIFY_TIMEOUT_MS)),
        }
    }

    pub fn disabled() -> Self {
        let config = GatewayConfig::default();
        Self {
            backend: None,
            probe_timeout: config.probe_timeout(),
            classify_timeout: config.classify_timeout(),
        }
    }

    /// HTTP gateway when an endpoint is configured, disabled otherwise.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        match &config.endpoint {
            Some(endpoint) if !endpoint.trim().is_empty() => {
                let backend = HttpClassifier::new(endpoint, &config.model)?;
                Ok(Self::new(Arc::new(backend), config))
            }
            _ => Ok(Self::disabled()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn consult(&self, text: &str) -> GatewayOutcome {
        let Some(backend) = &self.backend else {
            return GatewayOutcome::Unavailable;
        };

        match tokio::time::timeout(self.probe_timeout, backend.probe()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!("classifier probe failed: {e}");
                return GatewayOutcome::Unavailable;
            }
            Err(_) => {
                debug!("classifier probe timed out after {:?}", self.probe_timeout);
                return GatewayOutcome::Unavailable;
            }
        }

        let prompt = build_prompt(text);
        match tokio::time::timeout(self.classify_timeout, backend.classify(&prompt)).await {
            Ok(Ok(raw)) => match parse_mood_response(&raw) {
                Some(mood) => GatewayOutcome::Vote(mood),
                None => {
                    debug!(response = %raw, "classifier answer is not a single mood word");
                    GatewayOutcome::NoVote
                }
            },
            Ok(Err(e)) => {
                debug!("classifier call failed: {e}");
                GatewayOutcome::Unavailable
            }
            Err(_) => {
                debug!("classifier timed out after {:?}", self.classify_timeout);
                GatewayOutcome::TimedOut
            }
        }
    }
}

/// Prompt asking for exactly one mood word.
pub fn build_prompt(text: &str) -> String {
    let labels: Vec<&str> = MoodLabel::ALL.iter().map(|m| m.as_str()).collect();
    format!(
        "Classify the mood of the following message. Answer with exactly one word from: {}.\n\nMessage: {}\n\nMood:",
        labels.join(", "),
        text.trim()
    )
}

/// Lowercase, drop everything that is not a letter or whitespace, and accept
/// the answer only if exactly one word remains and it names a mood.
pub fn parse_mood_response(raw: &str) -> Option<MoodLabel> {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();
    let mut words = cleaned.split_whitespace();
    let word = words.next()?;
    if words.next().is_some() {
        return None;
    }
    MoodLabel::parse_token(word)
}

/// Ollama-style JSON API: `GET /api/tags` to probe, `POST /api/generate`
/// to classify.
pub struct HttpClassifier {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl HttpClassifier {
    pub fn new(endpoint: &str, model: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(CLASSIFY_TIMEOUT_MS))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn probe_inner(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.endpoint);
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    async fn classify_inner(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let response = self.http.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::Status(response.status().as_u16()));
        }
        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.response)
    }
}

impl ClassifierBackend for HttpClassifier {
    fn probe(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(self.probe_inner())
    }

    fn classify<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.classify_inner(prompt))
    }
}
