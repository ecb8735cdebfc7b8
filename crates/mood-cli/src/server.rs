use mood_core::MoodLabel;
use mood_engine::{MoodEngine, MoodSnapshot};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::session::SharedStore;

#[derive(Clone)]
pub struct MoodServer {
    engine: MoodEngine,
    store: SharedStore,
    tool_router: ToolRouter<Self>,
}

impl MoodServer {
    pub fn new(engine: MoodEngine, store: SharedStore) -> Self {
        Self {
            engine,
            store,
            tool_router: Self::tool_router(),
        }
    }

    /// Let in-flight refinements land, then flush the WAL.
    pub async fn shutdown(&self, grace: std::time::Duration) {
        if tokio::time::timeout(grace, self.engine.settle())
            .await
            .is_err()
        {
            tracing::warn!("refinements still running at shutdown, dropping them");
        }
        match self.store.lock() {
            Ok(store) => {
                if let Err(e) = store.checkpoint_truncate() {
                    tracing::warn!("WAL checkpoint failed: {e}");
                }
            }
            Err(e) => tracing::warn!("{e}"),
        }
    }

    fn snapshot_json(snapshot: &MoodSnapshot) -> serde_json::Value {
        serde_json::json!({
            "mood": snapshot.mood,
            "confidence": snapshot.confidence,
            "intensity": snapshot.intensity.to_string(),
            "sequence": snapshot.sequence,
            "refined": snapshot.refined,
        })
    }

    fn json_result(value: &serde_json::Value) -> CallToolResult {
        CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(value).unwrap_or_default(),
        )])
    }
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct AnalyzeRequest {
    /// The message to read the mood of
    text: String,
    /// Wait for the refined estimate before answering (default true).
    /// When false, the fast estimate is returned and refinement continues
    /// in the background.
    wait: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ResetRequest {
    /// What to clear: "conversation" (default) clears context and cache,
    /// "context" clears only the rolling context, "cache" clears only
    /// remembered results
    scope: Option<String>,
}

#[tool_router]
impl MoodServer {
    #[tool(
        description = "Analyze the mood of a conversational message. Returns the mood label, confidence, display intensity, and whether the estimate has been refined. Earlier messages in the conversation influence the result."
    )]
    async fn mood_analyze(
        &self,
        Parameters(req): Parameters<AnalyzeRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.engine.analyze(&req.text).await;
        let fast = self.engine.snapshot();
        if req.wait.unwrap_or(true) {
            self.engine.settle().await;
        }
        let current = self.engine.snapshot();

        let mut json = Self::snapshot_json(&current);
        json["fast"] = Self::snapshot_json(&fast);
        Ok(Self::json_result(&json))
    }

    #[tool(
        description = "Get the currently published mood and the recent conversation context it was derived from."
    )]
    async fn mood_state(&self) -> Result<CallToolResult, McpError> {
        let snapshot = self.engine.snapshot();
        let context: Vec<serde_json::Value> = self
            .engine
            .context()
            .await
            .iter()
            .map(|r| {
                serde_json::json!({
                    "sequence": r.sequence,
                    "mood": r.mood,
                    "confidence": r.confidence,
                })
            })
            .collect();

        let mut json = Self::snapshot_json(&snapshot);
        json["context"] = serde_json::json!(context);
        Ok(Self::json_result(&json))
    }

    #[tool(
        description = "Reset conversation state. Use when a new conversation starts so earlier messages stop influencing the mood. Learned word patterns are kept."
    )]
    async fn mood_reset(
        &self,
        Parameters(req): Parameters<ResetRequest>,
    ) -> Result<CallToolResult, McpError> {
        let scope = req.scope.as_deref().unwrap_or("conversation");
        match scope {
            "conversation" => self.engine.reset_conversation().await,
            "context" => self.engine.reset_context().await,
            "cache" => self.engine.clear_cache().await,
            other => {
                return Err(McpError::invalid_params(
                    format!(
                        "unknown scope '{other}': expected conversation, context, or cache"
                    ),
                    None,
                ));
            }
        }
        Ok(Self::json_result(&serde_json::json!({ "reset": scope })))
    }

    #[tool(
        description = "Get engine and history statistics: message counts, cache and refinement counters, classifier outcomes, learned patterns, and the stored mood distribution."
    )]
    async fn mood_stats(&self) -> Result<CallToolResult, McpError> {
        let engine = self.engine.stats().await;
        let store = self
            .store
            .lock()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let readings = store
            .reading_count()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let conversations = store
            .conversation_count()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let distribution: serde_json::Map<String, serde_json::Value> = store
            .mood_distribution()
            .map_err(|e| McpError::internal_error(e.to_string(), None))?
            .into_iter()
            .map(|(mood, n): (MoodLabel, u64)| (mood.as_str().to_string(), n.into()))
            .collect();

        let json = serde_json::json!({
            "engine": engine,
            "classifier": self.engine.gateway_enabled(),
            "stored_readings": readings,
            "conversations": conversations,
            "moods": distribution,
        });
        Ok(Self::json_result(&json))
    }
}

#[tool_handler]
impl ServerHandler for MoodServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Progressive mood reading for conversations.\n\n\
                 Call mood_analyze with each user message as it arrives. The first answer is a \
                 fast lexical estimate; with wait=true (the default) the result is the refined \
                 estimate that also weighs conversation context and learned patterns. \
                 Call mood_reset when a new conversation begins. mood_state returns the current \
                 mood without analyzing anything new."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
