//! Adapter that turns a language-model completion into a strategy vote.
//!
//! Transport (HTTP, auth, provider quirks) lives behind [`ModelClient`];
//! this module only builds the prompt and reads the reply.

use super::Strategy;
use async_trait::async_trait;
use parley_common::{
    Entities, EntityValue, IntentLabel, StrategyFailure, StrategyOutcome, StrategyResult,
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("Model transport error: {0}")]
    Transport(String),
    #[error("Model request cancelled")]
    Cancelled,
}

/// A remote (or local) completion endpoint.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, prompt: &str, cancel: &CancellationToken)
    -> Result<String, ModelError>;
}

#[derive(Debug, Deserialize)]
struct ModelReply {
    intent: String,
    confidence: f64,
    #[serde(default)]
    entities: serde_json::Map<String, serde_json::Value>,
}

pub struct ModelStrategy {
    client: Arc<dyn ModelClient>,
}

impl ModelStrategy {
    pub const NAME: &'static str = "model";

    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self { client }
    }

    pub fn prompt(text: &str, language: &str) -> String {
        let labels: Vec<&str> = IntentLabel::ALL.iter().map(|l| l.as_str()).collect();
        format!(
            "Classify the user's voice command.\n\
             Language: {language}\n\
             Allowed intents: {}\n\
             Reply with JSON only: {{\"intent\": <intent>, \"confidence\": <0..1>, \"entities\": {{...}}}}\n\
             Entity names: application, query, recipient, body, message, setting, value.\n\
             Command: {text}",
            labels.join(", ")
        )
    }
}

/// Parse a model reply. Models like to wrap JSON in prose or code fences,
/// so only the outermost `{...}` span is read.
pub fn parse_reply(reply: &str) -> StrategyOutcome {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => return Err(StrategyFailure::Malformed("no JSON object in reply".into())),
    };

    let parsed: ModelReply =
        serde_json::from_str(json).map_err(|e| StrategyFailure::Malformed(e.to_string()))?;

    // A label outside the known set is an abstention, not an error.
    let label = parsed.intent.parse().unwrap_or(IntentLabel::Unknown);
    let entities: Entities = parsed
        .entities
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k, EntityValue::from_json(v)))
        .collect();

    Ok(StrategyResult::new(
        label,
        parsed.confidence,
        entities,
        ModelStrategy::NAME,
    ))
}

#[async_trait]
impl Strategy for ModelStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn detect(
        &self,
        text: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> StrategyOutcome {
        let prompt = Self::prompt(text, language);
        let reply = self
            .client
            .complete(&prompt, cancel)
            .await
            .map_err(|e| match e {
                ModelError::Cancelled => StrategyFailure::Cancelled,
                ModelError::Transport(msg) => StrategyFailure::Failed(msg),
            })?;
        parse_reply(&reply)
    }
}
