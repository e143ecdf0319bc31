use crate::intent::{Entities, EntityValue, IntentLabel};
use serde::{Deserialize, Serialize};

/// The resolved intent for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDecision {
    pub label: IntentLabel,
    /// Aggregate score, capped at 1.0.
    pub confidence: f64,
    /// Entities of the strongest single result behind `label`.
    pub entities: Entities,
    pub original_text: String,
    pub language: String,
}

impl IntentDecision {
    pub fn unknown(original_text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            label: IntentLabel::Unknown,
            confidence: 0.0,
            entities: Entities::new(),
            original_text: original_text.into(),
            language: language.into(),
        }
    }

    pub fn entity_text(&self, name: &str) -> Option<&str> {
        self.entities.get(name).and_then(EntityValue::as_text)
    }
}
