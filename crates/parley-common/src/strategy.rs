use crate::intent::{Entities, IntentLabel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One classification strategy's opinion about an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub label: IntentLabel,
    /// Always within [0, 1]; see [`StrategyResult::new`].
    pub confidence: f64,
    pub entities: Entities,
    pub strategy_name: String,
}

impl StrategyResult {
    /// Build a result, clamping `confidence` into [0, 1]. NaN becomes 0.
    pub fn new(
        label: IntentLabel,
        confidence: f64,
        entities: Entities,
        strategy_name: impl Into<String>,
    ) -> Self {
        Self {
            label,
            confidence: clamp_unit(confidence),
            entities,
            strategy_name: strategy_name.into(),
        }
    }

    /// The "no opinion" vote.
    pub fn unknown(strategy_name: impl Into<String>) -> Self {
        Self::new(IntentLabel::Unknown, 0.0, Entities::new(), strategy_name)
    }

    pub fn with_entity(mut self, name: &str, value: impl Into<crate::EntityValue>) -> Self {
        self.entities.insert(name.to_string(), value.into());
        self
    }
}

pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Why a strategy produced no vote.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyFailure {
    #[error("Strategy timed out after {0}ms")]
    Timeout(u64),
    #[error("Strategy cancelled")]
    Cancelled,
    #[error("Strategy returned a malformed answer: {0}")]
    Malformed(String),
    #[error("Strategy failed: {0}")]
    Failed(String),
}

/// What the ensemble receives from each strategy.
pub type StrategyOutcome = Result<StrategyResult, StrategyFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped_at_ingestion() {
        let high = StrategyResult::new(IntentLabel::PlayMusic, 1.7, Entities::new(), "x");
        assert_eq!(high.confidence, 1.0);
        let low = StrategyResult::new(IntentLabel::PlayMusic, -0.2, Entities::new(), "x");
        assert_eq!(low.confidence, 0.0);
        let nan = StrategyResult::new(IntentLabel::PlayMusic, f64::NAN, Entities::new(), "x");
        assert_eq!(nan.confidence, 0.0);
    }
}
