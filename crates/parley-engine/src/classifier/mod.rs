//! Ensemble intent classifier.
//!
//! Every registered strategy sees the same `(text, language)` pair; their
//! weighted votes are combined by [`vote::aggregate`].

pub mod model;
pub mod pattern;
pub mod semantic;
pub mod vote;

pub use model::{ModelClient, ModelError, ModelStrategy};
pub use pattern::PatternStrategy;
pub use semantic::{SemanticStrategy, SimilarityCache};
pub use vote::{Verdict, Vote, aggregate};

use async_trait::async_trait;
use parley_common::{IntentDecision, StrategyFailure, StrategyOutcome, StrategyResult};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One independent way of classifying an utterance.
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Name reported in results and logs.
    fn name(&self) -> &str;

    async fn detect(
        &self,
        text: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> StrategyOutcome;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnsembleError {
    #[error("Strategy '{name}' has invalid weight {weight}; weights must be finite and > 0")]
    InvalidWeight { name: String, weight: f64 },
    #[error("Strategy '{0}' is registered twice")]
    DuplicateStrategy(String),
}

/// A strategy together with its trust level. The weight cannot change
/// after registration.
#[derive(Clone)]
pub struct WeightedStrategy {
    strategy: Arc<dyn Strategy>,
    weight: f64,
}

impl WeightedStrategy {
    pub fn new(strategy: Arc<dyn Strategy>, weight: f64) -> Result<Self, EnsembleError> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(EnsembleError::InvalidWeight {
                name: strategy.name().to_string(),
                weight,
            });
        }
        Ok(Self { strategy, weight })
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn name(&self) -> &str {
        self.strategy.name()
    }
}

impl std::fmt::Debug for WeightedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightedStrategy")
            .field("name", &self.name())
            .field("weight", &self.weight)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct EnsembleBuilder {
    strategies: Vec<WeightedStrategy>,
    timeout: Option<Duration>,
}

impl EnsembleBuilder {
    pub fn strategy(
        mut self,
        strategy: Arc<dyn Strategy>,
        weight: f64,
    ) -> Result<Self, EnsembleError> {
        let weighted = WeightedStrategy::new(strategy, weight)?;
        if self.strategies.iter().any(|s| s.name() == weighted.name()) {
            return Err(EnsembleError::DuplicateStrategy(weighted.name().to_string()));
        }
        self.strategies.push(weighted);
        Ok(self)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> EnsembleClassifier {
        EnsembleClassifier {
            strategies: self.strategies,
            timeout: self.timeout.unwrap_or(DEFAULT_STRATEGY_TIMEOUT),
        }
    }
}

const DEFAULT_STRATEGY_TIMEOUT: Duration = Duration::from_secs(2);

/// Fans an utterance out to every strategy and votes on the answers.
#[derive(Debug)]
pub struct EnsembleClassifier {
    strategies: Vec<WeightedStrategy>,
    timeout: Duration,
}

impl EnsembleClassifier {
    pub fn builder() -> EnsembleBuilder {
        EnsembleBuilder::default()
    }

    pub fn strategies(&self) -> &[WeightedStrategy] {
        &self.strategies
    }

    /// Classify `text`, waiting for every strategy to answer, fail, time out
    /// or be cancelled. A strategy that does not produce a result counts as
    /// an `Unknown` vote.
    pub async fn classify(
        &self,
        text: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> IntentDecision {
        // Dropping this future abandons whatever is still in flight.
        let scope = cancel.child_token();
        let _abandon = scope.clone().drop_guard();

        let handles: Vec<_> = self
            .strategies
            .iter()
            .map(|weighted| {
                let strategy = Arc::clone(&weighted.strategy);
                let text = text.to_string();
                let language = language.to_string();
                let scope = scope.clone();
                let timeout = self.timeout;
                tokio::spawn(async move {
                    run_strategy(strategy.as_ref(), &text, &language, &scope, timeout).await
                })
            })
            .collect();

        let joined = futures::future::join_all(handles).await;

        let votes: Vec<Vote> = joined
            .into_iter()
            .zip(&self.strategies)
            .map(|(outcome, weighted)| {
                let result = match outcome {
                    Ok(Ok(result)) => result,
                    Ok(Err(failure)) => {
                        warn!(strategy = weighted.name(), error = %failure, "strategy produced no vote");
                        StrategyResult::unknown(weighted.name())
                    }
                    Err(join_error) => {
                        warn!(strategy = weighted.name(), error = %join_error, "strategy task aborted");
                        StrategyResult::unknown(weighted.name())
                    }
                };
                debug!(
                    strategy = weighted.name(),
                    label = %result.label,
                    confidence = result.confidence,
                    "strategy vote"
                );
                Vote {
                    result,
                    weight: weighted.weight,
                }
            })
            .collect();

        match aggregate(&votes) {
            Some(verdict) => IntentDecision {
                label: verdict.label,
                confidence: verdict.confidence,
                entities: verdict.entities,
                original_text: text.to_string(),
                language: language.to_string(),
            },
            None => IntentDecision::unknown(text, language),
        }
    }
}

async fn run_strategy(
    strategy: &dyn Strategy,
    text: &str,
    language: &str,
    cancel: &CancellationToken,
    timeout: Duration,
) -> StrategyOutcome {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StrategyFailure::Cancelled),
        outcome = tokio::time::timeout(timeout, strategy.detect(text, language, cancel)) => {
            outcome.unwrap_or(Err(StrategyFailure::Timeout(timeout.as_millis() as u64)))
        }
    }
}
