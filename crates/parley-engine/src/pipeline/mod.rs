//! Command execution pipeline.
//!
//! A command travels through an ordered chain of stages before it reaches
//! its handler:
//!
//! validation → logging → performance → caching → cache invalidation → handler
//!
//! Each stage receives a [`Next`] it may call to continue the chain, or skip
//! to short-circuit. The order is fixed by [`PipelineBuilder::build`], not by
//! the order builder methods are called in.

pub mod caching;
pub mod invalidation;
pub mod logging;
pub mod performance;
pub mod validation;

pub use caching::CachingStage;
pub use invalidation::InvalidationStage;
pub use logging::LoggingStage;
pub use performance::PerformanceStage;
pub use validation::{RequiredParameters, ValidationStage, Validator, ValidatorRegistry};

use crate::cache::{CacheStore, GroupLocks};
use crate::handler::Handler;
use async_trait::async_trait;
use parley_common::{Command, PipelineError, PipelineResult};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub type StageResult = Result<PipelineResult, PipelineError>;

/// A cross-cutting concern wrapped around command execution.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, command: &Command, next: Next<'_>) -> StageResult;
}

/// The rest of the chain, from the point of view of one stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    handler: &'a dyn Handler,
    cancel: &'a CancellationToken,
}

impl<'a> Next<'a> {
    pub fn cancel(&self) -> &'a CancellationToken {
        self.cancel
    }

    /// Invoke the remaining stages and finally the handler.
    pub async fn run(self, command: &Command) -> StageResult {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    ..self
                };
                stage.handle(command, next).await
            }
            None => self.handler.handle(command, self.cancel).await,
        }
    }
}

pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Stage names, outermost first.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn execute(
        &self,
        command: &Command,
        handler: &dyn Handler,
        cancel: &CancellationToken,
    ) -> StageResult {
        let chain = Next {
            stages: &self.stages,
            handler,
            cancel,
        };
        chain.run(command).await
    }
}

/// Collects the stages to enable; [`PipelineBuilder::build`] puts them in
/// the canonical order.
#[derive(Default)]
pub struct PipelineBuilder {
    validation: Option<ValidationStage>,
    logging: Option<LoggingStage>,
    performance: Option<PerformanceStage>,
    caching: Option<CachingStage>,
    invalidation: Option<InvalidationStage>,
}

impl PipelineBuilder {
    pub fn validation(mut self, validators: ValidatorRegistry) -> Self {
        self.validation = Some(ValidationStage::new(validators));
        self
    }

    pub fn logging(mut self) -> Self {
        self.logging = Some(LoggingStage);
        self
    }

    pub fn performance(mut self, slow_threshold: Duration) -> Self {
        self.performance = Some(PerformanceStage::new(slow_threshold));
        self
    }

    pub fn caching(
        mut self,
        store: Arc<dyn CacheStore>,
        locks: Arc<GroupLocks>,
        default_sliding: Duration,
    ) -> Self {
        self.caching = Some(CachingStage::new(store, locks, default_sliding));
        self
    }

    pub fn invalidation(mut self, store: Arc<dyn CacheStore>, locks: Arc<GroupLocks>) -> Self {
        self.invalidation = Some(InvalidationStage::new(store, locks));
        self
    }

    pub fn build(self) -> Pipeline {
        let mut stages: Vec<Arc<dyn Stage>> = Vec::new();
        if let Some(s) = self.validation {
            stages.push(Arc::new(s));
        }
        if let Some(s) = self.logging {
            stages.push(Arc::new(s));
        }
        if let Some(s) = self.performance {
            stages.push(Arc::new(s));
        }
        if let Some(s) = self.caching {
            stages.push(Arc::new(s));
        }
        if let Some(s) = self.invalidation {
            stages.push(Arc::new(s));
        }
        Pipeline { stages }
    }
}

/// The full standard chain sharing one cache store.
pub fn standard_pipeline(
    validators: ValidatorRegistry,
    store: Arc<dyn CacheStore>,
    config: &crate::config::ParleyConfig,
) -> Pipeline {
    let locks = Arc::new(GroupLocks::new());
    Pipeline::builder()
        .validation(validators)
        .logging()
        .performance(config.pipeline.slow_threshold())
        .caching(
            Arc::clone(&store),
            Arc::clone(&locks),
            config.cache.default_sliding(),
        )
        .invalidation(store, locks)
        .build()
}
