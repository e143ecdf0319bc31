use crate::handler::HandlerRegistry;
use crate::pipeline::Pipeline;
use parley_common::{Command, CommandKind, PipelineResult};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Configuration mistakes; these are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("No handler registered for command '{0}'")]
    NoHandler(CommandKind),
}

/// Routes commands to their handler through the execution pipeline.
pub struct Dispatcher {
    handlers: HandlerRegistry,
    pipeline: Pipeline,
}

impl Dispatcher {
    pub fn new(handlers: HandlerRegistry, pipeline: Pipeline) -> Self {
        Self { handlers, pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run `command`. Validation and handler failures come back as a failed
    /// [`PipelineResult`]; only a missing handler is an `Err`.
    pub async fn dispatch(
        &self,
        command: &Command,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, DispatchError> {
        let handler = self
            .handlers
            .get(command.kind)
            .ok_or(DispatchError::NoHandler(command.kind))?;

        match self.pipeline.execute(command, handler.as_ref(), cancel).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(command = %command.kind, error = %e, "command did not complete");
                Ok(PipelineResult::failed(e))
            }
        }
    }
}
