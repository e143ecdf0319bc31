//! Shared utterance execution for the CLI.
//!
//! input → resolve (ensemble + context) → build command → dispatch → format

use crate::commands::CommandFactory;
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::resolver::Resolver;
use parley_common::{Command, IntentDecision, PipelineResult};
use std::fmt::Write as _;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Everything that happened to one line of input.
pub struct ExecutionResult {
    pub decision: IntentDecision,
    /// `None` when the utterance was not understood.
    pub command: Option<Command>,
    pub result: Option<PipelineResult>,
    /// Formatted output string for display.
    pub output: String,
    pub success: bool,
}

pub struct UtteranceExecutor {
    resolver: Resolver,
    dispatcher: Dispatcher,
    language: String,
    session_id: String,
    cancel: CancellationToken,
}

impl UtteranceExecutor {
    pub fn new(
        resolver: Resolver,
        dispatcher: Dispatcher,
        language: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            dispatcher,
            language: language.into(),
            session_id: session_id.into(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Token cancelling every in-flight line; cancelled on shutdown.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Execute a line of input.
    pub async fn execute_line(&self, line: &str) -> Result<ExecutionResult, ExecutorError> {
        let decision = self
            .resolver
            .resolve(line, &self.language, &self.session_id, &self.cancel)
            .await;

        let Some(command) = CommandFactory::build(&decision) else {
            let output = format!("Sorry, I did not understand \"{}\".", line.trim());
            return Ok(ExecutionResult {
                decision,
                command: None,
                result: None,
                output,
                success: false,
            });
        };

        let result = self.dispatcher.dispatch(&command, &self.cancel).await?;
        let output = format_outcome(&decision, &result);
        Ok(ExecutionResult {
            success: result.success,
            decision,
            command: Some(command),
            result: Some(result),
            output,
        })
    }
}

/// `intent <label> (<confidence>) [entities]` followed by the pipeline
/// outcome, one violation per line when validation failed.
pub fn format_outcome(decision: &IntentDecision, result: &PipelineResult) -> String {
    let mut out = format!("intent {} ({:.2})", decision.label, decision.confidence);
    for (name, value) in &decision.entities {
        let _ = write!(out, " {}={}", name, value);
    }
    out.push('\n');

    if result.success {
        let _ = write!(out, "ok: {}", result.message);
    } else {
        let _ = write!(out, "failed: {}", result.message);
        for violation in result.violations() {
            let _ = write!(out, "\n  - {}: {}", violation.field, violation.message);
        }
    }
    out
}
