use super::{Next, Stage, StageResult};
use async_trait::async_trait;
use parley_common::Command;
use tokio::time::Instant;
use tracing::{error, info};

/// Structured entries before and after the rest of the chain runs.
pub struct LoggingStage;

#[async_trait]
impl Stage for LoggingStage {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(&self, command: &Command, next: Next<'_>) -> StageResult {
        let params: Vec<String> = command
            .parameters
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        info!(
            command = %command.kind,
            params = %params.join(" "),
            cache_key = command.cache.as_ref().map(|c| c.key.as_str()),
            "handling command"
        );

        let started = Instant::now();
        let outcome = next.run(command).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(result) => info!(
                command = %command.kind,
                success = result.success,
                message = %result.message,
                elapsed_ms,
                "handled command"
            ),
            Err(e) => error!(
                command = %command.kind,
                params = %params.join(" "),
                error = %e,
                elapsed_ms,
                "command failed"
            ),
        }
        outcome
    }
}
