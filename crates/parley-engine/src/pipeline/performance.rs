use super::{Next, Stage, StageResult};
use async_trait::async_trait;
use parley_common::{Command, CommandKind};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

pub struct PerformanceStage {
    slow_threshold: Duration,
}

impl PerformanceStage {
    pub fn new(slow_threshold: Duration) -> Self {
        Self { slow_threshold }
    }
}

/// Reports elapsed time when dropped, so the measurement happens whether
/// the inner chain returns, fails or is cancelled mid-flight.
struct Stopwatch {
    kind: CommandKind,
    started: Instant,
    slow_threshold: Duration,
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        let elapsed = self.started.elapsed();
        let elapsed_ms = elapsed.as_millis() as u64;
        if elapsed > self.slow_threshold {
            warn!(
                command = %self.kind,
                elapsed_ms,
                threshold_ms = self.slow_threshold.as_millis() as u64,
                "slow command"
            );
        } else {
            info!(command = %self.kind, elapsed_ms, "command timing");
        }
    }
}

#[async_trait]
impl Stage for PerformanceStage {
    fn name(&self) -> &'static str {
        "performance"
    }

    async fn handle(&self, command: &Command, next: Next<'_>) -> StageResult {
        let _stopwatch = Stopwatch {
            kind: command.kind,
            started: Instant::now(),
            slow_threshold: self.slow_threshold,
        };
        next.run(command).await
    }
}
