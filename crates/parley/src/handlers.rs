use async_trait::async_trait;
use parley_common::{Command, CommandKind, PipelineError, PipelineResult, entity};
use parley_engine::handler::{Handler, HandlerRegistry};
use parley_engine::pipeline::StageResult;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Describes the side effect a command would have instead of performing it.
pub struct DryRunHandler;

impl DryRunHandler {
    fn describe(command: &Command) -> String {
        let text = |name: &str| command.param_text(name).unwrap_or("").to_string();
        match command.kind {
            CommandKind::OpenApplication => format!("would open {}", text(entity::APPLICATION)),
            CommandKind::CloseApplication => format!("would close {}", text(entity::APPLICATION)),
            CommandKind::PlayMusic => {
                let app = command
                    .param_text(entity::APPLICATION)
                    .or_else(|| command.param_text(entity::PREFERRED_APPLICATION))
                    .unwrap_or("the default player");
                match command.param_text(entity::QUERY) {
                    Some(query) if !query.is_empty() => format!("would play {} on {}", query, app),
                    _ => format!("would start playback on {}", app),
                }
            }
            CommandKind::PauseMusic => "would pause playback".to_string(),
            CommandKind::SendEmail => format!(
                "would email {}: {}",
                text(entity::RECIPIENT),
                text(entity::BODY)
            ),
            CommandKind::SendSms => format!(
                "would text {}: {}",
                text(entity::RECIPIENT),
                text(entity::MESSAGE)
            ),
            CommandKind::DeviceControl => match command.parameters.get(entity::VALUE) {
                Some(value) => format!("would set {} to {}", text(entity::SETTING), value),
                None => format!("would toggle {}", text(entity::SETTING)),
            },
        }
    }
}

#[async_trait]
impl Handler for DryRunHandler {
    async fn handle(&self, command: &Command, cancel: &CancellationToken) -> StageResult {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let message = Self::describe(command);
        info!(command = %command.kind, "{}", message);
        Ok(PipelineResult::ok(message))
    }
}

/// One dry-run handler for every command kind.
pub fn dry_run_registry() -> HandlerRegistry {
    let handler: Arc<dyn Handler> = Arc::new(DryRunHandler);
    let mut registry = HandlerRegistry::new();
    for kind in [
        CommandKind::OpenApplication,
        CommandKind::CloseApplication,
        CommandKind::PlayMusic,
        CommandKind::PauseMusic,
        CommandKind::SendEmail,
        CommandKind::SendSms,
        CommandKind::DeviceControl,
    ] {
        registry.register(kind, Arc::clone(&handler));
    }
    registry
}
