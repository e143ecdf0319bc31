use crate::pipeline::StageResult;
use async_trait::async_trait;
use parley_common::{Command, CommandKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Performs the side effect a command asks for.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, command: &Command, cancel: &CancellationToken) -> StageResult;
}

/// Registry of handlers, one per command kind.
///
/// Registering a second handler for a kind replaces the first.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<CommandKind, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handler previously registered for `kind`, if any.
    pub fn register(
        &mut self,
        kind: CommandKind,
        handler: Arc<dyn Handler>,
    ) -> Option<Arc<dyn Handler>> {
        self.handlers.insert(kind, handler)
    }

    pub fn get(&self, kind: CommandKind) -> Option<Arc<dyn Handler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<CommandKind> {
        let mut kinds: Vec<CommandKind> = self.handlers.keys().copied().collect();
        kinds.sort();
        kinds
    }
}
