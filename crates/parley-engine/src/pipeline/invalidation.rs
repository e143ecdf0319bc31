use super::{Next, Stage, StageResult};
use crate::cache::{CacheStore, GroupLocks};
use async_trait::async_trait;
use parley_common::Command;
use std::sync::Arc;
use tracing::{info, warn};

/// Drops a whole cache group after a command that makes it stale succeeds.
pub struct InvalidationStage {
    store: Arc<dyn CacheStore>,
    locks: Arc<GroupLocks>,
}

impl InvalidationStage {
    pub fn new(store: Arc<dyn CacheStore>, locks: Arc<GroupLocks>) -> Self {
        Self { store, locks }
    }
}

#[async_trait]
impl Stage for InvalidationStage {
    fn name(&self) -> &'static str {
        "invalidation"
    }

    async fn handle(&self, command: &Command, next: Next<'_>) -> StageResult {
        let result = next.run(command).await?;

        if let Some(group) = &command.invalidates
            && result.success
        {
            let _guard = self.locks.lock(group).await;
            match self.store.remove_group(group).await {
                Ok(keys) => info!(
                    command = %command.kind,
                    group = %group,
                    removed = keys.len(),
                    "invalidated cache group"
                ),
                Err(e) => warn!(group = %group, error = %e, "cache invalidation failed"),
            }
        }

        Ok(result)
    }
}
