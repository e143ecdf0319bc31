use super::{Next, Stage, StageResult};
use crate::cache::{CacheStore, GroupLocks, register_in_group, touch_group};
use async_trait::async_trait;
use parley_common::{CachePolicy, Command, PipelineResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Serves repeated cacheable commands from the store and records fresh
/// results. Store problems degrade to a miss; they never fail the command.
pub struct CachingStage {
    store: Arc<dyn CacheStore>,
    locks: Arc<GroupLocks>,
    default_sliding: Duration,
}

impl CachingStage {
    pub fn new(store: Arc<dyn CacheStore>, locks: Arc<GroupLocks>, default_sliding: Duration) -> Self {
        Self {
            store,
            locks,
            default_sliding,
        }
    }

    async fn read(&self, policy: &CachePolicy) -> Option<PipelineResult> {
        let bytes = match self.store.get(&policy.key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %policy.key, error = %e, "cache read failed; treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(key = %policy.key, error = %e, "cached payload unreadable; treating as miss");
                None
            }
        }
    }

    /// Store `result` and register it in its group.
    ///
    /// Runs as its own task: once started it finishes even if the request
    /// that triggered it is dropped, so group indices are never left half
    /// written.
    async fn write(&self, policy: &CachePolicy, result: &PipelineResult) {
        let payload = match serde_json::to_vec(result) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %policy.key, error = %e, "result not serializable; skipping cache write");
                return;
            }
        };

        let store = Arc::clone(&self.store);
        let locks = Arc::clone(&self.locks);
        let policy = policy.clone();
        let sliding = policy.sliding_expiration.unwrap_or(self.default_sliding);

        let task = tokio::spawn(async move {
            if let Err(e) = store.set(&policy.key, payload, sliding).await {
                warn!(key = %policy.key, error = %e, "cache write failed");
                return;
            }
            if let Some(group) = &policy.group
                && let Err(e) =
                    register_in_group(store.as_ref(), &locks, group, &policy.key, sliding).await
            {
                warn!(key = %policy.key, group = %group, error = %e, "cache group update failed");
            }
        });

        if let Err(e) = task.await {
            warn!(error = %e, "cache write task aborted");
        }
    }
}

#[async_trait]
impl Stage for CachingStage {
    fn name(&self) -> &'static str {
        "caching"
    }

    async fn handle(&self, command: &Command, next: Next<'_>) -> StageResult {
        let Some(policy) = &command.cache else {
            return next.run(command).await;
        };

        if !policy.bypass
            && let Some(hit) = self.read(policy).await
        {
            debug!(command = %command.kind, key = %policy.key, "cache hit");
            if let Some(group) = &policy.group
                && let Err(e) = touch_group(self.store.as_ref(), &self.locks, group).await
            {
                warn!(key = %policy.key, group = %group, error = %e, "cache group refresh failed");
            }
            return Ok(hit);
        }

        let result = next.run(command).await?;
        if result.success {
            self.write(policy, &result).await;
        }
        Ok(result)
    }
}
