use super::{CacheError, CacheStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async lock per group key, so updates to a group's index are
/// read-modify-write atomic while different groups proceed independently.
///
/// Locks nobody holds or waits on are dropped the next time any group is
/// locked.
#[derive(Debug, Default)]
pub struct GroupLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl GroupLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, group: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|name, lock| name == group || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(group.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of groups with a lock currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Add `key` to `group`'s index, extending the group's expiration to the
/// larger of its current value and `expiration`.
pub async fn register_in_group(
    store: &dyn CacheStore,
    locks: &GroupLocks,
    group: &str,
    key: &str,
    expiration: Duration,
) -> Result<(), CacheError> {
    let _guard = locks.lock(group).await;
    let mut index = store.get_group(group).await?.unwrap_or_default();
    index.add(key, expiration);
    store.set_group(group, index).await
}

/// Slide `group`'s expiration after one of its members was read.
///
/// The index expiration is at least every member's, so touching it on each
/// member hit keeps it alive as long as any member is.
pub async fn touch_group(
    store: &dyn CacheStore,
    locks: &GroupLocks,
    group: &str,
) -> Result<(), CacheError> {
    let _guard = locks.lock(group).await;
    store.get_group(group).await.map(|_| ())
}
