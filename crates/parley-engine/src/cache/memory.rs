use super::{CacheError, CacheStore, GroupIndex};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Writes between opportunistic purges of expired entries and groups.
const PURGE_EVERY: u64 = 64;

#[derive(Debug)]
struct Entry {
    value: Vec<u8>,
    sliding: Duration,
    expires_at: Instant,
}

#[derive(Debug)]
struct GroupEntry {
    index: GroupIndex,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    groups: HashMap<String, GroupEntry>,
    writes: u64,
}

impl Inner {
    fn purge(&mut self, now: Instant) -> usize {
        let before = self.entries.len() + self.groups.len();
        self.entries.retain(|_, e| e.expires_at > now);
        self.groups.retain(|_, g| g.expires_at > now);
        before - self.entries.len() - self.groups.len()
    }

    /// Count a write and purge every [`PURGE_EVERY`] of them.
    fn note_write(&mut self, now: Instant) {
        self.writes += 1;
        if self.writes % PURGE_EVERY == 0 {
            self.purge(now);
        }
    }
}

/// In-process [`CacheStore`]. Expired entries are dropped when read, and
/// periodically on write so keys that are never read again do not pile up.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    inner: Mutex<Inner>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a live entry exists, without sliding its expiration.
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner()
            .entries
            .get(key)
            .is_some_and(|e| e.expires_at > now)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner()
            .entries
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry and group index. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        self.inner().purge(Instant::now())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let mut inner = self.inner();
        match inner.entries.get_mut(key) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + entry.sliding;
                Ok(Some(entry.value.clone()))
            }
            Some(_) => {
                inner.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, sliding: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut inner = self.inner();
        inner.note_write(now);
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                sliding,
                expires_at: now + sliding,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.inner().entries.remove(key);
        Ok(())
    }

    async fn get_group(&self, group: &str) -> Result<Option<GroupIndex>, CacheError> {
        let now = Instant::now();
        let mut inner = self.inner();
        match inner.groups.get_mut(group) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + entry.index.sliding_expiration;
                Ok(Some(entry.index.clone()))
            }
            Some(_) => {
                inner.groups.remove(group);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_group(&self, group: &str, index: GroupIndex) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now + index.sliding_expiration;
        let mut inner = self.inner();
        inner.note_write(now);
        inner
            .groups
            .insert(group.to_string(), GroupEntry { index, expires_at });
        Ok(())
    }

    async fn remove_group(&self, group: &str) -> Result<Vec<String>, CacheError> {
        let mut inner = self.inner();
        let Some(entry) = inner.groups.remove(group) else {
            return Ok(Vec::new());
        };
        let keys: Vec<String> = entry.index.keys.into_iter().collect();
        for key in &keys {
            inner.entries.remove(key);
        }
        Ok(keys)
    }
}
