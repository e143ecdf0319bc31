//! Key/value cache with sliding expiration and named invalidation groups.
//!
//! The pipeline only talks to [`CacheStore`]; [`MemoryCacheStore`] is the
//! in-process backend. A distributed backend implements the same trait.

pub mod group;
pub mod memory;

pub use group::{GroupLocks, register_in_group, touch_group};
pub use memory::MemoryCacheStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache store unavailable: {0}")]
    Unavailable(String),
    #[error("Cache payload could not be (de)serialized: {0}")]
    Serialization(String),
}

/// Keys that are invalidated together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupIndex {
    pub keys: BTreeSet<String>,
    /// Never shrinks: the largest expiration any member asked for.
    pub sliding_expiration: Duration,
}

impl GroupIndex {
    pub fn add(&mut self, key: &str, expiration: Duration) {
        self.keys.insert(key.to_string());
        self.sliding_expiration = self.sliding_expiration.max(expiration);
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a live entry and reset its expiration.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, sliding: Duration) -> Result<(), CacheError>;

    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// Read a live group index and reset its expiration.
    async fn get_group(&self, group: &str) -> Result<Option<GroupIndex>, CacheError>;

    async fn set_group(&self, group: &str, index: GroupIndex) -> Result<(), CacheError>;

    /// Remove every key registered in `group`, then the index itself.
    /// Returns the keys that were removed.
    async fn remove_group(&self, group: &str) -> Result<Vec<String>, CacheError>;
}
