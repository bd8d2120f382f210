//! Key-value cache abstraction shared by the entity caches and the session manager.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache transport error: {0}")]
    Transport(String),
}

impl CacheError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Ephemeral key-value store with a score-ordered collection primitive.
///
/// Scores are unix timestamps in seconds.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value`; `None` keeps the entry until it is deleted.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
    -> Result<(), CacheError>;

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError>;

    /// Insert or re-score `member` in the collection `set`.
    async fn sorted_add(&self, set: &str, member: &str, score: i64) -> Result<(), CacheError>;

    /// Remove members whose score lies in `min..=max`, returning how many were removed.
    async fn sorted_remove_by_score(&self, set: &str, min: i64, max: i64)
    -> Result<u64, CacheError>;

    async fn sorted_score(&self, set: &str, member: &str) -> Result<Option<i64>, CacheError>;
}
