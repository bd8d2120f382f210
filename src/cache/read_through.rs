//! Cache-aside plumbing shared by the entity caches.
//!
//! Reads try the key-value cache first and fall back to a loader; writes only
//! ever delete. Cache failures are logged and counted, never returned.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::infra::telemetry::{
    CACHE_DEGRADED_TOTAL, CACHE_HIT_TOTAL, CACHE_MISS_TOTAL, CACHE_POPULATE_FAILED_TOTAL,
};

use super::backend::KeyValueCache;

const SOURCE: &str = "cache::read_through";

/// Outcome of consulting the cache for one key.
#[derive(Debug, PartialEq, Eq)]
pub enum Lookup<T> {
    Hit(T),
    /// Absent, or present but undecodable.
    Miss,
    /// The cache could not be reached; callers must not populate afterwards.
    Degraded,
}

#[derive(Clone)]
pub struct ReadThrough {
    cache: Arc<dyn KeyValueCache>,
    ttl: Option<Duration>,
    entity: &'static str,
}

impl ReadThrough {
    pub fn new(cache: Arc<dyn KeyValueCache>, ttl: Option<Duration>, entity: &'static str) -> Self {
        Self { cache, ttl, entity }
    }

    pub fn cache(&self) -> &Arc<dyn KeyValueCache> {
        &self.cache
    }

    pub async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Lookup<T> {
        match self.cache.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => {
                    counter!(CACHE_HIT_TOTAL, "entity" => self.entity).increment(1);
                    Lookup::Hit(value)
                }
                Err(err) => {
                    warn!(
                        target_module = SOURCE,
                        entity = self.entity,
                        key,
                        error = %err,
                        "Discarding undecodable cache entry"
                    );
                    counter!(CACHE_MISS_TOTAL, "entity" => self.entity).increment(1);
                    Lookup::Miss
                }
            },
            Ok(None) => {
                counter!(CACHE_MISS_TOTAL, "entity" => self.entity).increment(1);
                Lookup::Miss
            }
            Err(err) => {
                warn!(
                    target_module = SOURCE,
                    entity = self.entity,
                    key,
                    error = %err,
                    "Cache read failed; falling back to store"
                );
                counter!(CACHE_DEGRADED_TOTAL, "entity" => self.entity).increment(1);
                Lookup::Degraded
            }
        }
    }

    /// Best-effort write of `value` under `key`.
    pub async fn populate<T: Serialize>(&self, key: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(
                    target_module = SOURCE,
                    entity = self.entity,
                    key,
                    error = %err,
                    "Cache payload could not be encoded"
                );
                counter!(CACHE_POPULATE_FAILED_TOTAL, "entity" => self.entity).increment(1);
                return;
            }
        };

        if let Err(err) = self.cache.set(key, bytes, self.ttl).await {
            warn!(
                target_module = SOURCE,
                entity = self.entity,
                key,
                error = %err,
                "Cache populate failed"
            );
            counter!(CACHE_POPULATE_FAILED_TOTAL, "entity" => self.entity).increment(1);
        }
    }

    /// Best-effort delete; the next read repopulates from the store.
    pub async fn invalidate(&self, keys: &[String]) {
        if let Err(err) = self.cache.delete(keys).await {
            warn!(
                target_module = SOURCE,
                entity = self.entity,
                keys = ?keys,
                error = %err,
                "Cache invalidation failed"
            );
        } else {
            debug!(
                target_module = SOURCE,
                entity = self.entity,
                keys = ?keys,
                "Cache entries invalidated"
            );
        }
    }

    /// Cache-aside read: serve `key` from the cache or run `load` and populate.
    ///
    /// Population is skipped when the load returns `None` or the cache read
    /// itself failed.
    pub async fn fetch<T, E, F, Fut>(&self, key: &str, load: F) -> Result<Option<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
    {
        let populate = match self.lookup::<T>(key).await {
            Lookup::Hit(value) => return Ok(Some(value)),
            Lookup::Miss => true,
            Lookup::Degraded => false,
        };

        let loaded = load().await?;
        if populate && let Some(value) = loaded.as_ref() {
            self.populate(key, value).await;
        }
        Ok(loaded)
    }
}
