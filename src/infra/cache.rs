//! Key-value cache adapters selected from configuration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Pool, PoolConfig, Runtime, Timeouts};
use redis::AsyncCommands;
use tracing::info;

use crate::cache::backend::{CacheError, KeyValueCache};
use crate::cache::memory::MemoryCache;
use crate::config::{CacheBackendKind, CacheSettings};

use super::error::InfraError;

/// Redis-backed cache using a deadpool connection pool.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool for `url`; connections are established lazily.
    pub fn connect(url: &str, pool_size: usize, timeout: Duration) -> Result<Self, InfraError> {
        let mut redis_config = deadpool_redis::Config::from_url(url);
        let mut pool_config = PoolConfig::new(pool_size);
        let mut timeouts = Timeouts::default();
        timeouts.wait = Some(timeout);
        timeouts.create = Some(timeout);
        timeouts.recycle = Some(timeout);
        pool_config.timeouts = timeouts;
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| InfraError::cache(format!("failed to create redis pool: {err}")))?;
        Ok(Self::new(pool))
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool.get().await.map_err(CacheError::transport)
    }
}

#[async_trait]
impl KeyValueCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(CacheError::transport)
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        match ttl {
            Some(ttl) => conn
                .set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                .await
                .map_err(CacheError::transport),
            None => conn
                .set::<_, _, ()>(key, value)
                .await
                .map_err(CacheError::transport),
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(keys).await.map_err(CacheError::transport)
    }

    async fn sorted_add(&self, set: &str, member: &str, score: i64) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.zadd::<_, _, _, ()>(set, member, score)
            .await
            .map_err(CacheError::transport)
    }

    async fn sorted_remove_by_score(
        &self,
        set: &str,
        min: i64,
        max: i64,
    ) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        conn.zrembyscore::<_, _, _, u64>(set, min, max)
            .await
            .map_err(CacheError::transport)
    }

    async fn sorted_score(&self, set: &str, member: &str) -> Result<Option<i64>, CacheError> {
        let mut conn = self.connection().await?;
        let score = conn
            .zscore::<_, _, Option<f64>>(set, member)
            .await
            .map_err(CacheError::transport)?;
        Ok(score.map(|score| score as i64))
    }
}

/// Build the cache selected by `settings.backend`.
pub fn build_cache(settings: &CacheSettings) -> Result<Arc<dyn KeyValueCache>, InfraError> {
    match settings.backend {
        CacheBackendKind::Memory => {
            info!(backend = "memory", "Using in-process cache");
            Ok(Arc::new(MemoryCache::new()))
        }
        CacheBackendKind::Redis => {
            let url = settings
                .redis_url
                .as_deref()
                .ok_or_else(|| InfraError::configuration("cache.redis_url is required"))?;
            info!(backend = "redis", pool_size = settings.pool_size, "Using redis cache");
            let cache = RedisCache::connect(url, settings.pool_size, settings.timeout)?;
            Ok(Arc::new(cache))
        }
    }
}

/// Round-trip a probe key to verify the cache answers.
pub async fn health_check(cache: &dyn KeyValueCache) -> Result<(), InfraError> {
    cache
        .get("quire:health")
        .await
        .map(|_| ())
        .map_err(|err| InfraError::cache(err.to_string()))
}
