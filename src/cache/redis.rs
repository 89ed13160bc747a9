//! Redis-backed [`KeyValueCache`].
//!
//! Every command is awaited, including `DEL`: invalidation has to finish
//! before the write that triggered it returns.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use deadpool_redis::{Pool, PoolConfig, Runtime};
use redis::AsyncCommands;
use tracing::debug;

use super::store::{CacheError, KeyValueCache, Lookup};

const POOL_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Build a lazily connecting pool; no connection is opened here.
    pub fn connect(url: &str, pool_size: usize) -> Result<Self, CacheError> {
        let mut redis_config = deadpool_redis::Config::from_url(url);
        let mut pool_config = PoolConfig::new(pool_size.max(1));
        pool_config.timeouts.wait = Some(POOL_TIMEOUT);
        pool_config.timeouts.create = Some(POOL_TIMEOUT);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|err| CacheError::unavailable(err.to_string()))?;
        Ok(Self { pool })
    }

    /// Round-trip a `PING`. `openmusic check` runs this before probing keys.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|err| CacheError::command("PING", err))?;
        Ok(())
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|err| CacheError::unavailable(err.to_string()))
    }
}

#[async_trait]
impl KeyValueCache for RedisStore {
    async fn get(&self, key: &str) -> Result<Lookup, CacheError> {
        let mut conn = self.connection().await?;
        let value = conn
            .get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|err| CacheError::command("GET", err))?;
        Ok(match value {
            Some(data) => Lookup::Hit(Bytes::from(data)),
            None => Lookup::Miss,
        })
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        // SET EX rejects 0.
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value.as_ref(), ttl_secs)
            .await
            .map_err(|err| CacheError::command("SET", err))?;
        debug!(key, ttl_secs, "redis set");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|err| CacheError::command("DEL", err))?;
        debug!(key, "redis del");
        Ok(())
    }
}
