//! OpenMusic view cache.
//!
//! Read paths go through [`ViewCache`], a cache-aside layer that composes
//! album and playlist read models from several repositories and stores each
//! one under a deterministic [`ViewKey`]. Write paths describe what they
//! changed as a [`Mutation`]; the [`InvalidationPlan`] built from it lists
//! every key whose composed value the write can affect, and those keys are
//! deleted before the write returns.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "memory"        # memory | redis | disabled
//! redis_url = "redis://127.0.0.1:6379"
//! default_ttl_seconds = 1800
//! capacity = 10000
//! ```

mod config;
mod keys;
mod lock;
mod planner;
mod redis;
mod store;
mod views;

pub(crate) use lock::{rw_read, rw_write};

pub use config::{CacheBackendKind, CacheConfig};
pub use keys::ViewKey;
pub use planner::{InvalidationPlan, Mutation};
pub use redis::RedisStore;
pub use store::{CacheError, KeyValueCache, Lookup, LruStore, NoopStore};
pub use views::{
    METRIC_VIEW_CACHE_DEGRADED, METRIC_VIEW_CACHE_HIT, METRIC_VIEW_CACHE_INVALIDATE,
    METRIC_VIEW_CACHE_MISS, METRIC_VIEW_COMPOSE_MS, Source, Sourced, ViewCache, ViewError,
};

use std::sync::Arc;

/// Build the key-value store selected by `config`.
pub fn build_store(config: &CacheConfig) -> Result<Arc<dyn KeyValueCache>, CacheError> {
    match config.backend {
        CacheBackendKind::Memory => Ok(Arc::new(LruStore::new(config.capacity_non_zero()))),
        CacheBackendKind::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                CacheError::unavailable("redis backend selected without `cache.redis_url`")
            })?;
            Ok(Arc::new(RedisStore::connect(url, config.pool_size)?))
        }
        CacheBackendKind::Disabled => Ok(Arc::new(NoopStore)),
    }
}
