//! Cache configuration.
//!
//! Selects the key-value backend and bounds staleness via `openmusic.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 30 * 60;
const DEFAULT_CAPACITY: usize = 10_000;
const DEFAULT_POOL_SIZE: usize = 16;

/// Key-value backend used by the view cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheBackendKind {
    /// In-process LRU with per-entry expiry.
    #[default]
    Memory,
    /// Shared Redis instance.
    Redis,
    /// Every lookup misses; reads always compose from the database.
    Disabled,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub redis_url: Option<String>,
    /// TTL applied to every composed view.
    pub default_ttl: Duration,
    /// Maximum entries held by the in-process backend.
    pub capacity: usize,
    /// Maximum pooled Redis connections.
    pub pool_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            redis_url: None,
            default_ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            capacity: DEFAULT_CAPACITY,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            default_ttl: settings.default_ttl,
            capacity: settings.capacity.get(),
            pool_size: settings.pool_size.get(),
        }
    }
}

impl CacheConfig {
    /// Returns the capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
