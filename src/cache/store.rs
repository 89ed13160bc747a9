//! Key-value storage behind the view cache.
//!
//! The store only sees rendered keys and opaque bytes; serialization and
//! composition belong to [`super::ViewCache`].

use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use thiserror::Error;

use super::lock::rw_write;

const SOURCE: &str = "cache::store";

/// Outcome of a cache read. A miss is an ordinary result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Hit(Bytes),
    Miss,
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache command `{command}` failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn command(command: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Command {
            command,
            message: err.to_string(),
        }
    }
}

/// Generic get/set/delete with TTL over opaque bytes.
///
/// Expired and absent keys both read as [`Lookup::Miss`]; deleting an absent
/// key succeeds.
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Lookup, CacheError>;

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

struct Entry {
    value: Bytes,
    /// `None` when the ttl does not fit in an `Instant`; the entry then
    /// lives until evicted or deleted.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// In-process LRU store with per-entry expiry.
pub struct LruStore {
    entries: RwLock<LruCache<String, Entry>>,
}

impl LruStore {
    pub fn new(capacity: std::num::NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Number of live and not-yet-reaped entries.
    pub fn len(&self) -> usize {
        rw_write(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str, now: Instant) -> Lookup {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let expired = match entries.get(key) {
            Some(entry) if entry.is_live(now) => return Lookup::Hit(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        Lookup::Miss
    }
}

#[async_trait]
impl KeyValueCache for LruStore {
    async fn get(&self, key: &str) -> Result<Lookup, CacheError> {
        Ok(self.lookup(key, Instant::now()))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now().checked_add(ttl);
        rw_write(&self.entries, SOURCE, "set").put(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "delete").pop(key);
        Ok(())
    }
}

/// Store that never holds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

#[async_trait]
impl KeyValueCache for NoopStore {
    async fn get(&self, _key: &str) -> Result<Lookup, CacheError> {
        Ok(Lookup::Miss)
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}
