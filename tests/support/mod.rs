#![allow(dead_code)]

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use openmusic::application::context::CatalogContext;
use openmusic::application::songs::SongInput;
use openmusic::cache::{CacheError, KeyValueCache, Lookup, LruStore};
use openmusic::domain::entities::UserRecord;
use openmusic::infra::memory::{MemoryPublisher, MemoryRepositories};

pub const VIEW_TTL: Duration = Duration::from_secs(300);
pub const EXPORT_TOPIC: &str = "export:playlist";

pub struct Fixture {
    pub repos: Arc<MemoryRepositories>,
    pub store: Arc<LruStore>,
    pub publisher: Arc<MemoryPublisher>,
    pub ctx: CatalogContext,
}

impl Fixture {
    pub fn new() -> Self {
        let repos = Arc::new(MemoryRepositories::new());
        let store = Arc::new(LruStore::new(NonZeroUsize::new(128).unwrap()));
        let publisher = Arc::new(MemoryPublisher::new());
        let ctx = CatalogContext::new(
            repos.clone(),
            store.clone(),
            VIEW_TTL,
            publisher.clone(),
            EXPORT_TOPIC,
        );
        Self {
            repos,
            store,
            publisher,
            ctx,
        }
    }

    /// Catalog wired to a store whose every command fails.
    pub fn with_broken_cache() -> (Arc<MemoryRepositories>, CatalogContext) {
        let repos = Arc::new(MemoryRepositories::new());
        let ctx = CatalogContext::new(
            repos.clone(),
            Arc::new(BrokenStore),
            VIEW_TTL,
            Arc::new(MemoryPublisher::new()),
            EXPORT_TOPIC,
        );
        (repos, ctx)
    }

    pub fn user(&self, username: &str) -> UserRecord {
        self.repos
            .insert_user(username, &format!("{username} fullname"))
            .expect("insert user")
    }

    pub async fn cached(&self, key: &str) -> bool {
        self.store.get(key).await.expect("lru get").is_hit()
    }
}

pub fn song(title: &str, performer: &str, album_id: Option<&str>) -> SongInput {
    SongInput {
        title: title.to_string(),
        year: 2008,
        genre: "Indie".to_string(),
        performer: performer.to_string(),
        duration: Some(240),
        album_id: album_id.map(str::to_string),
    }
}

pub struct BrokenStore;

#[async_trait]
impl KeyValueCache for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Lookup, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }
}
