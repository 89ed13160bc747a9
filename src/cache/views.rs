//! Cache-aside producer of the composed read models.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use metrics::{counter, histogram};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::application::repos::{AlbumsRepo, PlaylistsRepo, RepoError};
use crate::domain::views::{AlbumView, PlaylistSongsView, PlaylistSummary};

use super::keys::ViewKey;
use super::planner::{InvalidationPlan, Mutation};
use super::store::{KeyValueCache, Lookup};

pub const METRIC_VIEW_CACHE_HIT: &str = "openmusic_view_cache_hit_total";
pub const METRIC_VIEW_CACHE_MISS: &str = "openmusic_view_cache_miss_total";
pub const METRIC_VIEW_CACHE_INVALIDATE: &str = "openmusic_view_cache_invalidate_total";
pub const METRIC_VIEW_CACHE_DEGRADED: &str = "openmusic_view_cache_degraded_total";
pub const METRIC_VIEW_COMPOSE_MS: &str = "openmusic_view_compose_ms";

/// Where a served value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Database,
}

/// A view together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sourced<T> {
    pub value: T,
    pub source: Source,
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("`{entity}` not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Composes album and playlist views and keeps them in a [`KeyValueCache`].
///
/// Cache failures never reach callers: a failed read is a miss, a failed
/// write or delete is logged and counted as degraded.
pub struct ViewCache {
    store: Arc<dyn KeyValueCache>,
    ttl: Duration,
    albums: Arc<dyn AlbumsRepo>,
    playlists: Arc<dyn PlaylistsRepo>,
}

impl ViewCache {
    pub fn new(
        store: Arc<dyn KeyValueCache>,
        ttl: Duration,
        albums: Arc<dyn AlbumsRepo>,
        playlists: Arc<dyn PlaylistsRepo>,
    ) -> Self {
        Self {
            store,
            ttl,
            albums,
            playlists,
        }
    }

    /// Album record together with its songs.
    pub async fn album_view(&self, album_id: &str) -> Result<Sourced<AlbumView>, ViewError> {
        self.read_through(ViewKey::album_songs(album_id), || {
            self.compose_album_view(album_id)
        })
        .await
    }

    /// Playlists owned by or shared with `user_id`. An empty list is a
    /// regular, cacheable value.
    pub async fn playlist_list(
        &self,
        user_id: &str,
    ) -> Result<Sourced<Vec<PlaylistSummary>>, ViewError> {
        self.read_through(ViewKey::playlists(user_id), || async move {
            self.playlists
                .list_visible_playlists(user_id)
                .await
                .map(Some)
        })
        .await
    }

    /// Callers must resolve access first; this only composes.
    pub async fn playlist_songs(
        &self,
        playlist_id: &str,
    ) -> Result<Sourced<PlaylistSongsView>, ViewError> {
        self.read_through(ViewKey::playlist_songs(playlist_id), || {
            self.compose_playlist_songs(playlist_id)
        })
        .await
    }

    pub async fn album_like_count(&self, album_id: &str) -> Result<Sourced<u64>, ViewError> {
        self.read_through(ViewKey::album_likes(album_id), || async move {
            if self.albums.find_album(album_id).await?.is_none() {
                return Ok(None);
            }
            self.albums.count_likes(album_id).await.map(Some)
        })
        .await
    }

    /// Delete every key the mutation can affect. Returns the applied plan.
    #[instrument(level = "debug", skip(self), fields(mutation = mutation.name()))]
    pub async fn apply(&self, mutation: &Mutation) -> InvalidationPlan {
        let plan = InvalidationPlan::for_mutation(mutation);
        for key in plan.keys() {
            let rendered = key.to_string();
            match self.store.delete(&rendered).await {
                Ok(()) => {
                    counter!(METRIC_VIEW_CACHE_INVALIDATE, "view" => key.namespace()).increment(1);
                }
                Err(err) => {
                    warn!(
                        key = %rendered,
                        error = %err,
                        "cache delete failed; entry will expire by ttl"
                    );
                    counter!(METRIC_VIEW_CACHE_DEGRADED, "op" => "delete").increment(1);
                }
            }
        }
        debug!(%plan, "invalidation applied");
        plan
    }

    async fn read_through<T, F, Fut>(&self, key: ViewKey, load: F) -> Result<Sourced<T>, ViewError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, RepoError>>,
    {
        let rendered = key.to_string();

        if let Some(value) = self.cached::<T>(&key, &rendered).await {
            counter!(METRIC_VIEW_CACHE_HIT, "view" => key.namespace()).increment(1);
            return Ok(Sourced {
                value,
                source: Source::Cache,
            });
        }
        counter!(METRIC_VIEW_CACHE_MISS, "view" => key.namespace()).increment(1);

        let started_at = Instant::now();
        let composed = load().await?;
        histogram!(METRIC_VIEW_COMPOSE_MS, "view" => key.namespace())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        let Some(value) = composed else {
            return Err(ViewError::NotFound {
                entity: key.entity(),
            });
        };

        self.populate(&rendered, &value).await;
        Ok(Sourced {
            value,
            source: Source::Database,
        })
    }

    async fn cached<T: DeserializeOwned>(&self, key: &ViewKey, rendered: &str) -> Option<T> {
        match self.store.get(rendered).await {
            Ok(Lookup::Hit(bytes)) => match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(
                        key = %rendered,
                        view = key.namespace(),
                        error = %err,
                        "undecodable cache entry; recomposing"
                    );
                    None
                }
            },
            Ok(Lookup::Miss) => None,
            Err(err) => {
                warn!(key = %rendered, error = %err, "cache get failed");
                counter!(METRIC_VIEW_CACHE_DEGRADED, "op" => "get").increment(1);
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, rendered: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => Bytes::from(bytes),
            Err(err) => {
                warn!(key = %rendered, error = %err, "failed to encode view");
                return;
            }
        };
        if let Err(err) = self.store.set(rendered, bytes, self.ttl).await {
            warn!(key = %rendered, error = %err, "cache set failed");
            counter!(METRIC_VIEW_CACHE_DEGRADED, "op" => "set").increment(1);
        }
    }

    async fn compose_album_view(&self, album_id: &str) -> Result<Option<AlbumView>, RepoError> {
        let Some(album) = self.albums.find_album(album_id).await? else {
            return Ok(None);
        };
        let songs = self.albums.list_album_songs(album_id).await?;
        Ok(Some(AlbumView {
            id: album.id,
            name: album.name,
            year: album.year,
            cover_url: album.cover_url,
            songs,
        }))
    }

    async fn compose_playlist_songs(
        &self,
        playlist_id: &str,
    ) -> Result<Option<PlaylistSongsView>, RepoError> {
        let Some(summary) = self.playlists.find_playlist_summary(playlist_id).await? else {
            return Ok(None);
        };
        let songs = self.playlists.list_playlist_songs(playlist_id).await?;
        Ok(Some(PlaylistSongsView {
            id: summary.id,
            name: summary.name,
            username: summary.username,
            songs,
        }))
    }
}
