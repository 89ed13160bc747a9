//! Repository traits describing persistence adapters.
//!
//! Write methods that can change a cached view return the identifiers the
//! caller needs to build its invalidation plan. Those identifiers are read in
//! the same atomic statement as the write, so cascades (album → songs →
//! playlist songs, playlist → collaborations) are never missed.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::entities::{
    ActivityRecord, AlbumRecord, CollaborationRecord, PlaylistRecord, SongRecord, UserRecord,
};
use crate::domain::types::{ActivityAction, LikeOutcome};
use crate::domain::views::{PlaylistSummary, SongSummary};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

// ============================================================================
// Albums & likes
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateAlbumParams {
    pub name: String,
    pub year: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateAlbumParams {
    pub id: String,
    pub name: String,
    pub year: i32,
}

/// Playlists that lost songs when an album (and its songs) was deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumDeletion {
    pub playlist_ids: Vec<String>,
}

#[async_trait]
pub trait AlbumsRepo: Send + Sync {
    async fn find_album(&self, id: &str) -> Result<Option<AlbumRecord>, RepoError>;

    async fn list_album_songs(&self, album_id: &str) -> Result<Vec<SongSummary>, RepoError>;

    async fn count_likes(&self, album_id: &str) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait AlbumsWriteRepo: Send + Sync {
    async fn create_album(&self, params: CreateAlbumParams) -> Result<AlbumRecord, RepoError>;

    /// Returns `None` when the album does not exist.
    async fn update_album(
        &self,
        params: UpdateAlbumParams,
    ) -> Result<Option<AlbumRecord>, RepoError>;

    /// Returns `false` when the album does not exist.
    async fn update_cover(&self, id: &str, cover_url: &str) -> Result<bool, RepoError>;

    /// Returns `None` when the album does not exist.
    async fn delete_album(&self, id: &str) -> Result<Option<AlbumDeletion>, RepoError>;

    /// Insert the like when absent, delete it when present. Fails with
    /// [`RepoError::NotFound`] when the album does not exist.
    async fn toggle_like(&self, user_id: &str, album_id: &str) -> Result<LikeOutcome, RepoError>;
}

// ============================================================================
// Songs
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateSongParams {
    pub title: String,
    pub year: i32,
    pub genre: String,
    pub performer: String,
    pub duration: Option<i32>,
    pub album_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UpdateSongParams {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub genre: String,
    pub performer: String,
    pub duration: Option<i32>,
    pub album_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SongQueryFilter {
    pub title: Option<String>,
    pub performer: Option<String>,
}

/// Album membership before and after a song write, plus the playlists that
/// reference the song.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongChange {
    pub previous_album_id: Option<String>,
    pub album_id: Option<String>,
    pub playlist_ids: Vec<String>,
}

#[async_trait]
pub trait SongsRepo: Send + Sync {
    async fn find_song(&self, id: &str) -> Result<Option<SongRecord>, RepoError>;

    async fn search_songs(&self, filter: &SongQueryFilter) -> Result<Vec<SongSummary>, RepoError>;
}

#[async_trait]
pub trait SongsWriteRepo: Send + Sync {
    async fn create_song(&self, params: CreateSongParams) -> Result<SongRecord, RepoError>;

    /// Returns `None` when the song does not exist.
    async fn update_song(&self, params: UpdateSongParams)
    -> Result<Option<SongChange>, RepoError>;

    /// Returns `None` when the song does not exist.
    async fn delete_song(&self, id: &str) -> Result<Option<SongChange>, RepoError>;
}

// ============================================================================
// Playlists
// ============================================================================

/// Principals whose playlist lists referenced a deleted playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistDeletion {
    pub owner_id: String,
    pub collaborator_ids: Vec<String>,
}

#[async_trait]
pub trait PlaylistsRepo: Send + Sync {
    async fn find_playlist(&self, id: &str) -> Result<Option<PlaylistRecord>, RepoError>;

    /// Playlists owned by or shared with `user_id`.
    async fn list_visible_playlists(
        &self,
        user_id: &str,
    ) -> Result<Vec<PlaylistSummary>, RepoError>;

    /// Playlist joined with its owner's username.
    async fn find_playlist_summary(&self, id: &str)
    -> Result<Option<PlaylistSummary>, RepoError>;

    async fn list_playlist_songs(&self, playlist_id: &str)
    -> Result<Vec<SongSummary>, RepoError>;
}

#[async_trait]
pub trait PlaylistsWriteRepo: Send + Sync {
    async fn create_playlist(&self, name: &str, owner_id: &str)
    -> Result<PlaylistRecord, RepoError>;

    /// Returns `None` when the playlist does not exist.
    async fn delete_playlist(&self, id: &str) -> Result<Option<PlaylistDeletion>, RepoError>;

    /// Returns the id of the new playlist/song link.
    async fn add_playlist_song(&self, playlist_id: &str, song_id: &str)
    -> Result<String, RepoError>;

    /// Returns `false` when the song was not in the playlist.
    async fn remove_playlist_song(
        &self,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<bool, RepoError>;
}

// ============================================================================
// Collaborations, users, activities
// ============================================================================

#[async_trait]
pub trait CollaborationsRepo: Send + Sync {
    async fn collaboration_exists(
        &self,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<bool, RepoError>;

    async fn create_collaboration(
        &self,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<CollaborationRecord, RepoError>;

    /// Returns `false` when no such collaboration existed.
    async fn delete_collaboration(
        &self,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct NewActivityRecord {
    pub playlist_id: String,
    pub song_title: String,
    pub username: String,
    pub action: ActivityAction,
    pub time: time::OffsetDateTime,
}

#[async_trait]
pub trait ActivitiesRepo: Send + Sync {
    async fn append_activity(&self, record: NewActivityRecord) -> Result<(), RepoError>;

    /// Records for the playlist in insertion order.
    async fn list_activities(&self, playlist_id: &str) -> Result<Vec<ActivityRecord>, RepoError>;
}

// ============================================================================
// Outbound messages
// ============================================================================

/// Fire-and-forget message sink; no acknowledgement is consumed.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), RepoError>;
}
