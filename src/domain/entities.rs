//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::types::ActivityAction;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumRecord {
    pub id: String,
    pub name: String,
    pub year: i32,
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongRecord {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub genre: String,
    pub performer: String,
    pub duration: Option<i32>,
    pub album_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistRecord {
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub fullname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollaborationRecord {
    pub id: String,
    pub playlist_id: String,
    pub user_id: String,
}

/// Immutable entry of a playlist's activity log.
///
/// Title and username are the display values at the time of the change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityRecord {
    pub playlist_id: String,
    pub song_title: String,
    pub username: String,
    pub action: ActivityAction,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
}
