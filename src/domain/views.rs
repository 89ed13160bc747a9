//! Composed read models served through the view cache.
//!
//! These are serialized as a unit into the key-value cache, so their wire
//! shape is part of the cache contract: changing a field invalidates every
//! cached payload (undecodable entries are treated as misses).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongSummary {
    pub id: String,
    pub title: String,
    pub performer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumView {
    pub id: String,
    pub name: String,
    pub year: i32,
    pub cover_url: Option<String>,
    pub songs: Vec<SongSummary>,
}

/// Playlist entry in a user's list, with the owner's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSongsView {
    pub id: String,
    pub name: String,
    pub username: String,
    pub songs: Vec<SongSummary>,
}
