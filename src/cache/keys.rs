//! Cache key definitions.
//!
//! Every cached read model is identified by a [`ViewKey`]. The rendered form
//! (`album-songs:{id}`, `playlists:{user}`, ...) is the key handed to the
//! key-value store, so it must stay stable across releases and instances.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewKey {
    /// Album record together with its songs.
    AlbumSongs(String),
    /// Playlists owned by or shared with a user.
    Playlists(String),
    /// Playlist header together with its songs.
    PlaylistSongs(String),
    /// Number of likes on an album.
    AlbumLikes(String),
}

impl ViewKey {
    pub fn album_songs(album_id: impl Into<String>) -> Self {
        Self::AlbumSongs(album_id.into())
    }

    pub fn playlists(user_id: impl Into<String>) -> Self {
        Self::Playlists(user_id.into())
    }

    pub fn playlist_songs(playlist_id: impl Into<String>) -> Self {
        Self::PlaylistSongs(playlist_id.into())
    }

    pub fn album_likes(album_id: impl Into<String>) -> Self {
        Self::AlbumLikes(album_id.into())
    }

    /// Namespace prefix, also used as the metrics label.
    pub fn namespace(&self) -> &'static str {
        match self {
            ViewKey::AlbumSongs(_) => "album-songs",
            ViewKey::Playlists(_) => "playlists",
            ViewKey::PlaylistSongs(_) => "playlist-songs",
            ViewKey::AlbumLikes(_) => "album-likes",
        }
    }

    /// Entity whose absence makes the view a NotFound.
    pub fn entity(&self) -> &'static str {
        match self {
            ViewKey::AlbumSongs(_) | ViewKey::AlbumLikes(_) => "album",
            ViewKey::Playlists(_) => "user",
            ViewKey::PlaylistSongs(_) => "playlist",
        }
    }

    fn id(&self) -> &str {
        match self {
            ViewKey::AlbumSongs(id)
            | ViewKey::Playlists(id)
            | ViewKey::PlaylistSongs(id)
            | ViewKey::AlbumLikes(id) => id,
        }
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace(), self.id())
    }
}
