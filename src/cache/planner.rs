//! Invalidation plan generation.
//!
//! Maps each committed [`Mutation`] to the exact set of composed views it can
//! change. Cascades are spelled out here rather than discovered at runtime:
//! the repositories return the extra identifiers (previous album, affected
//! playlists, collaborators) from the same statement as the write.

use std::collections::BTreeSet;
use std::fmt;

use super::keys::ViewKey;

/// A committed write, described by the identifiers its plan needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    AlbumEdited {
        album_id: String,
    },
    AlbumCoverSet {
        album_id: String,
    },
    /// Songs of the album are removed with it, so every playlist that held
    /// one of them changes too.
    AlbumDeleted {
        album_id: String,
        playlist_ids: Vec<String>,
    },
    SongAdded {
        album_id: Option<String>,
    },
    SongEdited {
        previous_album_id: Option<String>,
        album_id: Option<String>,
        playlist_ids: Vec<String>,
    },
    SongDeleted {
        album_id: Option<String>,
        playlist_ids: Vec<String>,
    },
    AlbumLikeToggled {
        album_id: String,
    },
    PlaylistCreated {
        owner_id: String,
    },
    PlaylistDeleted {
        playlist_id: String,
        owner_id: String,
        collaborator_ids: Vec<String>,
    },
    CollaborationGranted {
        user_id: String,
    },
    CollaborationRevoked {
        user_id: String,
    },
    PlaylistSongAdded {
        playlist_id: String,
    },
    PlaylistSongRemoved {
        playlist_id: String,
    },
}

impl Mutation {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::AlbumEdited { .. } => "album_edited",
            Mutation::AlbumCoverSet { .. } => "album_cover_set",
            Mutation::AlbumDeleted { .. } => "album_deleted",
            Mutation::SongAdded { .. } => "song_added",
            Mutation::SongEdited { .. } => "song_edited",
            Mutation::SongDeleted { .. } => "song_deleted",
            Mutation::AlbumLikeToggled { .. } => "album_like_toggled",
            Mutation::PlaylistCreated { .. } => "playlist_created",
            Mutation::PlaylistDeleted { .. } => "playlist_deleted",
            Mutation::CollaborationGranted { .. } => "collaboration_granted",
            Mutation::CollaborationRevoked { .. } => "collaboration_revoked",
            Mutation::PlaylistSongAdded { .. } => "playlist_song_added",
            Mutation::PlaylistSongRemoved { .. } => "playlist_song_removed",
        }
    }
}

/// Deduplicated, ordered set of keys to delete.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    keys: BTreeSet<ViewKey>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.keys.iter().map(ToString::to_string).collect();
        write!(f, "InvalidationPlan [{}]", rendered.join(", "))
    }
}

impl InvalidationPlan {
    pub fn for_mutation(mutation: &Mutation) -> Self {
        let mut plan = Self::default();

        match mutation {
            Mutation::AlbumEdited { album_id } | Mutation::AlbumCoverSet { album_id } => {
                plan.add(ViewKey::album_songs(album_id));
            }
            Mutation::AlbumDeleted {
                album_id,
                playlist_ids,
            } => {
                plan.add(ViewKey::album_songs(album_id));
                plan.add(ViewKey::album_likes(album_id));
                plan.add_playlist_songs(playlist_ids);
            }
            Mutation::SongAdded { album_id } => {
                plan.add_album_songs(album_id.as_deref());
            }
            Mutation::SongEdited {
                previous_album_id,
                album_id,
                playlist_ids,
            } => {
                plan.add_album_songs(previous_album_id.as_deref());
                plan.add_album_songs(album_id.as_deref());
                plan.add_playlist_songs(playlist_ids);
            }
            Mutation::SongDeleted {
                album_id,
                playlist_ids,
            } => {
                plan.add_album_songs(album_id.as_deref());
                plan.add_playlist_songs(playlist_ids);
            }
            Mutation::AlbumLikeToggled { album_id } => {
                plan.add(ViewKey::album_likes(album_id));
            }
            Mutation::PlaylistCreated { owner_id } => {
                plan.add(ViewKey::playlists(owner_id));
            }
            Mutation::PlaylistDeleted {
                playlist_id,
                owner_id,
                collaborator_ids,
            } => {
                plan.add(ViewKey::playlists(owner_id));
                plan.add(ViewKey::playlist_songs(playlist_id));
                for user_id in collaborator_ids {
                    plan.add(ViewKey::playlists(user_id));
                }
            }
            Mutation::CollaborationGranted { user_id }
            | Mutation::CollaborationRevoked { user_id } => {
                plan.add(ViewKey::playlists(user_id));
            }
            Mutation::PlaylistSongAdded { playlist_id }
            | Mutation::PlaylistSongRemoved { playlist_id } => {
                plan.add(ViewKey::playlist_songs(playlist_id));
            }
        }

        plan
    }

    pub fn keys(&self) -> impl Iterator<Item = &ViewKey> {
        self.keys.iter()
    }

    pub fn contains(&self, key: &ViewKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn add(&mut self, key: ViewKey) {
        self.keys.insert(key);
    }

    fn add_album_songs(&mut self, album_id: Option<&str>) {
        if let Some(album_id) = album_id {
            self.add(ViewKey::album_songs(album_id));
        }
    }

    fn add_playlist_songs(&mut self, playlist_ids: &[String]) {
        for playlist_id in playlist_ids {
            self.add(ViewKey::playlist_songs(playlist_id));
        }
    }
}
