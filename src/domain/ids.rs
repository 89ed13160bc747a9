//! Opaque identifiers of the form `<kind>-<random16>`.

use uuid::Uuid;

const RANDOM_LEN: usize = 16;

/// Entity families that receive generated identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Album,
    Song,
    Playlist,
    PlaylistSong,
    Collaboration,
    Like,
    Activity,
    User,
}

impl IdKind {
    pub fn prefix(self) -> &'static str {
        match self {
            IdKind::Album => "album",
            IdKind::Song => "song",
            IdKind::Playlist => "playlist",
            IdKind::PlaylistSong => "playlist_song",
            IdKind::Collaboration => "collab",
            IdKind::Like => "like",
            IdKind::Activity => "activity",
            IdKind::User => "user",
        }
    }
}

/// Generate a fresh identifier for `kind`.
pub fn generate(kind: IdKind) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("{}-{}", kind.prefix(), &random[..RANDOM_LEN])
}
