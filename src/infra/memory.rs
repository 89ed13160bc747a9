//! In-process repository implementations.
//!
//! Every trait method takes the state lock once for its whole duration, which
//! gives each write the same all-or-nothing visibility as a single SQL
//! statement. Foreign keys and unique constraints are enforced the way the
//! Postgres schema enforces them, cascades included.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::application::repos::{
    ActivitiesRepo, AlbumDeletion, AlbumsRepo, AlbumsWriteRepo, CollaborationsRepo,
    CreateAlbumParams, CreateSongParams, MessagePublisher, NewActivityRecord, PlaylistDeletion,
    PlaylistsRepo, PlaylistsWriteRepo, RepoError, SongChange, SongQueryFilter, SongsRepo,
    SongsWriteRepo, UpdateAlbumParams, UpdateSongParams, UsersRepo,
};
use crate::cache::{rw_read, rw_write};
use crate::domain::entities::{
    ActivityRecord, AlbumRecord, CollaborationRecord, PlaylistRecord, SongRecord, UserRecord,
};
use crate::domain::ids::{IdKind, generate};
use crate::domain::types::LikeOutcome;
use crate::domain::views::{PlaylistSummary, SongSummary};

const SOURCE: &str = "infra::memory";

struct PlaylistSongLink {
    id: String,
    playlist_id: String,
    song_id: String,
}

struct Like {
    user_id: String,
    album_id: String,
}

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<String, UserRecord>,
    albums: BTreeMap<String, AlbumRecord>,
    songs: BTreeMap<String, SongRecord>,
    playlists: BTreeMap<String, PlaylistRecord>,
    playlist_songs: Vec<PlaylistSongLink>,
    collaborations: Vec<CollaborationRecord>,
    likes: Vec<Like>,
    activities: Vec<ActivityRecord>,
}

impl MemoryState {
    fn song_summary(song: &SongRecord) -> SongSummary {
        SongSummary {
            id: song.id.clone(),
            title: song.title.clone(),
            performer: song.performer.clone(),
        }
    }

    fn playlist_summary(&self, playlist: &PlaylistRecord) -> Option<PlaylistSummary> {
        let owner = self.users.get(&playlist.owner_id)?;
        Some(PlaylistSummary {
            id: playlist.id.clone(),
            name: playlist.name.clone(),
            username: owner.username.clone(),
        })
    }

    fn playlists_holding(&self, song_ids: &BTreeSet<&str>) -> Vec<String> {
        let ids: BTreeSet<&str> = self
            .playlist_songs
            .iter()
            .filter(|link| song_ids.contains(link.song_id.as_str()))
            .map(|link| link.playlist_id.as_str())
            .collect();
        ids.into_iter().map(str::to_string).collect()
    }

    fn ensure_album(&self, album_id: Option<&str>) -> Result<(), RepoError> {
        match album_id {
            Some(id) if !self.albums.contains_key(id) => Err(foreign_key("songs_album_id_fkey")),
            _ => Ok(()),
        }
    }
}

fn foreign_key(constraint: &str) -> RepoError {
    RepoError::InvalidInput {
        message: format!("insert or update violates foreign key constraint \"{constraint}\""),
    }
}

fn duplicate(constraint: &str) -> RepoError {
    RepoError::Duplicate {
        constraint: constraint.to_string(),
    }
}

/// Repositories backed by process memory, for tests and database-less runs.
#[derive(Default)]
pub struct MemoryRepositories {
    state: RwLock<MemoryState>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users are provisioned outside the catalog; this seeds one.
    pub fn insert_user(&self, username: &str, fullname: &str) -> Result<UserRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "insert_user");
        if state.users.values().any(|user| user.username == username) {
            return Err(duplicate("users_username_key"));
        }
        let record = UserRecord {
            id: generate(IdKind::User),
            username: username.to_string(),
            fullname: fullname.to_string(),
        };
        state.users.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

#[async_trait]
impl AlbumsRepo for MemoryRepositories {
    async fn find_album(&self, id: &str) -> Result<Option<AlbumRecord>, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "find_album")
            .albums
            .get(id)
            .cloned())
    }

    async fn list_album_songs(&self, album_id: &str) -> Result<Vec<SongSummary>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_album_songs");
        let mut songs: Vec<&SongRecord> = state
            .songs
            .values()
            .filter(|song| song.album_id.as_deref() == Some(album_id))
            .collect();
        songs.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(songs.into_iter().map(MemoryState::song_summary).collect())
    }

    async fn count_likes(&self, album_id: &str) -> Result<u64, RepoError> {
        let state = rw_read(&self.state, SOURCE, "count_likes");
        Ok(state
            .likes
            .iter()
            .filter(|like| like.album_id == album_id)
            .count() as u64)
    }
}

#[async_trait]
impl AlbumsWriteRepo for MemoryRepositories {
    async fn create_album(&self, params: CreateAlbumParams) -> Result<AlbumRecord, RepoError> {
        let record = AlbumRecord {
            id: generate(IdKind::Album),
            name: params.name,
            year: params.year,
            cover_url: None,
        };
        rw_write(&self.state, SOURCE, "create_album")
            .albums
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_album(
        &self,
        params: UpdateAlbumParams,
    ) -> Result<Option<AlbumRecord>, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "update_album");
        Ok(state.albums.get_mut(&params.id).map(|album| {
            album.name = params.name;
            album.year = params.year;
            album.clone()
        }))
    }

    async fn update_cover(&self, id: &str, cover_url: &str) -> Result<bool, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "update_cover");
        Ok(match state.albums.get_mut(id) {
            Some(album) => {
                album.cover_url = Some(cover_url.to_string());
                true
            }
            None => false,
        })
    }

    async fn delete_album(&self, id: &str) -> Result<Option<AlbumDeletion>, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "delete_album");
        if state.albums.remove(id).is_none() {
            return Ok(None);
        }

        let song_ids: BTreeSet<String> = state
            .songs
            .values()
            .filter(|song| song.album_id.as_deref() == Some(id))
            .map(|song| song.id.clone())
            .collect();
        let borrowed: BTreeSet<&str> = song_ids.iter().map(String::as_str).collect();
        let playlist_ids = state.playlists_holding(&borrowed);

        state.songs.retain(|song_id, _| !song_ids.contains(song_id));
        state
            .playlist_songs
            .retain(|link| !song_ids.contains(&link.song_id));
        state.likes.retain(|like| like.album_id != id);

        Ok(Some(AlbumDeletion { playlist_ids }))
    }

    async fn toggle_like(&self, user_id: &str, album_id: &str) -> Result<LikeOutcome, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "toggle_like");
        if !state.albums.contains_key(album_id) {
            return Err(RepoError::NotFound);
        }
        if !state.users.contains_key(user_id) {
            return Err(foreign_key("user_album_likes_user_id_fkey"));
        }

        let before = state.likes.len();
        state
            .likes
            .retain(|like| !(like.user_id == user_id && like.album_id == album_id));
        if state.likes.len() < before {
            return Ok(LikeOutcome::Unliked);
        }

        state.likes.push(Like {
            user_id: user_id.to_string(),
            album_id: album_id.to_string(),
        });
        Ok(LikeOutcome::Liked)
    }
}

#[async_trait]
impl SongsRepo for MemoryRepositories {
    async fn find_song(&self, id: &str) -> Result<Option<SongRecord>, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "find_song")
            .songs
            .get(id)
            .cloned())
    }

    async fn search_songs(&self, filter: &SongQueryFilter) -> Result<Vec<SongSummary>, RepoError> {
        let title = filter.title.as_ref().map(|value| value.to_lowercase());
        let performer = filter.performer.as_ref().map(|value| value.to_lowercase());
        let matches = |field: &str, needle: &Option<String>| {
            needle
                .as_ref()
                .is_none_or(|needle| field.to_lowercase().contains(needle.as_str()))
        };

        let state = rw_read(&self.state, SOURCE, "search_songs");
        let mut songs: Vec<&SongRecord> = state
            .songs
            .values()
            .filter(|song| matches(&song.title, &title) && matches(&song.performer, &performer))
            .collect();
        songs.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(songs.into_iter().map(MemoryState::song_summary).collect())
    }
}

#[async_trait]
impl SongsWriteRepo for MemoryRepositories {
    async fn create_song(&self, params: CreateSongParams) -> Result<SongRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "create_song");
        state.ensure_album(params.album_id.as_deref())?;

        let record = SongRecord {
            id: generate(IdKind::Song),
            title: params.title,
            year: params.year,
            genre: params.genre,
            performer: params.performer,
            duration: params.duration,
            album_id: params.album_id,
        };
        state.songs.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_song(
        &self,
        params: UpdateSongParams,
    ) -> Result<Option<SongChange>, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "update_song");
        if !state.songs.contains_key(&params.id) {
            return Ok(None);
        }
        state.ensure_album(params.album_id.as_deref())?;

        let playlist_ids = state.playlists_holding(&BTreeSet::from([params.id.as_str()]));
        let Some(song) = state.songs.get_mut(&params.id) else {
            return Ok(None);
        };
        let previous_album_id = song.album_id.take();
        song.title = params.title;
        song.year = params.year;
        song.genre = params.genre;
        song.performer = params.performer;
        song.duration = params.duration;
        song.album_id = params.album_id.clone();

        Ok(Some(SongChange {
            previous_album_id,
            album_id: params.album_id,
            playlist_ids,
        }))
    }

    async fn delete_song(&self, id: &str) -> Result<Option<SongChange>, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "delete_song");
        let playlist_ids = state.playlists_holding(&BTreeSet::from([id]));
        let Some(song) = state.songs.remove(id) else {
            return Ok(None);
        };
        state.playlist_songs.retain(|link| link.song_id != id);

        Ok(Some(SongChange {
            previous_album_id: song.album_id.clone(),
            album_id: song.album_id,
            playlist_ids,
        }))
    }
}

#[async_trait]
impl PlaylistsRepo for MemoryRepositories {
    async fn find_playlist(&self, id: &str) -> Result<Option<PlaylistRecord>, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "find_playlist")
            .playlists
            .get(id)
            .cloned())
    }

    async fn list_visible_playlists(
        &self,
        user_id: &str,
    ) -> Result<Vec<PlaylistSummary>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_visible_playlists");
        let shared: BTreeSet<&str> = state
            .collaborations
            .iter()
            .filter(|collab| collab.user_id == user_id)
            .map(|collab| collab.playlist_id.as_str())
            .collect();

        let mut visible: Vec<PlaylistSummary> = state
            .playlists
            .values()
            .filter(|playlist| {
                playlist.owner_id == user_id || shared.contains(playlist.id.as_str())
            })
            .filter_map(|playlist| state.playlist_summary(playlist))
            .collect();
        visible.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(visible)
    }

    async fn find_playlist_summary(
        &self,
        id: &str,
    ) -> Result<Option<PlaylistSummary>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "find_playlist_summary");
        Ok(state
            .playlists
            .get(id)
            .and_then(|playlist| state.playlist_summary(playlist)))
    }

    async fn list_playlist_songs(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<SongSummary>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_playlist_songs");
        Ok(state
            .playlist_songs
            .iter()
            .filter(|link| link.playlist_id == playlist_id)
            .filter_map(|link| state.songs.get(&link.song_id))
            .map(MemoryState::song_summary)
            .collect())
    }
}

#[async_trait]
impl PlaylistsWriteRepo for MemoryRepositories {
    async fn create_playlist(
        &self,
        name: &str,
        owner_id: &str,
    ) -> Result<PlaylistRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "create_playlist");
        if !state.users.contains_key(owner_id) {
            return Err(foreign_key("playlists_owner_id_fkey"));
        }

        let record = PlaylistRecord {
            id: generate(IdKind::Playlist),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
        };
        state.playlists.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn delete_playlist(&self, id: &str) -> Result<Option<PlaylistDeletion>, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "delete_playlist");
        let Some(playlist) = state.playlists.remove(id) else {
            return Ok(None);
        };

        let mut collaborator_ids: Vec<String> = state
            .collaborations
            .iter()
            .filter(|collab| collab.playlist_id == id)
            .map(|collab| collab.user_id.clone())
            .collect();
        collaborator_ids.sort();

        state.collaborations.retain(|collab| collab.playlist_id != id);
        state.playlist_songs.retain(|link| link.playlist_id != id);

        Ok(Some(PlaylistDeletion {
            owner_id: playlist.owner_id,
            collaborator_ids,
        }))
    }

    async fn add_playlist_song(
        &self,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<String, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "add_playlist_song");
        if !state.playlists.contains_key(playlist_id) {
            return Err(foreign_key("playlist_songs_playlist_id_fkey"));
        }
        if !state.songs.contains_key(song_id) {
            return Err(foreign_key("playlist_songs_song_id_fkey"));
        }
        if state
            .playlist_songs
            .iter()
            .any(|link| link.playlist_id == playlist_id && link.song_id == song_id)
        {
            return Err(duplicate("playlist_songs_unique"));
        }

        let id = generate(IdKind::PlaylistSong);
        state.playlist_songs.push(PlaylistSongLink {
            id: id.clone(),
            playlist_id: playlist_id.to_string(),
            song_id: song_id.to_string(),
        });
        Ok(id)
    }

    async fn remove_playlist_song(
        &self,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<bool, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "remove_playlist_song");
        let before = state.playlist_songs.len();
        state
            .playlist_songs
            .retain(|link| !(link.playlist_id == playlist_id && link.song_id == song_id));
        Ok(state.playlist_songs.len() < before)
    }
}

#[async_trait]
impl CollaborationsRepo for MemoryRepositories {
    async fn collaboration_exists(
        &self,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<bool, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "collaboration_exists")
            .collaborations
            .iter()
            .any(|collab| collab.playlist_id == playlist_id && collab.user_id == user_id))
    }

    async fn create_collaboration(
        &self,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<CollaborationRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "create_collaboration");
        if !state.playlists.contains_key(playlist_id) {
            return Err(foreign_key("collaborations_playlist_id_fkey"));
        }
        if !state.users.contains_key(user_id) {
            return Err(foreign_key("collaborations_user_id_fkey"));
        }
        if state
            .collaborations
            .iter()
            .any(|collab| collab.playlist_id == playlist_id && collab.user_id == user_id)
        {
            return Err(duplicate("collaborations_unique"));
        }

        let record = CollaborationRecord {
            id: generate(IdKind::Collaboration),
            playlist_id: playlist_id.to_string(),
            user_id: user_id.to_string(),
        };
        state.collaborations.push(record.clone());
        Ok(record)
    }

    async fn delete_collaboration(
        &self,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<bool, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "delete_collaboration");
        let before = state.collaborations.len();
        state
            .collaborations
            .retain(|collab| !(collab.playlist_id == playlist_id && collab.user_id == user_id));
        Ok(state.collaborations.len() < before)
    }
}

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "find_user")
            .users
            .get(id)
            .cloned())
    }
}

#[async_trait]
impl ActivitiesRepo for MemoryRepositories {
    async fn append_activity(&self, record: NewActivityRecord) -> Result<(), RepoError> {
        rw_write(&self.state, SOURCE, "append_activity").activities.push(ActivityRecord {
            playlist_id: record.playlist_id,
            song_title: record.song_title,
            username: record.username,
            action: record.action,
            time: record.time,
        });
        Ok(())
    }

    async fn list_activities(&self, playlist_id: &str) -> Result<Vec<ActivityRecord>, RepoError> {
        Ok(rw_read(&self.state, SOURCE, "list_activities")
            .activities
            .iter()
            .filter(|activity| activity.playlist_id == playlist_id)
            .cloned()
            .collect())
    }
}

/// Publisher that keeps every message, in order.
#[derive(Default)]
pub struct MemoryPublisher {
    messages: RwLock<Vec<(String, Value)>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, Value)> {
        rw_read(&self.messages, SOURCE, "published").clone()
    }
}

#[async_trait]
impl MessagePublisher for MemoryPublisher {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), RepoError> {
        rw_write(&self.messages, SOURCE, "publish").push((topic.to_string(), payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::domain::types::ActivityAction;

    fn song_params(title: &str, album_id: Option<&str>) -> CreateSongParams {
        CreateSongParams {
            title: title.to_string(),
            year: 2008,
            genre: "Indie".to_string(),
            performer: "Coldplay".to_string(),
            duration: Some(120),
            album_id: album_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn playlist_delete_keeps_activity_history() {
        let repos = MemoryRepositories::new();
        let owner = repos.insert_user("dicoding", "Dicoding Indonesia").unwrap();
        let playlist = repos.create_playlist("Road Trip", &owner.id).await.unwrap();
        repos
            .append_activity(NewActivityRecord {
                playlist_id: playlist.id.clone(),
                song_title: "Yellow".into(),
                username: owner.username.clone(),
                action: ActivityAction::Add,
                time: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();

        repos.delete_playlist(&playlist.id).await.unwrap().unwrap();

        let log = repos.list_activities(&playlist.id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].song_title, "Yellow");
    }

    #[tokio::test]
    async fn album_delete_cascades_and_reports_playlists() {
        let repos = MemoryRepositories::new();
        let owner = repos.insert_user("dicoding", "Dicoding Indonesia").unwrap();
        let album = repos
            .create_album(CreateAlbumParams {
                name: "Viva la Vida".into(),
                year: 2008,
            })
            .await
            .unwrap();
        let song = repos
            .create_song(song_params("Life in Technicolor", Some(&album.id)))
            .await
            .unwrap();
        let playlist = repos.create_playlist("Road Trip", &owner.id).await.unwrap();
        repos
            .add_playlist_song(&playlist.id, &song.id)
            .await
            .unwrap();
        repos.toggle_like(&owner.id, &album.id).await.unwrap();

        let deletion = repos.delete_album(&album.id).await.unwrap().unwrap();

        assert_eq!(deletion.playlist_ids, vec![playlist.id.clone()]);
        assert!(repos.find_song(&song.id).await.unwrap().is_none());
        assert!(
            repos
                .list_playlist_songs(&playlist.id)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(repos.count_likes(&album.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_song_reports_previous_album() {
        let repos = MemoryRepositories::new();
        let first = repos
            .create_album(CreateAlbumParams {
                name: "A".into(),
                year: 2000,
            })
            .await
            .unwrap();
        let second = repos
            .create_album(CreateAlbumParams {
                name: "B".into(),
                year: 2001,
            })
            .await
            .unwrap();
        let song = repos
            .create_song(song_params("Fix You", Some(&first.id)))
            .await
            .unwrap();

        let change = repos
            .update_song(UpdateSongParams {
                id: song.id.clone(),
                title: "Fix You".into(),
                year: 2005,
                genre: "Rock".into(),
                performer: "Coldplay".into(),
                duration: None,
                album_id: Some(second.id.clone()),
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(change.previous_album_id.as_deref(), Some(first.id.as_str()));
        assert_eq!(change.album_id.as_deref(), Some(second.id.as_str()));
    }

    #[tokio::test]
    async fn song_with_unknown_album_is_rejected() {
        let repos = MemoryRepositories::new();
        let err = repos
            .create_song(song_params("Orphan", Some("album-missing")))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn duplicate_collaboration_is_rejected() {
        let repos = MemoryRepositories::new();
        let owner = repos.insert_user("owner", "Owner").unwrap();
        let guest = repos.insert_user("guest", "Guest").unwrap();
        let playlist = repos.create_playlist("Mix", &owner.id).await.unwrap();

        repos
            .create_collaboration(&playlist.id, &guest.id)
            .await
            .unwrap();
        let err = repos
            .create_collaboration(&playlist.id, &guest.id)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_on_both_fields() {
        let repos = MemoryRepositories::new();
        repos.create_song(song_params("Yellow", None)).await.unwrap();
        repos.create_song(song_params("Clocks", None)).await.unwrap();

        let found = repos
            .search_songs(&SongQueryFilter {
                title: Some("yEl".into()),
                performer: Some("COLD".into()),
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Yellow");
    }
}
