use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;

use crate::application::access::AccessResolver;
use crate::application::activity::PlaylistActivityLog;
use crate::application::error::AppError;
use crate::application::repos::{PlaylistsWriteRepo, SongsRepo, UsersRepo};
use crate::cache::{Mutation, Sourced, ViewCache};
use crate::domain::entities::ActivityRecord;
use crate::domain::types::ActivityAction;
use crate::domain::views::{PlaylistSongsView, PlaylistSummary};

#[derive(Clone)]
pub struct PlaylistService {
    writer: Arc<dyn PlaylistsWriteRepo>,
    songs: Arc<dyn SongsRepo>,
    users: Arc<dyn UsersRepo>,
    access: Arc<AccessResolver>,
    activity: Arc<PlaylistActivityLog>,
    views: Arc<ViewCache>,
}

impl PlaylistService {
    pub fn new(
        writer: Arc<dyn PlaylistsWriteRepo>,
        songs: Arc<dyn SongsRepo>,
        users: Arc<dyn UsersRepo>,
        access: Arc<AccessResolver>,
        activity: Arc<PlaylistActivityLog>,
        views: Arc<ViewCache>,
    ) -> Self {
        Self {
            writer,
            songs,
            users,
            access,
            activity,
            views,
        }
    }

    pub async fn add_playlist(&self, name: &str, owner_id: &str) -> Result<String, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("playlist name must not be empty"));
        }

        let playlist = self.writer.create_playlist(name, owner_id).await?;
        self.views
            .apply(&Mutation::PlaylistCreated {
                owner_id: owner_id.to_string(),
            })
            .await;
        info!(playlist_id = %playlist.id, owner_id, "playlist created");
        Ok(playlist.id)
    }

    /// Playlists owned by or shared with `user_id`.
    pub async fn playlists(&self, user_id: &str) -> Result<Sourced<Vec<PlaylistSummary>>, AppError> {
        Ok(self.views.playlist_list(user_id).await?)
    }

    /// Owner only.
    pub async fn delete_playlist(&self, principal: &str, playlist_id: &str) -> Result<(), AppError> {
        self.access
            .resolve_owner(playlist_id, principal)
            .await?
            .into_result()?;

        let deletion = self
            .writer
            .delete_playlist(playlist_id)
            .await?
            .ok_or_else(|| AppError::not_found("playlist"))?;

        self.views
            .apply(&Mutation::PlaylistDeleted {
                playlist_id: playlist_id.to_string(),
                owner_id: deletion.owner_id,
                collaborator_ids: deletion.collaborator_ids,
            })
            .await;
        info!(playlist_id, "playlist deleted");
        Ok(())
    }

    /// Returns the id of the playlist/song link.
    pub async fn add_song_to_playlist(
        &self,
        principal: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<String, AppError> {
        self.access
            .resolve(playlist_id, principal)
            .await?
            .into_result()?;

        let song = self
            .songs
            .find_song(song_id)
            .await?
            .ok_or_else(|| AppError::not_found("song"))?;
        let username = self.username(principal).await?;

        let link_id = self.writer.add_playlist_song(playlist_id, song_id).await?;
        self.views
            .apply(&Mutation::PlaylistSongAdded {
                playlist_id: playlist_id.to_string(),
            })
            .await;

        self.activity
            .append(
                playlist_id,
                &song.title,
                &username,
                ActivityAction::Add,
                OffsetDateTime::now_utc(),
            )
            .await?;
        Ok(link_id)
    }

    pub async fn playlist_songs(
        &self,
        principal: &str,
        playlist_id: &str,
    ) -> Result<Sourced<PlaylistSongsView>, AppError> {
        self.access
            .resolve(playlist_id, principal)
            .await?
            .into_result()?;
        Ok(self.views.playlist_songs(playlist_id).await?)
    }

    pub async fn delete_song_from_playlist(
        &self,
        principal: &str,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<(), AppError> {
        self.access
            .resolve(playlist_id, principal)
            .await?
            .into_result()?;

        let song = self
            .songs
            .find_song(song_id)
            .await?
            .ok_or_else(|| AppError::not_found("song"))?;
        let username = self.username(principal).await?;

        if !self
            .writer
            .remove_playlist_song(playlist_id, song_id)
            .await?
        {
            return Err(AppError::not_found("playlist song"));
        }
        self.views
            .apply(&Mutation::PlaylistSongRemoved {
                playlist_id: playlist_id.to_string(),
            })
            .await;

        self.activity
            .append(
                playlist_id,
                &song.title,
                &username,
                ActivityAction::Delete,
                OffsetDateTime::now_utc(),
            )
            .await?;
        Ok(())
    }

    pub async fn activities(
        &self,
        principal: &str,
        playlist_id: &str,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        self.access
            .resolve(playlist_id, principal)
            .await?
            .into_result()?;
        self.activity.list_for(playlist_id).await
    }

    async fn username(&self, user_id: &str) -> Result<String, AppError> {
        self.users
            .find_user(user_id)
            .await?
            .map(|user| user.username)
            .ok_or_else(|| AppError::not_found("user"))
    }
}
