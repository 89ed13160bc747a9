use std::sync::Arc;

use tracing::info;

use crate::application::error::AppError;
use crate::application::repos::{
    CreateSongParams, SongQueryFilter, SongsRepo, SongsWriteRepo, UpdateSongParams,
};
use crate::cache::{Mutation, ViewCache};
use crate::domain::entities::SongRecord;
use crate::domain::views::SongSummary;

/// Song payload shared by create and edit.
#[derive(Debug, Clone)]
pub struct SongInput {
    pub title: String,
    pub year: i32,
    pub genre: String,
    pub performer: String,
    pub duration: Option<i32>,
    pub album_id: Option<String>,
}

impl SongInput {
    fn validated(self) -> Result<Self, AppError> {
        let title = required("title", &self.title)?;
        let genre = required("genre", &self.genre)?;
        let performer = required("performer", &self.performer)?;
        if self.year <= 0 {
            return Err(AppError::validation("song year must be positive"));
        }
        if matches!(self.duration, Some(duration) if duration < 0) {
            return Err(AppError::validation("song duration must not be negative"));
        }
        Ok(Self {
            title,
            genre,
            performer,
            ..self
        })
    }
}

#[derive(Clone)]
pub struct SongService {
    reader: Arc<dyn SongsRepo>,
    writer: Arc<dyn SongsWriteRepo>,
    views: Arc<ViewCache>,
}

impl SongService {
    pub fn new(
        reader: Arc<dyn SongsRepo>,
        writer: Arc<dyn SongsWriteRepo>,
        views: Arc<ViewCache>,
    ) -> Self {
        Self {
            reader,
            writer,
            views,
        }
    }

    pub async fn add_song(&self, input: SongInput) -> Result<String, AppError> {
        let input = input.validated()?;
        let song = self
            .writer
            .create_song(CreateSongParams {
                title: input.title,
                year: input.year,
                genre: input.genre,
                performer: input.performer,
                duration: input.duration,
                album_id: input.album_id,
            })
            .await?;

        self.views
            .apply(&Mutation::SongAdded {
                album_id: song.album_id.clone(),
            })
            .await;
        info!(song_id = %song.id, "song created");
        Ok(song.id)
    }

    pub async fn song(&self, song_id: &str) -> Result<SongRecord, AppError> {
        self.reader
            .find_song(song_id)
            .await?
            .ok_or_else(|| AppError::not_found("song"))
    }

    /// Case-insensitive substring match on title and performer. No match is
    /// reported as NotFound.
    pub async fn search(&self, filter: SongQueryFilter) -> Result<Vec<SongSummary>, AppError> {
        let songs = self.reader.search_songs(&filter).await?;
        if songs.is_empty() {
            return Err(AppError::not_found("song"));
        }
        Ok(songs)
    }

    pub async fn edit_song(&self, song_id: &str, input: SongInput) -> Result<(), AppError> {
        let input = input.validated()?;
        let change = self
            .writer
            .update_song(UpdateSongParams {
                id: song_id.to_string(),
                title: input.title,
                year: input.year,
                genre: input.genre,
                performer: input.performer,
                duration: input.duration,
                album_id: input.album_id,
            })
            .await?
            .ok_or_else(|| AppError::not_found("song"))?;

        self.views
            .apply(&Mutation::SongEdited {
                previous_album_id: change.previous_album_id,
                album_id: change.album_id,
                playlist_ids: change.playlist_ids,
            })
            .await;
        Ok(())
    }

    pub async fn delete_song(&self, song_id: &str) -> Result<(), AppError> {
        let change = self
            .writer
            .delete_song(song_id)
            .await?
            .ok_or_else(|| AppError::not_found("song"))?;

        self.views
            .apply(&Mutation::SongDeleted {
                album_id: change.album_id,
                playlist_ids: change.playlist_ids,
            })
            .await;
        info!(song_id, "song deleted");
        Ok(())
    }
}

fn required(field: &'static str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!(
            "song {field} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}
