use std::sync::Arc;

use tracing::info;

use crate::application::error::AppError;
use crate::application::repos::{AlbumsWriteRepo, CreateAlbumParams, UpdateAlbumParams};
use crate::cache::{Mutation, Sourced, ViewCache};
use crate::domain::types::LikeOutcome;
use crate::domain::views::AlbumView;

#[derive(Clone)]
pub struct AlbumService {
    writer: Arc<dyn AlbumsWriteRepo>,
    views: Arc<ViewCache>,
}

impl AlbumService {
    pub fn new(writer: Arc<dyn AlbumsWriteRepo>, views: Arc<ViewCache>) -> Self {
        Self { writer, views }
    }

    pub async fn add_album(&self, name: &str, year: i32) -> Result<String, AppError> {
        let name = validate_album(name, year)?;
        let album = self
            .writer
            .create_album(CreateAlbumParams { name, year })
            .await?;
        info!(album_id = %album.id, "album created");
        Ok(album.id)
    }

    pub async fn album_view(&self, album_id: &str) -> Result<Sourced<AlbumView>, AppError> {
        Ok(self.views.album_view(album_id).await?)
    }

    pub async fn edit_album(&self, album_id: &str, name: &str, year: i32) -> Result<(), AppError> {
        let name = validate_album(name, year)?;
        self.writer
            .update_album(UpdateAlbumParams {
                id: album_id.to_string(),
                name,
                year,
            })
            .await?
            .ok_or_else(|| AppError::not_found("album"))?;

        self.views
            .apply(&Mutation::AlbumEdited {
                album_id: album_id.to_string(),
            })
            .await;
        Ok(())
    }

    /// Songs of the album go with it.
    pub async fn delete_album(&self, album_id: &str) -> Result<(), AppError> {
        let deletion = self
            .writer
            .delete_album(album_id)
            .await?
            .ok_or_else(|| AppError::not_found("album"))?;

        self.views
            .apply(&Mutation::AlbumDeleted {
                album_id: album_id.to_string(),
                playlist_ids: deletion.playlist_ids,
            })
            .await;
        info!(album_id, "album deleted");
        Ok(())
    }

    pub async fn set_cover(&self, album_id: &str, cover_url: &str) -> Result<(), AppError> {
        if cover_url.trim().is_empty() {
            return Err(AppError::validation("cover url must not be empty"));
        }
        if !self.writer.update_cover(album_id, cover_url).await? {
            return Err(AppError::not_found("album"));
        }

        self.views
            .apply(&Mutation::AlbumCoverSet {
                album_id: album_id.to_string(),
            })
            .await;
        Ok(())
    }

    /// Like the album if `user_id` has not, unlike it otherwise.
    pub async fn toggle_like(&self, user_id: &str, album_id: &str) -> Result<LikeOutcome, AppError> {
        let outcome = self.writer.toggle_like(user_id, album_id).await?;
        self.views
            .apply(&Mutation::AlbumLikeToggled {
                album_id: album_id.to_string(),
            })
            .await;
        Ok(outcome)
    }

    pub async fn like_count(&self, album_id: &str) -> Result<Sourced<u64>, AppError> {
        Ok(self.views.album_like_count(album_id).await?)
    }
}

fn validate_album(name: &str, year: i32) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("album name must not be empty"));
    }
    if year <= 0 {
        return Err(AppError::validation("album year must be positive"));
    }
    Ok(name.to_string())
}
