//! Append-only playlist activity log.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::application::error::AppError;
use crate::application::repos::{ActivitiesRepo, NewActivityRecord, RepoError};
use crate::domain::entities::ActivityRecord;
use crate::domain::types::ActivityAction;

#[derive(Clone)]
pub struct PlaylistActivityLog {
    repo: Arc<dyn ActivitiesRepo>,
}

impl PlaylistActivityLog {
    pub fn new(repo: Arc<dyn ActivitiesRepo>) -> Self {
        Self { repo }
    }

    /// Record display values as they are at `time`; later renames do not
    /// rewrite history.
    pub async fn append(
        &self,
        playlist_id: &str,
        song_title: &str,
        username: &str,
        action: ActivityAction,
        time: OffsetDateTime,
    ) -> Result<(), RepoError> {
        self.repo
            .append_activity(NewActivityRecord {
                playlist_id: playlist_id.to_string(),
                song_title: song_title.to_string(),
                username: username.to_string(),
                action,
                time,
            })
            .await
    }

    /// Records in insertion order. A playlist without activity is NotFound.
    pub async fn list_for(&self, playlist_id: &str) -> Result<Vec<ActivityRecord>, AppError> {
        let records = self.repo.list_activities(playlist_id).await?;
        if records.is_empty() {
            return Err(AppError::not_found("activity"));
        }
        Ok(records)
    }
}
