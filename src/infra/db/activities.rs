use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{ActivitiesRepo, NewActivityRecord, RepoError},
    domain::{
        entities::ActivityRecord,
        ids::{IdKind, generate},
        types::ActivityAction,
    },
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ActivityRow {
    playlist_id: String,
    song_title: String,
    username: String,
    action: ActivityAction,
    time: OffsetDateTime,
}

impl From<ActivityRow> for ActivityRecord {
    fn from(row: ActivityRow) -> Self {
        Self {
            playlist_id: row.playlist_id,
            song_title: row.song_title,
            username: row.username,
            action: row.action,
            time: row.time,
        }
    }
}

#[async_trait]
impl ActivitiesRepo for PostgresRepositories {
    async fn append_activity(&self, record: NewActivityRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO playlist_song_activities
                (id, playlist_id, song_title, username, action, time)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(generate(IdKind::Activity))
        .bind(&record.playlist_id)
        .bind(&record.song_title)
        .bind(&record.username)
        .bind(record.action)
        .bind(record.time)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn list_activities(&self, playlist_id: &str) -> Result<Vec<ActivityRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT playlist_id, song_title, username, action, time
            FROM playlist_song_activities
            WHERE playlist_id = $1
            ORDER BY seq
            "#,
        )
        .bind(playlist_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ActivityRecord::from).collect())
    }
}
