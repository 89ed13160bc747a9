use async_trait::async_trait;

use crate::{
    application::repos::{CollaborationsRepo, RepoError},
    domain::{
        entities::CollaborationRecord,
        ids::{IdKind, generate},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CollaborationRow {
    id: String,
    playlist_id: String,
    user_id: String,
}

impl From<CollaborationRow> for CollaborationRecord {
    fn from(row: CollaborationRow) -> Self {
        Self {
            id: row.id,
            playlist_id: row.playlist_id,
            user_id: row.user_id,
        }
    }
}

#[async_trait]
impl CollaborationsRepo for PostgresRepositories {
    async fn collaboration_exists(
        &self,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<bool, RepoError> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM collaborations WHERE playlist_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(playlist_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn create_collaboration(
        &self,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<CollaborationRecord, RepoError> {
        let row = sqlx::query_as::<_, CollaborationRow>(
            r#"
            INSERT INTO collaborations (id, playlist_id, user_id)
            VALUES ($1, $2, $3)
            RETURNING id, playlist_id, user_id
            "#,
        )
        .bind(generate(IdKind::Collaboration))
        .bind(playlist_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_collaboration(
        &self,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM collaborations WHERE playlist_id = $1 AND user_id = $2")
                .bind(playlist_id)
                .bind(user_id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
