use async_trait::async_trait;

use crate::{
    application::repos::{PlaylistDeletion, PlaylistsRepo, PlaylistsWriteRepo, RepoError},
    domain::{
        entities::PlaylistRecord,
        ids::{IdKind, generate},
        views::{PlaylistSummary, SongSummary},
    },
};

use super::{PostgresRepositories, albums::SongSummaryRow, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PlaylistRow {
    id: String,
    name: String,
    owner_id: String,
}

impl From<PlaylistRow> for PlaylistRecord {
    fn from(row: PlaylistRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            owner_id: row.owner_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PlaylistSummaryRow {
    id: String,
    name: String,
    username: String,
}

impl From<PlaylistSummaryRow> for PlaylistSummary {
    fn from(row: PlaylistSummaryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            username: row.username,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PlaylistDeletionRow {
    owner_id: String,
    collaborator_ids: Vec<String>,
}

#[async_trait]
impl PlaylistsRepo for PostgresRepositories {
    async fn find_playlist(&self, id: &str) -> Result<Option<PlaylistRecord>, RepoError> {
        let row = sqlx::query_as::<_, PlaylistRow>(
            "SELECT id, name, owner_id FROM playlists WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PlaylistRecord::from))
    }

    async fn list_visible_playlists(
        &self,
        user_id: &str,
    ) -> Result<Vec<PlaylistSummary>, RepoError> {
        let rows = sqlx::query_as::<_, PlaylistSummaryRow>(
            r#"
            SELECT p.id, p.name, u.username
            FROM playlists p
            JOIN users u ON u.id = p.owner_id
            LEFT JOIN collaborations c ON c.playlist_id = p.id AND c.user_id = $1
            WHERE p.owner_id = $1 OR c.user_id IS NOT NULL
            ORDER BY p.name, p.id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PlaylistSummary::from).collect())
    }

    async fn find_playlist_summary(
        &self,
        id: &str,
    ) -> Result<Option<PlaylistSummary>, RepoError> {
        let row = sqlx::query_as::<_, PlaylistSummaryRow>(
            r#"
            SELECT p.id, p.name, u.username
            FROM playlists p
            JOIN users u ON u.id = p.owner_id
            WHERE p.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PlaylistSummary::from))
    }

    async fn list_playlist_songs(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<SongSummary>, RepoError> {
        let rows = sqlx::query_as::<_, SongSummaryRow>(
            r#"
            SELECT s.id, s.title, s.performer
            FROM playlist_songs ps
            JOIN songs s ON s.id = ps.song_id
            WHERE ps.playlist_id = $1
            ORDER BY ps.added_at, ps.id
            "#,
        )
        .bind(playlist_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(SongSummary::from).collect())
    }
}

#[async_trait]
impl PlaylistsWriteRepo for PostgresRepositories {
    async fn create_playlist(
        &self,
        name: &str,
        owner_id: &str,
    ) -> Result<PlaylistRecord, RepoError> {
        let row = sqlx::query_as::<_, PlaylistRow>(
            r#"
            INSERT INTO playlists (id, name, owner_id)
            VALUES ($1, $2, $3)
            RETURNING id, name, owner_id
            "#,
        )
        .bind(generate(IdKind::Playlist))
        .bind(name)
        .bind(owner_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_playlist(&self, id: &str) -> Result<Option<PlaylistDeletion>, RepoError> {
        let row = sqlx::query_as::<_, PlaylistDeletionRow>(
            r#"
            WITH removed AS (
                DELETE FROM playlists WHERE id = $1 RETURNING id, owner_id
            )
            SELECT removed.owner_id,
                   ARRAY(
                       SELECT c.user_id
                       FROM collaborations c
                       WHERE c.playlist_id = removed.id
                       ORDER BY c.user_id
                   ) AS collaborator_ids
            FROM removed
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| PlaylistDeletion {
            owner_id: row.owner_id,
            collaborator_ids: row.collaborator_ids,
        }))
    }

    async fn add_playlist_song(
        &self,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<String, RepoError> {
        sqlx::query_scalar(
            r#"
            INSERT INTO playlist_songs (id, playlist_id, song_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(generate(IdKind::PlaylistSong))
        .bind(playlist_id)
        .bind(song_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn remove_playlist_song(
        &self,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM playlist_songs WHERE playlist_id = $1 AND song_id = $2")
                .bind(playlist_id)
                .bind(song_id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
