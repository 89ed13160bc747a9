use async_trait::async_trait;

use crate::{
    application::repos::{
        AlbumDeletion, AlbumsRepo, AlbumsWriteRepo, CreateAlbumParams, RepoError,
        UpdateAlbumParams,
    },
    domain::{
        entities::AlbumRecord,
        ids::{IdKind, generate},
        types::LikeOutcome,
        views::SongSummary,
    },
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct AlbumRow {
    id: String,
    name: String,
    year: i32,
    cover_url: Option<String>,
}

impl From<AlbumRow> for AlbumRecord {
    fn from(row: AlbumRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            year: row.year,
            cover_url: row.cover_url,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct SongSummaryRow {
    pub(super) id: String,
    pub(super) title: String,
    pub(super) performer: String,
}

impl From<SongSummaryRow> for SongSummary {
    fn from(row: SongSummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            performer: row.performer,
        }
    }
}

#[async_trait]
impl AlbumsRepo for PostgresRepositories {
    async fn find_album(&self, id: &str) -> Result<Option<AlbumRecord>, RepoError> {
        let row = sqlx::query_as::<_, AlbumRow>(
            r#"
            SELECT id, name, year, cover_url
            FROM albums
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AlbumRecord::from))
    }

    async fn list_album_songs(&self, album_id: &str) -> Result<Vec<SongSummary>, RepoError> {
        let rows = sqlx::query_as::<_, SongSummaryRow>(
            r#"
            SELECT id, title, performer
            FROM songs
            WHERE album_id = $1
            ORDER BY title, id
            "#,
        )
        .bind(album_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(SongSummary::from).collect())
    }

    async fn count_likes(&self, album_id: &str) -> Result<u64, RepoError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_album_likes WHERE album_id = $1")
                .bind(album_id)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}

#[async_trait]
impl AlbumsWriteRepo for PostgresRepositories {
    async fn create_album(&self, params: CreateAlbumParams) -> Result<AlbumRecord, RepoError> {
        let row = sqlx::query_as::<_, AlbumRow>(
            r#"
            INSERT INTO albums (id, name, year)
            VALUES ($1, $2, $3)
            RETURNING id, name, year, cover_url
            "#,
        )
        .bind(generate(IdKind::Album))
        .bind(&params.name)
        .bind(params.year)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_album(
        &self,
        params: UpdateAlbumParams,
    ) -> Result<Option<AlbumRecord>, RepoError> {
        let row = sqlx::query_as::<_, AlbumRow>(
            r#"
            UPDATE albums
               SET name = $2,
                   year = $3
             WHERE id = $1
            RETURNING id, name, year, cover_url
            "#,
        )
        .bind(&params.id)
        .bind(&params.name)
        .bind(params.year)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AlbumRecord::from))
    }

    async fn update_cover(&self, id: &str, cover_url: &str) -> Result<bool, RepoError> {
        let result = sqlx::query("UPDATE albums SET cover_url = $2 WHERE id = $1")
            .bind(id)
            .bind(cover_url)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_album(&self, id: &str) -> Result<Option<AlbumDeletion>, RepoError> {
        // The snapshot taken before the delete still sees the songs and
        // playlist links removed by the cascade.
        let playlist_ids: Option<Vec<String>> = sqlx::query_scalar(
            r#"
            WITH removed AS (
                DELETE FROM albums WHERE id = $1 RETURNING id
            )
            SELECT ARRAY(
                SELECT DISTINCT ps.playlist_id
                FROM playlist_songs ps
                JOIN songs s ON s.id = ps.song_id
                WHERE s.album_id = removed.id
                ORDER BY ps.playlist_id
            )
            FROM removed
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(playlist_ids.map(|playlist_ids| AlbumDeletion { playlist_ids }))
    }

    async fn toggle_like(&self, user_id: &str, album_id: &str) -> Result<LikeOutcome, RepoError> {
        if self.find_album(album_id).await?.is_none() {
            return Err(RepoError::NotFound);
        }

        let inserted: Option<String> = sqlx::query_scalar(
            r#"
            WITH removed AS (
                DELETE FROM user_album_likes
                WHERE user_id = $2 AND album_id = $3
                RETURNING id
            )
            INSERT INTO user_album_likes (id, user_id, album_id)
            SELECT $1, $2, $3
            WHERE NOT EXISTS (SELECT 1 FROM removed)
            RETURNING id
            "#,
        )
        .bind(generate(IdKind::Like))
        .bind(user_id)
        .bind(album_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(if inserted.is_some() {
            LikeOutcome::Liked
        } else {
            LikeOutcome::Unliked
        })
    }
}
