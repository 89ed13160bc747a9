use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    application::repos::{
        CreateSongParams, RepoError, SongChange, SongQueryFilter, SongsRepo, SongsWriteRepo,
        UpdateSongParams,
    },
    domain::{
        entities::SongRecord,
        ids::{IdKind, generate},
        views::SongSummary,
    },
};

use super::{PostgresRepositories, albums::SongSummaryRow, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SongRow {
    id: String,
    title: String,
    year: i32,
    genre: String,
    performer: String,
    duration: Option<i32>,
    album_id: Option<String>,
}

impl From<SongRow> for SongRecord {
    fn from(row: SongRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            year: row.year,
            genre: row.genre,
            performer: row.performer,
            duration: row.duration,
            album_id: row.album_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SongChangeRow {
    previous_album_id: Option<String>,
    album_id: Option<String>,
    playlist_ids: Vec<String>,
}

impl From<SongChangeRow> for SongChange {
    fn from(row: SongChangeRow) -> Self {
        Self {
            previous_album_id: row.previous_album_id,
            album_id: row.album_id,
            playlist_ids: row.playlist_ids,
        }
    }
}

#[async_trait]
impl SongsRepo for PostgresRepositories {
    async fn find_song(&self, id: &str) -> Result<Option<SongRecord>, RepoError> {
        let row = sqlx::query_as::<_, SongRow>(
            r#"
            SELECT id, title, year, genre, performer, duration, album_id
            FROM songs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SongRecord::from))
    }

    async fn search_songs(&self, filter: &SongQueryFilter) -> Result<Vec<SongSummary>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, title, performer FROM songs WHERE TRUE",
        );
        if let Some(title) = filter.title.as_ref() {
            qb.push(" AND title ILIKE ");
            qb.push_bind(format!("%{}%", escape_like(title)));
        }
        if let Some(performer) = filter.performer.as_ref() {
            qb.push(" AND performer ILIKE ");
            qb.push_bind(format!("%{}%", escape_like(performer)));
        }
        qb.push(" ORDER BY title, id");

        let rows = qb
            .build_query_as::<SongSummaryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(SongSummary::from).collect())
    }
}

#[async_trait]
impl SongsWriteRepo for PostgresRepositories {
    async fn create_song(&self, params: CreateSongParams) -> Result<SongRecord, RepoError> {
        let row = sqlx::query_as::<_, SongRow>(
            r#"
            INSERT INTO songs (id, title, year, genre, performer, duration, album_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, title, year, genre, performer, duration, album_id
            "#,
        )
        .bind(generate(IdKind::Song))
        .bind(&params.title)
        .bind(params.year)
        .bind(&params.genre)
        .bind(&params.performer)
        .bind(params.duration)
        .bind(params.album_id.as_deref())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_song(
        &self,
        params: UpdateSongParams,
    ) -> Result<Option<SongChange>, RepoError> {
        // `prev` is read from the statement snapshot, i.e. before the update.
        let row = sqlx::query_as::<_, SongChangeRow>(
            r#"
            UPDATE songs s
               SET title = $2,
                   year = $3,
                   genre = $4,
                   performer = $5,
                   duration = $6,
                   album_id = $7
              FROM songs prev
             WHERE s.id = $1
               AND prev.id = s.id
            RETURNING prev.album_id AS previous_album_id,
                      s.album_id,
                      ARRAY(
                          SELECT ps.playlist_id
                          FROM playlist_songs ps
                          WHERE ps.song_id = s.id
                          ORDER BY ps.playlist_id
                      ) AS playlist_ids
            "#,
        )
        .bind(&params.id)
        .bind(&params.title)
        .bind(params.year)
        .bind(&params.genre)
        .bind(&params.performer)
        .bind(params.duration)
        .bind(params.album_id.as_deref())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SongChange::from))
    }

    async fn delete_song(&self, id: &str) -> Result<Option<SongChange>, RepoError> {
        let row = sqlx::query_as::<_, SongChangeRow>(
            r#"
            WITH removed AS (
                DELETE FROM songs WHERE id = $1 RETURNING id, album_id
            )
            SELECT removed.album_id AS previous_album_id,
                   removed.album_id,
                   ARRAY(
                       SELECT ps.playlist_id
                       FROM playlist_songs ps
                       WHERE ps.song_id = removed.id
                       ORDER BY ps.playlist_id
                   ) AS playlist_ids
            FROM removed
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SongChange::from))
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
