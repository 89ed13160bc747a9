use async_trait::async_trait;

use crate::{
    application::repos::{RepoError, UsersRepo},
    domain::entities::UserRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    fullname: String,
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_user(&self, id: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, fullname FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| UserRecord {
            id: row.id,
            username: row.username,
            fullname: row.fullname,
        }))
    }
}
