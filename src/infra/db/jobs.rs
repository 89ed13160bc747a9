use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::application::repos::{MessagePublisher, RepoError};

use super::{PostgresRepositories, map_sqlx_error};

const DEFAULT_MAX_ATTEMPTS: i32 = 25;

/// Publishes messages as apalis jobs; the topic becomes the job type.
#[derive(Clone)]
pub struct ApalisPublisher {
    repositories: PostgresRepositories,
}

impl ApalisPublisher {
    pub fn new(repositories: PostgresRepositories) -> Self {
        Self { repositories }
    }
}

#[async_trait]
impl MessagePublisher for ApalisPublisher {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), RepoError> {
        let job_id: String = sqlx::query_scalar(
            r#"
            SELECT (apalis.push_job($1, $2::json, 'Pending', now(), $3, 0)).id
            "#,
        )
        .bind(topic)
        .bind(payload)
        .bind(DEFAULT_MAX_ATTEMPTS)
        .fetch_one(self.repositories.pool())
        .await
        .map_err(map_sqlx_error)?;

        debug!(topic, job_id, "message enqueued");
        Ok(())
    }
}
