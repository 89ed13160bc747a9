//! Asynchronous playlist export requests.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::application::access::AccessResolver;
use crate::application::error::AppError;
use crate::application::repos::MessagePublisher;
use crate::infra::error::InfraError;

pub const DEFAULT_EXPORT_TOPIC: &str = "export:playlist";

#[derive(Clone)]
pub struct ExportService {
    access: Arc<AccessResolver>,
    publisher: Arc<dyn MessagePublisher>,
    topic: String,
}

impl ExportService {
    pub fn new(
        access: Arc<AccessResolver>,
        publisher: Arc<dyn MessagePublisher>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            access,
            publisher,
            topic: topic.into(),
        }
    }

    /// Queue an export of the playlist to `target_email`. Nothing is awaited
    /// beyond the enqueue itself.
    pub async fn request_export(
        &self,
        principal: &str,
        playlist_id: &str,
        target_email: &str,
    ) -> Result<(), AppError> {
        let target_email = target_email.trim();
        if target_email.is_empty() {
            return Err(AppError::validation("target email must not be empty"));
        }

        self.access
            .resolve(playlist_id, principal)
            .await?
            .into_result()?;

        let payload = json!({
            "playlistId": playlist_id,
            "targetEmail": target_email,
        });
        self.publisher
            .publish(&self.topic, payload)
            .await
            .map_err(|err| InfraError::publisher(err.to_string()))?;

        info!(playlist_id, topic = %self.topic, "playlist export queued");
        Ok(())
    }
}
