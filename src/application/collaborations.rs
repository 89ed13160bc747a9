//! Playlist access grants beyond ownership.

use std::sync::Arc;

use tracing::info;

use crate::application::access::AccessResolver;
use crate::application::error::AppError;
use crate::application::repos::{CollaborationsRepo, RepoError, UsersRepo};
use crate::cache::{Mutation, ViewCache};

#[derive(Clone)]
pub struct CollaborationRegistry {
    repo: Arc<dyn CollaborationsRepo>,
    users: Arc<dyn UsersRepo>,
    views: Arc<ViewCache>,
}

impl CollaborationRegistry {
    pub fn new(
        repo: Arc<dyn CollaborationsRepo>,
        users: Arc<dyn UsersRepo>,
        views: Arc<ViewCache>,
    ) -> Self {
        Self { repo, users, views }
    }

    /// Grant `user_id` access to the playlist. Returns the collaboration id.
    ///
    /// Ownership of the playlist is checked by the caller.
    pub async fn add(&self, playlist_id: &str, user_id: &str) -> Result<String, AppError> {
        if self.users.find_user(user_id).await?.is_none() {
            return Err(AppError::not_found("user"));
        }

        let record = self.repo.create_collaboration(playlist_id, user_id).await?;
        self.views
            .apply(&Mutation::CollaborationGranted {
                user_id: user_id.to_string(),
            })
            .await;

        info!(
            playlist_id,
            user_id,
            collaboration_id = %record.id,
            "collaboration granted"
        );
        Ok(record.id)
    }

    /// Revoke a grant. A missing grant is an invariant violation and leaves
    /// every cached view untouched.
    pub async fn remove(&self, playlist_id: &str, user_id: &str) -> Result<(), AppError> {
        if !self.repo.delete_collaboration(playlist_id, user_id).await? {
            return Err(AppError::invariant("collaboration could not be removed"));
        }

        self.views
            .apply(&Mutation::CollaborationRevoked {
                user_id: user_id.to_string(),
            })
            .await;

        info!(playlist_id, user_id, "collaboration revoked");
        Ok(())
    }

    /// Always reads current state.
    pub async fn exists(&self, playlist_id: &str, user_id: &str) -> Result<bool, RepoError> {
        self.repo.collaboration_exists(playlist_id, user_id).await
    }
}

/// Owner-facing grant and revoke.
#[derive(Clone)]
pub struct CollaborationService {
    access: Arc<AccessResolver>,
    registry: Arc<CollaborationRegistry>,
}

impl CollaborationService {
    pub fn new(access: Arc<AccessResolver>, registry: Arc<CollaborationRegistry>) -> Self {
        Self { access, registry }
    }

    pub async fn grant(
        &self,
        owner_id: &str,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<String, AppError> {
        self.access
            .resolve_owner(playlist_id, owner_id)
            .await?
            .into_result()?;
        self.registry.add(playlist_id, user_id).await
    }

    pub async fn revoke(
        &self,
        owner_id: &str,
        playlist_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        self.access
            .resolve_owner(playlist_id, owner_id)
            .await?
            .into_result()?;
        self.registry.remove(playlist_id, user_id).await
    }
}
