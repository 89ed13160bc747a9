//! Playlist access resolution.
//!
//! Resolution is a two-step chain: the owner check answers first, and only a
//! non-owner falls through to the collaborator check. Decisions are never
//! cached; each call reads the current playlist and grant rows.

use std::sync::Arc;

use tracing::debug;

use crate::application::collaborations::CollaborationRegistry;
use crate::application::error::{STATUS_FORBIDDEN, STATUS_NOT_FOUND};
use crate::application::repos::{PlaylistsRepo, RepoError};
use crate::domain::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenial {
    NotFound,
    Forbidden,
}

impl AccessDenial {
    pub fn status_code(self) -> u16 {
        match self {
            AccessDenial::NotFound => STATUS_NOT_FOUND,
            AccessDenial::Forbidden => STATUS_FORBIDDEN,
        }
    }
}

impl From<AccessDenial> for DomainError {
    fn from(denial: AccessDenial) -> Self {
        match denial {
            AccessDenial::NotFound => DomainError::not_found("playlist"),
            AccessDenial::Forbidden => DomainError::forbidden("playlist"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(AccessDenial),
}

impl AccessDecision {
    pub fn into_result(self) -> Result<(), DomainError> {
        match self {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(denial) => Err(denial.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    OwnerOrCollaborator,
    OwnerOnly,
}

#[derive(Debug, Clone, Copy)]
enum State {
    OwnerCheck,
    CollaboratorCheck,
}

#[derive(Clone)]
pub struct AccessResolver {
    playlists: Arc<dyn PlaylistsRepo>,
    collaborations: Arc<CollaborationRegistry>,
}

impl AccessResolver {
    pub fn new(
        playlists: Arc<dyn PlaylistsRepo>,
        collaborations: Arc<CollaborationRegistry>,
    ) -> Self {
        Self {
            playlists,
            collaborations,
        }
    }

    /// Owner or collaborator.
    pub async fn resolve(
        &self,
        playlist_id: &str,
        principal: &str,
    ) -> Result<AccessDecision, RepoError> {
        self.run(playlist_id, principal, Mode::OwnerOrCollaborator)
            .await
    }

    /// Owner only; collaborators are forbidden.
    pub async fn resolve_owner(
        &self,
        playlist_id: &str,
        principal: &str,
    ) -> Result<AccessDecision, RepoError> {
        self.run(playlist_id, principal, Mode::OwnerOnly).await
    }

    async fn run(
        &self,
        playlist_id: &str,
        principal: &str,
        mode: Mode,
    ) -> Result<AccessDecision, RepoError> {
        let mut state = State::OwnerCheck;
        let decision = loop {
            match state {
                State::OwnerCheck => {
                    let Some(playlist) = self.playlists.find_playlist(playlist_id).await? else {
                        break AccessDecision::Deny(AccessDenial::NotFound);
                    };
                    if playlist.owner_id == principal {
                        break AccessDecision::Allow;
                    }
                    if mode == Mode::OwnerOnly {
                        break AccessDecision::Deny(AccessDenial::Forbidden);
                    }
                    state = State::CollaboratorCheck;
                }
                State::CollaboratorCheck => {
                    break if self.collaborations.exists(playlist_id, principal).await? {
                        AccessDecision::Allow
                    } else {
                        AccessDecision::Deny(AccessDenial::Forbidden)
                    };
                }
            }
        };

        debug!(playlist_id, principal, ?mode, ?decision, "access resolved");
        Ok(decision)
    }
}
