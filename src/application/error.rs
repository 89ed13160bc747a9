use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::repos::RepoError, cache::ViewError, domain::error::DomainError,
    infra::error::InfraError,
};

pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_FORBIDDEN: u16 = 403;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_CONFLICT: u16 = 409;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;
pub const STATUS_SERVICE_UNAVAILABLE: u16 = 503;

/// Flattened error chain for logs and upstream responses.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: u16,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: u16, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl From<ViewError> for AppError {
    fn from(err: ViewError) -> Self {
        match err {
            ViewError::NotFound { entity } => AppError::Domain(DomainError::not_found(entity)),
            ViewError::Repo(err) => AppError::Repo(err),
        }
    }
}

impl AppError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::Domain(DomainError::not_found(entity))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::validation(message))
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::invariant(message))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::Domain(DomainError::NotFound { .. }) | AppError::Repo(RepoError::NotFound)
        )
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, AppError::Domain(DomainError::Forbidden { .. }))
    }

    /// HTTP status an upstream transport should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Domain(DomainError::NotFound { .. }) | AppError::Repo(RepoError::NotFound) => {
                STATUS_NOT_FOUND
            }
            AppError::Domain(DomainError::Forbidden { .. }) => STATUS_FORBIDDEN,
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Domain(DomainError::Invariant { .. })
            | AppError::Repo(RepoError::InvalidInput { .. })
            | AppError::Repo(RepoError::Integrity { .. }) => STATUS_BAD_REQUEST,
            AppError::Repo(RepoError::Duplicate { .. }) => STATUS_CONFLICT,
            AppError::Repo(RepoError::Persistence(_)) | AppError::Repo(RepoError::Timeout) => {
                STATUS_SERVICE_UNAVAILABLE
            }
            AppError::Infra(InfraError::Database { .. })
            | AppError::Infra(InfraError::Cache(_))
            | AppError::Infra(InfraError::Publisher { .. }) => STATUS_SERVICE_UNAVAILABLE,
            AppError::Infra(InfraError::Configuration { .. })
            | AppError::Infra(InfraError::Telemetry(_))
            | AppError::Infra(InfraError::Io(_)) => STATUS_INTERNAL_SERVER_ERROR,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self.status_code(), self)
    }
}
