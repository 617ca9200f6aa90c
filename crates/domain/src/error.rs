//! Domain error types.

use entity_store::StoreError;
use thiserror::Error;

use crate::media::MediaError;

/// Errors that can occur during lending operations.
///
/// The first five variants are the caller-facing failure kinds; their
/// messages are written for end users and returned verbatim by the API.
#[derive(Debug, Error)]
pub enum LendingError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The caller may not perform this action (e.g. requesting own instrument).
    #[error("{0}")]
    Forbidden(String),

    /// The action duplicates an existing request, loan or review.
    #[error("{0}")]
    Conflict(String),

    /// The targeted record does not exist or is not visible to the caller.
    #[error("{0}")]
    NotFound(String),

    /// The mutation ran but affected no rows.
    #[error("{0}")]
    PersistenceFailure(String),

    /// An error occurred in the entity store.
    #[error("Entity store error: {0}")]
    Store(#[from] StoreError),

    /// An error occurred in the media store.
    #[error("Media store error: {0}")]
    Media(#[from] MediaError),
}

impl LendingError {
    pub(crate) fn validation(message: &str) -> Self {
        LendingError::Validation(message.to_string())
    }

    pub(crate) fn not_found(message: &str) -> Self {
        LendingError::NotFound(message.to_string())
    }

    pub(crate) fn conflict(message: &str) -> Self {
        LendingError::Conflict(message.to_string())
    }

    pub(crate) fn persistence(message: &str) -> Self {
        LendingError::PersistenceFailure(message.to_string())
    }
}
