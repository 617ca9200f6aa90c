//! Projection error types.

use thiserror::Error;

/// Errors that can occur while serving a read view.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// An error occurred in the entity store.
    #[error("Entity store error: {0}")]
    Store(#[from] entity_store::StoreError),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
