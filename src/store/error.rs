//! Memory Store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate memory id: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("embedding dimension violation: {0}")]
    Dimension(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage backend error: {0}")]
    Backend(#[from] rusqlite::Error),
}
