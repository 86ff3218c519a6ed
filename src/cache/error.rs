//! Result Cache error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] rusqlite::Error),
    #[error("cached payload could not be decoded: {0}")]
    Corrupt(String),
}
