//! Embedding gateway error types.

use thiserror::Error;

/// Errors the Embedding Gateway can return. Maps onto the core's
/// `InvalidInput` / `Transient` / `Dimension` / `Timeout` error kinds.
#[derive(Debug, Error, Clone)]
pub enum EmbeddingError {
    /// Empty or oversized input text.
    #[error("invalid embedding input: {0}")]
    InvalidInput(String),

    /// Provider returned a vector of the wrong length, or containing
    /// NaN/Inf. Fatal for the affected record — never retried.
    #[error("embedding dimension violation: {0}")]
    Dimension(String),

    /// Caller's or the rate limiter's deadline expired while queued.
    #[error("embedding request timed out: {0}")]
    Timeout(String),

    /// Retryable provider/network failure; surfaced only once the retry
    /// budget is exhausted.
    #[error("transient embedding failure: {0}")]
    Transient(String),
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(e: reqwest::Error) -> Self {
        EmbeddingError::Transient(e.to_string())
    }
}
