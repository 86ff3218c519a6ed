//! Pipeline Coordinator error types.

use thiserror::Error;

use crate::error::MemoriaError;

use super::flight::BuildWaitError;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// A caller's deadline (e.g. waiting on a coalesced build) expired.
    #[error("timeout: {0}")]
    Timeout(String),

    /// A build failed and no cached fallback could be served instead.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Wraps an error surfaced by a pipeline stage (store, embedding,
    /// cluster, cache) already mapped to the crate-wide error facade.
    #[error(transparent)]
    Upstream(Box<MemoriaError>),
}

impl From<crate::store::StoreError> for CoordinatorError {
    fn from(e: crate::store::StoreError) -> Self {
        CoordinatorError::Upstream(Box::new(MemoriaError::from(e)))
    }
}

impl From<crate::embedding::EmbeddingError> for CoordinatorError {
    fn from(e: crate::embedding::EmbeddingError) -> Self {
        CoordinatorError::Upstream(Box::new(MemoriaError::from(e)))
    }
}

impl From<crate::cluster::ClusterError> for CoordinatorError {
    fn from(e: crate::cluster::ClusterError) -> Self {
        CoordinatorError::Upstream(Box::new(MemoriaError::from(e)))
    }
}

impl From<crate::cache::CacheError> for CoordinatorError {
    fn from(e: crate::cache::CacheError) -> Self {
        CoordinatorError::Upstream(Box::new(MemoriaError::Transient(e.to_string())))
    }
}

impl From<serde_json::Error> for CoordinatorError {
    fn from(e: serde_json::Error) -> Self {
        CoordinatorError::Upstream(Box::new(MemoriaError::Transient(e.to_string())))
    }
}

impl From<BuildWaitError> for CoordinatorError {
    fn from(e: BuildWaitError) -> Self {
        match e {
            BuildWaitError::TimedOut => CoordinatorError::Timeout(e.to_string()),
            BuildWaitError::Build(msg) => CoordinatorError::Unavailable(msg),
        }
    }
}
