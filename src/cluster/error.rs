//! Cluster Engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("clustering backend failure: {0}")]
    Backend(String),
}
