//! Graph Builder error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph node references unknown id: {0}")]
    DanglingEdge(String),
}
