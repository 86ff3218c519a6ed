//! Topic Labeler error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopicsError {
    #[error("topic labeling failed: {0}")]
    Backend(String),
}
