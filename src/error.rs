//! Crate-wide error facade.

use axum::Json;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use serde::Serialize;
use thiserror::Error;

use crate::cluster::ClusterError;
use crate::coordinator::CoordinatorError;
use crate::embedding::EmbeddingError;
use crate::graph::GraphError;
use crate::store::StoreError;

/// Header carrying a short machine-readable status tag, independent of the
/// HTTP status code, so callers can branch without parsing the body.
pub const MEMORIA_STATUS_HEADER: &str = "x-memoria-status";

/// Error kinds surfaced by the core, per the engine's error-handling design.
#[derive(Debug, Error)]
pub enum MemoriaError {
    /// Caller-side error, propagated verbatim.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown memoryId or userId with no data.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate id on insert.
    #[error("conflict: {0}")]
    Conflict(String),

    /// External dependency hiccup; retries already exhausted.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Embedding shape violation.
    #[error("dimension error: {0}")]
    Dimension(String),

    /// A build failed and no cached fallback is usable.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Caller's deadline expired.
    #[error("timeout: {0}")]
    Timeout(String),
}

impl From<StoreError> for MemoriaError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(m) => MemoriaError::Conflict(m),
            StoreError::NotFound(m) => MemoriaError::NotFound(m),
            StoreError::Dimension(m) => MemoriaError::Dimension(m),
            StoreError::InvalidInput(m) => MemoriaError::InvalidInput(m),
            StoreError::Backend(e) => MemoriaError::Transient(e.to_string()),
        }
    }
}

impl From<EmbeddingError> for MemoriaError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::InvalidInput(m) => MemoriaError::InvalidInput(m),
            EmbeddingError::Dimension(m) => MemoriaError::Dimension(m),
            EmbeddingError::Timeout(m) => MemoriaError::Timeout(m),
            EmbeddingError::Transient(m) => MemoriaError::Transient(m),
        }
    }
}

impl From<ClusterError> for MemoriaError {
    fn from(e: ClusterError) -> Self {
        MemoriaError::Unavailable(e.to_string())
    }
}

impl From<GraphError> for MemoriaError {
    fn from(e: GraphError) -> Self {
        MemoriaError::Unavailable(e.to_string())
    }
}

impl From<CoordinatorError> for MemoriaError {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::Timeout(m) => MemoriaError::Timeout(m),
            CoordinatorError::Unavailable(m) => MemoriaError::Unavailable(m),
            CoordinatorError::Upstream(inner) => *inner,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

impl MemoriaError {
    fn status_and_tag(&self) -> (StatusCode, &'static str) {
        match self {
            MemoriaError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            MemoriaError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            MemoriaError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            MemoriaError::Transient(_) => (StatusCode::SERVICE_UNAVAILABLE, "transient"),
            MemoriaError::Dimension(_) => (StatusCode::UNPROCESSABLE_ENTITY, "dimension"),
            MemoriaError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
            MemoriaError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
        }
    }
}

impl IntoResponse for MemoriaError {
    fn into_response(self) -> axum::response::Response {
        let (status, tag) = self.status_and_tag();
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(MEMORIA_STATUS_HEADER),
            HeaderValue::from_static(tag),
        );

        let body = ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        };

        (status, headers, Json(body)).into_response()
    }
}
