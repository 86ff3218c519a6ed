//! Pluggable embedding providers.
//!
//! [`EmbeddingProvider`] is the seam tests substitute a mock across, the
//! same role `VectorDbClient` plays for the vector backend: production
//! wires [`HttpEmbeddingProvider`], tests wire [`MockEmbeddingProvider`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::EmbeddingError;

/// Distinguishes how a text is being embedded, so a provider that supports
/// asymmetric retrieval models can pick the right encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    /// A memory being ingested.
    RetrievalDocument,
    /// A search query.
    RetrievalQuery,
}

impl TaskType {
    fn as_str(self) -> &'static str {
        match self {
            TaskType::RetrievalDocument => "retrieval_document",
            TaskType::RetrievalQuery => "retrieval_query",
        }
    }
}

/// A backend capable of turning text into fixed-width vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a single text, classified by `task`.
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>, EmbeddingError>;

    /// Embeds a batch of texts, one output per input, order preserved.
    /// Partial success is permitted: any element may itself be an error.
    async fn embed_batch(
        &self,
        texts: &[&str],
        task: TaskType,
    ) -> Result<Vec<Result<Vec<f32>, EmbeddingError>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text, task).await);
        }
        Ok(out)
    }

    /// The vector width this provider produces.
    fn dimension(&self) -> usize;

    /// Provider name, for logging.
    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponseRow {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingResponseRow>,
}

/// HTTP-backed embedding provider talking an OpenAI-compatible
/// `/embeddings` endpoint.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

impl HttpEmbeddingProvider {
    pub fn new(endpoint: String, api_key: Option<String>, model: String, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            model,
            dimension,
        }
    }

    const MAX_INPUT_BYTES: usize = 32_000;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "embedding input is empty".to_string(),
            ));
        }
        if text.len() > Self::MAX_INPUT_BYTES {
            return Err(EmbeddingError::InvalidInput(format!(
                "embedding input exceeds {} bytes",
                Self::MAX_INPUT_BYTES
            )));
        }

        let mut req = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            input: text,
            model: &self.model,
        });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(EmbeddingError::from)?;
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(EmbeddingError::Transient(format!(
                "embedding provider returned {status}"
            )));
        }

        let parsed: EmbeddingResponse = resp.json().await.map_err(EmbeddingError::from)?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .ok_or_else(|| EmbeddingError::Transient("empty embedding response".to_string()))?;

        validate_vector(&vector, self.dimension)?;
        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str, _task: TaskType) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_one(text).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Deterministic, hash-seeded stub provider: same text always yields the
/// same unit vector, with no network or model dependency. Used in tests.
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "embedding input is empty".to_string(),
            ));
        }

        let seed = crate::hashing::hash_to_u64(format!("{}:{}", task.as_str(), text).as_bytes());
        Ok(deterministic_unit_vector(seed, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn deterministic_unit_vector(seed: u64, dim: usize) -> Vec<f32> {
    let mut state = seed | 1;
    let mut values = Vec::with_capacity(dim);
    for _ in 0..dim {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let value = ((state >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0;
        values.push(value);
    }

    let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut values {
            *v /= norm;
        }
    }
    values
}

/// Validates a returned vector against the expected dimension and rejects
/// NaN/Inf components.
pub fn validate_vector(vector: &[f32], expected_dim: usize) -> Result<(), EmbeddingError> {
    if vector.len() != expected_dim {
        return Err(EmbeddingError::Dimension(format!(
            "expected dimension {}, got {}",
            expected_dim,
            vector.len()
        )));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingError::Dimension(
            "embedding contains NaN or infinite components".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_deterministic() {
        let provider = MockEmbeddingProvider::new(16);
        let v1 = provider.embed("hello", TaskType::RetrievalDocument).await.unwrap();
        let v2 = provider.embed("hello", TaskType::RetrievalDocument).await.unwrap();
        assert_eq!(v1, v2);
    }

    #[tokio::test]
    async fn test_mock_provider_task_sensitive() {
        let provider = MockEmbeddingProvider::new(16);
        let doc = provider.embed("hello", TaskType::RetrievalDocument).await.unwrap();
        let query = provider.embed("hello", TaskType::RetrievalQuery).await.unwrap();
        assert_ne!(doc, query);
    }

    #[tokio::test]
    async fn test_mock_provider_rejects_empty() {
        let provider = MockEmbeddingProvider::new(16);
        let result = provider.embed("", TaskType::RetrievalDocument).await;
        assert!(matches!(result, Err(EmbeddingError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_vector_rejects_wrong_dim() {
        let result = validate_vector(&[0.1, 0.2], 3);
        assert!(matches!(result, Err(EmbeddingError::Dimension(_))));
    }

    #[test]
    fn test_validate_vector_rejects_nan() {
        let result = validate_vector(&[0.1, f32::NAN], 2);
        assert!(matches!(result, Err(EmbeddingError::Dimension(_))));
    }

    #[test]
    fn test_validate_vector_accepts_well_formed() {
        assert!(validate_vector(&[0.1, 0.2, 0.3], 3).is_ok());
    }
}
