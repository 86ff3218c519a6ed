//! Embedding Gateway: resolves text to a fixed-dimension vector through a
//! pluggable provider, with retry, rate shaping, and dimension validation.

pub mod error;
pub mod provider;
pub mod ratelimit;
pub mod retry;

pub use error::EmbeddingError;
pub use provider::{EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider, TaskType};
pub use ratelimit::{Lane, TokenBucket};
pub use retry::RetryPolicy;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

/// Deadline a caller's embed request is allowed to wait on the rate limiter
/// before failing with `Timeout`.
pub const DEFAULT_ACQUIRE_DEADLINE: Duration = Duration::from_secs(10);

/// Combines a provider, retry policy, and rate limiter into the gateway's
/// public contract (`Embed`/`EmbedBatch`).
pub struct Gateway {
    provider: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
    bucket: Arc<TokenBucket>,
    acquire_deadline: Duration,
}

impl Gateway {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, bucket: Arc<TokenBucket>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            bucket,
            acquire_deadline: DEFAULT_ACQUIRE_DEADLINE,
        }
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    #[instrument(skip(self, text), fields(task = ?task, provider = self.provider.name()))]
    pub async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>, EmbeddingError> {
        let lane = match task {
            TaskType::RetrievalQuery => Lane::Search,
            TaskType::RetrievalDocument => Lane::Ingestion,
        };

        self.bucket.acquire(lane, self.acquire_deadline).await?;

        let provider = &self.provider;
        let expected_dim = provider.dimension();
        let result = self
            .retry
            .run(|| async {
                let vector = provider.embed(text, task).await?;
                provider::validate_vector(&vector, expected_dim)?;
                Ok(vector)
            })
            .await;

        if let Err(ref e) = result {
            warn!(error = %e, "embedding request failed");
        } else {
            debug!("embedding request succeeded");
        }
        result
    }

    /// Embeds a batch of texts with partial success: each slot is `Ok` or a
    /// per-item `Err`, and the ordering of `texts` is preserved.
    pub async fn embed_batch(
        &self,
        texts: &[&str],
        task: TaskType,
    ) -> Vec<Result<Vec<f32>, EmbeddingError>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text, task).await);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_with_mock(dim: usize) -> Gateway {
        let provider = Arc::new(MockEmbeddingProvider::new(dim));
        let bucket = Arc::new(TokenBucket::new(1000, 0.2));
        Gateway::new(provider, bucket)
    }

    #[tokio::test]
    async fn test_embed_respects_dimension() {
        let gw = gateway_with_mock(8);
        let v = gw.embed("hello world", TaskType::RetrievalDocument).await.unwrap();
        assert_eq!(v.len(), 8);
    }

    #[tokio::test]
    async fn test_embed_rejects_empty_input() {
        let gw = gateway_with_mock(8);
        let result = gw.embed("", TaskType::RetrievalDocument).await;
        assert!(matches!(result, Err(EmbeddingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order() {
        let gw = gateway_with_mock(8);
        let texts = ["alpha", "beta", "gamma"];
        let results = gw.embed_batch(&texts, TaskType::RetrievalDocument).await;
        assert_eq!(results.len(), 3);
        for r in &results {
            assert!(r.is_ok());
        }
        assert_ne!(
            results[0].as_ref().unwrap(),
            results[1].as_ref().unwrap()
        );
    }
}
