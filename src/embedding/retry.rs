//! Retry policy for the Embedding Gateway: exponential backoff with jitter,
//! capped at a bounded attempt budget. `Dimension` failures never enter this
//! path — they're classified as fatal by the caller before retry is considered.

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;

use super::error::EmbeddingError;

/// Default maximum retry attempts for a single embedding call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_interval: Duration,
    max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Runs `op`, retrying on `EmbeddingError::Transient` with exponential
    /// backoff and jitter. `Dimension`/`InvalidInput`/`Timeout` are returned
    /// immediately without retry.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T, EmbeddingError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, EmbeddingError>>,
    {
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(EmbeddingError::Transient(reason)) => {
                    if attempt >= self.max_attempts {
                        return Err(EmbeddingError::Transient(reason));
                    }
                    let delay = backoff.next_backoff().unwrap_or(self.max_interval);
                    tokio::time::sleep(delay).await;
                }
                Err(other) => return Err(other),
            }
        }
    }
}
