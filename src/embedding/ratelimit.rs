//! Process-wide token bucket for outbound embedding calls.
//!
//! Ingestion workers draw from the general pool; interactive `Search`
//! embeds draw from a reserved lane so bulk ingestion can never starve
//! them, per the backpressure-fairness requirement.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::error::EmbeddingError;

/// Priority lane a caller draws tokens from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Background ingestion embeds — may be queued behind search traffic.
    Ingestion,
    /// Interactive search-query embeds — always has `reserved_fraction` of
    /// capacity available to it.
    Search,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket split into a general pool and a reserved pool.
pub struct TokenBucket {
    capacity_per_sec: f64,
    reserved_fraction: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(capacity_per_sec: u32, reserved_fraction: f64) -> Self {
        let capacity_per_sec = capacity_per_sec.max(1) as f64;
        Self {
            capacity_per_sec,
            reserved_fraction: reserved_fraction.clamp(0.0, 0.9),
            state: Mutex::new(BucketState {
                tokens: capacity_per_sec,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * self.capacity_per_sec)
                .min(self.capacity_per_sec);
            state.last_refill = now;
        }
    }

    /// Minimum tokens a caller on `lane` must see available to proceed
    /// without starving the other lane.
    fn floor_for(&self, lane: Lane) -> f64 {
        match lane {
            Lane::Search => 0.0,
            Lane::Ingestion => self.capacity_per_sec * self.reserved_fraction,
        }
    }

    /// Attempts to acquire one token for `lane`, waiting (with a deadline)
    /// if none are currently available above the lane's reserved floor.
    pub async fn acquire(&self, lane: Lane, deadline: Duration) -> Result<(), EmbeddingError> {
        let started = Instant::now();
        loop {
            {
                let mut state = self.state.lock();
                self.refill(&mut state);
                if state.tokens - self.floor_for(lane) >= 1.0 {
                    state.tokens -= 1.0;
                    return Ok(());
                }
            }

            if started.elapsed() >= deadline {
                return Err(EmbeddingError::Timeout(
                    "rate limiter deadline exceeded".to_string(),
                ));
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_succeeds_when_tokens_available() {
        let bucket = TokenBucket::new(10, 0.2);
        bucket
            .acquire(Lane::Ingestion, Duration::from_millis(50))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_search_lane_draws_from_reserved_pool() {
        let bucket = TokenBucket::new(10, 0.5);
        // Drain the general pool down to the reserved floor.
        for _ in 0..5 {
            bucket
                .acquire(Lane::Ingestion, Duration::from_millis(50))
                .await
                .unwrap();
        }
        // Ingestion should now be blocked at the floor...
        let ingestion_result = tokio::time::timeout(
            Duration::from_millis(30),
            bucket.acquire(Lane::Ingestion, Duration::from_millis(20)),
        )
        .await;
        assert!(ingestion_result.is_err() || ingestion_result.unwrap().is_err());

        // ...but search can still draw from the reserved half.
        bucket
            .acquire(Lane::Search, Duration::from_millis(50))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_timeout_when_bucket_exhausted() {
        let bucket = TokenBucket::new(1, 0.0);
        bucket
            .acquire(Lane::Search, Duration::from_millis(50))
            .await
            .unwrap();
        let result = bucket.acquire(Lane::Search, Duration::from_millis(5)).await;
        assert!(matches!(result, Err(EmbeddingError::Timeout(_))));
    }
}
