//! Cache entry and artifact-kind types shared by both tiers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived artifacts the Pipeline Coordinator builds and caches, one entry
/// per `(userId, Artifact)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Artifact {
    Clusters,
    Topics,
    Graph,
    Trajectory,
}

impl Artifact {
    pub fn as_str(self) -> &'static str {
        match self {
            Artifact::Clusters => "clusters",
            Artifact::Topics => "topics",
            Artifact::Graph => "graph",
            Artifact::Trajectory => "trajectory",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "clusters" => Some(Artifact::Clusters),
            "topics" => Some(Artifact::Topics),
            "graph" => Some(Artifact::Graph),
            "trajectory" => Some(Artifact::Trajectory),
            _ => None,
        }
    }

    /// Default time-to-live for this artifact kind.
    pub fn default_ttl(self) -> Duration {
        match self {
            Artifact::Clusters => super::TTL_CLUSTERS,
            Artifact::Topics => super::TTL_TOPICS,
            Artifact::Graph => super::TTL_GRAPH,
            Artifact::Trajectory => super::TTL_TRAJECTORY,
        }
    }
}

/// A cached artifact build for one user, keyed by `(user_id, artifact)`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub user_id: i64,
    pub artifact: Artifact,
    pub payload: String,
    pub digest: u64,
    pub generated_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.generated_at);
        match age.to_std() {
            Ok(age) => age >= self.ttl,
            Err(_) => false,
        }
    }

    /// A cached entry is usable when it is both unexpired and still
    /// matches the caller's current input digest — a stale digest means
    /// the underlying memories changed since this entry was built.
    pub fn is_fresh_for(&self, digest: u64, now: DateTime<Utc>) -> bool {
        self.digest == digest && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_fresh_within_ttl_and_matching_digest() {
        let entry = CacheEntry {
            user_id: 1,
            artifact: Artifact::Clusters,
            payload: "{}".to_string(),
            digest: 42,
            generated_at: Utc::now(),
            ttl: Duration::from_secs(3600),
        };
        assert!(entry.is_fresh_for(42, Utc::now()));
    }

    #[test]
    fn test_entry_stale_when_digest_differs() {
        let entry = CacheEntry {
            user_id: 1,
            artifact: Artifact::Clusters,
            payload: "{}".to_string(),
            digest: 42,
            generated_at: Utc::now(),
            ttl: Duration::from_secs(3600),
        };
        assert!(!entry.is_fresh_for(43, Utc::now()));
    }

    #[test]
    fn test_entry_expired_past_ttl() {
        let entry = CacheEntry {
            user_id: 1,
            artifact: Artifact::Graph,
            payload: "{}".to_string(),
            digest: 1,
            generated_at: Utc::now() - chrono::Duration::hours(1),
            ttl: Duration::from_secs(60),
        };
        assert!(entry.is_expired(Utc::now()));
    }
}
