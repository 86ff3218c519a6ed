//! Cluster Engine: groups a user's vectors into K clusters, emitting
//! centroids and membership that stay stable across incremental re-runs.

pub mod error;
pub mod identity;
pub mod kmeans;

pub use error::ClusterError;
pub use identity::PriorCentroid;

use kmeans::{adaptive_k, kmeans};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hashing::cluster_seed;

/// Below this count of embedded memories, clustering is skipped entirely
/// and an empty clustering is returned.
pub const MIN_MEMORIES_TO_CLUSTER: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: String,
    pub centroid: Vec<f32>,
    pub members: Vec<String>,
}

impl Cluster {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn percentage(&self, total_memories: usize) -> f64 {
        if total_memories == 0 {
            0.0
        } else {
            self.size() as f64 / total_memories as f64
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterResult {
    pub clusters: Vec<Cluster>,
    pub digest: u64,
}

/// Produces a user's clustering from their current embedding set.
///
/// `previous` supplies the prior run's centroids (if any) so matched
/// clusters inherit their old id; `digest` is the Memory Store's
/// `EmbeddingDigest` for this input and both seeds the deterministic RNG
/// and is returned verbatim for the caller to stamp onto the cache entry.
pub fn cluster(
    user_id: i64,
    embeddings: &[(String, Vec<f32>)],
    previous: &[PriorCentroid],
    digest: u64,
) -> Result<ClusterResult, ClusterError> {
    if embeddings.len() < MIN_MEMORIES_TO_CLUSTER {
        return Ok(ClusterResult {
            clusters: Vec::new(),
            digest,
        });
    }

    let k = adaptive_k(embeddings.len());
    let seed = cluster_seed(user_id, digest);
    let points: Vec<Vec<f32>> = embeddings.iter().map(|(_, v)| v.clone()).collect();

    let result = kmeans(&points, k, seed);

    let mut members_per_cluster: Vec<Vec<String>> = vec![Vec::new(); result.centroids.len()];
    for (idx, &cluster_idx) in result.assignments.iter().enumerate() {
        members_per_cluster[cluster_idx].push(embeddings[idx].0.clone());
    }

    let ids = identity::match_cluster_ids(&result.centroids, previous, || {
        format!("cluster-{}", Uuid::new_v4())
    });

    let clusters = result
        .centroids
        .into_iter()
        .zip(members_per_cluster)
        .zip(ids)
        .map(|((centroid, members), cluster_id)| Cluster {
            cluster_id,
            centroid,
            members,
        })
        .collect();

    Ok(ClusterResult { clusters, digest })
}
