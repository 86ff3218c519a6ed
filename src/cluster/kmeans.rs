//! k-means++ seeding and Lloyd's iteration over cosine distance.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::index::cosine_similarity;

const MAX_ITERATIONS: usize = 50;
const CONVERGENCE_EPSILON: f32 = 1e-4;

/// Output of a k-means run: one centroid per cluster and one cluster-index
/// assignment per input point (parallel to the input order).
#[derive(Debug, Clone)]
pub struct KMeansResult {
    pub centroids: Vec<Vec<f32>>,
    pub assignments: Vec<usize>,
}

fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / norm).collect()
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Chooses `k` initial centroids from `points` by k-means++ weighted
/// sampling: each subsequent centroid is picked with probability
/// proportional to its squared distance from the nearest centroid chosen
/// so far.
fn kmeans_plus_plus_seed(points: &[Vec<f32>], k: usize, rng: &mut ChaCha8Rng) -> Vec<Vec<f32>> {
    let mut centroids = Vec::with_capacity(k);
    let first = rng.gen_range(0..points.len());
    centroids.push(points[first].clone());

    while centroids.len() < k {
        let weights: Vec<f32> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| cosine_distance(p, c).powi(2))
                    .fold(f32::MAX, f32::min)
            })
            .collect();

        let total: f32 = weights.iter().sum();
        if total <= 0.0 {
            let idx = rng.gen_range(0..points.len());
            centroids.push(points[idx].clone());
            continue;
        }

        let mut target = rng.r#gen::<f32>() * total;
        let mut chosen = points.len() - 1;
        for (i, w) in weights.iter().enumerate() {
            if target <= *w {
                chosen = i;
                break;
            }
            target -= w;
        }
        centroids.push(points[chosen].clone());
    }

    centroids
}

fn assign(points: &[Vec<f32>], centroids: &[Vec<f32>]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            centroids
                .iter()
                .enumerate()
                .map(|(i, c)| (i, cosine_distance(p, c)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i)
                .unwrap_or(0)
        })
        .collect()
}

fn recompute_centroid(points: &[Vec<f32>], members: &[usize]) -> Vec<f32> {
    let dim = points[0].len();
    let mut sum = vec![0.0f32; dim];
    for &idx in members {
        for (s, v) in sum.iter_mut().zip(points[idx].iter()) {
            *s += v;
        }
    }
    let n = members.len() as f32;
    for s in &mut sum {
        *s /= n;
    }
    normalize(&sum)
}

/// Finds the point farthest (by cosine distance) from `centroid` among
/// `candidates`, used to re-seed empty clusters from the largest cluster.
fn farthest_point(points: &[Vec<f32>], candidates: &[usize], centroid: &[f32]) -> usize {
    *candidates
        .iter()
        .max_by(|&&a, &&b| {
            cosine_distance(&points[a], centroid)
                .partial_cmp(&cosine_distance(&points[b], centroid))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(&candidates[0])
}

/// Runs k-means with cosine distance to convergence, re-seeding any empty
/// cluster from the farthest point in the currently-largest cluster.
pub fn kmeans(raw_points: &[Vec<f32>], k: usize, seed: u64) -> KMeansResult {
    assert!(!raw_points.is_empty() && k > 0);
    let points: Vec<Vec<f32>> = raw_points.iter().map(|p| normalize(p)).collect();
    let k = k.min(points.len());

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut centroids = kmeans_plus_plus_seed(&points, k, &mut rng);
    let mut assignments = assign(&points, &centroids);

    for _ in 0..MAX_ITERATIONS {
        let mut members_per_cluster: Vec<Vec<usize>> = vec![Vec::new(); k];
        for (idx, &cluster) in assignments.iter().enumerate() {
            members_per_cluster[cluster].push(idx);
        }

        let mut new_centroids = Vec::with_capacity(k);
        for (cluster_idx, members) in members_per_cluster.iter().enumerate() {
            if members.is_empty() {
                let (largest_idx, largest_members) = members_per_cluster
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, m)| m.len())
                    .unwrap();
                let far = farthest_point(&points, largest_members, &centroids[largest_idx]);
                new_centroids.push(points[far].clone());
            } else {
                new_centroids.push(recompute_centroid(&points, members));
            }
            let _ = cluster_idx;
        }

        let mean_shift: f32 = centroids
            .iter()
            .zip(new_centroids.iter())
            .map(|(old, new)| cosine_distance(old, new))
            .sum::<f32>()
            / k as f32;

        let new_assignments = assign(&points, &new_centroids);
        let changed = new_assignments != assignments;

        centroids = new_centroids;
        assignments = new_assignments;

        if !changed || mean_shift < CONVERGENCE_EPSILON {
            break;
        }
    }

    KMeansResult {
        centroids,
        assignments,
    }
}

/// Adaptive cluster count: `clamp(round(sqrt(n/2)), 3, 12)`.
pub fn adaptive_k(n: usize) -> usize {
    let k = ((n as f64 / 2.0).sqrt()).round() as i64;
    k.clamp(3, 12) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_two_well_separated_groups() -> Vec<Vec<f32>> {
        let mut points = Vec::new();
        for _ in 0..5 {
            points.push(vec![1.0, 0.0, 0.0]);
        }
        for _ in 0..5 {
            points.push(vec![0.0, 1.0, 0.0]);
        }
        points
    }

    #[test]
    fn test_adaptive_k_bounds() {
        assert_eq!(adaptive_k(1), 3);
        assert_eq!(adaptive_k(1000), 12);
        assert_eq!(adaptive_k(18), 3);
        assert_eq!(adaptive_k(50), 5);
    }

    #[test]
    fn test_kmeans_separates_obvious_groups() {
        let points = make_two_well_separated_groups();
        let result = kmeans(&points, 2, 42);

        let cluster_a = result.assignments[0];
        for i in 0..5 {
            assert_eq!(result.assignments[i], cluster_a);
        }
        let cluster_b = result.assignments[5];
        assert_ne!(cluster_a, cluster_b);
        for i in 5..10 {
            assert_eq!(result.assignments[i], cluster_b);
        }
    }

    #[test]
    fn test_kmeans_deterministic_for_same_seed() {
        let points = make_two_well_separated_groups();
        let r1 = kmeans(&points, 2, 42);
        let r2 = kmeans(&points, 2, 42);
        assert_eq!(r1.assignments, r2.assignments);
    }

    #[test]
    fn test_kmeans_handles_k_larger_than_points() {
        let points = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let result = kmeans(&points, 5, 1);
        assert_eq!(result.centroids.len(), 2);
    }
}
