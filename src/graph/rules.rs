//! Keyword-overlap rules for inferring `prerequisite`/`complements` edges
//! between clusters, with `related` as the fallback when no rule's
//! preconditions hold. `applies` edges (keyword → cluster) are a
//! per-cluster frequency decision made directly in `build.rs`, not a
//! pairwise relation between two clusters, so they don't go through this
//! module.

use std::collections::HashSet;

use super::model::EdgeKind;

/// Infers the relation between cluster `a` and cluster `b` (in that
/// direction) from their aggregated keyword sets, given the clusters
/// already cleared the similarity-band test that makes an edge worth
/// emitting at all.
///
/// - A pure subset (`a`'s keywords ⊆ `b`'s, `a` smaller) is a `prerequisite`
///   of `b`.
/// - Symmetric partial overlap above 0.5 (Jaccard) is `complements`.
/// - Otherwise falls back to `related`.
pub fn infer_relation(a: &HashSet<String>, b: &HashSet<String>) -> EdgeKind {
    if a.is_empty() || b.is_empty() {
        return EdgeKind::Related;
    }

    if a.is_subset(b) && a.len() < b.len() {
        return EdgeKind::Prerequisite;
    }

    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    let jaccard = intersection as f64 / union as f64;
    if jaccard > 0.5 {
        return EdgeKind::Complements;
    }

    EdgeKind::Related
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_pure_subset_is_prerequisite() {
        let a = set(&["loops"]);
        let b = set(&["loops", "closures", "iterators"]);
        assert_eq!(infer_relation(&a, &b), EdgeKind::Prerequisite);
    }

    #[test]
    fn test_high_overlap_is_complements() {
        let a = set(&["async", "tokio", "futures"]);
        let b = set(&["async", "tokio", "channels"]);
        assert_eq!(infer_relation(&a, &b), EdgeKind::Complements);
    }

    #[test]
    fn test_low_overlap_is_related() {
        let a = set(&["rust", "ownership"]);
        let b = set(&["python", "decorators"]);
        assert_eq!(infer_relation(&a, &b), EdgeKind::Related);
    }

    #[test]
    fn test_empty_set_is_related() {
        let a: HashSet<String> = HashSet::new();
        let b = set(&["rust"]);
        assert_eq!(infer_relation(&a, &b), EdgeKind::Related);
    }
}
