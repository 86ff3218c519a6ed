//! In-memory hot tier: an LRU of recently built artifacts, keyed by
//! `(userId, Artifact)`. Mirrors the shape of the exact-match in-memory
//! cache used elsewhere in the engine, minus the persistence fallback.

use moka::sync::Cache;

use super::types::{Artifact, CacheEntry};

const DEFAULT_CAPACITY: u64 = 4_000;

pub struct HotCache {
    entries: Cache<(i64, Artifact), CacheEntry>,
}

impl HotCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity).build(),
        }
    }

    pub fn get(&self, user_id: i64, artifact: Artifact) -> Option<CacheEntry> {
        self.entries.get(&(user_id, artifact))
    }

    pub fn put(&self, entry: CacheEntry) {
        self.entries.insert((entry.user_id, entry.artifact), entry);
    }

    pub fn invalidate(&self, user_id: i64, artifact: Artifact) {
        self.entries.invalidate(&(user_id, artifact));
    }

    pub fn invalidate_user(&self, user_id: i64) {
        for artifact in [Artifact::Clusters, Artifact::Topics, Artifact::Graph, Artifact::Trajectory] {
            self.invalidate(user_id, artifact);
        }
    }

    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for HotCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn entry(user_id: i64, artifact: Artifact, digest: u64) -> CacheEntry {
        CacheEntry {
            user_id,
            artifact,
            payload: "{}".to_string(),
            digest,
            generated_at: Utc::now(),
            ttl: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_put_then_get_round_trips() {
        let cache = HotCache::new();
        cache.put(entry(1, Artifact::Clusters, 7));
        let got = cache.get(1, Artifact::Clusters).unwrap();
        assert_eq!(got.digest, 7);
    }

    #[test]
    fn test_invalidate_user_clears_all_artifacts() {
        let cache = HotCache::new();
        cache.put(entry(1, Artifact::Clusters, 1));
        cache.put(entry(1, Artifact::Graph, 2));
        cache.invalidate_user(1);
        assert!(cache.get(1, Artifact::Clusters).is_none());
        assert!(cache.get(1, Artifact::Graph).is_none());
    }

    #[test]
    fn test_different_users_are_isolated() {
        let cache = HotCache::new();
        cache.put(entry(1, Artifact::Clusters, 1));
        assert!(cache.get(2, Artifact::Clusters).is_none());
    }
}
