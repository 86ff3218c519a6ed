//! Result Cache: a hot in-memory tier backed by a persistent sqlite tier,
//! storing derived artifacts (clusters, topics, graph, trajectory) keyed by
//! `(userId, Artifact)` with digest-based freshness.

pub mod error;
pub mod hot;
pub mod persisted;
pub mod types;

pub use error::CacheError;
pub use hot::HotCache;
pub use persisted::PersistedCache;
pub use types::{Artifact, CacheEntry};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::instrument;

use crate::store::SqliteMemoryStore;

pub const TTL_CLUSTERS: Duration = Duration::from_secs(60 * 60);
pub const TTL_TOPICS: Duration = Duration::from_secs(60 * 60);
pub const TTL_GRAPH: Duration = Duration::from_secs(30 * 60);
pub const TTL_TRAJECTORY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug)]
pub enum CacheLookup {
    HitHot(CacheEntry),
    HitPersisted(CacheEntry),
    Miss,
}

impl CacheLookup {
    pub fn into_entry(self) -> Option<CacheEntry> {
        match self {
            CacheLookup::HitHot(e) | CacheLookup::HitPersisted(e) => Some(e),
            CacheLookup::Miss => None,
        }
    }
}

/// Combines the hot and persisted tiers behind one lookup/put/invalidate
/// API; callers never touch either tier directly.
pub struct ResultCache {
    hot: HotCache,
    store: Arc<SqliteMemoryStore>,
}

impl ResultCache {
    pub fn new(store: Arc<SqliteMemoryStore>) -> Self {
        Self {
            hot: HotCache::new(),
            store,
        }
    }

    pub fn with_hot_capacity(store: Arc<SqliteMemoryStore>, capacity: u64) -> Self {
        Self {
            hot: HotCache::with_capacity(capacity),
            store,
        }
    }

    fn persisted(&self) -> PersistedCache<'_> {
        PersistedCache::new(self.store.raw_connection())
    }

    /// Looks up an entry fresh enough to serve for `digest`. A hit in the
    /// persisted tier is promoted into the hot tier before returning.
    #[instrument(skip(self), fields(user_id, artifact = artifact.as_str()))]
    pub fn lookup(&self, user_id: i64, artifact: Artifact, digest: u64) -> Result<CacheLookup, CacheError> {
        let now = Utc::now();

        if let Some(entry) = self.hot.get(user_id, artifact) {
            if entry.is_fresh_for(digest, now) {
                return Ok(CacheLookup::HitHot(entry));
            }
        }

        if let Some(entry) = self.persisted().get(user_id, artifact)? {
            if entry.is_fresh_for(digest, now) {
                self.hot.put(entry.clone());
                return Ok(CacheLookup::HitPersisted(entry));
            }
        }

        Ok(CacheLookup::Miss)
    }

    /// Stores a freshly built artifact in both tiers with the artifact's
    /// default TTL.
    pub fn put(&self, user_id: i64, artifact: Artifact, payload: String, digest: u64) -> Result<(), CacheError> {
        let entry = CacheEntry {
            user_id,
            artifact,
            payload,
            digest,
            generated_at: Utc::now(),
            ttl: artifact.default_ttl(),
        };
        self.persisted().put(&entry)?;
        self.hot.put(entry);
        Ok(())
    }

    pub fn invalidate(&self, user_id: i64, artifact: Artifact) -> Result<(), CacheError> {
        self.hot.invalidate(user_id, artifact);
        self.persisted().invalidate(user_id, artifact)
    }

    pub fn invalidate_user(&self, user_id: i64) -> Result<(), CacheError> {
        self.hot.invalidate_user(user_id);
        self.persisted().invalidate_user(user_id)
    }
}
