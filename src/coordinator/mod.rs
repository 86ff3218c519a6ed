//! Pipeline Coordinator: the one place that knows the build order
//! `Cluster → Label → Build` and makes sure concurrent callers for the
//! same user and artifact share a single build (§6.6/§8 property 7).

pub mod error;
pub mod flight;
pub mod trajectory;

pub use error::CoordinatorError;
pub use flight::FlightMap;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cache::{Artifact, CacheLookup, ResultCache};
use crate::cluster::{self, Cluster, PriorCentroid};
use crate::constants::DEFAULT_READ_DEADLINE;
use crate::embedding::{Gateway as EmbeddingGateway, TaskType};
use crate::graph::{self, Graph};
use crate::ids::MemoryIdGenerator;
use crate::index::{InMemoryVectorIndex, ScoredMemory, top_k};
use crate::store::{self, Memory, MemoryFilter, NewMemory, SqliteMemoryStore};
use crate::topics::{self, Summarizer, Topic};

/// What a read call is asking for: whether a stale cache entry is
/// acceptable, and how long to wait for a build that's already in
/// flight (or has to start) before surfacing `Timeout`. The build itself
/// is never cancelled by the deadline — it keeps running on its own task
/// and populates the cache for the next caller.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub force_refresh: bool,
    pub deadline: Duration,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { force_refresh: false, deadline: DEFAULT_READ_DEADLINE }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClustersPayload {
    clusters: Vec<Cluster>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TopicsPayload {
    topics: Vec<Topic>,
}

/// Dependencies a detached build task needs. Cloning is cheap (every
/// field is an `Arc`), which is what lets a build outlive the caller
/// that triggered it once it's handed off to `tokio::spawn`.
#[derive(Clone)]
struct Deps {
    store: Arc<SqliteMemoryStore>,
    embeddings: Arc<EmbeddingGateway>,
    cache: Arc<ResultCache>,
    flight: Arc<FlightMap<(i64, Artifact)>>,
    summarizer: Option<Arc<dyn Summarizer>>,
}

pub struct Coordinator {
    deps: Deps,
    index: Arc<InMemoryVectorIndex>,
    id_gen: MemoryIdGenerator,
}

impl Coordinator {
    pub fn new(
        store: Arc<SqliteMemoryStore>,
        embeddings: Arc<EmbeddingGateway>,
        index: Arc<InMemoryVectorIndex>,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            deps: Deps {
                store,
                embeddings,
                cache,
                flight: Arc::new(FlightMap::new()),
                summarizer: None,
            },
            index,
            id_gen: MemoryIdGenerator::new(),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.deps.summarizer = Some(summarizer);
        self
    }

    /// Ingests a memory: assigns an id, persists it, and returns as soon as
    /// that write is durable. Embedding happens on a background task so the
    /// caller never waits on the Embedding Gateway — the same fire-and-forget
    /// shape the teacher uses for its post-response index update.
    #[instrument(skip(self, content, summary, keywords))]
    pub async fn ingest(
        &self,
        user_id: i64,
        content: String,
        r#type: String,
        summary: Option<String>,
        keywords: Option<Vec<String>>,
    ) -> Result<Memory, CoordinatorError> {
        let id = self.id_gen.next_id();
        let created_at = chrono::Utc::now().timestamp();
        let keywords = keywords.unwrap_or_else(|| store::extract_keywords(&content));

        self.deps.store.insert_memory(NewMemory {
            id: id.clone(),
            user_id,
            content: content.clone(),
            r#type,
            summary,
            keywords,
            created_at,
        })?;

        let memory = self.deps.store.get_memory(&id)?;
        self.spawn_embedding(user_id, id, content);

        Ok(memory)
    }

    fn spawn_embedding(&self, user_id: i64, memory_id: String, content: String) {
        let store = self.deps.store.clone();
        let embeddings = self.deps.embeddings.clone();
        let cache = self.deps.cache.clone();
        let index = self.index.clone();

        tokio::spawn(async move {
            let vector = match embeddings.embed(&content, TaskType::RetrievalDocument).await {
                Ok(v) => v,
                Err(err) => {
                    tracing::warn!(memory_id = %memory_id, error = %err, "background embedding failed");
                    return;
                }
            };

            if let Err(err) = store.upsert_embedding(&memory_id, &vector) {
                tracing::warn!(memory_id = %memory_id, error = %err, "failed to persist embedding");
                return;
            }

            if let Err(err) = cache.invalidate_user(user_id) {
                tracing::warn!(user_id, error = %err, "failed to invalidate cache after embedding");
            }
            if let Ok(digest) = store.embedding_digest(user_id) {
                index.invalidate(user_id, digest);
            }
        });
    }

    pub fn list(&self, user_id: i64, filter: &MemoryFilter) -> Result<Vec<Memory>, CoordinatorError> {
        Ok(self.deps.store.list_memories(user_id, filter)?)
    }

    /// The current `EmbeddingDigest` for a user, exposed so callers (e.g.
    /// the gateway's graph response) can stamp a freshness version on a
    /// derived artifact without reaching into the store directly.
    pub fn digest(&self, user_id: i64) -> Result<u64, CoordinatorError> {
        Ok(self.deps.store.embedding_digest(user_id)?)
    }

    #[instrument(skip(self, query_text))]
    pub async fn search(
        &self,
        user_id: i64,
        query_text: &str,
        k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredMemory>, CoordinatorError> {
        let digest = self.deps.store.embedding_digest(user_id)?;
        let store = &self.deps.store;
        let snapshot = self.index.get_or_load(user_id, digest, || {
            store
                .list_embeddings(user_id)
                .map(|rows| rows.into_iter().map(|r| (r.memory_id, r.vector)).collect())
        })?;

        let query_vector = self.deps.embeddings.embed(query_text, TaskType::RetrievalQuery).await?;
        Ok(top_k(&snapshot, &query_vector, k, min_score))
    }

    /// Re-embeds every memory whose vector is missing or malformed.
    #[instrument(skip(self))]
    pub async fn repair(&self, user_id: i64) -> Result<usize, CoordinatorError> {
        let dim = self.deps.embeddings.dimension();
        let broken = self.deps.store.memories_needing_repair(user_id, dim)?;
        let mut repaired = 0;
        for memory_id in broken {
            let memory = self.deps.store.get_memory(&memory_id)?;
            let vector = self.deps.embeddings.embed(&memory.content, TaskType::RetrievalDocument).await?;
            self.deps.store.upsert_embedding(&memory_id, &vector)?;
            repaired += 1;
        }
        if repaired > 0 {
            self.deps.cache.invalidate_user(user_id)?;
        }
        Ok(repaired)
    }

    #[instrument(skip(self))]
    pub async fn get_clusters(&self, user_id: i64, opts: ReadOptions) -> Result<Vec<Cluster>, CoordinatorError> {
        Ok(ensure_clusters(self.deps.clone(), user_id, opts).await?.clusters)
    }

    #[instrument(skip(self))]
    pub async fn get_topics(&self, user_id: i64, opts: ReadOptions) -> Result<Vec<Topic>, CoordinatorError> {
        Ok(ensure_topics(self.deps.clone(), user_id, opts).await?.topics)
    }

    #[instrument(skip(self))]
    pub async fn get_graph(&self, user_id: i64, opts: ReadOptions) -> Result<Graph, CoordinatorError> {
        ensure_graph(self.deps.clone(), user_id, opts).await
    }

    #[instrument(skip(self))]
    pub async fn get_trajectory(&self, user_id: i64, opts: ReadOptions) -> Result<trajectory::Trajectory, CoordinatorError> {
        let deps = self.deps.clone();
        let digest = deps.store.embedding_digest(user_id)?;

        let previous_counts: HashMap<String, usize> = deps
            .cache
            .lookup(user_id, Artifact::Trajectory, digest)
            .ok()
            .and_then(CacheLookup::into_entry)
            .and_then(|e| serde_json::from_str::<trajectory::Trajectory>(&e.payload).ok())
            .map(|t| t.topics.into_iter().map(|topic| (topic.cluster_id, topic.member_count)).collect())
            .unwrap_or_default();

        let topics = ensure_topics(deps.clone(), user_id, opts).await?.topics;
        let clusters = ensure_clusters(deps.clone(), user_id, opts).await?.clusters;
        let graph = ensure_graph(deps.clone(), user_id, opts).await?;

        let built = trajectory::synthesize(&topics, &clusters, &graph, &previous_counts);
        let payload = serde_json::to_string(&built)?;
        deps.cache.put(user_id, Artifact::Trajectory, payload, digest)?;
        Ok(built)
    }
}

fn cached<T: for<'de> Deserialize<'de>>(
    cache: &ResultCache,
    user_id: i64,
    artifact: Artifact,
    digest: u64,
) -> Result<Option<T>, CoordinatorError> {
    if let CacheLookup::HitHot(entry) | CacheLookup::HitPersisted(entry) = cache.lookup(user_id, artifact, digest)? {
        return Ok(Some(serde_json::from_str(&entry.payload)?));
    }
    Ok(None)
}

fn keywords_by_memory(store: &SqliteMemoryStore, user_id: i64) -> Result<HashMap<String, Vec<String>>, CoordinatorError> {
    let memories = store.list_memories(user_id, &MemoryFilter::paged(u32::MAX, 0))?;
    Ok(memories.into_iter().map(|m| (m.id, m.keywords)).collect())
}

fn content_by_memory(store: &SqliteMemoryStore, user_id: i64) -> Result<HashMap<String, String>, CoordinatorError> {
    let memories = store.list_memories(user_id, &MemoryFilter::paged(u32::MAX, 0))?;
    Ok(memories.into_iter().map(|m| (m.id, m.content)).collect())
}

fn embeddings_by_memory(store: &SqliteMemoryStore, user_id: i64) -> Result<HashMap<String, Vec<f32>>, CoordinatorError> {
    let rows = store.list_embeddings(user_id)?;
    Ok(rows.into_iter().map(|r| (r.memory_id, r.vector)).collect())
}

async fn ensure_clusters(deps: Deps, user_id: i64, opts: ReadOptions) -> Result<ClustersPayload, CoordinatorError> {
    let digest = deps.store.embedding_digest(user_id)?;

    if !opts.force_refresh {
        if let Some(payload) = cached::<ClustersPayload>(&deps.cache, user_id, Artifact::Clusters, digest)? {
            return Ok(payload);
        }
    }

    let build_deps = deps.clone();
    deps.flight
        .run((user_id, Artifact::Clusters), opts.deadline, move || build_clusters_task(build_deps, user_id, digest))
        .await?;

    cached::<ClustersPayload>(&deps.cache, user_id, Artifact::Clusters, digest)?
        .ok_or_else(|| CoordinatorError::Unavailable("cluster build completed without a cache entry".to_string()))
}

async fn build_clusters_task(deps: Deps, user_id: i64, digest: u64) -> Result<(), String> {
    let rows = deps.store.list_embeddings(user_id).map_err(|e| e.to_string())?;
    let embeddings: Vec<(String, Vec<f32>)> = rows.into_iter().map(|r| (r.memory_id, r.vector)).collect();

    let previous: Vec<PriorCentroid> = match deps.cache.lookup(user_id, Artifact::Clusters, digest) {
        Ok(CacheLookup::Miss) | Err(_) => Vec::new(),
        Ok(lookup) => lookup
            .into_entry()
            .and_then(|e| serde_json::from_str::<ClustersPayload>(&e.payload).ok())
            .map(|p| {
                p.clusters
                    .into_iter()
                    .map(|c| PriorCentroid { cluster_id: c.cluster_id, centroid: c.centroid })
                    .collect()
            })
            .unwrap_or_default(),
    };

    let result = cluster::cluster(user_id, &embeddings, &previous, digest).map_err(|e| e.to_string())?;
    let payload = ClustersPayload { clusters: result.clusters };
    let serialized = serde_json::to_string(&payload).map_err(|e| e.to_string())?;
    deps.cache.put(user_id, Artifact::Clusters, serialized, digest).map_err(|e| e.to_string())?;
    Ok(())
}

async fn ensure_topics(deps: Deps, user_id: i64, opts: ReadOptions) -> Result<TopicsPayload, CoordinatorError> {
    let digest = deps.store.embedding_digest(user_id)?;

    if !opts.force_refresh {
        if let Some(payload) = cached::<TopicsPayload>(&deps.cache, user_id, Artifact::Topics, digest)? {
            return Ok(payload);
        }
    }

    let build_deps = deps.clone();
    deps.flight
        .run((user_id, Artifact::Topics), opts.deadline, move || build_topics_task(build_deps, user_id, opts, digest))
        .await?;

    cached::<TopicsPayload>(&deps.cache, user_id, Artifact::Topics, digest)?
        .ok_or_else(|| CoordinatorError::Unavailable("topic build completed without a cache entry".to_string()))
}

async fn build_topics_task(deps: Deps, user_id: i64, opts: ReadOptions, digest: u64) -> Result<(), String> {
    let clusters = ensure_clusters(deps.clone(), user_id, opts).await.map_err(|e| e.to_string())?.clusters;
    let keywords = keywords_by_memory(&deps.store, user_id).map_err(|e| e.to_string())?;
    let embeddings = embeddings_by_memory(&deps.store, user_id).map_err(|e| e.to_string())?;

    let topics = if let Some(summarizer) = &deps.summarizer {
        let content = content_by_memory(&deps.store, user_id).map_err(|e| e.to_string())?;
        topics::label_clusters_with_summarizer(&clusters, &keywords, &embeddings, &content, summarizer).await
    } else {
        topics::label_clusters(&clusters, &keywords, &embeddings)
    };

    let payload = TopicsPayload { topics };
    let serialized = serde_json::to_string(&payload).map_err(|e| e.to_string())?;
    deps.cache.put(user_id, Artifact::Topics, serialized, digest).map_err(|e| e.to_string())?;
    Ok(())
}

async fn ensure_graph(deps: Deps, user_id: i64, opts: ReadOptions) -> Result<Graph, CoordinatorError> {
    let digest = deps.store.embedding_digest(user_id)?;

    if !opts.force_refresh {
        if let Some(graph) = cached::<Graph>(&deps.cache, user_id, Artifact::Graph, digest)? {
            return Ok(graph);
        }
    }

    let build_deps = deps.clone();
    deps.flight
        .run((user_id, Artifact::Graph), opts.deadline, move || build_graph_task(build_deps, user_id, opts, digest))
        .await?;

    cached::<Graph>(&deps.cache, user_id, Artifact::Graph, digest)?
        .ok_or_else(|| CoordinatorError::Unavailable("graph build completed without a cache entry".to_string()))
}

async fn build_graph_task(deps: Deps, user_id: i64, opts: ReadOptions, digest: u64) -> Result<(), String> {
    let topics = ensure_topics(deps.clone(), user_id, opts).await.map_err(|e| e.to_string())?.topics;
    let clusters = ensure_clusters(deps.clone(), user_id, opts).await.map_err(|e| e.to_string())?.clusters;
    let keywords = keywords_by_memory(&deps.store, user_id).map_err(|e| e.to_string())?;
    let embeddings = embeddings_by_memory(&deps.store, user_id).map_err(|e| e.to_string())?;

    let built = graph::build_graph(&clusters, &topics, &keywords, &embeddings);
    let payload = serde_json::to_string(&built).map_err(|e| e.to_string())?;
    deps.cache.put(user_id, Artifact::Graph, payload, digest).map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{MockEmbeddingProvider, TokenBucket};

    fn coordinator(dim: usize) -> Coordinator {
        let store = Arc::new(SqliteMemoryStore::open_in_memory().unwrap());
        let provider = Arc::new(MockEmbeddingProvider::new(dim));
        let bucket = Arc::new(TokenBucket::new(1000, 0.2));
        let embeddings = Arc::new(EmbeddingGateway::new(provider, bucket));
        let index = Arc::new(InMemoryVectorIndex::new());
        let cache = Arc::new(ResultCache::new(store.clone()));
        Coordinator::new(store, embeddings, index, cache)
    }

    #[tokio::test]
    async fn test_ingest_then_list_round_trips() {
        let coord = coordinator(8);
        let memory = coord
            .ingest(1, "learning rust ownership".to_string(), "note".to_string(), None, None)
            .await
            .unwrap();

        let listed = coord.list(1, &MemoryFilter::paged(10, 0)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, memory.id);
    }

    #[tokio::test]
    async fn test_search_finds_ingested_memory() {
        let coord = coordinator(8);
        coord
            .ingest(1, "async tokio patterns".to_string(), "note".to_string(), None, None)
            .await
            .unwrap();

        // Embedding runs on a background task; repair() is a synchronous
        // re-embed of anything still missing, which makes this deterministic
        // without sleeping on the spawned task.
        coord.repair(1).await.unwrap();

        let results = coord.search(1, "async tokio patterns", 5, 0.0).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_clusters_below_minimum_return_empty() {
        let coord = coordinator(8);
        coord.ingest(1, "one memory".to_string(), "note".to_string(), None, None).await.unwrap();
        let clusters = coord.get_clusters(1, ReadOptions::default()).await.unwrap();
        assert!(clusters.is_empty());
    }

    #[tokio::test]
    async fn test_repair_reembeds_missing_vector() {
        let coord = coordinator(8);
        let memory = coord.ingest(1, "content".to_string(), "note".to_string(), None, None).await.unwrap();
        // Force the embedding into a broken state.
        coord.deps.store.upsert_embedding(&memory.id, &[1.0, 2.0]).unwrap();

        let repaired = coord.repair(1).await.unwrap();
        assert_eq!(repaired, 1);
    }

    #[tokio::test]
    async fn test_concurrent_get_clusters_coalesce_and_both_succeed() {
        let coord = Arc::new(coordinator(8));
        coord.ingest(1, "rust ownership".to_string(), "note".to_string(), None, None).await.unwrap();
        coord.ingest(1, "async tokio runtime".to_string(), "note".to_string(), None, None).await.unwrap();
        coord.repair(1).await.unwrap();

        let a = coord.clone();
        let b = coord.clone();
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { a.get_clusters(1, ReadOptions::default()).await }),
            tokio::spawn(async move { b.get_clusters(1, ReadOptions::default()).await }),
        );
        assert!(ra.unwrap().is_ok());
        assert!(rb.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_zero_deadline_surfaces_timeout_without_failing_the_build() {
        let coord = coordinator(8);
        coord.ingest(1, "rust ownership".to_string(), "note".to_string(), None, None).await.unwrap();
        coord.repair(1).await.unwrap();

        let opts = ReadOptions { force_refresh: false, deadline: Duration::from_nanos(1) };
        let result = coord.get_clusters(1, opts).await;
        assert!(matches!(result, Err(CoordinatorError::Timeout(_))));

        // The build keeps running in the background; a generous-deadline
        // follow-up call should see it land in the cache rather than time
        // out or retrigger a build.
        tokio::time::sleep(Duration::from_millis(50)).await;
        coord.get_clusters(1, ReadOptions::default()).await.unwrap();
    }
}
