//! Wire DTOs for the HTTP gateway.
//!
//! Internal types stay plain snake_case Rust; this module is the only place
//! that speaks the API's camelCase JSON, the same separation the teacher
//! keeps between `CachePayload` and the provider-facing chat types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;
use crate::coordinator::trajectory::Trajectory;
use crate::graph::{Edge, Graph, Node};
use crate::index::ScoredMemory;
use crate::store::Memory;
use crate::topics::Topic;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub user_id: i64,
    pub content: String,
    pub r#type: String,
    pub summary: Option<String>,
    pub keywords: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDto {
    pub id: String,
    pub user_id: i64,
    pub content: String,
    pub r#type: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub timestamp: i64,
    pub created_at: i64,
}

impl From<Memory> for MemoryDto {
    fn from(m: Memory) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            content: m.content,
            r#type: m.r#type,
            summary: m.summary,
            keywords: m.keywords,
            timestamp: m.timestamp,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListMemoriesResponse {
    pub memories: Vec<MemoryDto>,
}

#[derive(Debug, Deserialize)]
pub struct PagingQuery {
    #[serde(default = "default_list_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_list_limit() -> u32 {
    100
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    #[serde(default)]
    pub min_score: f32,
}

fn default_search_limit() -> usize {
    crate::constants::DEFAULT_TOP_K
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultDto {
    pub memory_id: String,
    pub score: f32,
}

impl From<ScoredMemory> for SearchResultDto {
    fn from(s: ScoredMemory) -> Self {
        Self {
            memory_id: s.memory_id,
            score: s.score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummaryDto {
    pub id: String,
    pub label: String,
    pub count: usize,
    pub percentage: f64,
    pub representative_memory: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClustersResponse {
    pub topics: Vec<TopicSummaryDto>,
}

/// Joins the Cluster Engine's membership/size view with the Topic Labeler's
/// label/representative-memory view into the read contract's single
/// `topics[]` shape.
pub fn merge_clusters_and_topics(clusters: &[Cluster], topics: &[Topic]) -> ClustersResponse {
    let total: usize = clusters.iter().map(|c| c.size()).sum();
    let topics_by_cluster: HashMap<&str, &Topic> =
        topics.iter().map(|t| (t.cluster_id.as_str(), t)).collect();

    let topics = clusters
        .iter()
        .map(|c| {
            let topic = topics_by_cluster.get(c.cluster_id.as_str());
            TopicSummaryDto {
                id: c.cluster_id.clone(),
                label: topic.map(|t| t.label.clone()).unwrap_or_else(|| "untitled".to_string()),
                count: c.size(),
                percentage: c.percentage(total),
                representative_memory: topic.and_then(|t| t.representative_memory_id.clone()),
            }
        })
        .collect();

    ClustersResponse { topics }
}

#[derive(Debug, Serialize)]
pub struct GraphResponse {
    pub nodes: Vec<Node>,
    pub links: Vec<Edge>,
    pub version: u64,
}

impl GraphResponse {
    pub fn from_graph(graph: Graph, version: u64) -> Self {
        Self {
            nodes: graph.nodes,
            links: graph.edges,
            version,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RepairResponse {
    pub count: usize,
}

#[derive(Debug, Deserialize, Default)]
pub struct RefreshQuery {
    #[serde(default)]
    pub refresh: bool,
    /// Caller-supplied override for how long to wait for a build before
    /// receiving a 504, in milliseconds. Missing or absent means the
    /// coordinator's own default.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct TrajectoryResponse {
    #[serde(flatten)]
    pub trajectory: Trajectory,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(id: &str, members: usize) -> Cluster {
        Cluster {
            cluster_id: id.to_string(),
            centroid: vec![0.0],
            members: (0..members).map(|i| format!("m{i}")).collect(),
        }
    }

    fn topic(cluster_id: &str, label: &str) -> Topic {
        Topic {
            cluster_id: cluster_id.to_string(),
            label: label.to_string(),
            representative_memory_id: Some("m0".to_string()),
            keywords: vec![],
        }
    }

    #[test]
    fn test_merge_joins_label_and_size() {
        let clusters = vec![cluster("c1", 3), cluster("c2", 1)];
        let topics = vec![topic("c1", "rust"), topic("c2", "go")];
        let merged = merge_clusters_and_topics(&clusters, &topics);

        assert_eq!(merged.topics.len(), 2);
        assert_eq!(merged.topics[0].label, "rust");
        assert_eq!(merged.topics[0].count, 3);
        assert!((merged.topics[0].percentage - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_merge_falls_back_when_topic_missing() {
        let clusters = vec![cluster("c1", 1)];
        let merged = merge_clusters_and_topics(&clusters, &[]);
        assert_eq!(merged.topics[0].label, "untitled");
        assert_eq!(merged.topics[0].representative_memory, None);
    }
}
