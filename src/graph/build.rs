//! Composes clusters, topics, and keywords into a [`Graph`] of nodes and
//! typed edges.

use std::collections::{HashMap, HashSet};

use super::model::{Edge, EdgeKind, Graph, Node, NodeKind};
use super::rules::infer_relation;
use crate::cluster::Cluster;
use crate::index::cosine_similarity;
use crate::topics::Topic;

/// Above this many member memories across all clusters, MemoryNodes are
/// sampled down to the newest `DISPLAY_CAP` ids (memory ids are time-
/// ordered, so "newest" is simply the lexicographically greatest).
const DISPLAY_CAP: usize = 500;

/// A keyword needs to appear in at least this many memories to earn its
/// own KeywordNode.
const MIN_KEYWORD_MEMORY_COUNT: usize = 2;

/// Clusters whose centroid-cosine is at or above this are `similar`.
const SIMILAR_THRESHOLD: f32 = 0.7;

/// Clusters whose centroid-cosine falls in `[RELATED_THRESHOLD, SIMILAR_THRESHOLD)`
/// get an edge (exact type resolved by the keyword-overlap rule layer).
const RELATED_THRESHOLD: f32 = 0.4;

/// A keyword "applies" to a cluster once it shows up in at least this
/// fraction of the cluster's own members, not just a couple of them.
const APPLIES_RATIO: f32 = 0.5;

pub fn build_graph(
    clusters: &[Cluster],
    topics: &[Topic],
    keywords_by_memory: &HashMap<String, Vec<String>>,
    embeddings_by_memory: &HashMap<String, Vec<f32>>,
) -> Graph {
    let labels: HashMap<&str, &str> = topics
        .iter()
        .map(|t| (t.cluster_id.as_str(), t.label.as_str()))
        .collect();

    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    let sampled_members = sample_members(clusters);

    for cluster in clusters {
        nodes.push(Node {
            id: cluster.cluster_id.clone(),
            kind: NodeKind::Cluster,
            label: labels.get(cluster.cluster_id.as_str()).copied().unwrap_or(&cluster.cluster_id).to_string(),
            size: (1.0 + cluster.members.len() as f64).ln(),
        });
    }

    let keyword_frequency = count_keyword_memberships(clusters, keywords_by_memory);
    let keyword_nodes: HashSet<&str> = keyword_frequency
        .iter()
        .filter(|(_, count)| **count >= MIN_KEYWORD_MEMORY_COUNT)
        .map(|(kw, _)| kw.as_str())
        .collect();
    for kw in &keyword_nodes {
        nodes.push(Node {
            id: keyword_node_id(kw),
            kind: NodeKind::Keyword,
            label: kw.to_string(),
            size: keyword_frequency[*kw] as f64,
        });
    }

    for cluster in clusters {
        for member in &cluster.members {
            if !sampled_members.contains(member.as_str()) {
                continue;
            }
            nodes.push(Node {
                id: member.clone(),
                kind: NodeKind::Memory,
                label: member.clone(),
                size: 1.0,
            });

            let weight = embeddings_by_memory
                .get(member)
                .map(|v| cosine_similarity(v, &cluster.centroid).clamp(0.0, 1.0))
                .unwrap_or(0.0);
            edges.push(Edge {
                source: cluster.cluster_id.clone(),
                target: member.clone(),
                kind: EdgeKind::Contains,
                weight,
            });

            if let Some(kws) = keywords_by_memory.get(member) {
                for kw in kws {
                    if keyword_nodes.contains(kw.as_str()) {
                        edges.push(Edge {
                            source: member.clone(),
                            target: keyword_node_id(kw),
                            kind: EdgeKind::References,
                            weight: 1.0,
                        });
                    }
                }
            }
        }
    }

    for cluster in clusters {
        let member_count = cluster.members.len().max(1);
        let counts = count_keyword_memberships(std::slice::from_ref(cluster), keywords_by_memory);
        for (kw, count) in &counts {
            if !keyword_nodes.contains(kw.as_str()) {
                continue;
            }
            let ratio = *count as f32 / member_count as f32;
            if ratio >= APPLIES_RATIO {
                edges.push(Edge {
                    source: keyword_node_id(kw),
                    target: cluster.cluster_id.clone(),
                    kind: EdgeKind::Applies,
                    weight: ratio.clamp(0.0, 1.0),
                });
            }
        }
    }

    edges.extend(cluster_pair_edges(clusters, keywords_by_memory));

    Graph { nodes, edges }
}

fn sample_members(clusters: &[Cluster]) -> HashSet<&str> {
    let mut all: Vec<&str> = clusters.iter().flat_map(|c| c.members.iter().map(String::as_str)).collect();
    if all.len() <= DISPLAY_CAP {
        return all.into_iter().collect();
    }
    all.sort_unstable();
    all.into_iter().rev().take(DISPLAY_CAP).collect()
}

fn count_keyword_memberships(
    clusters: &[Cluster],
    keywords_by_memory: &HashMap<String, Vec<String>>,
) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for cluster in clusters {
        for member in &cluster.members {
            if let Some(kws) = keywords_by_memory.get(member) {
                for kw in kws {
                    *counts.entry(kw.clone()).or_insert(0) += 1;
                }
            }
        }
    }
    counts
}

fn keyword_node_id(keyword: &str) -> String {
    format!("keyword-{keyword}")
}

fn cluster_keyword_set(cluster: &Cluster, keywords_by_memory: &HashMap<String, Vec<String>>) -> HashSet<String> {
    cluster
        .members
        .iter()
        .filter_map(|m| keywords_by_memory.get(m))
        .flatten()
        .cloned()
        .collect()
}

fn cluster_pair_edges(clusters: &[Cluster], keywords_by_memory: &HashMap<String, Vec<String>>) -> Vec<Edge> {
    let mut edges = Vec::new();
    let keyword_sets: Vec<HashSet<String>> = clusters
        .iter()
        .map(|c| cluster_keyword_set(c, keywords_by_memory))
        .collect();

    for i in 0..clusters.len() {
        for j in (i + 1)..clusters.len() {
            let cos = cosine_similarity(&clusters[i].centroid, &clusters[j].centroid);
            if cos >= SIMILAR_THRESHOLD {
                edges.push(Edge {
                    source: clusters[i].cluster_id.clone(),
                    target: clusters[j].cluster_id.clone(),
                    kind: EdgeKind::Similar,
                    weight: cos.clamp(0.0, 1.0),
                });
            } else if cos >= RELATED_THRESHOLD {
                edges.push(resolved_related_edge(
                    clusters[i].cluster_id.clone(),
                    clusters[j].cluster_id.clone(),
                    &keyword_sets[i],
                    &keyword_sets[j],
                    cos,
                ));
            }
        }
    }
    edges
}

fn resolved_related_edge(
    a_id: String,
    b_id: String,
    a_kw: &HashSet<String>,
    b_kw: &HashSet<String>,
    cos: f32,
) -> Edge {
    let weight = cos.clamp(0.0, 1.0);

    match infer_relation(a_kw, b_kw) {
        EdgeKind::Prerequisite => Edge { source: a_id, target: b_id, kind: EdgeKind::Prerequisite, weight },
        EdgeKind::Complements => Edge { source: a_id, target: b_id, kind: EdgeKind::Complements, weight },
        _ => match infer_relation(b_kw, a_kw) {
            EdgeKind::Prerequisite => Edge { source: b_id, target: a_id, kind: EdgeKind::Prerequisite, weight },
            _ => Edge { source: a_id, target: b_id, kind: EdgeKind::Related, weight },
        },
    }
}
