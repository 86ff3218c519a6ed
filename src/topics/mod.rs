//! Topic Labeler: assigns a human-readable label to each cluster using
//! TF-IDF-weighted keyword aggregation, with an optional LLM
//! summarization path that never blocks a build on failure.

pub mod error;
pub mod summarizer;

pub use error::TopicsError;
pub use summarizer::{LlmSummarizer, Summarizer};

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;
use crate::index::cosine_similarity;

/// A label must beat the runner-up keyword's weight by this ratio to be
/// used alone; otherwise the top 3 keywords are joined into a phrase.
const DOMINANCE_RATIO: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub cluster_id: String,
    pub label: String,
    pub representative_memory_id: Option<String>,
    pub keywords: Vec<String>,
}

/// Labels every cluster in `clusters`. `keywords_by_memory` and
/// `embeddings_by_memory` must cover every member referenced by a cluster.
pub fn label_clusters(
    clusters: &[Cluster],
    keywords_by_memory: &HashMap<String, Vec<String>>,
    embeddings_by_memory: &HashMap<String, Vec<f32>>,
) -> Vec<Topic> {
    let idf = inverse_document_frequency(clusters, keywords_by_memory);

    clusters
        .iter()
        .map(|cluster| label_one(cluster, keywords_by_memory, embeddings_by_memory, &idf))
        .collect()
}

/// The summarizer is sent at most this many representative snippets per
/// cluster, nearest-to-centroid first.
const SUMMARIZER_SNIPPET_COUNT: usize = 5;

/// Runs [`label_clusters`] then asks `summarizer` to refine each resulting
/// label using that cluster's representative-memory content. A summarizer
/// failure is logged and the keyword-derived label is kept as-is; this never
/// fails the call.
pub async fn label_clusters_with_summarizer(
    clusters: &[Cluster],
    keywords_by_memory: &HashMap<String, Vec<String>>,
    embeddings_by_memory: &HashMap<String, Vec<f32>>,
    content_by_memory: &HashMap<String, String>,
    summarizer: &Arc<dyn Summarizer>,
) -> Vec<Topic> {
    let mut topics = label_clusters(clusters, keywords_by_memory, embeddings_by_memory);
    let clusters_by_id: HashMap<&str, &Cluster> = clusters.iter().map(|c| (c.cluster_id.as_str(), c)).collect();

    for topic in &mut topics {
        let Some(cluster) = clusters_by_id.get(topic.cluster_id.as_str()) else {
            continue;
        };
        let snippets: Vec<String> = nearest_members(cluster, embeddings_by_memory, SUMMARIZER_SNIPPET_COUNT)
            .into_iter()
            .filter_map(|id| content_by_memory.get(&id).cloned())
            .collect();
        if snippets.is_empty() {
            continue;
        }

        match summarizer.summarize(&topic.label, &snippets).await {
            Ok(refined) => topic.label = refined,
            Err(err) => {
                tracing::debug!(cluster_id = %topic.cluster_id, error = %err, "summarizer fallback to keyword label");
            }
        }
    }

    topics
}

fn inverse_document_frequency(
    clusters: &[Cluster],
    keywords_by_memory: &HashMap<String, Vec<String>>,
) -> HashMap<String, f64> {
    let n_docs = clusters.len().max(1) as f64;
    let mut doc_freq: HashMap<String, u32> = HashMap::new();

    for cluster in clusters {
        let mut seen_in_cluster = std::collections::HashSet::new();
        for member in &cluster.members {
            if let Some(kws) = keywords_by_memory.get(member) {
                for kw in kws {
                    seen_in_cluster.insert(kw.clone());
                }
            }
        }
        for kw in seen_in_cluster {
            *doc_freq.entry(kw).or_insert(0) += 1;
        }
    }

    doc_freq
        .into_iter()
        .map(|(kw, df)| (kw, (n_docs / df as f64).ln() + 1.0))
        .collect()
}

fn label_one(
    cluster: &Cluster,
    keywords_by_memory: &HashMap<String, Vec<String>>,
    embeddings_by_memory: &HashMap<String, Vec<f32>>,
    idf: &HashMap<String, f64>,
) -> Topic {
    let mut term_freq: HashMap<String, u32> = HashMap::new();
    for member in &cluster.members {
        if let Some(kws) = keywords_by_memory.get(member) {
            for kw in kws {
                *term_freq.entry(kw.clone()).or_insert(0) += 1;
            }
        }
    }

    let mut weighted: Vec<(String, f64)> = term_freq
        .iter()
        .map(|(kw, tf)| {
            let weight = *tf as f64 * idf.get(kw).copied().unwrap_or(1.0);
            (kw.clone(), weight)
        })
        .collect();
    weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));

    let label = if let Some((top_kw, top_weight)) = weighted.first() {
        let runner_up = weighted.get(1).map(|(_, w)| *w).unwrap_or(0.0);
        if runner_up == 0.0 || top_weight / runner_up >= DOMINANCE_RATIO {
            top_kw.clone()
        } else {
            let mut phrase: Vec<String> = weighted.iter().take(3).map(|(kw, _)| kw.clone()).collect();
            phrase.dedup();
            phrase.join(", ")
        }
    } else {
        "untitled".to_string()
    };

    let keywords = weighted.into_iter().map(|(kw, _)| kw).collect();
    let representative_memory_id = representative_member(cluster, embeddings_by_memory);

    Topic {
        cluster_id: cluster.cluster_id.clone(),
        label,
        representative_memory_id,
        keywords,
    }
}

fn representative_member(
    cluster: &Cluster,
    embeddings_by_memory: &HashMap<String, Vec<f32>>,
) -> Option<String> {
    nearest_members(cluster, embeddings_by_memory, 1).into_iter().next()
}

/// The `n` cluster members nearest the centroid by cosine similarity,
/// descending. Used both for the single `representative_memory_id` field
/// and for the wider snippet set sent to the summarizer.
fn nearest_members(cluster: &Cluster, embeddings_by_memory: &HashMap<String, Vec<f32>>, n: usize) -> Vec<String> {
    let mut scored: Vec<(&String, f32)> = cluster
        .members
        .iter()
        .filter_map(|id| embeddings_by_memory.get(id).map(|v| (id, cosine_similarity(v, &cluster.centroid))))
        .collect();
    scored.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(n).map(|(id, _)| id.clone()).collect()
}
