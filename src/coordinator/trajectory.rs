//! Learning-trajectory projection: a read-only view over topics + the
//! knowledge graph, with no storage of its own beyond the Result Cache
//! entry the coordinator already writes for every artifact.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cluster::Cluster;
use crate::graph::{EdgeKind, Graph};
use crate::topics::Topic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Progress {
    New,
    Grown { by: i64 },
    Unchanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryTopic {
    pub cluster_id: String,
    pub label: String,
    pub member_count: usize,
    pub progress: Progress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub topics: Vec<TrajectoryTopic>,
    pub suggested_next: Vec<String>,
}

const MAX_SUGGESTIONS: usize = 3;

/// `previous_member_counts` maps `clusterId -> member_count` from the last
/// cached trajectory, if any.
pub fn synthesize(
    topics: &[Topic],
    clusters: &[Cluster],
    graph: &Graph,
    previous_member_counts: &HashMap<String, usize>,
) -> Trajectory {
    let sizes: HashMap<&str, usize> = clusters.iter().map(|c| (c.cluster_id.as_str(), c.size())).collect();

    let trajectory_topics: Vec<TrajectoryTopic> = topics
        .iter()
        .map(|t| {
            let member_count = sizes.get(t.cluster_id.as_str()).copied().unwrap_or(0);
            let progress = match previous_member_counts.get(&t.cluster_id) {
                None => Progress::New,
                Some(&prior) if member_count > prior => Progress::Grown {
                    by: member_count as i64 - prior as i64,
                },
                Some(_) => Progress::Unchanged,
            };
            TrajectoryTopic {
                cluster_id: t.cluster_id.clone(),
                label: t.label.clone(),
                member_count,
                progress,
            }
        })
        .collect();

    let suggested_next = suggest_next(clusters, graph);

    Trajectory {
        topics: trajectory_topics,
        suggested_next,
    }
}

fn suggest_next(clusters: &[Cluster], graph: &Graph) -> Vec<String> {
    let sizes: HashMap<&str, usize> = clusters.iter().map(|c| (c.cluster_id.as_str(), c.size())).collect();

    let mut candidates: Vec<(&str, usize)> = graph
        .edges
        .iter()
        .filter(|e| e.kind == EdgeKind::Prerequisite)
        .filter_map(|e| {
            let source_size = sizes.get(e.source.as_str()).copied()?;
            let target_size = sizes.get(e.target.as_str()).copied()?;
            if source_size < target_size {
                Some((e.source.as_str(), source_size))
            } else {
                None
            }
        })
        .collect();

    candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    candidates.dedup_by(|a, b| a.0 == b.0);

    candidates.into_iter().take(MAX_SUGGESTIONS).map(|(id, _)| id.to_string()).collect()
}
