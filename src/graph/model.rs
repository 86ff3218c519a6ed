//! The graph's tagged-union node and edge types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Cluster,
    Keyword,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    /// Relative visual weight; clusters scale with log(1+members), keywords
    /// with frequency, memories are fixed at 1.0.
    pub size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Contains,
    References,
    /// Keyword → cluster: this keyword is characteristic of the cluster's
    /// membership, not just mentioned by one memory in it.
    Applies,
    Similar,
    Complements,
    Prerequisite,
    Related,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub weight: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EdgeKind::Applies).unwrap(), "\"applies\"");
    }
}
