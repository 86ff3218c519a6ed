//! Graph Builder: composes clusters, topics, and keywords into a tagged-
//! union graph of nodes and typed edges. Graph values are transient —
//! callers persist only the serialized form via the Result Cache.

pub mod build;
pub mod error;
pub mod model;
pub mod rules;

pub use build::build_graph;
pub use error::GraphError;
pub use model::{Edge, EdgeKind, Graph, Node, NodeKind};
