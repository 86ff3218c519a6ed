//! # Memoria
//!
//! A personal learning-memory engine. Conversational turns and summaries are
//! ingested as "memories"; the engine embeds them into a semantic substrate,
//! clusters the substrate into topics, derives a labeled knowledge graph over
//! clusters/keywords/memories, and serves similarity search, topic listing,
//! graph retrieval, and a learning-trajectory projection.
//!
//! ```text
//! Ingest → Embed → Cluster → Label → Graph → Trajectory
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use memoria::config::Config;
//!
//! # fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Listening on {}", config.socket_addr());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`store`] - Memory Store (sqlite-backed persistence)
//! - [`embedding`] - Embedding Gateway (rate-limited, retrying)
//! - [`index`] - in-memory vector index and top-K search
//! - [`cluster`] - Cluster Engine (k-means, stable identity)
//! - [`topics`] - Topic Labeler
//! - [`graph`] - Knowledge Graph Builder
//! - [`cache`] - Result Cache (hot + persisted tiers)
//! - [`coordinator`] - Pipeline Coordinator orchestrating the above
//! - [`gateway`] - HTTP surface
//! - [`config`] - environment-backed configuration

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod embedding;
pub mod error;
pub mod gateway;
pub mod graph;
pub mod hashing;
pub mod ids;
pub mod index;
pub mod store;
pub mod topics;

pub use config::{Config, ConfigError};
pub use constants::{DimConfig, DimValidationError, validate_embedding_dim};
pub use coordinator::{Coordinator, CoordinatorError, ReadOptions};
pub use error::{MEMORIA_STATUS_HEADER, MemoriaError};
pub use gateway::{HandlerState, create_router_with_state};
pub use hashing::{cluster_seed, fold_digest, hash_content, hash_to_u64};
pub use ids::MemoryIdGenerator;
