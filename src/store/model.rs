//! Memory Store row types.

use serde::{Deserialize, Serialize};

/// A persisted memory row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Memory {
    pub id: String,
    pub user_id: i64,
    pub content: String,
    pub r#type: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub created_at: i64,
    pub timestamp: i64,
}

/// Paging/filtering options for `ListMemories`.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    pub r#type: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl MemoryFilter {
    pub fn paged(limit: u32, offset: u32) -> Self {
        Self {
            r#type: None,
            limit,
            offset,
        }
    }
}

/// A memory paired with its current embedding vector.
#[derive(Debug, Clone)]
pub struct EmbeddingRow {
    pub memory_id: String,
    pub vector: Vec<f32>,
    pub version: u32,
}

/// Input to `InsertMemory`.
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub id: String,
    pub user_id: i64,
    pub content: String,
    pub r#type: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub created_at: i64,
}
