//! Memory Store: durable record of memories, keywords, and embeddings;
//! owns the id scheme and referential integrity.

pub mod error;
pub mod keywords;
pub mod model;
pub mod sqlite;

pub use error::StoreError;
pub use keywords::extract_keywords;
pub use model::{EmbeddingRow, Memory, MemoryFilter, NewMemory};
pub use sqlite::SqliteMemoryStore;
