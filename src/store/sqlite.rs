//! `rusqlite`-backed implementation of the Memory Store.

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::instrument;

use super::error::StoreError;
use super::keywords::normalize_keywords;
use super::model::{EmbeddingRow, Memory, MemoryFilter, NewMemory};
use crate::hashing::fold_digest;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    type TEXT NOT NULL,
    summary TEXT,
    timestamp INTEGER NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_memories_user ON memories(user_id, id DESC);

CREATE TABLE IF NOT EXISTS memory_keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    memory_id TEXT NOT NULL REFERENCES memories(id) ON DELETE CASCADE,
    keyword TEXT NOT NULL,
    UNIQUE(memory_id, keyword)
);

CREATE TABLE IF NOT EXISTS memory_embeddings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    memory_id TEXT NOT NULL UNIQUE REFERENCES memories(id) ON DELETE CASCADE,
    vector_data TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS cluster_result_cache (
    user_id INTEGER NOT NULL,
    artifact TEXT NOT NULL,
    payload TEXT NOT NULL,
    digest INTEGER NOT NULL,
    generated_at INTEGER NOT NULL,
    ttl_secs INTEGER NOT NULL,
    PRIMARY KEY (user_id, artifact)
);
"#;

/// Durable storage for memories, keywords, and embeddings, backed by a
/// bundled SQLite database behind a single mutex — short critical
/// sections, no async held across a lock, matching the rest of the
/// engine's concurrency texture.
pub struct SqliteMemoryStore {
    conn: Mutex<Connection>,
}

impl SqliteMemoryStore {
    pub fn open(path: &std::path::Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Exposes the underlying connection for sibling modules (the Result
    /// Cache's persisted tier) that share this database file rather than
    /// opening a second handle.
    pub(crate) fn raw_connection(&self) -> &Mutex<Connection> {
        &self.conn
    }

    #[instrument(skip(self, memory))]
    pub fn insert_memory(&self, memory: NewMemory) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM memories WHERE id = ?1",
                params![memory.id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::Conflict(memory.id));
        }

        conn.execute(
            "INSERT INTO memories (id, user_id, content, type, summary, timestamp, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                memory.id,
                memory.user_id,
                memory.content,
                memory.r#type,
                memory.summary,
                memory.created_at,
            ],
        )?;

        let keywords = normalize_keywords(&memory.keywords);
        for kw in keywords {
            conn.execute(
                "INSERT OR IGNORE INTO memory_keywords (memory_id, keyword) VALUES (?1, ?2)",
                params![memory.id, kw],
            )?;
        }

        Ok(())
    }

    /// Idempotent per `(memoryId, keyword)`.
    pub fn insert_keywords(&self, memory_id: &str, keywords: &[String]) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        for kw in normalize_keywords(keywords) {
            conn.execute(
                "INSERT OR IGNORE INTO memory_keywords (memory_id, keyword) VALUES (?1, ?2)",
                params![memory_id, kw],
            )?;
        }
        Ok(())
    }

    /// Atomically inserts or replaces a memory's embedding, bumping its
    /// version.
    #[instrument(skip(self, vector))]
    pub fn upsert_embedding(&self, memory_id: &str, vector: &[f32]) -> Result<u32, StoreError> {
        let conn = self.conn.lock();
        let owner: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM memories WHERE id = ?1",
                params![memory_id],
                |row| row.get(0),
            )
            .optional()?;
        if owner.is_none() {
            return Err(StoreError::NotFound(memory_id.to_string()));
        }

        let prev_version: Option<u32> = conn
            .query_row(
                "SELECT version FROM memory_embeddings WHERE memory_id = ?1",
                params![memory_id],
                |row| row.get(0),
            )
            .optional()?;
        let next_version = prev_version.unwrap_or(0) + 1;

        let payload = serde_json::to_string(vector)
            .map_err(|e| StoreError::InvalidInput(e.to_string()))?;

        conn.execute(
            "INSERT INTO memory_embeddings (memory_id, vector_data, version)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(memory_id) DO UPDATE SET vector_data = excluded.vector_data, version = excluded.version",
            params![memory_id, payload, next_version],
        )?;

        Ok(next_version)
    }

    pub fn get_memory(&self, memory_id: &str) -> Result<Memory, StoreError> {
        let conn = self.conn.lock();
        Self::load_memory(&conn, memory_id)?.ok_or_else(|| StoreError::NotFound(memory_id.to_string()))
    }

    fn load_memory(conn: &Connection, memory_id: &str) -> Result<Option<Memory>, StoreError> {
        let row = conn
            .query_row(
                "SELECT id, user_id, content, type, summary, timestamp, created_at
                 FROM memories WHERE id = ?1",
                params![memory_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, user_id, content, r#type, summary, timestamp, created_at)) = row else {
            return Ok(None);
        };

        let mut stmt =
            conn.prepare("SELECT keyword FROM memory_keywords WHERE memory_id = ?1")?;
        let keywords = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Memory {
            id,
            user_id,
            content,
            r#type,
            summary,
            keywords,
            created_at,
            timestamp,
        }))
    }

    /// Paged, ordered by `id` desc (newest first).
    pub fn list_memories(
        &self,
        user_id: i64,
        filter: &MemoryFilter,
    ) -> Result<Vec<Memory>, StoreError> {
        let conn = self.conn.lock();
        let limit = if filter.limit == 0 { 100 } else { filter.limit };

        let mut stmt = conn.prepare(
            "SELECT id FROM memories WHERE user_id = ?1
             AND (?2 IS NULL OR type = ?2)
             ORDER BY id DESC LIMIT ?3 OFFSET ?4",
        )?;
        let ids: Vec<String> = stmt
            .query_map(
                params![user_id, filter.r#type, limit, filter.offset],
                |row| row.get::<_, String>(0),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        ids.into_iter()
            .map(|id| {
                Self::load_memory(&conn, &id)?
                    .ok_or_else(|| StoreError::NotFound(id.clone()))
            })
            .collect()
    }

    /// Returns `(memoryId, vector)` pairs for every memory with a current
    /// embedding. The cluster engine must ignore memories without one —
    /// this is enforced by simply never returning them.
    pub fn list_embeddings(&self, user_id: i64) -> Result<Vec<EmbeddingRow>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT e.memory_id, e.vector_data, e.version
             FROM memory_embeddings e
             JOIN memories m ON m.id = e.memory_id
             WHERE m.user_id = ?1",
        )?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(memory_id, payload, version)| {
                let vector: Vec<f32> = serde_json::from_str(&payload)
                    .map_err(|e| StoreError::Dimension(e.to_string()))?;
                Ok(EmbeddingRow {
                    memory_id,
                    vector,
                    version,
                })
            })
            .collect()
    }

    /// Cheap, order-independent hash of `(memoryId, version)` identity —
    /// changes iff the embedding set changes.
    pub fn embedding_digest(&self, user_id: i64) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT e.memory_id, e.version FROM memory_embeddings e
             JOIN memories m ON m.id = e.memory_id
             WHERE m.user_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u32>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut digest = 0u64;
        for (memory_id, version) in rows {
            digest = fold_digest(digest, &memory_id, version);
        }
        Ok(digest)
    }

    /// Deletes a memory; cascades to its keywords and embedding.
    pub fn delete_memory(&self, memory_id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let affected = conn.execute("DELETE FROM memories WHERE id = ?1", params![memory_id])?;
        if affected == 0 {
            return Err(StoreError::NotFound(memory_id.to_string()));
        }
        Ok(())
    }

    /// Memories for `user_id` whose embedding is missing or fails a
    /// dimension check — candidates for the repair endpoint.
    pub fn memories_needing_repair(
        &self,
        user_id: i64,
        expected_dim: usize,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT m.id, e.vector_data FROM memories m
             LEFT JOIN memory_embeddings e ON e.memory_id = m.id
             WHERE m.user_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut needing_repair = Vec::new();
        for (id, payload) in rows {
            match payload {
                None => needing_repair.push(id),
                Some(json) => {
                    let ok = serde_json::from_str::<Vec<f32>>(&json)
                        .map(|v| v.len() == expected_dim && v.iter().all(|x| x.is_finite()))
                        .unwrap_or(false);
                    if !ok {
                        needing_repair.push(id);
                    }
                }
            }
        }
        Ok(needing_repair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_memory(id: &str, user_id: i64, content: &str) -> NewMemory {
        NewMemory {
            id: id.to_string(),
            user_id,
            content: content.to_string(),
            r#type: "chat".to_string(),
            summary: None,
            keywords: vec!["rust".to_string(), "Rust".to_string()],
            created_at: 1,
        }
    }

    #[test]
    fn test_insert_and_get_memory() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        store.insert_memory(new_memory("20260101000000000001", 1, "hello")).unwrap();

        let memory = store.get_memory("20260101000000000001").unwrap();
        assert_eq!(memory.content, "hello");
        assert_eq!(memory.keywords, vec!["rust".to_string()]);
    }

    #[test]
    fn test_duplicate_insert_conflicts() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        store.insert_memory(new_memory("id1", 1, "hello")).unwrap();
        let result = store.insert_memory(new_memory("id1", 1, "hello again"));
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_upsert_embedding_bumps_version() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        store.insert_memory(new_memory("id1", 1, "hello")).unwrap();

        let v1 = store.upsert_embedding("id1", &[0.1, 0.2, 0.3]).unwrap();
        let v2 = store.upsert_embedding("id1", &[0.4, 0.5, 0.6]).unwrap();
        assert_eq!(v1, 1);
        assert_eq!(v2, 2);
    }

    #[test]
    fn test_upsert_embedding_missing_memory_not_found() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        let result = store.upsert_embedding("missing", &[0.1]);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_list_embeddings_ignores_memories_without_one() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        store.insert_memory(new_memory("id1", 1, "hello")).unwrap();
        store.insert_memory(new_memory("id2", 1, "world")).unwrap();
        store.upsert_embedding("id1", &[0.1, 0.2]).unwrap();

        let embeddings = store.list_embeddings(1).unwrap();
        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].memory_id, "id1");
    }

    #[test]
    fn test_digest_changes_with_embedding_set() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        store.insert_memory(new_memory("id1", 1, "hello")).unwrap();

        let digest_before = store.embedding_digest(1).unwrap();
        store.upsert_embedding("id1", &[0.1, 0.2]).unwrap();
        let digest_after = store.embedding_digest(1).unwrap();

        assert_ne!(digest_before, digest_after);
    }

    #[test]
    fn test_delete_memory_cascades() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        store.insert_memory(new_memory("id1", 1, "hello")).unwrap();
        store.upsert_embedding("id1", &[0.1, 0.2]).unwrap();

        store.delete_memory("id1").unwrap();

        assert!(matches!(store.get_memory("id1"), Err(StoreError::NotFound(_))));
        assert_eq!(store.list_embeddings(1).unwrap().len(), 0);
    }

    #[test]
    fn test_list_memories_paged_ordered_desc() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        store.insert_memory(new_memory("id1", 1, "a")).unwrap();
        store.insert_memory(new_memory("id2", 1, "b")).unwrap();
        store.insert_memory(new_memory("id3", 1, "c")).unwrap();

        let page = store.list_memories(1, &MemoryFilter::paged(2, 0)).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "id3");
        assert_eq!(page[1].id, "id2");
    }

    #[test]
    fn test_memories_needing_repair_flags_missing_and_wrong_dim() {
        let store = SqliteMemoryStore::open_in_memory().unwrap();
        store.insert_memory(new_memory("id1", 1, "a")).unwrap();
        store.insert_memory(new_memory("id2", 1, "b")).unwrap();
        store.upsert_embedding("id2", &[0.1, 0.2]).unwrap();

        let needing = store.memories_needing_repair(1, 3).unwrap();
        assert!(needing.contains(&"id1".to_string()));
        assert!(needing.contains(&"id2".to_string()));
    }
}
