//! Persistent tier: the `cluster_result_cache` table, survives process
//! restarts so a cold hot-cache doesn't force every user to rebuild.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use super::error::CacheError;
use super::types::{Artifact, CacheEntry};

pub struct PersistedCache<'a> {
    conn: &'a Mutex<Connection>,
}

impl<'a> PersistedCache<'a> {
    pub fn new(conn: &'a Mutex<Connection>) -> Self {
        Self { conn }
    }

    pub fn get(&self, user_id: i64, artifact: Artifact) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT payload, digest, generated_at, ttl_secs FROM cluster_result_cache
                 WHERE user_id = ?1 AND artifact = ?2",
                params![user_id, artifact.as_str()],
                |row| {
                    let payload: String = row.get(0)?;
                    let digest: i64 = row.get(1)?;
                    let generated_at: i64 = row.get(2)?;
                    let ttl_secs: i64 = row.get(3)?;
                    Ok((payload, digest, generated_at, ttl_secs))
                },
            )
            .optional()?;

        Ok(row.map(|(payload, digest, generated_at, ttl_secs)| CacheEntry {
            user_id,
            artifact,
            payload,
            digest: digest as u64,
            generated_at: timestamp_to_utc(generated_at),
            ttl: std::time::Duration::from_secs(ttl_secs.max(0) as u64),
        }))
    }

    pub fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO cluster_result_cache (user_id, artifact, payload, digest, generated_at, ttl_secs)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, artifact) DO UPDATE SET
                payload = excluded.payload,
                digest = excluded.digest,
                generated_at = excluded.generated_at,
                ttl_secs = excluded.ttl_secs",
            params![
                entry.user_id,
                entry.artifact.as_str(),
                entry.payload,
                entry.digest as i64,
                entry.generated_at.timestamp(),
                entry.ttl.as_secs() as i64,
            ],
        )?;
        Ok(())
    }

    pub fn invalidate(&self, user_id: i64, artifact: Artifact) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM cluster_result_cache WHERE user_id = ?1 AND artifact = ?2",
            params![user_id, artifact.as_str()],
        )?;
        Ok(())
    }

    pub fn invalidate_user(&self, user_id: i64) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM cluster_result_cache WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(())
    }
}

fn timestamp_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fixture_conn() -> Mutex<Connection> {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE cluster_result_cache (
                user_id INTEGER NOT NULL,
                artifact TEXT NOT NULL,
                payload TEXT NOT NULL,
                digest INTEGER NOT NULL,
                generated_at INTEGER NOT NULL,
                ttl_secs INTEGER NOT NULL,
                PRIMARY KEY (user_id, artifact)
            );",
        )
        .unwrap();
        Mutex::new(conn)
    }

    #[test]
    fn test_put_then_get_round_trips() {
        let conn = fixture_conn();
        let cache = PersistedCache::new(&conn);
        let entry = CacheEntry {
            user_id: 1,
            artifact: Artifact::Topics,
            payload: "{\"a\":1}".to_string(),
            digest: 99,
            generated_at: Utc::now(),
            ttl: Duration::from_secs(60),
        };
        cache.put(&entry).unwrap();
        let got = cache.get(1, Artifact::Topics).unwrap().unwrap();
        assert_eq!(got.digest, 99);
        assert_eq!(got.payload, "{\"a\":1}");
    }

    #[test]
    fn test_upsert_replaces_prior_entry() {
        let conn = fixture_conn();
        let cache = PersistedCache::new(&conn);
        let mut entry = CacheEntry {
            user_id: 1,
            artifact: Artifact::Graph,
            payload: "v1".to_string(),
            digest: 1,
            generated_at: Utc::now(),
            ttl: Duration::from_secs(60),
        };
        cache.put(&entry).unwrap();
        entry.payload = "v2".to_string();
        entry.digest = 2;
        cache.put(&entry).unwrap();

        let got = cache.get(1, Artifact::Graph).unwrap().unwrap();
        assert_eq!(got.payload, "v2");
        assert_eq!(got.digest, 2);
    }

    #[test]
    fn test_missing_entry_returns_none() {
        let conn = fixture_conn();
        let cache = PersistedCache::new(&conn);
        assert!(cache.get(1, Artifact::Clusters).unwrap().is_none());
    }

    #[test]
    fn test_invalidate_user_clears_all_entries() {
        let conn = fixture_conn();
        let cache = PersistedCache::new(&conn);
        cache
            .put(&CacheEntry {
                user_id: 1,
                artifact: Artifact::Clusters,
                payload: "{}".to_string(),
                digest: 1,
                generated_at: Utc::now(),
                ttl: Duration::from_secs(60),
            })
            .unwrap();
        cache.invalidate_user(1).unwrap();
        assert!(cache.get(1, Artifact::Clusters).unwrap().is_none());
    }
}
