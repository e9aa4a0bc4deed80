//! The metadata cache (§4.3.1): a single SQLite-backed store for
//! transcripts, extracted content, summaries, and slide manifests, keyed
//! by the fingerprints in `key.rs`. Every read and write sweeps expired
//! rows and, if over the byte cap, evicts the least-recently-accessed
//! rows until back under it.

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;
use summarize_core::{Error, Result};
use tracing::{debug, info};

/// One of the four logical tables sharing the same physical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Transcript,
    Content,
    Summary,
    Slides,
}

impl Namespace {
    fn as_str(self) -> &'static str {
        match self {
            Namespace::Transcript => "transcript",
            Namespace::Content => "content",
            Namespace::Summary => "summary",
            Namespace::Slides => "slides",
        }
    }
}

/// Single-writer, multi-reader metadata store. `rusqlite::Connection`
/// isn't `Sync`, so all access goes through a mutex; SQLite's own WAL mode
/// lets readers proceed concurrently with an in-flight writer at the file
/// level, which is the concurrency guarantee §4.3.1 asks for.
pub struct MetadataCache {
    conn: Arc<Mutex<Connection>>,
    max_bytes: u64,
    ttl_ms: i64,
}

impl MetadataCache {
    pub fn open(path: &Path, max_bytes: u64, ttl_ms: i64) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| Error::Cache(e.to_string()))?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)), max_bytes, ttl_ms })
    }

    pub fn open_in_memory(max_bytes: u64, ttl_ms: i64) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Cache(e.to_string()))?;
        Self::init_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)), max_bytes, ttl_ms })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        // WAL + rename-into-place semantics on checkpoint tolerate a
        // crash mid-write without corrupting the file (§4.3.1).
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT NOT NULL,
                namespace TEXT NOT NULL,
                value TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                last_accessed_at INTEGER NOT NULL,
                size_bytes INTEGER NOT NULL,
                PRIMARY KEY (namespace, key)
             );
             CREATE INDEX IF NOT EXISTS idx_cache_last_access ON cache_entries(last_accessed_at);
             CREATE INDEX IF NOT EXISTS idx_cache_created ON cache_entries(created_at);",
        )
        .map_err(|e| Error::Cache(e.to_string()))?;
        Ok(())
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Delete rows past their TTL, then evict by ascending
    /// `last_accessed_at` until the store is back under `max_bytes`.
    /// Called on every read and write (§4.3.1, §8 invariant 6).
    fn sweep(&self, conn: &Connection) -> Result<()> {
        let now = Self::now_ms();
        let cutoff = now - self.ttl_ms;
        let expired = conn
            .execute("DELETE FROM cache_entries WHERE created_at < ?1", params![cutoff])
            .map_err(|e| Error::Cache(e.to_string()))?;
        if expired > 0 {
            debug!(expired, "metadata cache TTL sweep");
        }

        let total: i64 = conn
            .query_row("SELECT COALESCE(SUM(size_bytes), 0) FROM cache_entries", [], |r| r.get(0))
            .map_err(|e| Error::Cache(e.to_string()))?;
        if (total as u64) <= self.max_bytes {
            return Ok(());
        }

        let mut evicted = 0u64;
        let mut over = total as u64 - self.max_bytes;
        let mut stmt = conn
            .prepare("SELECT namespace, key, size_bytes FROM cache_entries ORDER BY last_accessed_at ASC")
            .map_err(|e| Error::Cache(e.to_string()))?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?, r.get::<_, i64>(2)?)))
            .map_err(|e| Error::Cache(e.to_string()))?;
        for row in rows {
            if over == 0 {
                break;
            }
            let (namespace, key, size) = row.map_err(|e| Error::Cache(e.to_string()))?;
            conn.execute(
                "DELETE FROM cache_entries WHERE namespace = ?1 AND key = ?2",
                params![namespace, key],
            )
            .map_err(|e| Error::Cache(e.to_string()))?;
            over = over.saturating_sub(size as u64);
            evicted += 1;
        }
        if evicted > 0 {
            info!(evicted, "metadata cache evicted entries over byte cap");
        }
        Ok(())
    }

    /// Store a pre-serialized JSON value under `(namespace, key)`.
    pub fn put(&self, namespace: Namespace, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn.lock();
        let serialized = serde_json::to_string(value)?;
        let now = Self::now_ms();
        conn.execute(
            "INSERT INTO cache_entries (key, namespace, value, created_at, last_accessed_at, size_bytes)
             VALUES (?1, ?2, ?3, ?4, ?4, ?5)
             ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                created_at = excluded.created_at,
                last_accessed_at = excluded.last_accessed_at,
                size_bytes = excluded.size_bytes",
            params![key, namespace.as_str(), serialized, now, serialized.len() as i64],
        )
        .map_err(|e| Error::Cache(e.to_string()))?;
        self.sweep(&conn)?;
        Ok(())
    }

    /// Read a value, touching `last_accessed_at`. Returns `None` if
    /// absent or expired (the sweep that runs first guarantees an expired
    /// row is never returned, per §8 invariant 6).
    pub fn get(&self, namespace: Namespace, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn.lock();
        self.sweep(&conn)?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM cache_entries WHERE namespace = ?1 AND key = ?2",
                params![namespace.as_str(), key],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| Error::Cache(e.to_string()))?;
        let Some(raw) = raw else { return Ok(None) };
        conn.execute(
            "UPDATE cache_entries SET last_accessed_at = ?1 WHERE namespace = ?2 AND key = ?3",
            params![Self::now_ms(), namespace.as_str(), key],
        )
        .map_err(|e| Error::Cache(e.to_string()))?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn remove(&self, namespace: Namespace, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM cache_entries WHERE namespace = ?1 AND key = ?2",
            params![namespace.as_str(), key],
        )
        .map_err(|e| Error::Cache(e.to_string()))?;
        Ok(())
    }

    /// `--cache-stats`: entry count and total bytes, overall and per
    /// namespace.
    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.conn.lock();
        self.sweep(&conn)?;
        let (count, bytes): (i64, i64) = conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0) FROM cache_entries",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .map_err(|e| Error::Cache(e.to_string()))?;
        Ok(CacheStats { entries: count as u64, total_bytes: bytes as u64 })
    }

    /// `--clear-cache`: drop every row.
    pub fn clear(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let n = conn.execute("DELETE FROM cache_entries", []).map_err(|e| Error::Cache(e.to_string()))?;
        Ok(n as u64)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub entries: u64,
    pub total_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = MetadataCache::open_in_memory(1_000_000, 60_000).unwrap();
        cache.put(Namespace::Content, "k1", &serde_json::json!({"a": 1})).unwrap();
        let v = cache.get(Namespace::Content, "k1").unwrap().unwrap();
        assert_eq!(v, serde_json::json!({"a": 1}));
    }

    #[test]
    fn namespaces_do_not_collide_on_same_key() {
        let cache = MetadataCache::open_in_memory(1_000_000, 60_000).unwrap();
        cache.put(Namespace::Content, "k", &serde_json::json!("content")).unwrap();
        cache.put(Namespace::Summary, "k", &serde_json::json!("summary")).unwrap();
        assert_eq!(cache.get(Namespace::Content, "k").unwrap().unwrap(), serde_json::json!("content"));
        assert_eq!(cache.get(Namespace::Summary, "k").unwrap().unwrap(), serde_json::json!("summary"));
    }

    #[test]
    fn missing_key_returns_none() {
        let cache = MetadataCache::open_in_memory(1_000_000, 60_000).unwrap();
        assert!(cache.get(Namespace::Content, "nope").unwrap().is_none());
    }

    #[test]
    fn ttl_sweep_expires_old_rows() {
        let cache = MetadataCache::open_in_memory(1_000_000, 0).unwrap();
        cache.put(Namespace::Content, "k1", &serde_json::json!("v")).unwrap();
        // ttl_ms = 0 means anything with created_at < now is immediately expired.
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(cache.get(Namespace::Content, "k1").unwrap().is_none());
    }

    #[test]
    fn size_cap_evicts_oldest_accessed_first() {
        let cache = MetadataCache::open_in_memory(10, 60_000).unwrap();
        cache.put(Namespace::Content, "a", &serde_json::json!("xxxx")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        cache.put(Namespace::Content, "b", &serde_json::json!("yyyy")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        // Writing a third entry pushes the store over the 10-byte cap,
        // evicting "a" (oldest last_accessed_at) first.
        cache.put(Namespace::Content, "c", &serde_json::json!("zzzz")).unwrap();
        assert!(cache.get(Namespace::Content, "a").unwrap().is_none());
    }

    #[test]
    fn clear_removes_everything() {
        let cache = MetadataCache::open_in_memory(1_000_000, 60_000).unwrap();
        cache.put(Namespace::Content, "a", &serde_json::json!(1)).unwrap();
        cache.put(Namespace::Summary, "b", &serde_json::json!(2)).unwrap();
        let removed = cache.clear().unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.stats().unwrap().entries, 0);
    }
}
