//! File-backed media cache (§4.3.2): downloaded binary assets live as
//! plain files under `media/`, indexed by an `index.json` that is always
//! rewritten atomically (write to a `.tmp` sibling, then rename).

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use summarize_core::{MediaCacheEntry, Result, VerifyMode};
use tracing::{info, warn};

use crate::key::url_hash;

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct Index {
    #[serde(default)]
    entries: HashMap<String, MediaCacheEntry>,
}

pub struct MediaCache {
    dir: PathBuf,
    index: Mutex<Index>,
    max_bytes: u64,
    ttl_ms: i64,
    verify: VerifyMode,
}

impl MediaCache {
    pub fn open(dir: &Path, max_bytes: u64, ttl_ms: i64, verify: VerifyMode) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let index_path = dir.join("index.json");
        let index = if index_path.exists() {
            let raw = std::fs::read_to_string(&index_path)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            Index::default()
        };
        Ok(Self { dir: dir.to_path_buf(), index: Mutex::new(index), max_bytes, ttl_ms, verify })
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.json")
    }

    /// Rewrite `index.json` atomically: write to a temp file in the same
    /// directory, then rename over the original so a crash mid-write never
    /// leaves a truncated index (§4.3.2, §9 invariant — durability of the
    /// media cache index).
    fn persist(&self, index: &Index) -> Result<()> {
        let serialized = serde_json::to_vec_pretty(index)?;
        let tmp = self.dir.join("index.json.tmp");
        {
            let mut f = std::fs::File::create(&tmp)?;
            f.write_all(&serialized)?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp, self.index_path())?;
        Ok(())
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Delete entries past their TTL and their backing files, then evict by
    /// ascending `last_access_at_ms` until `sum(size_bytes) <= max_bytes`
    /// (§8 invariant: media cache never exceeds its configured byte cap).
    fn sweep(&self, index: &mut Index) -> Result<bool> {
        let mut changed = false;
        let now = Self::now_ms();
        let expired: Vec<String> = index
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at_ms.map(|exp| exp <= now).unwrap_or(false))
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.remove_file(&index.entries[&key]);
            index.entries.remove(&key);
            changed = true;
        }

        let total: u64 = index.entries.values().map(|e| e.size_bytes).sum();
        if total <= self.max_bytes {
            return Ok(changed);
        }
        let mut over = total - self.max_bytes;
        let mut ordered: Vec<String> = index.entries.keys().cloned().collect();
        ordered.sort_by_key(|k| index.entries[k].last_access_at_ms);
        for key in ordered {
            if over == 0 {
                break;
            }
            let entry = index.entries.remove(&key).expect("key came from this index");
            over = over.saturating_sub(entry.size_bytes);
            self.remove_file(&entry);
            changed = true;
        }
        if changed {
            info!("media cache sweep evicted entries");
        }
        Ok(changed)
    }

    fn remove_file(&self, entry: &MediaCacheEntry) {
        let path = self.dir.join(&entry.file_name);
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "failed to remove evicted media file");
            }
        }
    }

    /// Write `bytes` under a name derived from `url_hash(url)` plus
    /// `extension`, index it, then sweep. `ttl_days` of `None` means the
    /// entry never expires by TTL (still subject to the byte cap).
    pub fn put(
        &self,
        url: &str,
        bytes: &[u8],
        extension: &str,
        media_type: Option<String>,
        filename: Option<String>,
        ttl_days: Option<u64>,
    ) -> Result<(MediaCacheEntry, PathBuf)> {
        let key = url_hash(url);
        let file_name = if extension.is_empty() { key.clone() } else { format!("{key}.{extension}") };
        let path = self.dir.join(&file_name);
        std::fs::write(&path, bytes)?;

        let now = Self::now_ms();
        let sha256 = if self.verify == VerifyMode::Hash {
            Some(to_hex(&Sha256::digest(bytes)))
        } else {
            None
        };
        let entry = MediaCacheEntry {
            url: url.to_string(),
            file_name,
            size_bytes: bytes.len() as u64,
            sha256,
            media_type,
            filename,
            created_at_ms: now,
            last_access_at_ms: now,
            expires_at_ms: ttl_days.map(|d| now + d as i64 * 86_400_000),
        };

        let mut index = self.index.lock();
        index.entries.insert(key, entry.clone());
        self.sweep(&mut index)?;
        self.persist(&index)?;
        Ok((entry, path))
    }

    /// Look up a cached asset by source URL, verifying it per the
    /// configured `VerifyMode` and touching `last_access_at_ms`. A failed
    /// verification evicts the stale entry and returns `None` rather than
    /// surfacing the corrupted bytes (§4.3.2 scenario 3).
    pub fn get(&self, url: &str) -> Result<Option<(MediaCacheEntry, PathBuf)>> {
        let key = url_hash(url);
        let mut index = self.index.lock();
        self.sweep(&mut index)?;
        let Some(entry) = index.entries.get(&key).cloned() else {
            return Ok(None);
        };
        let path = self.dir.join(&entry.file_name);

        if !self.verify_entry(&entry, &path)? {
            warn!(url, "media cache entry failed verification, evicting");
            self.remove_file(&entry);
            index.entries.remove(&key);
            self.persist(&index)?;
            return Ok(None);
        }

        let mut updated = entry.clone();
        updated.last_access_at_ms = Self::now_ms();
        index.entries.insert(key, updated.clone());
        self.persist(&index)?;
        Ok(Some((updated, path)))
    }

    fn verify_entry(&self, entry: &MediaCacheEntry, path: &Path) -> Result<bool> {
        let Ok(metadata) = std::fs::metadata(path) else {
            return Ok(false);
        };
        match self.verify {
            VerifyMode::None => Ok(true),
            VerifyMode::Size => Ok(metadata.len() == entry.size_bytes),
            VerifyMode::Hash => {
                let Some(expected) = &entry.sha256 else { return Ok(true) };
                let bytes = std::fs::read(path)?;
                Ok(&to_hex(&Sha256::digest(&bytes)) == expected)
            }
        }
    }

    pub fn stats(&self) -> (u64, u64) {
        let index = self.index.lock();
        let total: u64 = index.entries.values().map(|e| e.size_bytes).sum();
        (index.entries.len() as u64, total)
    }

    pub fn clear(&self) -> Result<u64> {
        let mut index = self.index.lock();
        let n = index.entries.len() as u64;
        let entries: Vec<_> = index.entries.drain().map(|(_, v)| v).collect();
        for entry in &entries {
            self.remove_file(entry);
        }
        self.persist(&index)?;
        Ok(n)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}
