//! Per-`slidesDir` mutex table (§4.5 "Locking", §9 "File-scope module
//! caches"): a keyed map of async mutexes protected by one outer
//! `parking_lot::Mutex`, so acquiring a per-directory lock never blocks an
//! unrelated directory's extraction.

use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct SlidesLockTable {
    locks: SyncMutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl SlidesLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `dir`, creating its entry on first use.
    /// Callers that have to wait are, by construction, "queued" (§4.5) —
    /// the caller observes this as the `acquire` future not resolving yet.
    pub async fn acquire(&self, dir: &Path) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock();
            locks.entry(dir.to_path_buf()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
        };
        mutex.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn second_acquire_for_same_dir_waits_for_first_to_release() {
        let table = Arc::new(SlidesLockTable::new());
        let dir = PathBuf::from("/tmp/slides-test");

        let first = table.acquire(&dir).await;
        let table2 = table.clone();
        let dir2 = dir.clone();
        let handle = tokio::spawn(async move {
            let _second = table2.acquire(&dir2).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());
        drop(first);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn different_dirs_do_not_contend() {
        let table = SlidesLockTable::new();
        let a = table.acquire(Path::new("/tmp/a")).await;
        let b = table.acquire(Path::new("/tmp/b")).await;
        drop(a);
        drop(b);
    }
}
