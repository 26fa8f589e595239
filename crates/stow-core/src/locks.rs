//! Per-path async locks.
//!
//! Serializes work on the same cache entry or destination module while
//! letting unrelated paths proceed in parallel.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

type LockMap = HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>;

/// A set of named locks keyed by path. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`.
    pub async fn lock(&self, path: &Path) -> PathGuard {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(path.to_path_buf()).or_default().clone()
        };
        let guard = slot.clone().lock_owned().await;
        PathGuard {
            locks: self.inner.clone(),
            path: path.to_path_buf(),
            slot,
            guard: Some(guard),
        }
    }

    /// Number of paths currently locked or waited on.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held while a path is locked. Dropping it releases the lock.
#[derive(Debug)]
pub struct PathGuard {
    locks: Arc<Mutex<LockMap>>,
    path: PathBuf,
    slot: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one in `self.slot`: nobody else is waiting.
        if Arc::strong_count(&self.slot) == 2 {
            map.remove(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_path_is_exclusive() {
        let locks = PathLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let active = active.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(Path::new("/cache/a.zip")).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_paths_do_not_block() {
        let locks = PathLocks::new();
        let _a = locks.lock(Path::new("/a")).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock(Path::new("/b"))).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
