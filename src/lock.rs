//! Named mutexes for read-modify-write on shared parent resources.
//!
//! Several resources can edit one parent object (a CDN's route list, a
//! queue's policy set). Handlers for the same parent must not interleave
//! their read and write, so they take the parent's key first:
//!
//! ```
//! use std::sync::Arc;
//! use sakura_provider_core::lock::KeyedLock;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let locks = Arc::new(KeyedLock::new());
//! let _guard = locks.lock("cdn/123").await;
//! // read the parent, modify, write back
//! # }
//! ```
//!
//! Entries are created on first use and never evicted; the key space is
//! bounded by the parents one process touches.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// A table of mutexes keyed by string.
#[derive(Debug, Default)]
pub struct KeyedLock {
    entries: DashMap<String, Arc<Mutex<()>>>,
}

/// Holds a key's mutex. Dropping it releases the key.
#[derive(Debug)]
pub struct KeyedLockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl KeyedLockGuard {
    /// The key this guard holds.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl KeyedLock {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyedLockGuard {
        let mutex = self.entry(key);
        trace!(key, "waiting for lock");
        let guard = mutex.lock_owned().await;
        trace!(key, "lock acquired");
        KeyedLockGuard {
            key: key.to_string(),
            _guard: guard,
        }
    }

    /// Run `f` while holding `key`.
    pub async fn with_lock<F, Fut, T>(&self, key: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.lock(key).await;
        f().await
    }

    /// Number of keys ever locked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no key has been locked yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // The shard guard is released before the caller awaits the mutex.
    fn entry(&self, key: &str) -> Arc<Mutex<()>> {
        if let Some(existing) = self.entries.get(key) {
            return Arc::clone(existing.value());
        }
        Arc::clone(
            self.entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, Instant};
    use tokio_test::{assert_pending, assert_ready};

    #[tokio::test(start_paused = true)]
    async fn test_same_key_serializes() {
        let locks = Arc::new(KeyedLock::new());
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let mut tasks = Vec::new();
        for id in 0..3 {
            let locks = Arc::clone(&locks);
            let log = Arc::clone(&log);
            tasks.push(tokio::spawn(async move {
                locks
                    .with_lock("cdn/1", || async {
                        log.lock().unwrap().push(format!("enter {}", id));
                        sleep(Duration::from_secs(1)).await;
                        log.lock().unwrap().push(format!("exit {}", id));
                    })
                    .await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 6);
        for pair in log.chunks(2) {
            let entered = pair[0].strip_prefix("enter ").unwrap();
            let exited = pair[1].strip_prefix("exit ").unwrap();
            assert_eq!(entered, exited);
        }
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_run_concurrently() {
        let locks = Arc::new(KeyedLock::new());
        let start = Instant::now();

        let a = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                locks
                    .with_lock("cdn/1", || sleep(Duration::from_secs(10)))
                    .await
            })
        };
        let b = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                locks
                    .with_lock("cdn/2", || sleep(Duration::from_secs(10)))
                    .await
            })
        };
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_guard_drop_releases_key() {
        let locks = KeyedLock::new();
        let guard = locks.lock("queue/7").await;
        assert_eq!(guard.key(), "queue/7");

        let mut second = tokio_test::task::spawn(locks.lock("queue/7"));
        assert_pending!(second.poll());

        drop(guard);
        assert!(second.is_woken());
        let second = assert_ready!(second.poll());
        assert_eq!(second.key(), "queue/7");
    }

    #[tokio::test]
    async fn test_entries_are_kept() {
        let locks = KeyedLock::new();
        assert!(locks.is_empty());
        drop(locks.lock("a").await);
        drop(locks.lock("b").await);
        drop(locks.lock("a").await);
        assert_eq!(locks.len(), 2);
    }
}
