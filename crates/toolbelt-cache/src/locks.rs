//! Per-key mutexes for the list emulations.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily populated map of per-key mutexes.
///
/// The map only ever grows: entries are inserted on first use and never
/// garbage-collected, which is acceptable for the bounded list-key
/// alphabets this library is deployed with.
#[derive(Debug, Default)]
pub(crate) struct KeyLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquires the mutex for `key`, holding it until the guard drops.
    pub(crate) async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock();
            Arc::clone(
                map.entry(key.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = Arc::new(KeyLocks::new());
        let counter = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("k").await;
                let seen = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
                counter.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
                seen
            }));
        }

        for handle in handles {
            // Nobody else was inside the critical section.
            assert_eq!(handle.await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _a = locks.acquire("a").await;
        // Must not deadlock.
        let _b = locks.acquire("b").await;
    }
}
