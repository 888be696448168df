//! Concurrency safety of the emulated lists.
//!
//! N tasks each perform M push/pop pairs on the same list key through
//! the same handle. The per-key mutex must keep pops atomic: no element
//! is observed twice, every pop succeeds, and the list drains to empty.

use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;
use toolbelt_cache::{new_cache, Cache, CacheConfig, DRIVER_MEMORY, DRIVER_SLED};

const TASKS: usize = 8;
const PAIRS: usize = 40;

async fn hammer(cache: Arc<dyn Cache>) {
    let popped = Arc::new(Mutex::new(Vec::with_capacity(TASKS * PAIRS)));

    let mut handles = Vec::new();
    for task in 0..TASKS {
        let cache = Arc::clone(&cache);
        let popped = Arc::clone(&popped);
        handles.push(tokio::spawn(async move {
            for i in 0..PAIRS {
                cache
                    .rpush("contended", &format!("{task}-{i}"))
                    .await
                    .unwrap();
                // The queue holds at least this task's push, so the pop
                // must never see an empty list.
                let value = cache.lpop("contended").await.unwrap();
                popped.lock().await.push(value);
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let popped = popped.lock().await;
    assert_eq!(popped.len(), TASKS * PAIRS);

    let unique: HashSet<&String> = popped.iter().collect();
    assert_eq!(unique.len(), popped.len(), "an element was popped twice");

    assert_eq!(cache.len("contended").await.unwrap(), 0);
    assert!(cache.lpop("contended").await.unwrap_err().is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn memory_push_pop_pairs_never_duplicate() {
    let config = CacheConfig::builder().driver(DRIVER_MEMORY).build();
    let cache: Arc<dyn Cache> = Arc::from(new_cache(config).await.unwrap());
    hammer(cache).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sled_push_pop_pairs_never_duplicate() {
    let temp = TempDir::new().unwrap();
    let config = CacheConfig::builder()
        .driver(DRIVER_SLED)
        .path(temp.path().join("db"))
        .build();
    let cache: Arc<dyn Cache> = Arc::from(new_cache(config).await.unwrap());
    hammer(cache).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disjoint_keys_interleave_freely() {
    let config = CacheConfig::builder().driver(DRIVER_MEMORY).build();
    let cache: Arc<dyn Cache> = Arc::from(new_cache(config).await.unwrap());

    let mut handles = Vec::new();
    for task in 0..TASKS {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            let key = format!("queue-{task}");
            for i in 0..PAIRS {
                cache.rpush(&key, &i.to_string()).await.unwrap();
            }
            for i in 0..PAIRS {
                assert_eq!(cache.lpop(&key).await.unwrap(), i.to_string());
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}
