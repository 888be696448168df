//! List emulation over a plain key/value store.
//!
//! A list `k` is represented by an inclusive head index at `k:head`, an
//! exclusive tail index at `k:tail`, and element keys `k:elem:<i>` for
//! every `head <= i < tail`. The invariants: `head <= tail`, length is
//! `tail - head`, and an empty list has `head == tail`.
//!
//! Mutating operations must run under the per-key mutex supplied by the
//! caller's [`KeyLocks`](crate::locks::KeyLocks); length queries read
//! without it.

use crate::error::{CacheError, Result};
use crate::keys::{elem_key, head_key, tail_key};
use crate::locks::KeyLocks;

/// Minimal scalar surface a backend lends to the emulation. Index and
/// element keys never carry a TTL.
pub(crate) trait RawKv: Send + Sync {
    async fn raw_get(&self, key: &str) -> Result<Option<String>>;
    async fn raw_set(&self, key: &str, value: &str) -> Result<()>;
    async fn raw_delete(&self, key: &str) -> Result<()>;
}

async fn read_index<S: RawKv>(store: &S, key: &str) -> Result<Option<i64>> {
    match store.raw_get(key).await? {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| CacheError::internal(format!("corrupt list index at '{key}': {raw:?}"))),
    }
}

async fn write_index<S: RawKv>(store: &S, key: &str, index: i64) -> Result<()> {
    store.raw_set(key, &index.to_string()).await
}

/// First push to a list: head 0, tail 1, the element at position 0.
async fn init_list<S: RawKv>(store: &S, key: &str, value: &str) -> Result<()> {
    write_index(store, &head_key(key), 0).await?;
    write_index(store, &tail_key(key), 1).await?;
    store.raw_set(&elem_key(key, 0), value).await
}

pub(crate) async fn lpush<S: RawKv>(
    store: &S,
    locks: &KeyLocks,
    key: &str,
    value: &str,
) -> Result<()> {
    let _guard = locks.acquire(key).await;

    match read_index(store, &head_key(key)).await? {
        None => init_list(store, key, value).await,
        Some(head) => {
            let head = head - 1;
            store.raw_set(&elem_key(key, head), value).await?;
            write_index(store, &head_key(key), head).await
        }
    }
}

pub(crate) async fn rpush<S: RawKv>(
    store: &S,
    locks: &KeyLocks,
    key: &str,
    value: &str,
) -> Result<()> {
    let _guard = locks.acquire(key).await;

    match read_index(store, &tail_key(key)).await? {
        None => init_list(store, key, value).await,
        Some(tail) => {
            store.raw_set(&elem_key(key, tail), value).await?;
            write_index(store, &tail_key(key), tail + 1).await
        }
    }
}

pub(crate) async fn lpop<S: RawKv>(store: &S, locks: &KeyLocks, key: &str) -> Result<String> {
    let _guard = locks.acquire(key).await;

    let head = read_index(store, &head_key(key))
        .await?
        .ok_or(CacheError::NotFound)?;
    let tail = read_index(store, &tail_key(key))
        .await?
        .ok_or(CacheError::NotFound)?;
    if head >= tail {
        return Err(CacheError::NotFound);
    }

    let element = elem_key(key, head);
    let value = store
        .raw_get(&element)
        .await?
        .ok_or(CacheError::NotFound)?;
    store.raw_delete(&element).await?;
    write_index(store, &head_key(key), head + 1).await?;
    Ok(value)
}

pub(crate) async fn rpop<S: RawKv>(store: &S, locks: &KeyLocks, key: &str) -> Result<String> {
    let _guard = locks.acquire(key).await;

    let head = read_index(store, &head_key(key))
        .await?
        .ok_or(CacheError::NotFound)?;
    let tail = read_index(store, &tail_key(key))
        .await?
        .ok_or(CacheError::NotFound)?;
    if head >= tail {
        return Err(CacheError::NotFound);
    }

    let tail = tail - 1;
    let element = elem_key(key, tail);
    let value = store
        .raw_get(&element)
        .await?
        .ok_or(CacheError::NotFound)?;
    store.raw_delete(&element).await?;
    write_index(store, &tail_key(key), tail).await?;
    Ok(value)
}

/// Drains the band front to back, deleting the element keys and both
/// index keys. An absent list yields an empty sequence.
pub(crate) async fn pop_all<S: RawKv>(store: &S, locks: &KeyLocks, key: &str) -> Result<Vec<String>> {
    let _guard = locks.acquire(key).await;

    let Some(head) = read_index(store, &head_key(key)).await? else {
        return Ok(Vec::new());
    };
    let Some(tail) = read_index(store, &tail_key(key)).await? else {
        store.raw_delete(&head_key(key)).await?;
        return Ok(Vec::new());
    };

    let mut values = Vec::with_capacity(usize::try_from(tail - head).unwrap_or_default());
    for index in head..tail {
        let element = elem_key(key, index);
        if let Some(value) = store.raw_get(&element).await? {
            values.push(value);
        }
        store.raw_delete(&element).await?;
    }

    store.raw_delete(&head_key(key)).await?;
    store.raw_delete(&tail_key(key)).await?;
    Ok(values)
}

/// `tail - head`, or 0 for an absent list. Reads without the per-key
/// mutex.
pub(crate) async fn len<S: RawKv>(store: &S, key: &str) -> Result<i64> {
    let Some(head) = read_index(store, &head_key(key)).await? else {
        return Ok(0);
    };
    let Some(tail) = read_index(store, &tail_key(key)).await? else {
        return Ok(0);
    };
    Ok(tail - head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// In-memory RawKv double for exercising the algorithms alone.
    #[derive(Default)]
    struct MapKv {
        map: Mutex<HashMap<String, String>>,
    }

    impl RawKv for MapKv {
        async fn raw_get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.map.lock().await.get(key).cloned())
        }

        async fn raw_set(&self, key: &str, value: &str) -> Result<()> {
            self.map
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn raw_delete(&self, key: &str) -> Result<()> {
            self.map.lock().await.remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let store = MapKv::default();
        let locks = KeyLocks::new();

        for value in ["1", "2", "3"] {
            rpush(&store, &locks, "q", value).await.unwrap();
        }
        assert_eq!(len(&store, "q").await.unwrap(), 3);
        assert_eq!(lpop(&store, &locks, "q").await.unwrap(), "1");
        assert_eq!(lpop(&store, &locks, "q").await.unwrap(), "2");
        assert_eq!(lpop(&store, &locks, "q").await.unwrap(), "3");
        assert!(lpop(&store, &locks, "q").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_lpush_grows_leftwards() {
        let store = MapKv::default();
        let locks = KeyLocks::new();

        lpush(&store, &locks, "q", "1").await.unwrap();
        lpush(&store, &locks, "q", "2").await.unwrap();
        assert_eq!(lpop(&store, &locks, "q").await.unwrap(), "2");
        assert_eq!(rpop(&store, &locks, "q").await.unwrap(), "1");
    }

    #[tokio::test]
    async fn test_negative_indices_from_lpush() {
        let store = MapKv::default();
        let locks = KeyLocks::new();

        rpush(&store, &locks, "q", "mid").await.unwrap();
        lpush(&store, &locks, "q", "left").await.unwrap();

        // head moved to -1 and the element band follows it.
        let map = store.map.lock().await;
        assert_eq!(map.get("q:head").map(String::as_str), Some("-1"));
        assert_eq!(map.get("q:elem:-1").map(String::as_str), Some("left"));
        assert_eq!(map.get("q:elem:0").map(String::as_str), Some("mid"));
    }

    #[tokio::test]
    async fn test_pop_all_resets_everything() {
        let store = MapKv::default();
        let locks = KeyLocks::new();

        for value in ["a", "b", "c"] {
            rpush(&store, &locks, "q", value).await.unwrap();
        }
        assert_eq!(pop_all(&store, &locks, "q").await.unwrap(), ["a", "b", "c"]);
        assert_eq!(len(&store, "q").await.unwrap(), 0);
        assert!(store.map.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_pop_all_on_absent_list_is_empty() {
        let store = MapKv::default();
        let locks = KeyLocks::new();
        assert!(pop_all(&store, &locks, "nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_list_keeps_indices_until_pop_all() {
        let store = MapKv::default();
        let locks = KeyLocks::new();

        rpush(&store, &locks, "q", "only").await.unwrap();
        lpop(&store, &locks, "q").await.unwrap();

        // head == tail marks the list empty; the index keys survive.
        assert_eq!(len(&store, "q").await.unwrap(), 0);
        let map = store.map.lock().await;
        assert_eq!(map.get("q:head"), map.get("q:tail"));
        assert!(map.get("q:head").is_some());
    }

    #[tokio::test]
    async fn test_corrupt_index_is_internal_error() {
        let store = MapKv::default();
        let locks = KeyLocks::new();
        store.raw_set("q:head", "not-a-number").await.unwrap();

        let err = lpop(&store, &locks, "q").await.unwrap_err();
        assert!(matches!(err, CacheError::Internal { .. }));
    }
}
