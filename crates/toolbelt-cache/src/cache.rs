//! The cache contract every backend implements.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// One buffered transaction operation.
#[derive(Debug, Clone)]
pub(crate) enum TxOp {
    Set {
        key: String,
        value: String,
        expires_at: Option<SystemTime>,
    },
    Delete {
        key: String,
    },
}

impl TxOp {
    pub(crate) fn set(key: &str, value: &str, ttl: Duration) -> Self {
        Self::Set {
            key: key.to_string(),
            value: value.to_string(),
            expires_at: expiry_from_ttl(ttl),
        }
    }

    pub(crate) fn delete(key: &str) -> Self {
        Self::Delete {
            key: key.to_string(),
        }
    }
}

/// Converts a TTL into an absolute expiry. Zero means no expiry.
pub(crate) fn expiry_from_ttl(ttl: Duration) -> Option<SystemTime> {
    if ttl.is_zero() {
        None
    } else {
        Some(SystemTime::now() + ttl)
    }
}

/// A scoped sequence of writes that commits atomically or discards.
///
/// Local backends hold an exclusive write latch while a transaction is
/// open; the network backend buffers the operations as a pipelined batch
/// and sends nothing until commit.
#[async_trait]
pub trait Transaction: Send {
    /// Buffers a set, with `ttl` of zero meaning no expiry.
    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Buffers a delete.
    fn delete(&mut self, key: &str) -> Result<()>;

    /// Applies every buffered operation atomically.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every buffered operation.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Uniform key/value, hash and list contract over a cache backend.
///
/// All implementations honour the same cross-backend invariants:
///
/// - A missing key, hash field or list is the shared
///   [`NotFound`](crate::CacheError::NotFound) kind, whatever the
///   backend natively reports.
/// - Operations on a single key through a single handle are
///   sequentially consistent.
/// - List push/pop pairs are atomic per key: two concurrent `lpop`s on
///   the same key through the same handle never return the same
///   element.
///
/// Keys and values are opaque strings. On the local backends, hash
/// fields live under composite `key:field` keys and lists under
/// `key:head`, `key:tail` and `key:elem:<n>` index keys, so callers
/// should avoid colons inside hash keys and fields and must not write
/// scalar keys that collide with those patterns.
#[async_trait]
pub trait Cache: Send + Sync + std::fmt::Debug {
    /// Fetches the value of `key`.
    async fn get(&self, key: &str) -> Result<String>;

    /// Stores `value` under `key`. A `ttl` of zero means no expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Reports whether `key` exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Replaces the expiry of an existing key.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](crate::CacheError::NotFound) when the key
    /// does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Fetches one hash field.
    async fn hget(&self, key: &str, field: &str) -> Result<String>;

    /// Stores one hash field. A positive `ttl` applies to the whole
    /// key, matching the per-key TTL model of the local backends.
    async fn hset(&self, key: &str, field: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Removes one hash field.
    async fn hdel(&self, key: &str, field: &str) -> Result<()>;

    /// Fetches every field and value of a hash. An absent hash yields
    /// an empty mapping.
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Pushes `value` onto the front of the list.
    async fn lpush(&self, key: &str, value: &str) -> Result<()>;

    /// Pushes `value` onto the back of the list.
    async fn rpush(&self, key: &str, value: &str) -> Result<()>;

    /// Pops the front element.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](crate::CacheError::NotFound) when the list
    /// is empty or absent.
    async fn lpop(&self, key: &str) -> Result<String>;

    /// Pops the back element.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](crate::CacheError::NotFound) when the list
    /// is empty or absent.
    async fn rpop(&self, key: &str) -> Result<String>;

    /// Drains the whole list front to back. An empty or absent list
    /// yields an empty sequence, not an error.
    async fn pop_all(&self, key: &str) -> Result<Vec<String>>;

    /// Length of the list; 0 for an absent list.
    async fn len(&self, key: &str) -> Result<i64>;

    /// Alias for [`rpush`](Self::rpush).
    async fn push(&self, key: &str, value: &str) -> Result<()> {
        self.rpush(key, value).await
    }

    /// Alias for [`lpop`](Self::lpop).
    async fn pop(&self, key: &str) -> Result<String> {
        self.lpop(key).await
    }

    /// Opens a transaction.
    async fn begin_tx(&self) -> Result<Box<dyn Transaction>>;

    /// Releases backend resources. Idempotent and infallible.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_from_zero_ttl_is_none() {
        assert!(expiry_from_ttl(Duration::ZERO).is_none());
    }

    #[test]
    fn test_expiry_from_positive_ttl_is_in_the_future() {
        let expiry = expiry_from_ttl(Duration::from_secs(60)).unwrap();
        assert!(expiry > SystemTime::now());
    }

    #[test]
    fn test_txop_set_carries_expiry() {
        match TxOp::set("k", "v", Duration::from_secs(1)) {
            TxOp::Set { key, value, expires_at } => {
                assert_eq!(key, "k");
                assert_eq!(value, "v");
                assert!(expires_at.is_some());
            }
            TxOp::Delete { .. } => panic!("expected a set"),
        }
    }
}
