//! Local log-structured backend on sled.
//!
//! sled has no native TTL, so every value carries an 8-byte big-endian
//! expiry envelope (milliseconds since the epoch, 0 for none). Reads
//! treat an expired entry as missing and lazily delete it. Hash fields
//! use composite keys with a prefix scan for enumeration; lists use the
//! shared head/tail emulation.

use crate::cache::{expiry_from_ttl, Cache, Transaction, TxOp};
use crate::config::CacheConfig;
use crate::emu::{self, RawKv};
use crate::error::{CacheError, Result};
use crate::keys::{composite_key, hash_prefix};
use crate::locks::KeyLocks;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, OwnedMutexGuard};

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn expiry_millis(expires_at: Option<SystemTime>) -> u64 {
    expires_at.map_or(0, |at| {
        at.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    })
}

fn encode_value(value: &str, expires_at: Option<SystemTime>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8 + value.len());
    buf.extend_from_slice(&expiry_millis(expires_at).to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
    buf
}

/// Splits the expiry envelope off a stored value.
fn decode_value(bytes: &[u8]) -> Result<(u64, String)> {
    if bytes.len() < 8 {
        return Err(CacheError::internal("stored value shorter than its envelope"));
    }
    let millis = u64::from_be_bytes(bytes[..8].try_into().expect("checked length"));
    let value = std::str::from_utf8(&bytes[8..])
        .map_err(|_| CacheError::internal("stored value is not valid UTF-8"))?
        .to_string();
    Ok((millis, value))
}

fn is_expired(millis: u64) -> bool {
    millis != 0 && millis <= now_millis()
}

/// sled-backed cache.
#[derive(Debug)]
pub(crate) struct SledStore {
    db: sled::Db,
    locks: KeyLocks,
    tx_latch: Arc<Mutex<()>>,
}

impl SledStore {
    /// Opens (or creates) the store at `config.path`.
    pub(crate) fn open(config: &CacheConfig) -> Result<Self> {
        let path = config.path.as_ref().ok_or_else(|| {
            CacheError::InvalidArgument("sled driver requires a path".to_string())
        })?;
        let db = sled::open(path)?;
        Ok(Self {
            db,
            locks: KeyLocks::new(),
            tx_latch: Arc::new(Mutex::new(())),
        })
    }

    /// Fetches a live value, lazily deleting an expired entry.
    fn live_get(&self, key: &str) -> Result<Option<String>> {
        let Some(bytes) = self.db.get(key)? else {
            return Ok(None);
        };
        let (expiry, value) = decode_value(&bytes)?;
        if is_expired(expiry) {
            self.db.remove(key)?;
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn put(&self, key: &str, value: &str, expires_at: Option<SystemTime>) -> Result<()> {
        self.db.insert(key, encode_value(value, expires_at))?;
        Ok(())
    }
}

impl RawKv for SledStore {
    async fn raw_get(&self, key: &str) -> Result<Option<String>> {
        self.live_get(key)
    }

    async fn raw_set(&self, key: &str, value: &str) -> Result<()> {
        self.put(key, value, None)
    }

    async fn raw_delete(&self, key: &str) -> Result<()> {
        self.db.remove(key)?;
        Ok(())
    }
}

#[async_trait]
impl Cache for SledStore {
    async fn get(&self, key: &str) -> Result<String> {
        self.live_get(key)?.ok_or(CacheError::NotFound)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.put(key, value, expiry_from_ttl(ttl))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.db.remove(key)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_get(key)?.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let value = self.live_get(key)?.ok_or(CacheError::NotFound)?;
        self.put(key, &value, expiry_from_ttl(ttl))
    }

    async fn hget(&self, key: &str, field: &str) -> Result<String> {
        self.get(&composite_key(key, field)).await
    }

    async fn hset(&self, key: &str, field: &str, value: &str, ttl: Duration) -> Result<()> {
        self.set(&composite_key(key, field), value, ttl).await
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        self.delete(&composite_key(key, field)).await
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let prefix = hash_prefix(key);
        let mut fields = HashMap::new();

        for entry in self.db.scan_prefix(prefix.as_bytes()) {
            let (raw_key, raw_value) = entry?;
            let (expiry, value) = decode_value(&raw_value)?;
            if is_expired(expiry) {
                self.db.remove(&raw_key)?;
                continue;
            }
            let full = std::str::from_utf8(&raw_key)
                .map_err(|_| CacheError::internal("stored key is not valid UTF-8"))?;
            fields.insert(full[prefix.len()..].to_string(), value);
        }

        Ok(fields)
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        emu::lpush(self, &self.locks, key, value).await
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        emu::rpush(self, &self.locks, key, value).await
    }

    async fn lpop(&self, key: &str) -> Result<String> {
        emu::lpop(self, &self.locks, key).await
    }

    async fn rpop(&self, key: &str) -> Result<String> {
        emu::rpop(self, &self.locks, key).await
    }

    async fn pop_all(&self, key: &str) -> Result<Vec<String>> {
        emu::pop_all(self, &self.locks, key).await
    }

    async fn len(&self, key: &str) -> Result<i64> {
        emu::len(self, key).await
    }

    async fn begin_tx(&self) -> Result<Box<dyn Transaction>> {
        let guard = Arc::clone(&self.tx_latch).lock_owned().await;
        Ok(Box::new(SledTx {
            db: self.db.clone(),
            ops: Vec::new(),
            _latch: guard,
        }))
    }

    async fn close(&self) {
        let _ = self.db.flush();
    }
}

/// Buffered transaction applied as one sled batch on commit.
///
/// The latch keeps write intent exclusive for the transaction's
/// lifetime; dropping the transaction releases it.
struct SledTx {
    db: sled::Db,
    ops: Vec<TxOp>,
    _latch: OwnedMutexGuard<()>,
}

#[async_trait]
impl Transaction for SledTx {
    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.ops.push(TxOp::set(key, value, ttl));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.ops.push(TxOp::delete(key));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut batch = sled::Batch::default();
        for op in &self.ops {
            match op {
                TxOp::Set {
                    key,
                    value,
                    expires_at,
                } => batch.insert(key.as_bytes(), encode_value(value, *expires_at)),
                TxOp::Delete { key } => batch.remove(key.as_bytes()),
            }
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
