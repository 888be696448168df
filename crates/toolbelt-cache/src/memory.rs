//! Local in-memory backend with optional journal persistence.
//!
//! State lives in an ordered map, which doubles as the native prefix
//! iterator for hash enumeration. When the configuration carries a
//! path, every committed write is appended to a JSON-lines journal that
//! is replayed on open, so the store survives restarts. Expiry is
//! absolute wall-clock time, which keeps replayed entries honest.

use crate::cache::{expiry_from_ttl, Cache, Transaction, TxOp};
use crate::config::CacheConfig;
use crate::emu::{self, RawKv};
use crate::error::{CacheError, Result};
use crate::keys::{composite_key, hash_prefix};
use crate::locks::KeyLocks;
use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<SystemTime>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= SystemTime::now())
    }
}

/// One line of the persistence journal.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JournalRecord {
    Set {
        key: String,
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expires_at_ms: Option<u64>,
    },
    Delete {
        key: String,
    },
}

fn to_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

fn from_millis(millis: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis)
}

#[derive(Debug)]
struct Inner {
    map: RwLock<BTreeMap<String, Entry>>,
    journal: Option<SyncMutex<BufWriter<File>>>,
    locks: KeyLocks,
    tx_latch: Arc<AsyncMutex<()>>,
}

impl Inner {
    /// Appends one record to the journal, if persistence is on.
    fn journal_append(&self, record: &JournalRecord) -> Result<()> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        let line = serde_json::to_string(record)
            .map_err(|err| CacheError::backend("journal record did not serialize", err))?;
        let mut writer = journal.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Applies a write to the map and mirrors it into the journal.
    /// Callers hold the map's write lock.
    fn apply(
        &self,
        map: &mut BTreeMap<String, Entry>,
        key: &str,
        value: &str,
        expires_at: Option<SystemTime>,
    ) -> Result<()> {
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        self.journal_append(&JournalRecord::Set {
            key: key.to_string(),
            value: value.to_string(),
            expires_at_ms: expires_at.map(to_millis),
        })
    }

    fn remove(&self, map: &mut BTreeMap<String, Entry>, key: &str) -> Result<()> {
        map.remove(key);
        self.journal_append(&JournalRecord::Delete {
            key: key.to_string(),
        })
    }
}

/// In-memory cache with optional journal persistence.
#[derive(Debug)]
pub(crate) struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Opens the store, replaying the journal when `config.path` is set.
    pub(crate) fn open(config: &CacheConfig) -> Result<Self> {
        let mut map = BTreeMap::new();
        let journal = match &config.path {
            None => None,
            Some(path) => {
                replay_journal(path, &mut map)?;
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(SyncMutex::new(BufWriter::new(file)))
            }
        };

        Ok(Self {
            inner: Arc::new(Inner {
                map: RwLock::new(map),
                journal,
                locks: KeyLocks::new(),
                tx_latch: Arc::new(AsyncMutex::new(())),
            }),
        })
    }

    async fn live_get(&self, key: &str) -> Option<String> {
        let map = self.inner.map.read().await;
        map.get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone())
    }
}

fn replay_journal(path: &Path, map: &mut BTreeMap<String, Entry>) -> Result<()> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let record: JournalRecord = serde_json::from_str(&line)
            .map_err(|err| CacheError::backend("corrupt journal line", err))?;
        match record {
            JournalRecord::Set {
                key,
                value,
                expires_at_ms,
            } => {
                map.insert(
                    key,
                    Entry {
                        value,
                        expires_at: expires_at_ms.map(from_millis),
                    },
                );
            }
            JournalRecord::Delete { key } => {
                map.remove(&key);
            }
        }
    }
    Ok(())
}

impl RawKv for MemoryStore {
    async fn raw_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.live_get(key).await)
    }

    async fn raw_set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.inner.map.write().await;
        self.inner.apply(&mut map, key, value, None)
    }

    async fn raw_delete(&self, key: &str) -> Result<()> {
        let mut map = self.inner.map.write().await;
        self.inner.remove(&mut map, key)
    }
}

#[async_trait]
impl Cache for MemoryStore {
    async fn get(&self, key: &str) -> Result<String> {
        self.live_get(key).await.ok_or(CacheError::NotFound)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut map = self.inner.map.write().await;
        self.inner.apply(&mut map, key, value, expiry_from_ttl(ttl))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut map = self.inner.map.write().await;
        self.inner.remove(&mut map, key)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_get(key).await.is_some())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut map = self.inner.map.write().await;
        let value = match map.get(key) {
            Some(entry) if !entry.is_expired() => entry.value.clone(),
            _ => return Err(CacheError::NotFound),
        };
        self.inner.apply(&mut map, key, &value, expiry_from_ttl(ttl))
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
        let map = self.inner.map.read().await;

        let mut fields = HashMap::new();
        for (full, entry) in map.range(prefix.clone()..) {
            if !full.starts_with(&prefix) {
                break;
            }
            if entry.is_expired() {
                continue;
            }
            fields.insert(full[prefix.len()..].to_string(), entry.value.clone());
        }
        Ok(fields)
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        emu::lpush(self, &self.inner.locks, key, value).await
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        emu::rpush(self, &self.inner.locks, key, value).await
    }

    async fn lpop(&self, key: &str) -> Result<String> {
        emu::lpop(self, &self.inner.locks, key).await
    }

    async fn rpop(&self, key: &str) -> Result<String> {
        emu::rpop(self, &self.inner.locks, key).await
    }

    async fn pop_all(&self, key: &str) -> Result<Vec<String>> {
        emu::pop_all(self, &self.inner.locks, key).await
    }

    async fn len(&self, key: &str) -> Result<i64> {
        emu::len(self, key).await
    }

    async fn begin_tx(&self) -> Result<Box<dyn Transaction>> {
        let latch = Arc::clone(&self.inner.tx_latch).lock_owned().await;
        Ok(Box::new(MemoryTx {
            inner: Arc::clone(&self.inner),
            ops: Vec::new(),
            _latch: latch,
        }))
    }

    async fn close(&self) {
        if let Some(journal) = &self.inner.journal {
            let _ = journal.lock().flush();
        }
    }
}

/// Buffered transaction applied under the map's write lock on commit.
struct MemoryTx {
    inner: Arc<Inner>,
    ops: Vec<TxOp>,
    _latch: OwnedMutexGuard<()>,
}

#[async_trait]
impl Transaction for MemoryTx {
    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.ops.push(TxOp::set(key, value, ttl));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.ops.push(TxOp::delete(key));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut map = self.inner.map.write().await;
        for op in &self.ops {
            match op {
                TxOp::Set {
                    key,
                    value,
                    expires_at,
                } => self.inner.apply(&mut map, key, value, *expires_at)?,
                TxOp::Delete { key } => self.inner.remove(&mut map, key)?,
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_record_shapes() {
        let record = JournalRecord::Set {
            key: "k".to_string(),
            value: "v".to_string(),
            expires_at_ms: None,
        };
        let line = serde_json::to_string(&record).unwrap();
        assert_eq!(line, r#"{"op":"set","key":"k","value":"v"}"#);

        let back: JournalRecord = serde_json::from_str(&line).unwrap();
        assert!(matches!(back, JournalRecord::Set { .. }));
    }

    #[test]
    fn test_entry_expiry() {
        let live = Entry {
            value: "x".to_string(),
            expires_at: Some(SystemTime::now() + Duration::from_secs(60)),
        };
        assert!(!live.is_expired());

        let dead = Entry {
            value: "x".to_string(),
            expires_at: Some(SystemTime::now() - Duration::from_secs(1)),
        };
        assert!(dead.is_expired());

        let immortal = Entry {
            value: "x".to_string(),
            expires_at: None,
        };
        assert!(!immortal.is_expired());
    }

    #[tokio::test]
    async fn test_replay_applies_sets_and_deletes() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("cache.journal");
        std::fs::write(
            &path,
            concat!(
                r#"{"op":"set","key":"a","value":"1"}"#,
                "\n",
                r#"{"op":"set","key":"b","value":"2"}"#,
                "\n",
                r#"{"op":"delete","key":"a"}"#,
                "\n",
            ),
        )
        .unwrap();

        let config = CacheConfig::builder().driver("memory").path(&path).build();
        let store = MemoryStore::open(&config).unwrap();

        assert!(store.get("a").await.unwrap_err().is_not_found());
        assert_eq!(store.get("b").await.unwrap(), "2");
    }

    #[tokio::test]
    async fn test_corrupt_journal_is_internal_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("cache.journal");
        std::fs::write(&path, "{oops\n").unwrap();

        let config = CacheConfig::builder().driver("memory").path(&path).build();
        let err = MemoryStore::open(&config).unwrap_err();
        assert!(matches!(err, CacheError::Internal { .. }));
    }
}
