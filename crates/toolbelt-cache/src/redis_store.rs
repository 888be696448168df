//! Network backend on Redis.
//!
//! Redis covers scalars, hashes and lists natively, so nothing is
//! emulated. Transactions are an atomic pipeline: commit executes the
//! batch, rollback discards it.

use crate::cache::{Cache, Transaction};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;

fn ttl_millis(ttl: Duration) -> u64 {
    ttl.as_millis() as u64
}

/// Builds the connection URL out of the configured fields.
fn connection_url(config: &CacheConfig) -> Result<String> {
    if config.host.is_empty() {
        return Err(CacheError::InvalidArgument(
            "redis driver requires a host".to_string(),
        ));
    }
    let auth = config
        .password
        .as_deref()
        .map(|password| format!(":{password}@"))
        .unwrap_or_default();
    Ok(format!(
        "redis://{auth}{}:{}/{}",
        config.host, config.port, config.db
    ))
}

/// Redis-backed cache over a multiplexed, reconnecting connection.
pub(crate) struct RedisStore {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects to the configured server.
    pub(crate) async fn open(config: &CacheConfig) -> Result<Self> {
        let client = redis::Client::open(connection_url(config)?)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisStore {
    async fn get(&self, key: &str) -> Result<String> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        value.ok_or(CacheError::NotFound)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        if ttl.is_zero() {
            let _: () = conn.set(key, value).await?;
        } else {
            let _: () = conn.pset_ex(key, value, ttl_millis(ttl)).await?;
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(key).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let applied: bool = conn.pexpire(key, ttl_millis(ttl) as i64).await?;
        if applied {
            Ok(())
        } else {
            Err(CacheError::NotFound)
        }
    }

    async fn hget(&self, key: &str, field: &str) -> Result<String> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.hget(key, field).await?;
        value.ok_or(CacheError::NotFound)
    }

    async fn hset(&self, key: &str, field: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(key, field, value).await?;
        // TTL is per key, not per field, matching the local backends.
        if !ttl.is_zero() {
            let _: bool = conn.pexpire(key, ttl_millis(ttl) as i64).await?;
        }
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.hdel(key, field).await?;
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        Ok(conn.hgetall(key).await?)
    }

    async fn lpush(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.lpush(key, value).await?;
        Ok(())
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.rpush(key, value).await?;
        Ok(())
    }

    async fn lpop(&self, key: &str) -> Result<String> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.lpop(key, None).await?;
        value.ok_or(CacheError::NotFound)
    }

    async fn rpop(&self, key: &str) -> Result<String> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.rpop(key, None).await?;
        value.ok_or(CacheError::NotFound)
    }

    async fn pop_all(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        // Range and delete inside one atomic batch so no element is
        // observed twice or lost.
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.lrange(key, 0, -1);
        pipe.del(key).ignore();
        let (values,): (Vec<String>,) = pipe.query_async(&mut conn).await?;
        Ok(values)
    }

    async fn len(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(key).await?)
    }

    async fn begin_tx(&self) -> Result<Box<dyn Transaction>> {
        let mut pipe = redis::Pipeline::new();
        pipe.atomic();
        Ok(Box::new(RedisTx {
            conn: self.conn.clone(),
            pipe,
        }))
    }

    async fn close(&self) {
        // The multiplexed connection closes when the last clone drops.
    }
}

/// Pipelined batch: nothing reaches the server before commit.
struct RedisTx {
    conn: ConnectionManager,
    pipe: redis::Pipeline,
}

#[async_trait]
impl Transaction for RedisTx {
    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            self.pipe.set(key, value).ignore();
        } else {
            self.pipe.pset_ex(key, value, ttl_millis(ttl)).ignore();
        }
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.pipe.del(key).ignore();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let Self { mut conn, pipe } = *self;
        let _: () = pipe.query_async(&mut conn).await?;
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
    fn test_connection_url_without_password() {
        let config = CacheConfig::builder()
            .driver("redis")
            .host("localhost")
            .port(6379)
            .build();
        assert_eq!(connection_url(&config).unwrap(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_connection_url_with_password_and_db() {
        let config = CacheConfig::builder()
            .driver("redis")
            .host("cache.internal")
            .port(6380)
            .password("hunter2")
            .db(5)
            .build();
        assert_eq!(
            connection_url(&config).unwrap(),
            "redis://:hunter2@cache.internal:6380/5"
        );
    }

    #[test]
    fn test_missing_host_rejected() {
        let config = CacheConfig::builder().driver("redis").build();
        let err = connection_url(&config).unwrap_err();
        assert!(matches!(err, CacheError::InvalidArgument(_)));
    }
}
