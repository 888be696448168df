//! Uniform key/value, hash and list cache facade over pluggable
//! backends.
//!
//! Three drivers register out of the box: `redis` (network), `sled`
//! (local log-structured) and `memory` (local in-memory with optional
//! journal persistence). All of them honour one behavioral contract,
//! including list/queue and hash semantics that the local engines do
//! not provide natively; see [`Cache`] for the invariants.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use toolbelt_cache::{new_cache, CacheConfig, DRIVER_MEMORY};
//!
//! # async fn example() -> toolbelt_cache::Result<()> {
//! let cache = new_cache(CacheConfig::builder().driver(DRIVER_MEMORY).build()).await?;
//!
//! cache.set("user:1", "alice", Duration::ZERO).await?;
//! assert_eq!(cache.get("user:1").await?, "alice");
//!
//! cache.rpush("jobs", "first").await?;
//! cache.rpush("jobs", "second").await?;
//! assert_eq!(cache.lpop("jobs").await?, "first");
//!
//! let tx = {
//!     let mut tx = cache.begin_tx().await?;
//!     tx.set("a", "1", Duration::ZERO)?;
//!     tx.set("b", "2", Duration::ZERO)?;
//!     tx
//! };
//! tx.commit().await?;
//!
//! cache.close().await;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod cache;
mod config;
mod emu;
mod error;
mod keys;
mod locks;
mod memory;
mod redis_store;
mod registry;
mod sled_store;

pub use cache::{Cache, Transaction};
pub use config::{CacheConfig, CacheConfigBuilder, DRIVER_MEMORY, DRIVER_REDIS, DRIVER_SLED};
pub use error::{CacheError, Result};
pub use registry::{new_cache, register_driver, registered_drivers, DriverFactory};
