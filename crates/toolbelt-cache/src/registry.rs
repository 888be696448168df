//! Driver registry and the cache factory.

use crate::cache::Cache;
use crate::config::{CacheConfig, DRIVER_MEMORY, DRIVER_REDIS, DRIVER_SLED};
use crate::error::{CacheError, Result};
use crate::memory::MemoryStore;
use crate::redis_store::RedisStore;
use crate::sled_store::SledStore;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Once, OnceLock};
use tracing::debug;

/// Constructor registered for one driver tag.
pub type DriverFactory =
    Arc<dyn Fn(CacheConfig) -> BoxFuture<'static, Result<Box<dyn Cache>>> + Send + Sync>;

static REGISTRY: OnceLock<RwLock<HashMap<String, DriverFactory>>> = OnceLock::new();
static BUILTINS: Once = Once::new();

fn registry() -> &'static RwLock<HashMap<String, DriverFactory>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn ensure_builtin_drivers() {
    BUILTINS.call_once(|| {
        register_driver(DRIVER_SLED, |config| {
            Box::pin(async move { SledStore::open(&config).map(|s| Box::new(s) as Box<dyn Cache>) })
        });
        register_driver(DRIVER_MEMORY, |config| {
            Box::pin(
                async move { MemoryStore::open(&config).map(|s| Box::new(s) as Box<dyn Cache>) },
            )
        });
        register_driver(DRIVER_REDIS, |config| {
            Box::pin(async move {
                RedisStore::open(&config)
                    .await
                    .map(|s| Box::new(s) as Box<dyn Cache>)
            })
        });
    });
}

/// Registers a driver constructor under `name`.
///
/// The built-in drivers register themselves on first use; this entry
/// point exists for additional drivers. Registering an existing name
/// replaces it.
pub fn register_driver<F>(name: impl Into<String>, factory: F)
where
    F: Fn(CacheConfig) -> BoxFuture<'static, Result<Box<dyn Cache>>> + Send + Sync + 'static,
{
    let name = name.into();
    debug!(driver = %name, "registering cache driver");
    registry().write().insert(name, Arc::new(factory));
}

/// Lists the registered driver tags, sorted.
pub fn registered_drivers() -> Vec<String> {
    ensure_builtin_drivers();
    let mut drivers: Vec<String> = registry().read().keys().cloned().collect();
    drivers.sort();
    drivers
}

/// Builds a cache from its configuration.
///
/// # Errors
///
/// Returns [`CacheError::DriverNotSpecified`] for an empty driver tag,
/// [`CacheError::UnsupportedDriver`] for an unregistered one, and
/// whatever the driver's constructor reports.
///
/// # Examples
///
/// ```
/// use toolbelt_cache::{new_cache, CacheConfig, DRIVER_MEMORY};
///
/// # async fn example() -> toolbelt_cache::Result<()> {
/// let cache = new_cache(CacheConfig::builder().driver(DRIVER_MEMORY).build()).await?;
/// cache.set("greeting", "hello", std::time::Duration::ZERO).await?;
/// assert_eq!(cache.get("greeting").await?, "hello");
/// # Ok(())
/// # }
/// ```
pub async fn new_cache(config: CacheConfig) -> Result<Box<dyn Cache>> {
    ensure_builtin_drivers();

    if config.driver.is_empty() {
        return Err(CacheError::DriverNotSpecified);
    }

    let factory = registry()
        .read()
        .get(&config.driver)
        .cloned()
        .ok_or_else(|| CacheError::UnsupportedDriver {
            driver: config.driver.clone(),
        })?;

    factory(config).await
}
