//! Cache configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Driver tag for the network backend (Redis).
pub const DRIVER_REDIS: &str = "redis";

/// Driver tag for the local log-structured backend (sled).
pub const DRIVER_SLED: &str = "sled";

/// Driver tag for the local in-memory backend with optional journal
/// persistence.
pub const DRIVER_MEMORY: &str = "memory";

/// Configuration for one cache instance.
///
/// Immutable for the lifetime of the cache built from it. `driver` is
/// mandatory; `path` configures the local backends, the network fields
/// configure Redis.
///
/// # Examples
///
/// ```
/// use toolbelt_cache::{CacheConfig, DRIVER_SLED};
///
/// let config = CacheConfig::builder()
///     .driver(DRIVER_SLED)
///     .path("/var/lib/app/cache")
///     .build();
///
/// assert_eq!(config.driver, DRIVER_SLED);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Driver tag from the registered set.
    pub driver: String,

    /// On-disk location for the local backends. For the memory driver,
    /// setting a path enables journal persistence.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Server host for the network backend.
    #[serde(default)]
    pub host: String,

    /// Server port for the network backend.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Authentication password for the network backend.
    #[serde(default)]
    pub password: Option<String>,

    /// Logical database number for the network backend.
    #[serde(default)]
    pub db: i64,
}

fn default_port() -> u16 {
    6379
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: String::new(),
            path: None,
            host: String::new(),
            port: default_port(),
            password: None,
            db: 0,
        }
    }
}

impl CacheConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }
}

/// Builder for [`CacheConfig`].
#[derive(Debug, Clone, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Sets the driver tag.
    #[must_use]
    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.config.driver = driver.into();
        self
    }

    /// Sets the on-disk path for local backends.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = Some(path.into());
        self
    }

    /// Sets the server host for the network backend.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Sets the server port for the network backend.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Sets the authentication password for the network backend.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Sets the logical database number for the network backend.
    #[must_use]
    pub fn db(mut self, db: i64) -> Self {
        self.config.db = db;
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> CacheConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert!(config.driver.is_empty());
        assert_eq!(config.port, 6379);
        assert!(config.path.is_none());
    }

    #[test]
    fn test_builder_local() {
        let config = CacheConfig::builder()
            .driver(DRIVER_MEMORY)
            .path("/tmp/cache.journal")
            .build();
        assert_eq!(config.driver, "memory");
        assert_eq!(config.path.as_deref(), Some(std::path::Path::new("/tmp/cache.journal")));
    }

    #[test]
    fn test_builder_network() {
        let config = CacheConfig::builder()
            .driver(DRIVER_REDIS)
            .host("cache.internal")
            .port(6380)
            .password("hunter2")
            .db(3)
            .build();
        assert_eq!(config.host, "cache.internal");
        assert_eq!(config.port, 6380);
        assert_eq!(config.password.as_deref(), Some("hunter2"));
        assert_eq!(config.db, 3);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: CacheConfig = serde_json::from_str(r#"{"driver": "sled"}"#).unwrap();
        assert_eq!(config.driver, "sled");
        assert_eq!(config.port, 6379);
        assert!(config.password.is_none());
    }
}
