//! Error types for the cache facade.

use thiserror::Error;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors surfaced by the cache facade.
///
/// Backend-native "no such key" errors are always translated to
/// [`CacheError::NotFound`] before they reach the caller, so the kind is
/// uniform across drivers.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The key, hash field, or list head/tail does not exist.
    #[error("key not found")]
    NotFound,

    /// The configuration carried no driver tag.
    #[error("cache driver not specified")]
    DriverNotSpecified,

    /// The configured driver tag is not registered.
    #[error("unsupported cache driver: {driver}")]
    UnsupportedDriver {
        /// The unrecognized driver tag.
        driver: String,
    },

    /// The configuration is unusable for the selected driver.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O failure from a local backend or its persistence file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected backend failure.
    #[error("internal cache error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
        /// Underlying backend error, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl CacheError {
    /// Returns `true` if this is the uniform missing-key error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns `true` if the configured driver is not registered.
    #[must_use]
    pub const fn is_unsupported_driver(&self) -> bool {
        matches!(self, Self::UnsupportedDriver { .. })
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn backend(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<sled::Error> for CacheError {
    fn from(err: sled::Error) -> Self {
        Self::backend("sled operation failed", err)
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::backend("redis operation failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(CacheError::NotFound.is_not_found());
        assert!(!CacheError::DriverNotSpecified.is_not_found());
    }

    #[test]
    fn test_unsupported_driver_display() {
        let err = CacheError::UnsupportedDriver {
            driver: "bogus".to_string(),
        };
        assert!(err.is_unsupported_driver());
        assert!(format!("{err}").contains("bogus"));
    }

    #[test]
    fn test_internal_source_chain() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = CacheError::backend("write failed", io);
        assert!(err.source().is_some());
        assert!(format!("{err}").contains("write failed"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CacheError = io.into();
        assert!(format!("{err}").contains("denied"));
    }
}
