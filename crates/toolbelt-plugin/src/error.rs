//! Error types for the plugin host.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for plugin host operations.
pub type Result<T> = std::result::Result<T, PluginError>;

/// Errors surfaced by the plugin host.
///
/// Every failure belongs to exactly one kind. Tool-level failures are not
/// represented here: a tool that fails while executing its own logic
/// reports that inside a [`CallToolResult`](toolbelt_core::CallToolResult)
/// with the error flag set, and the surrounding RPC succeeds.
#[derive(Error, Debug)]
pub enum PluginError {
    /// Plugin directory traversal failed.
    ///
    /// Raised when the discovery root is missing or unreadable, or when a
    /// file under it cannot be stat'ed.
    #[error("plugin discovery failed at {path}: {source}")]
    Discovery {
        /// Path where the traversal failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The plugin failed the cookie or protocol-version exchange.
    #[error("handshake with plugin '{plugin}' failed: {reason}")]
    Handshake {
        /// Plugin name derived from the binary path.
        plugin: String,
        /// What went wrong during the exchange.
        reason: String,
    },

    /// The RPC channel failed: broken pipe, decode failure, or the child
    /// process died.
    #[error("transport failure for plugin '{plugin}': {message}")]
    Transport {
        /// Plugin name derived from the binary path.
        plugin: String,
        /// Description of the failure.
        message: String,
        /// Underlying error, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No loaded plugin provides the requested tool.
    #[error("tool not found: {tool}")]
    ToolNotFound {
        /// The unknown tool name.
        tool: String,
    },

    /// Parameter validation rejected the input before dispatch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller's cancellation token fired before or during the call.
    ///
    /// The plugin process is not interrupted; only the waiter is
    /// released.
    #[error("tool call cancelled: {tool}")]
    Cancelled {
        /// The tool whose call was abandoned.
        tool: String,
    },

    /// Unexpected host-side failure.
    #[error("internal plugin host error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl PluginError {
    /// Returns `true` if this is a discovery error.
    #[must_use]
    pub const fn is_discovery(&self) -> bool {
        matches!(self, Self::Discovery { .. })
    }

    /// Returns `true` if this is a handshake error.
    #[must_use]
    pub const fn is_handshake(&self) -> bool {
        matches!(self, Self::Handshake { .. })
    }

    /// Returns `true` if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns `true` if this is a tool-lookup miss.
    #[must_use]
    pub const fn is_tool_not_found(&self) -> bool {
        matches!(self, Self::ToolNotFound { .. })
    }

    /// Returns `true` if this is an invalid-argument error.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns `true` if the call was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub(crate) fn transport(plugin: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            plugin: plugin.to_string(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn transport_with(
        plugin: &str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            plugin: plugin.to_string(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_display() {
        let err = PluginError::Handshake {
            plugin: "time_tool".to_string(),
            reason: "protocol version 99, host speaks 1".to_string(),
        };
        let display = format!("{err}");
        assert!(display.contains("time_tool"));
        assert!(display.contains("protocol version 99"));
        assert!(err.is_handshake());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_source_chain() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = PluginError::transport_with("p", "write failed", io);
        assert!(err.is_transport());
        assert!(err.source().is_some());
    }

    #[test]
    fn test_tool_not_found_display() {
        let err = PluginError::ToolNotFound {
            tool: "missing".to_string(),
        };
        assert!(err.is_tool_not_found());
        assert!(format!("{err}").contains("missing"));
    }

    #[test]
    fn test_cancelled_classification() {
        let err = PluginError::Cancelled {
            tool: "slow".to_string(),
        };
        assert!(err.is_cancelled());
        assert!(!err.is_tool_not_found());
    }

    #[test]
    fn test_discovery_classification() {
        let err = PluginError::Discovery {
            path: PathBuf::from("/nonexistent"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.is_discovery());
        assert!(format!("{err}").contains("/nonexistent"));
    }
}
