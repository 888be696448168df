//! Out-of-process tool plugin host.
//!
//! Plugins are independent executables discovered by file suffix,
//! spawned as child processes, and spoken to over a length-prefixed JSON
//! RPC channel gated by a cookie-and-version handshake. The
//! [`PluginManager`] exposes the loaded set as one flat tool namespace.
//!
//! The same crate carries the plugin-side runtime: a binary implements
//! [`ToolPlugin`] and calls [`serve`] from its `main`.
//!
//! # Host example
//!
//! ```no_run
//! use toolbelt_plugin::PluginManager;
//!
//! # async fn example() -> toolbelt_plugin::Result<()> {
//! let manager = PluginManager::new();
//! let report = manager.load_all_plugins("./plugins").await?;
//! println!("loaded {} plugins", report.loaded.len());
//!
//! let result = manager
//!     .call_tool("current_time", serde_json::Map::new())
//!     .await?;
//! println!("{result:?}");
//! manager.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Cancellation
//!
//! [`PluginManager::call_tool_with_context`] cancels the waiter, not the
//! work: an abandoned call leaves the plugin process running until its
//! own logic returns. Tools that need bounded work must check a
//! cooperative signal of their own.

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod discovery;
mod error;
mod manager;
mod process;
mod protocol;
mod serve;
mod transport;

pub use discovery::{scan_plugins, PLUGIN_SUFFIX};
pub use error::{PluginError, Result};
pub use manager::{LoadReport, LoadedPlugin, PluginManager};
pub use process::PluginProcess;
pub use protocol::{PluginInfo, COOKIE_KEY, COOKIE_VALUE, PROTOCOL_VERSION};
pub use serve::{serve, serve_connection, ToolPlugin};

// The data model plugin authors and hosts both need, re-exported so a
// plugin binary can depend on this crate alone.
pub use toolbelt_core::{
    CallToolResult, Content, FileContent, FileKind, InputSchema, PluginName, Property,
    StructContent, TextContent, ToolName, ToolSchema,
};
