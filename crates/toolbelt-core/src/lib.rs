//! Core types shared across the toolbelt workspace.
//!
//! This crate provides the data model that crosses the plugin boundary:
//! strong domain newtypes, the content taxonomy carried in tool results,
//! and the declarative tool-schema builder.
//!
//! # Architecture
//!
//! - Strong domain types (`ToolName`, `PluginName`)
//! - Tagged content union (`Content`) and the `CallToolResult` envelope
//! - `ToolSchema` with a composable JSON-Schema-style builder
//!
//! # Examples
//!
//! ```
//! use toolbelt_core::{Property, ToolSchema};
//!
//! let tool = ToolSchema::builder("current_time", "Returns the current time")
//!     .string("format", Property::new().description("strftime format"))
//!     .string("timezone", Property::new().default_value("UTC"))
//!     .build();
//!
//! assert_eq!(tool.name.as_str(), "current_time");
//! assert_eq!(tool.input_schema.properties.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

mod content;
mod result;
mod tool;
mod types;

pub use content::{Content, FileContent, FileKind, StructContent, TextContent};
pub use result::CallToolResult;
pub use tool::{InputSchema, Property, ToolBuilder, ToolSchema};
pub use types::{PluginName, ToolName};
