//! Strong domain types for the plugin host.
//!
//! Newtypes over `String` keep tool names and plugin names from being
//! mixed up with each other or with arbitrary string values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tool name identifier (newtype over String).
///
/// Identifies a single operation exposed by a plugin. Tool names form a
/// flat namespace across all loaded plugins.
///
/// # Examples
///
/// ```
/// use toolbelt_core::ToolName;
///
/// let tool = ToolName::new("current_time");
/// assert_eq!(tool.as_str(), "current_time");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolName(String);

impl ToolName {
    /// Creates a new tool name.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the tool name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ToolName` and returns the inner `String`.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ToolName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ToolName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Plugin name identifier (newtype over String).
///
/// Derived from the plugin binary's file stem at load time (the file name
/// minus the `.tool.plugin` suffix).
///
/// # Examples
///
/// ```
/// use toolbelt_core::PluginName;
///
/// let plugin = PluginName::new("time_tool");
/// assert_eq!(plugin.as_str(), "time_tool");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginName(String);

impl PluginName {
    /// Creates a new plugin name.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the plugin name as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `PluginName` and returns the inner `String`.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PluginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PluginName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PluginName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_name_creation() {
        let name = ToolName::new("send_message");
        assert_eq!(name.as_str(), "send_message");
    }

    #[test]
    fn test_tool_name_display() {
        let name = ToolName::new("display_test");
        assert_eq!(format!("{name}"), "display_test");
    }

    #[test]
    fn test_tool_name_from_string() {
        let name = ToolName::from("tool".to_string());
        assert_eq!(name.as_str(), "tool");
    }

    #[test]
    fn test_tool_name_into_inner() {
        let name = ToolName::new("test");
        assert_eq!(name.into_inner(), "test");
    }

    #[test]
    fn test_tool_name_serde_transparent() {
        let name = ToolName::new("current_time");
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"current_time\"");

        let back: ToolName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn test_plugin_name_creation() {
        let name = PluginName::new("time_tool");
        assert_eq!(name.as_str(), "time_tool");
    }

    #[test]
    fn test_plugin_name_display() {
        let name = PluginName::new("p1");
        assert_eq!(format!("{name}"), "p1");
    }

    #[test]
    fn test_names_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ToolName>();
        assert_send_sync::<PluginName>();
    }
}
