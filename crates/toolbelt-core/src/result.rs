//! Tool invocation results.

use crate::content::Content;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn is_false(b: &bool) -> bool {
    !*b
}

/// The outcome of a single tool invocation.
///
/// Any error a tool discovers while executing its own logic should be
/// reported inside the result with [`is_error`](Self::is_error) set, not
/// as a transport-level failure. Callers need to see such failures to
/// correct their parameters and retry. Host-level failures (unknown tool,
/// dead child, decode error) are surfaced as errors instead and never
/// produce a result object.
///
/// # Examples
///
/// ```
/// use toolbelt_core::CallToolResult;
///
/// let result = CallToolResult::new()
///     .add_text("2024-01-01")
///     .set_meta("timezone", "UTC".into());
///
/// assert!(!result.is_error);
/// assert_eq!(result.content.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallToolResult {
    /// Ordered content items produced by the tool.
    #[serde(default)]
    pub content: Vec<Content>,
    /// True when the tool reports a failure in-band.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
    /// Free-form metadata attached to the response.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl CallToolResult {
    /// Creates an empty, successful result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the canonical error result: the error flag set and a
    /// single text item named `"error"` carrying the diagnostic.
    ///
    /// # Examples
    ///
    /// ```
    /// use toolbelt_core::CallToolResult;
    ///
    /// let result = CallToolResult::error("unknown timezone");
    /// assert!(result.is_error);
    /// assert_eq!(result.content[0].as_text(), Some("unknown timezone"));
    /// ```
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::named_text(message, "error")],
            is_error: true,
            meta: Map::new(),
        }
    }

    /// Appends a text item.
    #[must_use]
    pub fn add_text(mut self, text: impl Into<String>) -> Self {
        self.content.push(Content::text(text));
        self
    }

    /// Appends a labelled text item.
    #[must_use]
    pub fn add_named_text(mut self, text: impl Into<String>, name: impl Into<String>) -> Self {
        self.content.push(Content::named_text(text, name));
        self
    }

    /// Appends any content item.
    #[must_use]
    pub fn add_content(mut self, content: impl Into<Content>) -> Self {
        self.content.push(content.into());
        self
    }

    /// Appends a structured item.
    #[must_use]
    pub fn add_struct(mut self, data: Value) -> Self {
        self.content.push(Content::structured(data));
        self
    }

    /// Sets a metadata entry.
    #[must_use]
    pub fn set_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Marks the result as a tool-reported failure.
    #[must_use]
    pub fn mark_error(mut self) -> Self {
        self.is_error = true;
        self
    }
}
