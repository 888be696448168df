//! Wire protocol between the host and a plugin process.
//!
//! The handshake is environment plus one line of text: the host exports
//! the magic cookie into the child's environment, and a conforming plugin
//! answers with `toolbelt|<protocol-version>` on stdout before any frame.
//! After that, both directions carry length-prefixed JSON frames. Every
//! value that crosses the boundary is a closed serde enum or a plain JSON
//! shape, so the decoder can reconstruct any variant without out-of-band
//! type registration.
//!
//! Bumping [`COOKIE_VALUE`] or [`PROTOCOL_VERSION`] is a breaking change
//! that requires rebuilding the host and every plugin together.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use toolbelt_core::{CallToolResult, ToolName, ToolSchema};

/// Environment variable carrying the magic cookie to the plugin.
pub const COOKIE_KEY: &str = "TOOL_PLUGIN";

/// Expected value of the magic cookie.
pub const COOKIE_VALUE: &str = "tool_v1.0.0";

/// Protocol version spoken by this host. Any mismatch is fatal.
pub const PROTOCOL_VERSION: u32 = 1;

/// Tag leading the handshake line.
pub(crate) const HANDSHAKE_TAG: &str = "toolbelt";

/// Upper bound on a single frame body.
pub(crate) const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Descriptive information a plugin reports once at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Descriptive plugin name (may differ from the derived load name).
    pub name: String,
    /// Semantic version string.
    pub version: String,
    /// Free-text description.
    pub description: String,
    /// Author attribution.
    pub author: String,
}

/// A single RPC request frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub(crate) enum Request {
    /// Fetch the plugin's descriptive information.
    GetPluginInfo,
    /// Fetch the plugin's tool list.
    GetTools,
    /// Invoke a tool with a flat parameter mapping.
    CallTool {
        tool_name: ToolName,
        params: Map<String, Value>,
    },
}

/// A single RPC response frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub(crate) enum Response {
    PluginInfo(PluginInfo),
    Tools(Vec<ToolSchema>),
    ToolResult(CallToolResult),
    /// Plugin-side failure outside a tool's own logic.
    Error(String),
}

/// Builds the line a plugin prints after a successful cookie check.
pub(crate) fn handshake_line() -> String {
    format!("{HANDSHAKE_TAG}|{PROTOCOL_VERSION}")
}

/// Parses a handshake line, returning the plugin's protocol version.
pub(crate) fn parse_handshake_line(line: &str) -> std::result::Result<u32, String> {
    let mut parts = line.trim().splitn(2, '|');
    let tag = parts.next().unwrap_or_default();
    if tag != HANDSHAKE_TAG {
        return Err(format!("unexpected handshake line {line:?}"));
    }
    let version = parts
        .next()
        .ok_or_else(|| format!("handshake line {line:?} missing protocol version"))?;
    version
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("handshake line {line:?} carries a malformed protocol version"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolbelt_core::{Property, ToolSchema};

    #[test]
    fn test_handshake_line_roundtrip() {
        let line = handshake_line();
        assert_eq!(parse_handshake_line(&line).unwrap(), PROTOCOL_VERSION);
    }

    #[test]
    fn test_handshake_rejects_wrong_tag() {
        assert!(parse_handshake_line("otherhost|1").is_err());
    }

    #[test]
    fn test_handshake_rejects_missing_version() {
        assert!(parse_handshake_line("toolbelt").is_err());
        assert!(parse_handshake_line("toolbelt|abc").is_err());
    }

    #[test]
    fn test_handshake_parses_future_version() {
        assert_eq!(parse_handshake_line("toolbelt|99\n").unwrap(), 99);
    }

    #[test]
    fn test_request_wire_shape() {
        let request = Request::CallTool {
            tool_name: ToolName::new("current_time"),
            params: json!({"format": "%Y"}).as_object().unwrap().clone(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "call_tool");
        assert_eq!(value["tool_name"], "current_time");
        assert_eq!(value["params"]["format"], "%Y");

        let back: Request = serde_json::from_value(value).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_plain_request_wire_shape() {
        let value = serde_json::to_value(Request::GetTools).unwrap();
        assert_eq!(value, json!({"method": "get_tools"}));
    }

    #[test]
    fn test_response_roundtrip_with_all_content_variants() {
        let image = toolbelt_core::FileContent::new(
            toolbelt_core::FileKind::Image,
            "aGVsbG8=",
            "image/png",
        )
        .with_dimensions(640, 480);
        let result = CallToolResult::new()
            .add_text("caption")
            .add_content(image)
            .add_struct(json!({"nested": {"values": [1, 2, 3]}}));

        let response = Response::ToolResult(result);
        let encoded = serde_json::to_vec(&response).unwrap();
        let back: Response = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn test_tools_response_roundtrip() {
        let tool = ToolSchema::builder("t", "d")
            .string("a", Property::new().required())
            .build();
        let response = Response::Tools(vec![tool]);

        let encoded = serde_json::to_vec(&response).unwrap();
        let back: Response = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn test_error_response_roundtrip() {
        let response = Response::Error("listing tools failed".to_string());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["kind"], "error");

        let back: Response = serde_json::from_value(value).unwrap();
        assert_eq!(back, response);
    }
}
