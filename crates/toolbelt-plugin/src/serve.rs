//! Plugin-side runtime.
//!
//! A plugin binary implements [`ToolPlugin`] and hands it to [`serve`]
//! from its `main`. The runtime verifies the magic cookie, answers the
//! handshake, and then dispatches frames until the host closes the
//! connection.

use crate::error::{PluginError, Result};
use crate::protocol::{handshake_line, PluginInfo, Request, Response, COOKIE_KEY, COOKIE_VALUE};
use crate::transport::{read_frame, write_frame};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use toolbelt_core::{CallToolResult, ToolName, ToolSchema};

/// The contract a plugin binary implements.
///
/// `call_tool` receives the tool name and a flat string-keyed parameter
/// mapping; the host converts any typed parameter record to this form
/// before dispatch, so implementations never see caller-defined types.
///
/// Errors returned from `call_tool` are converted into an error-flagged
/// [`CallToolResult`] by the runtime so the caller can observe and
/// correct them; they never fail the RPC itself.
#[async_trait]
pub trait ToolPlugin: Send + Sync {
    /// Descriptive information, fetched once at load time.
    async fn plugin_info(&self) -> Result<PluginInfo>;

    /// The tools this plugin exposes.
    async fn tools(&self) -> Result<Vec<ToolSchema>>;

    /// Invokes one tool.
    async fn call_tool(
        &self,
        tool: &ToolName,
        params: Map<String, Value>,
    ) -> Result<CallToolResult>;
}

/// Serves a plugin over stdin/stdout after validating the magic cookie.
///
/// Call this from the plugin binary's `main`. If the cookie is missing
/// or wrong the process exits with status 1 before touching its standard
/// streams, which the host observes as a handshake failure.
///
/// # Errors
///
/// Returns a [`PluginError::Transport`] if the stdio streams fail
/// mid-conversation. A clean EOF from the host is a normal shutdown and
/// returns `Ok(())`.
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use serde_json::{Map, Value};
/// use toolbelt_core::{CallToolResult, ToolName, ToolSchema};
/// use toolbelt_plugin::{serve, PluginInfo, Result, ToolPlugin};
///
/// struct Echo;
///
/// #[async_trait]
/// impl ToolPlugin for Echo {
///     async fn plugin_info(&self) -> Result<PluginInfo> {
///         Ok(PluginInfo {
///             name: "echo".into(),
///             version: "1.0.0".into(),
///             description: "echoes its input".into(),
///             author: "example".into(),
///         })
///     }
///
///     async fn tools(&self) -> Result<Vec<ToolSchema>> {
///         Ok(vec![ToolSchema::builder("echo", "Echo the params").build()])
///     }
///
///     async fn call_tool(
///         &self,
///         _tool: &ToolName,
///         params: Map<String, Value>,
///     ) -> Result<CallToolResult> {
///         Ok(CallToolResult::new().add_struct(Value::Object(params)))
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(err) = serve(Echo).await {
///         eprintln!("plugin failed: {err}");
///         std::process::exit(1);
///     }
/// }
/// ```
pub async fn serve(plugin: impl ToolPlugin) -> Result<()> {
    match std::env::var(COOKIE_KEY) {
        Ok(value) if value == COOKIE_VALUE => {}
        _ => {
            eprintln!(
                "this binary is a tool plugin and must be launched by a plugin host \
                 (missing or wrong {COOKIE_KEY})"
            );
            std::process::exit(1);
        }
    }

    serve_connection(&plugin, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serves a plugin over an arbitrary duplex stream.
///
/// Writes the handshake line, then answers frames until EOF. Useful for
/// in-process plugins and tests; [`serve`] wires this to stdio after the
/// cookie check.
///
/// # Errors
///
/// Returns [`PluginError::Transport`] on stream failures.
pub async fn serve_connection<P, R, W>(plugin: &P, mut reader: R, mut writer: W) -> Result<()>
where
    P: ToolPlugin,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let greeting = format!("{}\n", handshake_line());
    writer
        .write_all(greeting.as_bytes())
        .await
        .map_err(|err| PluginError::transport_with("serve", "handshake write failed", err))?;
    writer
        .flush()
        .await
        .map_err(|err| PluginError::transport_with("serve", "handshake flush failed", err))?;

    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => {
                return Err(PluginError::transport_with("serve", "frame read failed", err));
            }
        };

        let response = match serde_json::from_slice::<Request>(&frame) {
            Ok(request) => dispatch(plugin, request).await,
            Err(err) => Response::Error(format!("request did not decode: {err}")),
        };

        let body = serde_json::to_vec(&response)
            .map_err(|err| PluginError::transport_with("serve", "response serialize failed", err))?;
        write_frame(&mut writer, &body)
            .await
            .map_err(|err| PluginError::transport_with("serve", "frame write failed", err))?;
    }
}

async fn dispatch<P: ToolPlugin>(plugin: &P, request: Request) -> Response {
    match request {
        Request::GetPluginInfo => match plugin.plugin_info().await {
            Ok(info) => Response::PluginInfo(info),
            Err(err) => Response::Error(err.to_string()),
        },
        Request::GetTools => match plugin.tools().await {
            Ok(tools) => Response::Tools(tools),
            Err(err) => Response::Error(err.to_string()),
        },
        Request::CallTool { tool_name, params } => {
            match plugin.call_tool(&tool_name, params).await {
                Ok(result) => Response::ToolResult(result),
                // Tool failures stay in-band so the caller can see and
                // correct them.
                Err(err) => {
                    Response::ToolResult(CallToolResult::error(format!("tool call failed: {err}")))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_handshake_line, PROTOCOL_VERSION};
    use serde_json::json;
    use tokio::io::{AsyncBufReadExt, BufReader};

    struct Fixed;

    #[async_trait]
    impl ToolPlugin for Fixed {
        async fn plugin_info(&self) -> Result<PluginInfo> {
            Ok(PluginInfo {
                name: "fixed".to_string(),
                version: "0.0.1".to_string(),
                description: String::new(),
                author: String::new(),
            })
        }

        async fn tools(&self) -> Result<Vec<ToolSchema>> {
            Err(PluginError::Internal {
                message: "listing broke".to_string(),
            })
        }

        async fn call_tool(
            &self,
            tool: &ToolName,
            _params: Map<String, Value>,
        ) -> Result<CallToolResult> {
            if tool.as_str() == "explode" {
                return Err(PluginError::InvalidArgument("bad input".to_string()));
            }
            Ok(CallToolResult::new().add_text("done"))
        }
    }

    async fn start() -> (
        BufReader<tokio::io::ReadHalf<tokio::io::DuplexStream>>,
        tokio::io::WriteHalf<tokio::io::DuplexStream>,
    ) {
        let (host_side, plugin_side) = tokio::io::duplex(64 * 1024);
        let (plugin_read, plugin_write) = tokio::io::split(plugin_side);
        tokio::spawn(async move {
            let _ = serve_connection(&Fixed, plugin_read, plugin_write).await;
        });

        let (host_read, host_write) = tokio::io::split(host_side);
        let mut reader = BufReader::new(host_read);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(parse_handshake_line(&line).unwrap(), PROTOCOL_VERSION);
        (reader, host_write)
    }

    async fn exchange(
        reader: &mut BufReader<tokio::io::ReadHalf<tokio::io::DuplexStream>>,
        writer: &mut tokio::io::WriteHalf<tokio::io::DuplexStream>,
        request: &Request,
    ) -> Response {
        write_frame(writer, &serde_json::to_vec(request).unwrap())
            .await
            .unwrap();
        let frame = read_frame(reader).await.unwrap();
        serde_json::from_slice(&frame).unwrap()
    }

    #[tokio::test]
    async fn test_serve_writes_handshake_first() {
        // start() already asserts the greeting parses.
        let _ = start().await;
    }

    #[tokio::test]
    async fn test_plugin_side_error_becomes_error_response() {
        let (mut reader, mut writer) = start().await;
        let response = exchange(&mut reader, &mut writer, &Request::GetTools).await;
        match response {
            Response::Error(message) => assert!(message.contains("listing broke")),
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tool_error_stays_in_band() {
        let (mut reader, mut writer) = start().await;
        let request = Request::CallTool {
            tool_name: ToolName::new("explode"),
            params: Map::new(),
        };
        let response = exchange(&mut reader, &mut writer, &request).await;
        match response {
            Response::ToolResult(result) => {
                assert!(result.is_error);
                assert!(result.content[0]
                    .as_text()
                    .unwrap()
                    .contains("bad input"));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_successful_tool_call() {
        let (mut reader, mut writer) = start().await;
        let request = Request::CallTool {
            tool_name: ToolName::new("work"),
            params: json!({"x": 1}).as_object().unwrap().clone(),
        };
        let response = exchange(&mut reader, &mut writer, &request).await;
        match response {
            Response::ToolResult(result) => {
                assert!(!result.is_error);
                assert_eq!(result.content[0].as_text(), Some("done"));
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_request_answered_with_error() {
        let (mut reader, mut writer) = start().await;
        write_frame(&mut writer, b"{not json").await.unwrap();
        let frame = read_frame(&mut reader).await.unwrap();
        let response: Response = serde_json::from_slice(&frame).unwrap();
        assert!(matches!(response, Response::Error(_)));
    }
}
