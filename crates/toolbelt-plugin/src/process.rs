//! Child-process plugin wrapper.
//!
//! Owns a plugin process from spawn to termination: handshake, RPC
//! surface, and shutdown. A failed RPC is never retried here; it is
//! reported upward verbatim.

use crate::error::{PluginError, Result};
use crate::protocol::{
    parse_handshake_line, PluginInfo, Request, Response, COOKIE_KEY, COOKIE_VALUE,
    PROTOCOL_VERSION,
};
use crate::transport::{BoxReader, BoxWriter, RpcClient};
use serde_json::{Map, Value};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use toolbelt_core::{CallToolResult, ToolName, ToolSchema};
use tracing::{debug, warn};

/// How long the host waits for the handshake line.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a child gets to exit after its transport closes before it is
/// killed.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Host-side wrapper around one running plugin.
///
/// The wrapper owns the child process exclusively. Dropping the wrapper
/// kills the child; prefer [`shutdown`](Self::shutdown) for a graceful
/// close.
#[derive(Debug)]
pub struct PluginProcess {
    name: String,
    rpc: RpcClient,
    child: Mutex<Option<Child>>,
}

impl PluginProcess {
    /// Spawns the plugin binary and performs the handshake.
    ///
    /// The binary is executed with no arguments, the magic cookie in its
    /// environment, and its standard streams attached. Stderr is drained
    /// to tracing output on a background task.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Handshake`] when the child exits without
    /// answering, answers malformed, or speaks a different protocol
    /// version; [`PluginError::Transport`] when spawning fails. In every
    /// error path the child is killed before returning.
    pub async fn spawn(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = crate::manager::plugin_name_for_path(path);

        let mut child = Command::new(path)
            .env(COOKIE_KEY, COOKIE_VALUE)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                PluginError::transport_with(&name, format!("spawning {} failed", path.display()), err)
            })?;

        debug!(plugin = %name, path = %path.display(), "spawned plugin process");

        let stdin = take_stream(child.stdin.take(), &name, "stdin")?;
        let stdout = take_stream(child.stdout.take(), &name, "stdout")?;
        if let Some(stderr) = child.stderr.take() {
            drain_stderr(name.clone(), stderr);
        }

        let mut reader = BufReader::new(stdout);
        if let Err(err) = read_handshake(&name, &mut reader).await {
            let _ = child.kill().await;
            return Err(err);
        }

        let rpc = RpcClient::new(&name, Box::new(reader) as BoxReader, Box::new(stdin) as BoxWriter);
        Ok(Self {
            name,
            rpc,
            child: Mutex::new(Some(child)),
        })
    }

    /// Wraps an already-established duplex stream instead of a spawned
    /// process. No handshake is performed; the peer is trusted to speak
    /// frames directly.
    pub(crate) fn from_stream(
        name: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        let name = name.into();
        Self {
            rpc: RpcClient::new(&name, Box::new(reader), Box::new(writer)),
            name,
            child: Mutex::new(None),
        }
    }

    /// The name this process was loaded under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetches the plugin's descriptive information.
    pub async fn plugin_info(&self) -> Result<PluginInfo> {
        match self.rpc.call(&Request::GetPluginInfo).await? {
            Response::PluginInfo(info) => Ok(info),
            Response::Error(message) => Err(self.remote_error("get_plugin_info", message)),
            other => Err(self.unexpected_response("get_plugin_info", &other)),
        }
    }

    /// Fetches the plugin's tool list.
    pub async fn tools(&self) -> Result<Vec<ToolSchema>> {
        match self.rpc.call(&Request::GetTools).await? {
            Response::Tools(tools) => Ok(tools),
            Response::Error(message) => Err(self.remote_error("get_tools", message)),
            other => Err(self.unexpected_response("get_tools", &other)),
        }
    }

    /// Invokes a tool with a flat parameter mapping.
    ///
    /// A tool that fails inside its own logic reports that in-band: the
    /// returned result carries the error flag and a diagnostic, and this
    /// call still succeeds.
    pub async fn call_tool(
        &self,
        tool: &ToolName,
        params: Map<String, Value>,
    ) -> Result<CallToolResult> {
        let request = Request::CallTool {
            tool_name: tool.clone(),
            params,
        };
        match self.rpc.call(&request).await? {
            Response::ToolResult(result) => Ok(result),
            Response::Error(message) => Err(self.remote_error("call_tool", message)),
            other => Err(self.unexpected_response("call_tool", &other)),
        }
    }

    /// Tears the child down: closes the transport, waits briefly for a
    /// clean exit, then kills. Idempotent.
    pub async fn shutdown(&self) {
        let mut slot = self.child.lock().await;
        // An in-flight call that never completes holds the stream lock;
        // bound the graceful close so the kill path is always reached.
        let _ = timeout(Duration::from_secs(1), self.rpc.close()).await;
        let Some(mut child) = slot.take() else {
            return;
        };

        match timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(plugin = %self.name, ?status, "plugin exited");
            }
            Ok(Err(err)) => {
                warn!(plugin = %self.name, %err, "waiting for plugin failed, killing");
                let _ = child.kill().await;
            }
            Err(_) => {
                warn!(plugin = %self.name, "plugin ignored shutdown, killing");
                let _ = child.kill().await;
            }
        }
    }

    fn remote_error(&self, method: &str, message: String) -> PluginError {
        PluginError::transport(&self.name, format!("{method} failed remotely: {message}"))
    }

    fn unexpected_response(&self, method: &str, response: &Response) -> PluginError {
        PluginError::transport(
            &self.name,
            format!("{method} received a mismatched response: {response:?}"),
        )
    }
}

fn take_stream<T>(stream: Option<T>, plugin: &str, which: &str) -> Result<T> {
    stream.ok_or_else(|| PluginError::Internal {
        message: format!("failed to capture {which} of plugin '{plugin}'"),
    })
}

/// Reads and validates the handshake line from the child's stdout.
async fn read_handshake<R>(name: &str, reader: &mut BufReader<R>) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    let read = timeout(HANDSHAKE_TIMEOUT, reader.read_line(&mut line)).await;

    let bytes = match read {
        Err(_) => {
            return Err(PluginError::Handshake {
                plugin: name.to_string(),
                reason: format!("no handshake within {}s", HANDSHAKE_TIMEOUT.as_secs()),
            });
        }
        Ok(Err(err)) => {
            return Err(PluginError::Handshake {
                plugin: name.to_string(),
                reason: format!("reading handshake failed: {err}"),
            });
        }
        Ok(Ok(bytes)) => bytes,
    };

    if bytes == 0 {
        // The child closed stdout before answering. A plugin that sees
        // the wrong cookie exits non-zero without printing anything, so
        // this is the usual shape of a cookie rejection.
        return Err(PluginError::Handshake {
            plugin: name.to_string(),
            reason: "plugin exited before the handshake (cookie rejected?)".to_string(),
        });
    }

    let version = parse_handshake_line(&line).map_err(|reason| PluginError::Handshake {
        plugin: name.to_string(),
        reason,
    })?;

    if version != PROTOCOL_VERSION {
        return Err(PluginError::Handshake {
            plugin: name.to_string(),
            reason: format!("protocol version {version}, host speaks {PROTOCOL_VERSION}"),
        });
    }

    debug!(plugin = %name, version, "handshake complete");
    Ok(())
}

/// Forwards child stderr lines to tracing so a chatty plugin cannot
/// block on a full pipe.
fn drain_stderr(name: String, stderr: tokio::process::ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(plugin = %name, stderr = %line, "plugin stderr");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serve::{serve_connection, ToolPlugin};
    use async_trait::async_trait;

    struct NoTools;

    #[async_trait]
    impl ToolPlugin for NoTools {
        async fn plugin_info(&self) -> Result<PluginInfo> {
            Ok(PluginInfo {
                name: "no_tools".to_string(),
                version: "1.0.0".to_string(),
                description: "empty".to_string(),
                author: "tests".to_string(),
            })
        }

        async fn tools(&self) -> Result<Vec<ToolSchema>> {
            Ok(Vec::new())
        }

        async fn call_tool(
            &self,
            tool: &ToolName,
            _params: Map<String, Value>,
        ) -> Result<CallToolResult> {
            Ok(CallToolResult::error(format!("unknown tool: {tool}")))
        }
    }

    /// Connects a wrapper to an in-process serve loop, consuming the
    /// handshake greeting the way `spawn` does for a real child.
    async fn wired(plugin: impl ToolPlugin + 'static) -> PluginProcess {
        let (host_side, plugin_side) = tokio::io::duplex(64 * 1024);
        let (host_read, host_write) = tokio::io::split(host_side);
        let (plugin_read, plugin_write) = tokio::io::split(plugin_side);
        tokio::spawn(async move {
            let _ = serve_connection(&plugin, plugin_read, plugin_write).await;
        });

        let mut reader = BufReader::new(host_read);
        read_handshake("wired", &mut reader).await.unwrap();
        PluginProcess::from_stream("wired", reader, host_write)
    }

    #[tokio::test]
    async fn test_plugin_info_roundtrip() {
        let process = wired(NoTools).await;
        let info = process.plugin_info().await.unwrap();
        assert_eq!(info.name, "no_tools");
        assert_eq!(info.version, "1.0.0");
    }

    #[tokio::test]
    async fn test_tools_roundtrip() {
        let process = wired(NoTools).await;
        assert!(process.tools().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_in_band_error() {
        let process = wired(NoTools).await;
        let result = process
            .call_tool(&ToolName::new("nope"), Map::new())
            .await
            .unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn test_calls_serialize_in_issue_order() {
        let process = std::sync::Arc::new(wired(NoTools).await);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let process = process.clone();
            handles.push(tokio::spawn(async move {
                process.plugin_info().await.unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().name, "no_tools");
        }
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let process = wired(NoTools).await;
        process.shutdown().await;
        process.shutdown().await;
    }
}
