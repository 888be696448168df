//! Length-prefixed frame transport.
//!
//! Frames are a 4-byte big-endian length followed by a JSON body. The
//! host-side [`RpcClient`] serializes calls behind a single lock, so
//! requests against one plugin complete in issue order.

use crate::error::{PluginError, Result};
use crate::protocol::{Request, Response, MAX_FRAME_LEN};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

pub(crate) type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
pub(crate) type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Writes one frame and flushes.
pub(crate) async fn write_frame<W>(writer: &mut W, body: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(body.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| io::Error::other(format!("frame of {} bytes exceeds limit", body.len())))?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await
}

/// Reads one frame body.
pub(crate) async fn read_frame<R>(reader: &mut R) -> io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes).await?;
    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_FRAME_LEN {
        return Err(io::Error::other(format!(
            "incoming frame of {len} bytes exceeds limit"
        )));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(body)
}

struct FramedPair {
    reader: BoxReader,
    writer: BoxWriter,
}

/// Host-side RPC endpoint for one plugin connection.
pub(crate) struct RpcClient {
    plugin: String,
    stream: Mutex<FramedPair>,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}

impl RpcClient {
    pub(crate) fn new(plugin: &str, reader: BoxReader, writer: BoxWriter) -> Self {
        Self {
            plugin: plugin.to_string(),
            stream: Mutex::new(FramedPair { reader, writer }),
        }
    }

    /// Performs one synchronous request/response exchange.
    ///
    /// Holding the stream lock for the full exchange keeps concurrent
    /// callers serialized per connection.
    pub(crate) async fn call(&self, request: &Request) -> Result<Response> {
        let body = serde_json::to_vec(request).map_err(|err| {
            PluginError::transport_with(&self.plugin, "request did not serialize", err)
        })?;

        let mut stream = self.stream.lock().await;
        write_frame(&mut stream.writer, &body)
            .await
            .map_err(|err| PluginError::transport_with(&self.plugin, "request write failed", err))?;

        let frame = read_frame(&mut stream.reader).await.map_err(|err| {
            PluginError::transport_with(&self.plugin, "response read failed", err)
        })?;

        serde_json::from_slice(&frame).map_err(|err| {
            PluginError::transport_with(&self.plugin, "response did not decode", err)
        })
    }

    /// Closes the write half, signalling EOF to the peer. Errors are
    /// ignored; the peer may already be gone.
    pub(crate) async fn close(&self) {
        let mut stream = self.stream.lock().await;
        let _ = stream.writer.shutdown().await;
    }
}
