use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

use crate::config::Endpoint;
use crate::error::RpcError;

use super::framing::LineFramer;

const READ_CHUNK: usize = 4096;

/// Opens one fresh byte stream per RPC call.
///
/// The client never reuses a stream: every call connects, writes one request
/// line, reads one response line, and drops the stream.
#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<Self::Stream>;
}

/// Plaintext TCP connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, endpoint: &Endpoint) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Write `request_line` and read until the framer reports a complete frame.
pub(super) async fn exchange<S>(
    stream: &mut S,
    endpoint: &str,
    request_line: &[u8],
) -> Result<String, RpcError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let connection_error = |source: io::Error| RpcError::Connection {
        endpoint: endpoint.to_owned(),
        source,
    };

    stream
        .write_all(request_line)
        .await
        .map_err(connection_error)?;
    stream.flush().await.map_err(connection_error)?;

    let mut framer = LineFramer::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = stream.read(&mut chunk).await.map_err(connection_error)?;
        if n == 0 {
            return Err(connection_error(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "connection closed after {} bytes without a line terminator",
                    framer.buffered()
                ),
            )));
        }
        trace!(endpoint, chunk_len = n, "rpc response chunk");
        if let Some(frame) = framer.push(&chunk[..n]) {
            return Ok(frame);
        }
    }
}
