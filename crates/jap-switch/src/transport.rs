//! Transport seam
//!
//! Sessions talk to any `AsyncRead + AsyncWrite` stream. A [`Connector`]
//! opens those streams, so the same session code drives real telnet sockets
//! and in-memory `tokio::io::duplex` pairs.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Well-known telnet port used by both switches and receivers
pub const TELNET_PORT: u16 = 23;

/// Byte stream a session runs over
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Boxed transport produced by a [`Connector`]
pub type BoxedTransport = Box<dyn Transport>;

/// Opens transports to switches and receivers
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a transport to `host:port`, giving up after `timeout`
    async fn connect(&self, host: &str, port: u16, timeout: Duration)
        -> io::Result<BoxedTransport>;
}

/// Plain TCP connector
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> io::Result<BoxedTransport> {
        debug!("{}: opening TCP connection on port {}", host, port);
        let stream = tokio::time::timeout(timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}
