//! Receiver endpoint sessions
//!
//! Each receiver runs its own shell. Traffic to it never touches the switch
//! session, so an [`EndpointSession`] is owned by its receiver and needs no
//! shared locking.

use std::sync::Arc;

use jap_protocol::{endpoint, Prompt};
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::session::{exchange, probe, ConnectionHealth, SessionConfig};
use crate::transport::{BoxedTransport, Connector};

/// Shell connection to one receiver
pub struct EndpointSession {
    host: String,
    connector: Arc<dyn Connector>,
    config: SessionConfig,
    io: Option<BoxedTransport>,
}

impl EndpointSession {
    /// Create a session; the connection is opened on first use
    pub fn new(host: impl Into<String>, connector: Arc<dyn Connector>, config: SessionConfig) -> Self {
        Self {
            host: host.into(),
            connector,
            config,
            io: None,
        }
    }

    /// Receiver address
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether a connection is currently open
    pub fn is_connected(&self) -> bool {
        self.io.is_some()
    }

    /// Send a shell command and return its output up to the `#` prompt
    pub async fn command(&mut self, command: &str) -> Result<Vec<u8>, SessionError> {
        let deadline = Instant::now() + self.config.command_timeout();
        let poll = self.config.poll_interval();

        self.ensure_connected(deadline).await?;
        let io = self.io.as_mut().ok_or(SessionError::Closed)?;

        debug!("{}: send receiver command [{}]", self.host, command.escape_debug());
        let result = exchange(io, command, Prompt::Endpoint, deadline, poll).await;
        if let Err(e) = &result {
            if e.is_fatal_to_connection() {
                self.drop_connection(e).await;
            }
        }
        result
    }

    /// Read the receiver's MAC address from its interface status
    ///
    /// Returns `Ok(None)` when the receiver answered without a MAC.
    pub async fn query_mac(&mut self) -> Result<Option<String>, SessionError> {
        let data = self.command(endpoint::MAC_QUERY).await?;
        Ok(endpoint::parse_mac(&String::from_utf8_lossy(&data)))
    }

    /// Ask the receiver to renegotiate its USB-over-IP link
    pub async fn reconnect_usb(&mut self) -> Result<(), SessionError> {
        self.command(endpoint::USB_RECONNECT).await.map(|_| ())
    }

    /// Close the connection, if one is open
    pub async fn disconnect(&mut self) {
        if let Some(mut io) = self.io.take() {
            info!("{}: disconnecting from receiver", self.host);
            let _ = io.shutdown().await;
        }
    }

    async fn drop_connection(&mut self, reason: &SessionError) {
        if let Some(mut io) = self.io.take() {
            debug!("{}: dropping connection after {}", self.host, reason);
            let _ = io.shutdown().await;
        }
    }

    async fn ensure_connected(&mut self, deadline: Instant) -> Result<(), SessionError> {
        if let Some(io) = self.io.as_mut() {
            let health = probe(io, self.config.probe_timeout(), deadline).await;
            match health {
                Ok(ConnectionHealth::Alive | ConnectionHealth::Idle) => {
                    debug!("{}: using existing connection", self.host);
                    return Ok(());
                }
                Ok(ConnectionHealth::Broken) => {
                    debug!("{}: existing connection is broken", self.host);
                    self.io = None;
                }
                Err(e) => {
                    self.drop_connection(&e).await;
                    return Err(e);
                }
            }
        }

        info!("{}: creating new connection", self.host);
        let connect_timeout = self
            .config
            .connect_timeout()
            .min(deadline.saturating_duration_since(Instant::now()));
        let mut io = self
            .connector
            .connect(&self.host, self.config.port, connect_timeout)
            .await
            .map_err(|source| SessionError::Connection {
                host: self.host.clone(),
                source,
            })?;

        // Receivers print a banner and prompt on connect; let it arrive, then drop it
        tokio::time::sleep_until((Instant::now() + self.config.endpoint_settle()).min(deadline)).await;
        if probe(&mut io, self.config.probe_timeout(), deadline).await? == ConnectionHealth::Broken {
            return Err(SessionError::Closed);
        }

        self.io = Some(io);
        Ok(())
    }
}
