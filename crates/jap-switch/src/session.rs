//! Prompt-driven command sessions
//!
//! The switch CLI is an interactive shell, not an RPC endpoint: a command is
//! written as raw text and its output is complete once the shell prompt
//! shows up again. [`CommandSession`] owns one logged-in shell connection and
//! runs exactly one such exchange at a time; callers serialize access (see
//! [`crate::Switch`]).

use std::time::Duration;

use jap_protocol::{Dialect, Prompt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, Instant};
use tracing::{debug, trace};

use crate::error::SessionError;
use crate::transport::TELNET_PORT;

/// Size of each socket read
const READ_CHUNK: usize = 1024;

/// Timing of switch and endpoint sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// TCP port of the switch and receiver shells
    pub port: u16,
    /// Time allowed for a command, reconnect included (ms)
    pub command_timeout_ms: u64,
    /// Time allowed to open a transport (ms)
    pub connect_timeout_ms: u64,
    /// Quiet period that ends a drain of stale output (ms)
    pub probe_timeout_ms: u64,
    /// Length of each read attempt while waiting for a prompt (ms)
    pub poll_interval_ms: u64,
    /// Wait after sending the switch login before discarding the banner (ms)
    pub login_settle_ms: u64,
    /// Wait after connecting to a receiver before discarding its banner (ms)
    pub endpoint_settle_ms: u64,
    /// Wait after a route change before asking a receiver to reconnect USB (ms)
    pub usb_settle_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: TELNET_PORT,
            command_timeout_ms: 3000,
            connect_timeout_ms: 200,
            probe_timeout_ms: 200,
            poll_interval_ms: 100,
            login_settle_ms: 1000,
            endpoint_settle_ms: 300,
            usb_settle_ms: 1000,
        }
    }
}

impl SessionConfig {
    /// Time allowed for a command, connect and login included, to finish
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Upper bound on opening a transport
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Quiet period after which a connection counts as drained
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Length of each read attempt while waiting for a prompt
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Wait after sending the switch login before discarding the banner
    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    /// Wait after connecting to a receiver before discarding its banner
    pub fn endpoint_settle(&self) -> Duration {
        Duration::from_millis(self.endpoint_settle_ms)
    }

    /// Wait after a route change before asking a receiver to reconnect USB
    pub fn usb_settle(&self) -> Duration {
        Duration::from_millis(self.usb_settle_ms)
    }
}

/// Switch login credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Outcome of probing an open connection before reuse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionHealth {
    /// Unread data was pending and has been discarded
    Alive,
    /// Nothing arrived before the probe timeout
    Idle,
    /// Peer closed or the read failed
    Broken,
}

impl ConnectionHealth {
    /// Whether the connection can carry another command
    pub fn is_usable(&self) -> bool {
        !matches!(self, ConnectionHealth::Broken)
    }
}

/// Probe a connection, draining anything left over from earlier exchanges
///
/// Late replies (e.g. the login banner) are consumed here so they cannot
/// satisfy the next prompt match. The connection is drained once nothing
/// arrives for `wait`; a peer that is still talking at `deadline` yields
/// [`SessionError::Timeout`].
pub(crate) async fn probe<T>(
    io: &mut T,
    wait: Duration,
    deadline: Instant,
) -> Result<ConnectionHealth, SessionError>
where
    T: AsyncRead + Unpin,
{
    let started = Instant::now();
    let mut buf = [0u8; READ_CHUNK];
    let mut health = ConnectionHealth::Idle;

    loop {
        let now = Instant::now();
        if now >= deadline {
            debug!("Connection not drained after {:?}", started.elapsed());
            return Err(SessionError::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        let slice = wait.min(deadline - now);
        match timeout(slice, io.read(&mut buf)).await {
            Err(_) if slice == wait => return Ok(health),
            Err(_) => {} // quiet, but the deadline cut the window short
            Ok(Ok(0)) => return Ok(ConnectionHealth::Broken),
            Ok(Ok(n)) => {
                trace!("Discarding {} stale bytes: {:?}", n, String::from_utf8_lossy(&buf[..n]));
                health = ConnectionHealth::Alive;
            }
            Ok(Err(e)) => {
                debug!("Probe read failed: {}", e);
                return Ok(ConnectionHealth::Broken);
            }
        }
    }
}

/// Read until `prompt` appears in the accumulated output or `deadline` passes
///
/// Each read attempt is bounded by `poll`, so the loop never spins and never
/// overshoots the deadline by more than one attempt. On timeout the partial
/// output is discarded.
pub(crate) async fn read_until_prompt<T>(
    io: &mut T,
    prompt: Prompt,
    deadline: Instant,
    poll: Duration,
) -> Result<Vec<u8>, SessionError>
where
    T: AsyncRead + Unpin,
{
    let started = Instant::now();
    let mut data = Vec::new();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        if prompt.matches_bytes(&data) {
            trace!("Command call took {:?}", started.elapsed());
            return Ok(data);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(SessionError::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }

        match timeout(poll.min(deadline - now), io.read(&mut buf)).await {
            Ok(Ok(0)) => return Err(SessionError::Closed),
            Ok(Ok(n)) => data.extend_from_slice(&buf[..n]),
            Ok(Err(e)) => return Err(SessionError::Io(e)),
            Err(_) => {} // nothing this slice
        }
    }
}

/// Write a command and wait for the prompt
pub(crate) async fn exchange<T>(
    io: &mut T,
    command: &str,
    prompt: Prompt,
    deadline: Instant,
    poll: Duration,
) -> Result<Vec<u8>, SessionError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    io.write_all(command.as_bytes()).await?;
    io.flush().await?;
    read_until_prompt(io, prompt, deadline, poll).await
}

/// Logged-in shell session on one switch
pub struct CommandSession<T> {
    host: String,
    io: T,
    prompt: Prompt,
    config: SessionConfig,
    /// Set while a command is on the wire; still set afterwards only if the
    /// exchange was abandoned half way (its future was dropped)
    in_flight: bool,
}

impl<T> CommandSession<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Log in over a freshly opened transport
    ///
    /// Sends username, password and the dialect's session mode command, waits
    /// for the switch to settle, then discards the login banner. The whole
    /// login must finish by `deadline`.
    pub async fn login(
        host: &str,
        mut io: T,
        dialect: &dyn Dialect,
        credentials: &Credentials,
        config: SessionConfig,
        deadline: Instant,
    ) -> Result<Self, SessionError> {
        let login = dialect.login_command(&credentials.username, &credentials.password);
        io.write_all(login.as_bytes()).await?;
        io.flush().await?;

        tokio::time::sleep_until((Instant::now() + config.login_settle()).min(deadline)).await;
        if probe(&mut io, config.probe_timeout(), deadline).await? == ConnectionHealth::Broken {
            return Err(SessionError::Closed);
        }
        debug!("{}: logged in as {}", host, credentials.username);

        Ok(Self {
            host: host.to_string(),
            io,
            prompt: dialect.prompt(),
            config,
            in_flight: false,
        })
    }

    /// Host this session is connected to
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Whether an earlier exchange was abandoned mid-flight
    ///
    /// A half-written command may be sitting in the switch's line buffer, so
    /// such a session must be replaced rather than reused.
    pub fn is_interrupted(&self) -> bool {
        self.in_flight
    }

    /// Check whether the connection can be reused, draining stale output until `deadline`
    pub async fn probe(&mut self, deadline: Instant) -> Result<ConnectionHealth, SessionError> {
        probe(&mut self.io, self.config.probe_timeout(), deadline).await
    }

    /// Send `command` and return everything up to and including the prompt
    pub async fn execute(
        &mut self,
        command: &str,
        deadline: Instant,
    ) -> Result<Vec<u8>, SessionError> {
        debug!("{}: send switch command [{}]", self.host, command.escape_debug());
        self.in_flight = true;
        let result = exchange(
            &mut self.io,
            command,
            self.prompt,
            deadline,
            self.config.poll_interval(),
        )
        .await;
        self.in_flight = false;

        if let Ok(data) = &result {
            trace!("{}: response data is [{}]", self.host, String::from_utf8_lossy(data));
        }
        result
    }

    /// Shut the transport down
    pub async fn close(mut self) {
        let _ = self.io.shutdown().await;
    }
}
