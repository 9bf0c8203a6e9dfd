//! Error types for switch and endpoint control

use jap_protocol::{ParseError, ReceiverId, TransmitterId};
use thiserror::Error;

/// Errors from a single command/response exchange
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport could not be opened
    #[error("failed to connect to {host}: {source}")]
    Connection {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// Transport broke mid-exchange
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the connection
    #[error("connection closed by peer")]
    Closed,

    /// No prompt arrived before the deadline
    #[error("no prompt after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },
}

impl SessionError {
    /// Whether the connection that produced this error can no longer be used
    ///
    /// After a timeout the late reply may still be on its way and would be
    /// read as the answer to the next command.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            SessionError::Io(_) | SessionError::Closed | SessionError::Timeout { .. }
        )
    }
}

/// Errors from switch-level operations
#[derive(Debug, Error)]
pub enum SwitchError {
    /// Session error
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// VLAN dump could not be decoded
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Transmitter is not in the catalog
    #[error("unknown transmitter: {0}")]
    UnknownTransmitter(TransmitterId),

    /// Receiver is not configured
    #[error("unknown receiver: {0}")]
    UnknownReceiver(ReceiverId),

    /// Port layout has not been discovered from the switch yet
    #[error("switch port layout not yet discovered")]
    LayoutUnknown,

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not determine a configuration path
    #[error("could not determine configuration directory")]
    NoConfigDir,

    /// Could not read the configuration file
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration is not valid JSON for the expected schema
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A receiver or transmitter id is outside 1..=350
    #[error("{kind} id {id} out of range 1..=350")]
    IdOutOfRange { kind: &'static str, id: u16 },

    /// A receiver address could not be derived
    #[error("cannot derive address for receiver {0}")]
    InvalidAddress(ReceiverId),
}
