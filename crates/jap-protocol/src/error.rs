//! Error types for VLAN dump decoding

use thiserror::Error;

/// Errors that can occur while decoding switch output
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The reply is not a VLAN table at all
    #[error("reply carries no VLAN table header")]
    MissingVlanTable,

    /// The dump carries no `JAP_<tx>x<rx>` layout marker
    #[error("layout marker JAP_<tx>x<rx> not found")]
    MissingLayoutMarker,

    /// The layout marker was found but could not be read
    #[error("invalid layout marker: {0}")]
    InvalidLayoutMarker(String),

    /// A port list entry is not a number or `low-high` run
    #[error("invalid port range entry: {0}")]
    InvalidPortRange(String),

    /// A transmitter VLAN name does not carry a numeric id
    #[error("invalid transmitter marker: {0}")]
    InvalidTransmitter(String),
}
