//! Just Add Power Switch Protocol Library
//!
//! This crate provides the I/O-free half of controlling a Just Add Power
//! AV-over-IP matrix: the text dialects spoken by the managed Ethernet
//! switch that carries the video VLANs.
//!
//! - **Cisco**: SG-series CLI, `show vlan` port lists wrap across lines
//! - **Luxul**: Luxul CLI, one VLAN per line with `1/`-prefixed ports
//!
//! # Architecture
//!
//! Each vendor module implements [`Dialect`]:
//! - Decoding a `show vlan` dump into a [`RoutingMap`] (receiver → transmitter)
//! - Building the configuration command that moves a receiver port into a
//!   transmitter VLAN
//!
//! Shared pieces live in their own modules: [`range`] expands port lists,
//! [`layout`] maps between receiver ids and switch ports, [`prompt`]
//! recognises when the shell has finished answering.
//!
//! # Example
//!
//! ```rust
//! use jap_protocol::{vlan, PortLayout, ReceiverId, TransmitterId, Vendor};
//!
//! let dump = " 1   JAP_10x20   gi11   Default\n 17  TRANSMITTER_7  gi21  static\n";
//! let decoded = vlan::decode(Vendor::Cisco, dump, None).unwrap();
//!
//! assert_eq!(decoded.layout, PortLayout::new(10, 20));
//! assert_eq!(decoded.routes.get(ReceiverId(10)), Some(TransmitterId(7)));
//! ```

pub mod cisco;
pub mod endpoint;
pub mod error;
pub mod layout;
pub mod luxul;
pub mod prompt;
pub mod range;
pub mod routing;
pub mod vlan;

pub use error::ParseError;
pub use layout::PortLayout;
pub use prompt::Prompt;
pub use range::expand_range;
pub use routing::{ReceiverId, RoutingMap, TransmitterId};

/// Command that lists VLAN membership
pub const SHOW_VLAN: &str = "show vlan\n";

/// Identifies which switch CLI dialect a switch speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Vendor {
    /// Cisco SG-series
    #[default]
    Cisco,
    /// Luxul
    Luxul,
}

impl Vendor {
    /// Returns a human-readable name for the vendor
    pub fn name(&self) -> &'static str {
        match self {
            Vendor::Cisco => "Cisco",
            Vendor::Luxul => "Luxul",
        }
    }

    /// Dialect implementation for this vendor
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            Vendor::Cisco => &cisco::Cisco,
            Vendor::Luxul => &luxul::Luxul,
        }
    }
}

impl std::str::FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cisco" => Ok(Vendor::Cisco),
            "luxul" => Ok(Vendor::Luxul),
            other => Err(format!("unknown switch vendor: {}", other)),
        }
    }
}

/// Vendor-specific switch CLI dialect
pub trait Dialect: Send + Sync {
    /// Vendor this dialect belongs to
    fn vendor(&self) -> Vendor;

    /// Decode a `show vlan` dump using an already known port layout
    fn decode_vlans(&self, text: &str, layout: PortLayout) -> Result<RoutingMap, ParseError>;

    /// Configuration command moving `receiver_port` into `transmitter_vlan`
    ///
    /// The command removes the port from the transmitter trunk range and adds
    /// it untagged to the target VLAN, then returns to the exec prompt.
    fn route_command(&self, receiver_port: u16, transmitter_vlan: u16) -> String;

    /// Login sequence sent right after the transport opens
    fn login_command(&self, username: &str, password: &str) -> String {
        format!("{}\r{}\r{}\r", username, password, self.session_mode_command())
    }

    /// Command that disables paging for the session
    fn session_mode_command(&self) -> &'static str {
        "terminal datadump"
    }

    /// Prompt ending each command's output
    fn prompt(&self) -> Prompt {
        Prompt::Switch
    }
}
