//! Just Add Power Simulation Library
//!
//! This crate provides a simulation layer for testing matrix control without
//! a physical switch or receivers. It includes:
//!
//! - **VirtualSwitch**: Cisco or Luxul CLI with live VLAN membership
//! - **VirtualEndpoint**: Receiver shell answering MAC and USB commands
//! - **VirtualNetwork**: Hostname table that opens in-memory connections
//!
//! # Example
//!
//! ```rust
//! use jap_protocol::{PortLayout, ReceiverId, TransmitterId, Vendor};
//! use jap_sim::VirtualSwitch;
//!
//! let mut switch = VirtualSwitch::new("switch01", Vendor::Cisco, PortLayout::new(4, 8));
//! switch.set_route(ReceiverId(3), TransmitterId(2));
//!
//! switch.greeting();
//! let reply = switch.process_input(b"cisco\rcisco\rshow vlan\n");
//! assert!(String::from_utf8_lossy(&reply).contains("TRANSMITTER_2"));
//! ```

pub mod endpoint;
pub mod network;
pub mod switch;
pub mod task;

pub use endpoint::VirtualEndpoint;
pub use network::{SharedEndpoint, SharedSwitch, VirtualNetwork};
pub use switch::VirtualSwitch;
pub use task::{run_virtual_device_task, VirtualDevice};
