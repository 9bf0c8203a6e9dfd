//! Just Add Power Matrix Control
//!
//! Async control plane for a Just Add Power AV-over-IP matrix. Routing lives
//! entirely in the VLAN configuration of one managed switch: a receiver
//! shows whichever transmitter's VLAN its port is an untagged member of.
//!
//! - [`Switch`] owns the single shell session to the switch and the
//!   throttled [`RoutingCache`]; all receivers share it
//! - [`EndpointSession`] talks to one receiver's own shell (MAC discovery,
//!   USB reconnect)
//! - [`RouteController`] performs route changes
//! - [`Matrix`] wires everything up from a [`MatrixConfig`]
//!
//! Transports come from a [`Connector`], so tests can run the same code
//! against in-memory streams.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod matrix;
pub mod receiver;
pub mod route;
pub mod session;
pub mod switch;
pub mod transport;

pub use cache::RoutingCache;
pub use catalog::{Transmitter, TransmitterCatalog};
pub use config::MatrixConfig;
pub use endpoint::EndpointSession;
pub use error::{ConfigError, SessionError, SwitchError};
pub use matrix::Matrix;
pub use receiver::{Receiver, ReceiverInfo, ReceiverStatus};
pub use route::{RouteController, RouteOutcome, UsbReconnect};
pub use session::{CommandSession, ConnectionHealth, Credentials, SessionConfig};
pub use switch::{RouteCommandStatus, Switch, SwitchConfig};
pub use transport::{BoxedTransport, Connector, TcpConnector, Transport, TELNET_PORT};

pub use jap_protocol::{PortLayout, ReceiverId, RoutingMap, TransmitterId, Vendor};
