//! Route changes
//!
//! Moving a receiver to a new transmitter is a switch-side VLAN change
//! followed, for USB-capable receivers, by a reconnect directive sent to the
//! receiver itself so its USB-over-IP link follows the video.
//!
//! The routing cache is written optimistically: the new binding is visible
//! immediately even when the switch did not confirm the change. This trades
//! consistency for responsiveness; a lost change shows up as the old
//! binding again after the next refresh.

use std::sync::Arc;

use jap_protocol::{ReceiverId, TransmitterId};
use tracing::{debug, info, warn};

use crate::catalog::TransmitterCatalog;
use crate::endpoint::EndpointSession;
use crate::error::SwitchError;
use crate::switch::{RouteCommandStatus, Switch};

/// What happened to the receiver's USB link after a route change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbReconnect {
    /// Receiver has no USB capability
    NotRequired,
    /// Reconnect directive was acknowledged
    Sent,
    /// Reconnect directive failed; the VLAN change stands
    Failed,
}

/// Result of a route change that was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteOutcome {
    pub receiver: ReceiverId,
    pub transmitter: TransmitterId,
    pub command: RouteCommandStatus,
    pub usb: UsbReconnect,
}

impl RouteOutcome {
    /// Whether the switch confirmed the change
    pub fn is_confirmed(&self) -> bool {
        self.command == RouteCommandStatus::Confirmed
    }
}

/// Applies route changes on one switch against a transmitter catalog
pub struct RouteController {
    switch: Arc<Switch>,
    catalog: Arc<TransmitterCatalog>,
}

impl RouteController {
    pub fn new(switch: Arc<Switch>, catalog: Arc<TransmitterCatalog>) -> Self {
        Self { switch, catalog }
    }

    pub fn switch(&self) -> &Arc<Switch> {
        &self.switch
    }

    pub fn catalog(&self) -> &TransmitterCatalog {
        &self.catalog
    }

    /// Bind `receiver` to `transmitter`
    ///
    /// An unknown transmitter is rejected before any command is sent or the
    /// cache is touched. `usb_endpoint` is the receiver's own session when the
    /// receiver is USB-capable.
    pub async fn set_route(
        &self,
        receiver: ReceiverId,
        transmitter: TransmitterId,
        usb_endpoint: Option<&mut EndpointSession>,
    ) -> Result<RouteOutcome, SwitchError> {
        if !self.catalog.contains(transmitter) {
            return Err(SwitchError::UnknownTransmitter(transmitter));
        }
        info!("{}: setting source to {}", receiver, transmitter);

        let command = self.switch.apply_route(receiver, transmitter).await?;

        let usb = match usb_endpoint {
            None => UsbReconnect::NotRequired,
            Some(endpoint) => {
                debug!("{}: setting USB connection", receiver);
                tokio::time::sleep(self.switch.session_config().usb_settle()).await;
                match endpoint.reconnect_usb().await {
                    Ok(()) => UsbReconnect::Sent,
                    Err(e) => {
                        warn!("{}: USB reconnect failed: {}", receiver, e);
                        UsbReconnect::Failed
                    }
                }
            }
        };

        Ok(RouteOutcome {
            receiver,
            transmitter,
            command,
            usb,
        })
    }
}
