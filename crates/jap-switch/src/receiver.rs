//! Receiver devices
//!
//! A [`Receiver`] is the per-display view of the matrix: its current source,
//! the list of sources it can switch to, and a preview image. It owns the
//! shell session to its own endpoint and shares the switch through its
//! [`RouteController`].

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use jap_protocol::{ReceiverId, TransmitterId};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::Transmitter;
use crate::endpoint::EndpointSession;
use crate::error::{SessionError, SwitchError};
use crate::route::{RouteController, RouteOutcome};

/// Reachability of a receiver endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverStatus {
    /// Endpoint answered MAC discovery
    Online,
    /// Endpoint has not answered yet
    #[default]
    Offline,
}

impl ReceiverStatus {
    pub fn name(&self) -> &'static str {
        match self {
            ReceiverStatus::Online => "on",
            ReceiverStatus::Offline => "off",
        }
    }
}

/// Static settings of one receiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverInfo {
    pub id: ReceiverId,
    pub name: String,
    pub address: Ipv4Addr,
    /// Carries USB over IP
    pub usb: bool,
    /// Serve the receiver's own frame grab as the preview image
    pub image_pull: bool,
    /// Minimum age of a frame grab before a new one is requested
    pub image_pull_refresh: Duration,
}

/// Cache-busting state of the frame grab URL
#[derive(Debug, Clone, Copy, Default)]
struct ImagePull {
    last_refresh: Option<Instant>,
    serial: u64,
}

/// One receiver on the matrix
pub struct Receiver {
    info: ReceiverInfo,
    unique_id: String,
    status: ReceiverStatus,
    mac: Option<String>,
    transmitter: Option<TransmitterId>,
    image: ImagePull,
    controller: Arc<RouteController>,
    endpoint: EndpointSession,
}

impl Receiver {
    pub fn new(info: ReceiverInfo, controller: Arc<RouteController>, endpoint: EndpointSession) -> Self {
        let unique_id = format!("{}-{}", controller.switch().host(), info.id.as_u16());
        Self {
            info,
            unique_id,
            status: ReceiverStatus::Offline,
            mac: None,
            transmitter: None,
            image: ImagePull::default(),
            controller,
            endpoint,
        }
    }

    pub fn id(&self) -> ReceiverId {
        self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &ReceiverInfo {
        &self.info
    }

    /// `<switch host>-<receiver id>`
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn status(&self) -> ReceiverStatus {
        self.status
    }

    /// MAC address found during discovery
    pub fn mac(&self) -> Option<&str> {
        self.mac.as_deref()
    }

    /// Load the current binding and look up the endpoint's MAC address
    ///
    /// An endpoint that does not answer leaves the receiver offline; that is
    /// not an error. Transport failures other than a timeout are returned.
    pub async fn discover(&mut self) -> Result<(), SessionError> {
        self.transmitter = self.controller.switch().current_transmitter(self.info.id).await;

        match self.endpoint.query_mac().await {
            Ok(Some(mac)) => {
                info!("{}: receiver MAC [{}]", self.info.id, mac);
                self.mac = Some(mac);
                self.status = ReceiverStatus::Online;
                Ok(())
            }
            Ok(None) => {
                warn!("{}: no MAC address in interface status", self.info.id);
                Ok(())
            }
            Err(SessionError::Timeout { .. }) | Err(SessionError::Connection { .. }) => {
                warn!("{}: connection timed out", self.info.id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Refresh the current source from the (throttled) routing cache
    pub async fn update(&mut self) {
        if self.status != ReceiverStatus::Online {
            return;
        }
        self.transmitter = self.controller.switch().current_transmitter(self.info.id).await;
    }

    /// Current source, if the receiver is bound to a known transmitter
    pub fn source(&self) -> Option<&Transmitter> {
        self.transmitter.and_then(|id| self.controller.catalog().get(id))
    }

    pub fn transmitter_id(&self) -> Option<TransmitterId> {
        self.transmitter
    }

    /// Title shown for the current media: the source name
    pub fn media_title(&self) -> Option<&str> {
        self.source().map(|tx| tx.name.as_str())
    }

    /// Names of every selectable source, ordered by transmitter id
    pub fn source_list(&self) -> Vec<&str> {
        self.controller.catalog().source_list()
    }

    /// Preview image of the current media
    ///
    /// A transmitter's static image wins; otherwise, with image pull enabled,
    /// the receiver's frame grab with a query string that changes once per
    /// refresh period.
    pub fn media_image_url(&mut self) -> Option<String> {
        if let Some(url) = self.source().and_then(|tx| tx.image_url.clone()) {
            return Some(url);
        }
        if !self.info.image_pull {
            return None;
        }

        let now = Instant::now();
        let due = match self.image.last_refresh {
            Some(at) => now.saturating_duration_since(at) >= self.info.image_pull_refresh,
            None => true,
        };
        if due {
            debug!("{}: updating image", self.info.id);
            self.image.last_refresh = Some(now);
            self.image.serial = self.image.serial.wrapping_add(1);
        }
        Some(format!("http://{}/pull.bmp?{}", self.info.address, self.image.serial))
    }

    /// Switch to the source named `name`
    ///
    /// Returns `Ok(None)` without touching the switch when no transmitter has
    /// that name.
    pub async fn select_source(&mut self, name: &str) -> Result<Option<RouteOutcome>, SwitchError> {
        let Some(id) = self.controller.catalog().by_name(name).map(|tx| tx.id) else {
            debug!("{}: ignoring unknown source {:?}", self.info.id, name);
            return Ok(None);
        };
        self.set_route(id).await.map(Some)
    }

    /// Bind this receiver to `transmitter`
    pub async fn set_route(&mut self, transmitter: TransmitterId) -> Result<RouteOutcome, SwitchError> {
        let usb_endpoint = if self.info.usb {
            Some(&mut self.endpoint)
        } else {
            None
        };
        let outcome = self
            .controller
            .set_route(self.info.id, transmitter, usb_endpoint)
            .await?;

        self.transmitter = Some(transmitter);
        self.image.last_refresh = None;
        Ok(outcome)
    }

    /// Close this receiver's endpoint session
    pub async fn disconnect(&mut self) {
        self.endpoint.disconnect().await;
    }
}
