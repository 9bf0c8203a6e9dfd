//! Shared switch handle
//!
//! A [`Switch`] owns the single shell connection to one physical switch and
//! that switch's routing cache. Every receiver of the switch holds an
//! `Arc<Switch>`; all switch traffic goes through one async mutex that is
//! held for the whole connect → send → read-until-prompt sequence, so two
//! commands can never interleave on the wire.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use jap_protocol::{
    vlan, ParseError, PortLayout, ReceiverId, RoutingMap, TransmitterId, Vendor, SHOW_VLAN,
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::RoutingCache;
use crate::error::{SessionError, SwitchError};
use crate::session::{CommandSession, ConnectionHealth, Credentials, SessionConfig};
use crate::transport::{BoxedTransport, Connector};

/// Static configuration of one switch
#[derive(Debug, Clone)]
pub struct SwitchConfig {
    /// Hostname or address of the switch
    pub host: String,
    /// Login credentials
    pub credentials: Credentials,
    /// CLI dialect
    pub vendor: Vendor,
    /// Minimum time between VLAN dumps
    pub min_refresh_interval: Duration,
    /// Session timing
    pub session: SessionConfig,
}

/// Whether a route change command was acknowledged by the switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteCommandStatus {
    /// The switch returned to its exec prompt
    Confirmed,
    /// The command timed out or the connection failed; the cache was updated anyway
    Unconfirmed,
}

/// Everything guarded by the switch's exclusivity lock
struct SwitchState {
    session: Option<CommandSession<BoxedTransport>>,
    cache: RoutingCache,
}

/// Handle to one physical switch, shared by all of its receivers
pub struct Switch {
    config: SwitchConfig,
    connector: Arc<dyn Connector>,
    /// Receivers kept in the routing map; empty keeps every decoded receiver
    receivers: BTreeSet<ReceiverId>,
    state: Mutex<SwitchState>,
}

impl Switch {
    /// Create a switch handle; no connection is opened until the first command
    pub fn new(config: SwitchConfig, connector: Arc<dyn Connector>) -> Self {
        let cache = RoutingCache::new(config.min_refresh_interval);
        Self {
            config,
            connector,
            receivers: BTreeSet::new(),
            state: Mutex::new(SwitchState {
                session: None,
                cache,
            }),
        }
    }

    /// Restrict the routing map to the configured receivers
    pub fn with_receivers(mut self, receivers: impl IntoIterator<Item = ReceiverId>) -> Self {
        self.receivers = receivers.into_iter().collect();
        self
    }

    /// Switch hostname
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Switch CLI dialect
    pub fn vendor(&self) -> Vendor {
        self.config.vendor
    }

    /// Session timing
    pub fn session_config(&self) -> &SessionConfig {
        &self.config.session
    }

    /// Port layout, once discovered
    pub async fn layout(&self) -> Option<PortLayout> {
        self.state.lock().await.cache.layout()
    }

    /// Copy of the cached routing map, without refreshing
    pub async fn cached_routes(&self) -> RoutingMap {
        self.state.lock().await.cache.routes().clone()
    }

    /// Run one raw command with the standard timeout
    ///
    /// Waits for any command already in flight; the timeout starts once this
    /// caller owns the session and covers reconnecting if that is needed.
    pub async fn execute(&self, command: &str) -> Result<Vec<u8>, SessionError> {
        let mut state = self.state.lock().await;
        let deadline = Instant::now() + self.config.session.command_timeout();
        self.execute_locked(&mut state, command, deadline).await
    }

    /// Run one raw command that must finish, lock wait included, by `deadline`
    ///
    /// Dropping the returned future also cancels the command; the session is
    /// then replaced on next use instead of being reused mid-exchange.
    pub async fn execute_until(
        &self,
        command: &str,
        deadline: Instant,
    ) -> Result<Vec<u8>, SessionError> {
        let started = Instant::now();
        let mut state = tokio::time::timeout_at(deadline, self.state.lock())
            .await
            .map_err(|_| SessionError::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            })?;
        self.execute_locked(&mut state, command, deadline).await
    }

    /// Transmitter currently bound to `receiver`
    ///
    /// Refreshes the cache first if the throttle window has passed. A failed
    /// refresh is logged and the previous snapshot is used. `None` means the
    /// receiver has no known source, not that something went wrong.
    pub async fn current_transmitter(&self, receiver: ReceiverId) -> Option<TransmitterId> {
        let mut state = self.state.lock().await;

        // Checked under the lock: a caller that waited on a refresh sees it as fresh
        if state.cache.is_stale(Instant::now()) {
            debug!("{}: getting switch configuration for {}", self.config.host, receiver);
            if let Err(e) = self.refresh_locked(&mut state).await {
                warn!("{}: switch refresh failed: {}", self.config.host, e);
            }
        } else {
            debug!("{}: using cached switch configuration for {}", self.config.host, receiver);
        }

        state.cache.lookup(receiver)
    }

    /// Refresh the routing map now, ignoring the throttle, and report failures
    ///
    /// Used at setup so that an unreachable or unrecognised switch fails loudly.
    pub async fn refresh(&self) -> Result<(), SwitchError> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await
    }

    /// Send the route change for `receiver` and record the new binding
    ///
    /// The cache is updated whether or not the switch confirmed the change;
    /// the next refresh corrects it if the change did not take effect.
    pub async fn apply_route(
        &self,
        receiver: ReceiverId,
        transmitter: TransmitterId,
    ) -> Result<RouteCommandStatus, SwitchError> {
        if !receiver.is_valid() {
            return Err(SwitchError::UnknownReceiver(receiver));
        }
        if !transmitter.is_valid() {
            return Err(SwitchError::UnknownTransmitter(transmitter));
        }

        let mut state = self.state.lock().await;
        let layout = state.cache.layout().ok_or(SwitchError::LayoutUnknown)?;

        let command = self.config.vendor.dialect().route_command(
            layout.receiver_port(receiver),
            PortLayout::transmitter_vlan(transmitter),
        );
        let deadline = Instant::now() + self.config.session.command_timeout();

        let status = match self.execute_locked(&mut state, &command, deadline).await {
            Ok(_) => RouteCommandStatus::Confirmed,
            Err(SessionError::Timeout { .. }) => {
                warn!("{}: route change for {} timed out", self.config.host, receiver);
                RouteCommandStatus::Unconfirmed
            }
            Err(e) => {
                warn!("{}: route change for {} failed: {}", self.config.host, receiver, e);
                RouteCommandStatus::Unconfirmed
            }
        };

        state.cache.record_route(receiver, transmitter);
        Ok(status)
    }

    /// Close the switch connection, if one is open
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.session.take() {
            info!("Disconnecting from switch {}", self.config.host);
            session.close().await;
        }
    }

    async fn refresh_locked(&self, state: &mut SwitchState) -> Result<(), SwitchError> {
        state.cache.mark_refreshed(Instant::now());

        let deadline = Instant::now() + self.config.session.command_timeout();
        let data = self.execute_locked(state, SHOW_VLAN, deadline).await?;
        let text = String::from_utf8_lossy(&data);
        if !vlan::has_table_header(&text) {
            return Err(ParseError::MissingVlanTable.into());
        }

        let decoded = vlan::decode(self.config.vendor, &text, state.cache.layout())?;
        if state.cache.set_layout(decoded.layout) {
            info!(
                "{}: configured for Tx: {}, Rx: {}",
                self.config.host, decoded.layout.transmitters, decoded.layout.receivers
            );
        }

        let mut routes = decoded.routes;
        if !self.receivers.is_empty() {
            routes.retain(|rx| self.receivers.contains(&rx));
        }
        debug!("{}: decoded {} routes", self.config.host, routes.len());
        state.cache.replace(routes);
        Ok(())
    }

    async fn execute_locked(
        &self,
        state: &mut SwitchState,
        command: &str,
        deadline: Instant,
    ) -> Result<Vec<u8>, SessionError> {
        let result = match self.ensure_session(state, deadline).await {
            Ok(session) => session.execute(command, deadline).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            if e.is_fatal_to_connection() {
                if let Some(session) = state.session.take() {
                    debug!("{}: dropping connection after {}", self.config.host, e);
                    session.close().await;
                }
            }
        }
        result
    }

    /// Reuse the open session if it still answers, otherwise log in again
    ///
    /// Draining, connecting and logging in all count against `deadline`.
    async fn ensure_session<'a>(
        &self,
        state: &'a mut SwitchState,
        deadline: Instant,
    ) -> Result<&'a mut CommandSession<BoxedTransport>, SessionError> {
        let reusable = match state.session.as_mut() {
            Some(session) if session.is_interrupted() => {
                debug!("{}: previous command was abandoned", self.config.host);
                false
            }
            Some(session) => match session.probe(deadline).await? {
                ConnectionHealth::Alive | ConnectionHealth::Idle => {
                    debug!("{}: using existing connection", self.config.host);
                    true
                }
                ConnectionHealth::Broken => {
                    debug!("{}: existing connection is broken", self.config.host);
                    false
                }
            },
            None => false,
        };
        if reusable {
            return state.session.as_mut().ok_or(SessionError::Closed);
        }

        if let Some(stale) = state.session.take() {
            stale.close().await;
        }

        info!("{}: creating new connection", self.config.host);
        let session_config = &self.config.session;
        let connect_timeout = session_config
            .connect_timeout()
            .min(deadline.saturating_duration_since(Instant::now()));
        let io = self
            .connector
            .connect(&self.config.host, session_config.port, connect_timeout)
            .await
            .map_err(|source| SessionError::Connection {
                host: self.config.host.clone(),
                source,
            })?;

        let session = CommandSession::login(
            &self.config.host,
            io,
            self.config.vendor.dialect(),
            &self.config.credentials,
            session_config.clone(),
            deadline,
        )
        .await?;
        Ok(state.session.insert(session))
    }
}
