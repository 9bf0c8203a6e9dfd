//! Throttled routing cache
//!
//! One cache per switch, shared by all of its receivers. A refresh replaces
//! the whole routing map; the only partial write is the optimistic update
//! after a route change.

use std::time::Duration;

use jap_protocol::{PortLayout, ReceiverId, RoutingMap, TransmitterId};
use tokio::time::Instant;

/// Last known routing state of one switch
#[derive(Debug, Clone)]
pub struct RoutingCache {
    routes: RoutingMap,
    layout: Option<PortLayout>,
    last_refresh: Option<Instant>,
    min_refresh_interval: Duration,
}

impl RoutingCache {
    /// Create an empty cache that refreshes at most once per `min_refresh_interval`
    pub fn new(min_refresh_interval: Duration) -> Self {
        Self {
            routes: RoutingMap::new(),
            layout: None,
            last_refresh: None,
            min_refresh_interval,
        }
    }

    /// Whether a refresh is due at `now`
    pub fn is_stale(&self, now: Instant) -> bool {
        match self.last_refresh {
            Some(at) => now.saturating_duration_since(at) >= self.min_refresh_interval,
            None => true,
        }
    }

    /// Record a refresh attempt, successful or not
    ///
    /// Failed attempts count too, so an unreachable switch is polled no more
    /// often than a healthy one.
    pub fn mark_refreshed(&mut self, now: Instant) {
        self.last_refresh = Some(now);
    }

    /// Time of the last refresh attempt
    pub fn last_refresh(&self) -> Option<Instant> {
        self.last_refresh
    }

    /// Replace the routing map with a freshly decoded snapshot
    pub fn replace(&mut self, routes: RoutingMap) {
        self.routes = routes;
    }

    /// Overwrite one receiver's binding ahead of the next refresh
    pub fn record_route(&mut self, receiver: ReceiverId, transmitter: TransmitterId) {
        self.routes.insert(receiver, transmitter);
    }

    /// Transmitter bound to `receiver`, `None` when the receiver was not in the last dump
    pub fn lookup(&self, receiver: ReceiverId) -> Option<TransmitterId> {
        self.routes.get(receiver)
    }

    /// Current snapshot
    pub fn routes(&self) -> &RoutingMap {
        &self.routes
    }

    /// Discovered port layout
    pub fn layout(&self) -> Option<PortLayout> {
        self.layout
    }

    /// Store the port layout; once set it never changes
    ///
    /// Returns `true` if this call set it.
    pub fn set_layout(&mut self, layout: PortLayout) -> bool {
        if self.layout.is_some() {
            return false;
        }
        self.layout = Some(layout);
        true
    }

    /// Minimum time between refreshes
    pub fn min_refresh_interval(&self) -> Duration {
        self.min_refresh_interval
    }
}
