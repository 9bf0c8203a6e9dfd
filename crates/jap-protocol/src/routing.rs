//! Receiver and transmitter identities and the decoded routing map

use std::collections::BTreeMap;
use std::fmt;

/// Lowest valid receiver or transmitter id
pub const MIN_DEVICE_ID: u16 = 1;

/// Highest valid receiver or transmitter id
pub const MAX_DEVICE_ID: u16 = 350;

/// Identifier of a transmitter (video source)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TransmitterId(pub u16);

impl TransmitterId {
    /// Get the raw id value
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Whether the id lies in the supported 1..=350 range
    pub fn is_valid(&self) -> bool {
        (MIN_DEVICE_ID..=MAX_DEVICE_ID).contains(&self.0)
    }
}

impl fmt::Display for TransmitterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tx{}", self.0)
    }
}

/// Identifier of a receiver (video sink)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ReceiverId(pub u16);

impl ReceiverId {
    /// Get the raw id value
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Whether the id lies in the supported 1..=350 range
    pub fn is_valid(&self) -> bool {
        (MIN_DEVICE_ID..=MAX_DEVICE_ID).contains(&self.0)
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rx{}", self.0)
    }
}

/// Snapshot of which transmitter each receiver is bound to
///
/// Built in document order from a VLAN dump, so when two VLAN blocks claim
/// the same receiver the later block wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingMap {
    routes: BTreeMap<ReceiverId, TransmitterId>,
}

impl RoutingMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a receiver to a transmitter, replacing any previous binding
    pub fn insert(&mut self, receiver: ReceiverId, transmitter: TransmitterId) {
        self.routes.insert(receiver, transmitter);
    }

    /// Transmitter bound to `receiver`, if the receiver appeared in the dump
    pub fn get(&self, receiver: ReceiverId) -> Option<TransmitterId> {
        self.routes.get(&receiver).copied()
    }

    /// Drop every receiver not accepted by `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(ReceiverId) -> bool) {
        self.routes.retain(|rx, _| keep(*rx));
    }

    /// Number of bound receivers
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no receiver is bound
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterate bindings in receiver id order
    pub fn iter(&self) -> impl Iterator<Item = (ReceiverId, TransmitterId)> + '_ {
        self.routes.iter().map(|(rx, tx)| (*rx, *tx))
    }
}

impl FromIterator<(ReceiverId, TransmitterId)> for RoutingMap {
    fn from_iter<I: IntoIterator<Item = (ReceiverId, TransmitterId)>>(iter: I) -> Self {
        let mut map = RoutingMap::new();
        for (rx, tx) in iter {
            map.insert(rx, tx);
        }
        map
    }
}
