//! Physical port layout of a Just Add Power switch
//!
//! A JAP switch is cabled in a fixed order: transmitters occupy ports
//! `1..=tx`, the next port is the uplink, and receivers follow. Each
//! transmitter owns VLAN `id + 10`; receiver ports are untagged members of
//! exactly one transmitter VLAN.
//!
//! The switch advertises its size through a VLAN named `JAP_<tx>x<rx>`
//! (e.g. `JAP_10x20`), which is read once from the first VLAN dump.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::routing::{ReceiverId, TransmitterId, MAX_DEVICE_ID};

/// Offset between a transmitter id and the VLAN it broadcasts on
pub const TRANSMITTER_VLAN_OFFSET: u16 = 10;

/// VLAN range every receiver port is removed from before joining a transmitter
pub const TRUNK_VLAN_RANGE: &str = "11-399";

static LAYOUT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"JAP_(\d+)x(\d+)").expect("layout marker pattern"));

/// Anything that starts like a marker, for error reports
static MARKER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"JAP_\S*").expect("marker token pattern"));

/// Transmitter and receiver port counts of one switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortLayout {
    /// Number of transmitter ports
    pub transmitters: u16,
    /// Number of receiver ports
    pub receivers: u16,
}

impl PortLayout {
    /// Create a layout from known counts
    pub fn new(transmitters: u16, receivers: u16) -> Self {
        Self {
            transmitters,
            receivers,
        }
    }

    /// Read the `JAP_<tx>x<rx>` marker from raw switch output
    ///
    /// The first well-formed marker wins. Counts above 350 are rejected.
    pub fn from_marker(text: &str) -> Result<Self, ParseError> {
        let found = LAYOUT_MARKER.captures_iter(text).find_map(|caps| {
            let transmitters = caps[1].parse::<u16>().ok()?;
            let receivers = caps[2].parse::<u16>().ok()?;
            (transmitters <= MAX_DEVICE_ID && receivers <= MAX_DEVICE_ID)
                .then(|| PortLayout::new(transmitters, receivers))
        });
        if let Some(layout) = found {
            return Ok(layout);
        }

        Err(MARKER_TOKEN
            .find(text)
            .map(|m| ParseError::InvalidLayoutMarker(m.as_str().to_string()))
            .unwrap_or(ParseError::MissingLayoutMarker))
    }

    /// Physical switch port a receiver is cabled to
    ///
    /// Ids and counts are at most 350, which keeps the port well inside `u16`.
    pub fn receiver_port(&self, receiver: ReceiverId) -> u16 {
        receiver.0 + self.transmitters + 1
    }

    /// Receiver cabled to a physical port, or `None` for transmitter and uplink ports
    pub fn receiver_for_port(&self, port: u16) -> Option<ReceiverId> {
        let id = i32::from(port) - (i32::from(self.transmitters) + 1);
        if id > 0 {
            u16::try_from(id).ok().map(ReceiverId)
        } else {
            None
        }
    }

    /// VLAN a transmitter broadcasts on
    pub fn transmitter_vlan(transmitter: TransmitterId) -> u16 {
        transmitter.0 + TRANSMITTER_VLAN_OFFSET
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_marker_in_dump() {
        let dump = "show vlan\r\n\r\n 1    JAP_10x20     gi1-30     Default\r\n";
        assert_eq!(PortLayout::from_marker(dump).unwrap(), PortLayout::new(10, 20));
    }

    #[test]
    fn test_missing_marker() {
        assert_eq!(
            PortLayout::from_marker("VLAN Name Ports").unwrap_err(),
            ParseError::MissingLayoutMarker
        );
    }

    #[test]
    fn test_malformed_marker() {
        assert_eq!(
            PortLayout::from_marker(" 1  JAP_tenxtwenty  gi1").unwrap_err(),
            ParseError::InvalidLayoutMarker("JAP_tenxtwenty".into())
        );
    }

    #[test]
    fn test_first_good_marker_wins() {
        let text = "JAP_x JAP_4x8 JAP_16x32";
        assert_eq!(PortLayout::from_marker(text).unwrap(), PortLayout::new(4, 8));
    }

    #[test]
    fn test_oversized_marker_rejected() {
        assert_eq!(
            PortLayout::from_marker(" 1  JAP_65535x1  gi1").unwrap_err(),
            ParseError::InvalidLayoutMarker("JAP_65535x1".into())
        );
        assert_eq!(
            PortLayout::from_marker("JAP_99999999x4").unwrap_err(),
            ParseError::InvalidLayoutMarker("JAP_99999999x4".into())
        );
        assert_eq!(PortLayout::from_marker("JAP_350x350").unwrap(), PortLayout::new(350, 350));
    }

    #[test]
    fn test_receiver_port() {
        let layout = PortLayout::new(10, 20);
        assert_eq!(layout.receiver_port(ReceiverId(1)), 12);
        assert_eq!(layout.receiver_port(ReceiverId(10)), 21);
    }

    #[test]
    fn test_receiver_for_port() {
        let layout = PortLayout::new(10, 20);
        assert_eq!(layout.receiver_for_port(21), Some(ReceiverId(10)));
        assert_eq!(layout.receiver_for_port(11), None);
        assert_eq!(layout.receiver_for_port(10), None);
        assert_eq!(layout.receiver_for_port(1), None);
    }

    #[test]
    fn test_transmitter_vlan() {
        assert_eq!(PortLayout::transmitter_vlan(TransmitterId(1)), 11);
        assert_eq!(PortLayout::transmitter_vlan(TransmitterId(7)), 17);
    }

    proptest! {
        #[test]
        fn receiver_port_inverts(tx in 1u16..64, rx in 1u16..=350) {
            let layout = PortLayout::new(tx, 350);
            let port = layout.receiver_port(ReceiverId(rx));
            prop_assert_eq!(layout.receiver_for_port(port), Some(ReceiverId(rx)));
        }

        #[test]
        fn transmitter_side_ports_dropped(tx in 1u16..64, port in 0u16..64) {
            let layout = PortLayout::new(tx, 8);
            prop_assume!(port <= tx + 1);
            prop_assert_eq!(layout.receiver_for_port(port), None);
        }
    }
}
