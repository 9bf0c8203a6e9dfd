//! VLAN table decoding
//!
//! Turns a raw `show vlan` dump into a [`RoutingMap`] using the vendor's
//! [`Dialect`]. On the first dump of a switch the port layout is not yet
//! known and is read from the `JAP_<tx>x<rx>` marker before any line is
//! parsed.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::ParseError;
use crate::layout::PortLayout;
use crate::routing::{RoutingMap, TransmitterId};
use crate::Vendor;

/// Column header line of both dialects (`VLAN  Name  Ports`, `VID  VLAN Name  Interfaces`)
static TABLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(?:vlan|vid)\b.*\bname\b").expect("VLAN table header pattern")
});

/// Whether `text` contains a VLAN table column header
///
/// A reply without one is output of some other command (e.g. the late tail
/// of a configuration command) and must not be decoded as an empty table.
pub fn has_table_header(text: &str) -> bool {
    TABLE_HEADER.is_match(text)
}

/// Result of decoding one VLAN dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedVlans {
    /// Port layout used for the decode (discovered or supplied)
    pub layout: PortLayout,
    /// Receiver to transmitter bindings found in the dump
    pub routes: RoutingMap,
}

/// Decode a VLAN dump
///
/// `known` is the layout discovered from an earlier dump; when `None` the
/// layout marker must be present in `text`.
pub fn decode(
    vendor: Vendor,
    text: &str,
    known: Option<PortLayout>,
) -> Result<DecodedVlans, ParseError> {
    let layout = match known {
        Some(layout) => layout,
        None => {
            let layout = PortLayout::from_marker(text)?;
            debug!(
                "Read switch layout Tx: {}, Rx: {}",
                layout.transmitters, layout.receivers
            );
            layout
        }
    };

    let routes = vendor.dialect().decode_vlans(text, layout)?;
    Ok(DecodedVlans { layout, routes })
}

/// Bind every receiver port in `ports` to `tx`, skipping transmitter and uplink ports
pub(crate) fn bind_ports(
    routes: &mut RoutingMap,
    tx: TransmitterId,
    ports: &[u16],
    layout: PortLayout,
) {
    for &port in ports {
        if let Some(rx) = layout.receiver_for_port(port) {
            routes.insert(rx, tx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ReceiverId;

    #[test]
    fn test_first_dump_discovers_layout() {
        let dump = " 1   JAP_10x20   gi11   Default\n 17  TRANSMITTER_7  gi21  static\n";
        let decoded = decode(Vendor::Cisco, dump, None).unwrap();

        assert_eq!(decoded.layout, PortLayout::new(10, 20));
        assert_eq!(decoded.routes.get(ReceiverId(10)), Some(TransmitterId(7)));
    }

    #[test]
    fn test_known_layout_skips_marker() {
        let dump = " 17  TRANSMITTER_7  gi21  static\n";
        let decoded = decode(Vendor::Cisco, dump, Some(PortLayout::new(10, 20))).unwrap();
        assert_eq!(decoded.routes.len(), 1);
    }

    #[test]
    fn test_missing_marker_fails_first_dump() {
        let dump = " 17  TRANSMITTER_7  gi21  static\n";
        assert_eq!(
            decode(Vendor::Cisco, dump, None).unwrap_err(),
            ParseError::MissingLayoutMarker
        );
    }

    #[test]
    fn test_table_header() {
        assert!(has_table_header(
            "show vlan\r\n\r\nVLAN    Name    Ports    Type    Authorization\r\n"
        ));
        assert!(has_table_header("VID  VLAN Name      Interfaces\r\n"));
        assert!(has_table_header("Vlan       Name        Ports\r\n"));
        assert!(!has_table_header("\r\nswitch01(config)#\r\nswitch01(config-if)#\r\nswitch01#"));
        assert!(!has_table_header(" 11  TRANSMITTER_1  gi1  static\r\n"));
    }

    #[test]
    fn test_luxul_dispatch() {
        let dump = " 1    JAP_10x20    Gi 1/11\n 12   TX_2    Gi 1/21-23\n";
        let decoded = decode(Vendor::Luxul, dump, None).unwrap();
        assert_eq!(decoded.routes.len(), 3);
        assert_eq!(decoded.routes.get(ReceiverId(12)), Some(TransmitterId(2)));
    }
}
