//! Luxul dialect
//!
//! # VLAN dump
//!
//! ```text
//! VID  VLAN Name      Interfaces
//! ---- ------------   ----------------
//! 1    JAP_10x20      Gi 1/11,1/32-52
//! 11   TX_1           Gi 1/1,1/12-14
//! 12   TX_2           Gi 1/2,1/21-23
//! ```
//!
//! Port lists never wrap, so each transmitter VLAN is exactly one line.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::error::ParseError;
use crate::layout::{PortLayout, TRUNK_VLAN_RANGE};
use crate::range::expand_range;
use crate::routing::{RoutingMap, TransmitterId};
use crate::vlan::bind_ports;
use crate::{Dialect, Vendor};

/// VLAN name marker of transmitter VLANs
const TRANSMITTER_MARKER: &str = "TX_";

/// Interface type column value
const PORT_TAG: &str = "Gi";

/// Unit prefix on every port in the port list
const UNIT_PREFIX: &str = "1/";

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("digit run pattern"));

/// Luxul command dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct Luxul;

impl Dialect for Luxul {
    fn vendor(&self) -> Vendor {
        Vendor::Luxul
    }

    fn decode_vlans(&self, text: &str, layout: PortLayout) -> Result<RoutingMap, ParseError> {
        let mut routes = RoutingMap::new();

        for line in text.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3
                || !fields[1].contains(TRANSMITTER_MARKER)
                || !fields[2].contains(PORT_TAG)
            {
                continue;
            }
            let Some(port_list) = fields.get(3) else {
                continue;
            };

            let tx = transmitter_id(fields[1])?;
            let ports = expand_range(&port_list.replace(UNIT_PREFIX, ""))?;
            trace!("Split data: [{}] {:?}", tx, ports);
            bind_ports(&mut routes, tx, &ports, layout);
        }

        Ok(routes)
    }

    fn route_command(&self, receiver_port: u16, transmitter_vlan: u16) -> String {
        format!(
            "conf t\r int ge{}\r sw hy al vl rem {}\r sw hy al vl ad {}\r end\r",
            receiver_port, TRUNK_VLAN_RANGE, transmitter_vlan
        )
    }
}

/// First run of digits in the VLAN name
fn transmitter_id(field: &str) -> Result<TransmitterId, ParseError> {
    DIGITS
        .find(field)
        .and_then(|digits| digits.as_str().parse::<u16>().ok())
        .map(TransmitterId)
        .ok_or_else(|| ParseError::InvalidTransmitter(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ReceiverId;

    const DUMP: &str = "show vlan\r\n\
        VID  VLAN Name      Interfaces\r\n\
        ---- ------------   ----------------\r\n\
        1    JAP_10x20      Gi 1/11,1/32-52\r\n\
        11   TX_1           Gi 1/1,1/12-14\r\n\
        12   TX_2           Gi 1/2,1/21-23\r\n\
        japluxul01#";

    #[test]
    fn test_decode_dump() {
        let routes = Luxul.decode_vlans(DUMP, PortLayout::new(10, 20)).unwrap();

        assert_eq!(routes.get(ReceiverId(1)), Some(TransmitterId(1)));
        assert_eq!(routes.get(ReceiverId(3)), Some(TransmitterId(1)));
        assert_eq!(routes.get(ReceiverId(10)), Some(TransmitterId(2)));
        assert_eq!(routes.get(ReceiverId(12)), Some(TransmitterId(2)));
        assert_eq!(routes.len(), 6);
    }

    #[test]
    fn test_ports_map_to_transmitter() {
        let dump = "12   TX_2    Gi 1/21-23\n";
        let routes = Luxul.decode_vlans(dump, PortLayout::new(0, 30)).unwrap();

        let receivers: Vec<_> = routes.iter().map(|(rx, _)| rx.0 + 1).collect();
        assert_eq!(receivers, vec![21, 22, 23]);
        assert!(routes.iter().all(|(_, tx)| tx == TransmitterId(2)));
    }

    #[test]
    fn test_missing_port_tag_ignored() {
        let dump = "12   TX_2    Te 1/21-23\n";
        assert!(Luxul.decode_vlans(dump, PortLayout::new(10, 20)).unwrap().is_empty());
    }

    #[test]
    fn test_missing_port_list_ignored() {
        let dump = "12   TX_2    Gi\n";
        assert!(Luxul.decode_vlans(dump, PortLayout::new(10, 20)).unwrap().is_empty());
    }

    #[test]
    fn test_transmitter_id_digits() {
        assert_eq!(transmitter_id("TX_12").unwrap(), TransmitterId(12));
        assert_eq!(transmitter_id("TX_3_lobby").unwrap(), TransmitterId(3));
        assert!(transmitter_id("TX_").is_err());
    }

    #[test]
    fn test_route_command() {
        assert_eq!(
            Luxul.route_command(13, 17),
            "conf t\r int ge13\r sw hy al vl rem 11-399\r sw hy al vl ad 17\r end\r"
        );
    }
}
