//! Cisco SG-series dialect
//!
//! # VLAN dump
//!
//! ```text
//! VLAN    Name              Ports                Type     Authorization
//! ---- --------------- ---------------------- --------- -------------
//!  1      JAP_10x20       gi11,gi32-52          Default   Required
//!  11   TRANSMITTER_1     gi1,gi12-14,          static    Required
//!                         gi20
//!  12   TRANSMITTER_2     gi2,gi15              static    Required
//! ```
//!
//! The port column wraps: a fragment ending in `,` continues on the next
//! line ("run-on" line), whose first field carries the rest of the list.
//!
//! # Route change
//!
//! `conf`, select `ge<port>`, drop the port from the transmitter trunk range,
//! add it untagged to the transmitter VLAN, `end`.

use tracing::trace;

use crate::error::ParseError;
use crate::layout::{PortLayout, TRUNK_VLAN_RANGE};
use crate::range::expand_range;
use crate::routing::{RoutingMap, TransmitterId};
use crate::vlan::bind_ports;
use crate::{Dialect, Vendor};

/// VLAN name prefix of transmitter VLANs
const TRANSMITTER_MARKER: &str = "TRANSMITTER_";

/// Port prefix in the port column
const PORT_TAG: &str = "gi";

/// Cisco command dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct Cisco;

impl Dialect for Cisco {
    fn vendor(&self) -> Vendor {
        Vendor::Cisco
    }

    fn decode_vlans(&self, text: &str, layout: PortLayout) -> Result<RoutingMap, ParseError> {
        let mut routes = RoutingMap::new();
        // Transmitter whose port list wrapped, with the fragments read so far
        let mut run_on: Option<(TransmitterId, String)> = None;

        for line in text.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();

            if let Some((tx, mut ports)) = run_on.take() {
                match fields.first() {
                    Some(fragment) => {
                        ports.push_str(&fragment.replace(PORT_TAG, ""));
                        if ports.ends_with(',') {
                            run_on = Some((tx, ports));
                        } else {
                            finish_block(&mut routes, tx, &ports, layout)?;
                        }
                    }
                    // Blank lines inside a wrapped list carry nothing
                    None => run_on = Some((tx, ports)),
                }
                continue;
            }

            if fields.len() < 3 {
                continue;
            }
            let Some(tx) = transmitter_marker(fields[1])? else {
                continue;
            };
            if !fields[2].contains(PORT_TAG) {
                continue;
            }

            let ports = fields[2].replace(PORT_TAG, "");
            if ports.ends_with(',') {
                run_on = Some((tx, ports));
            } else {
                finish_block(&mut routes, tx, &ports, layout)?;
            }
        }

        // Output cut off inside a wrapped list: keep the ports we did see
        if let Some((tx, ports)) = run_on {
            trace!("VLAN dump ended inside {} port list", tx);
            finish_block(&mut routes, tx, &ports, layout)?;
        }

        Ok(routes)
    }

    fn route_command(&self, receiver_port: u16, transmitter_vlan: u16) -> String {
        format!(
            "conf\r int ge{}\r sw g al v r {}\r sw g al v a {} u\r end\r",
            receiver_port, TRUNK_VLAN_RANGE, transmitter_vlan
        )
    }
}

fn transmitter_marker(field: &str) -> Result<Option<TransmitterId>, ParseError> {
    let Some(idx) = field.find(TRANSMITTER_MARKER) else {
        return Ok(None);
    };
    let id = &field[idx + TRANSMITTER_MARKER.len()..];
    id.parse::<u16>()
        .map(|id| Some(TransmitterId(id)))
        .map_err(|_| ParseError::InvalidTransmitter(field.to_string()))
}

fn finish_block(
    routes: &mut RoutingMap,
    tx: TransmitterId,
    ports: &str,
    layout: PortLayout,
) -> Result<(), ParseError> {
    let ports = expand_range(ports)?;
    trace!("Split data: [{}] {:?}", tx, ports);
    bind_ports(routes, tx, &ports, layout);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::ReceiverId;

    const DUMP: &str = "show vlan\r\n\
        \r\n\
        VLAN    Name              Ports                Type     Authorization\r\n\
        ---- --------------- ---------------------- --------- -------------\r\n \
        1      JAP_10x20       gi11,gi32-52          Default   Required\r\n \
        11   TRANSMITTER_1     gi1,gi12-14,          static    Required\r\n                         \
        gi20\r\n \
        12   TRANSMITTER_2     gi2,gi15              static    Required\r\n \
        13   TRANSMITTER_3     gi3                   static    Required\r\n\
        switch01#";

    fn layout() -> PortLayout {
        PortLayout::new(10, 20)
    }

    #[test]
    fn test_decode_dump() {
        let routes = Cisco.decode_vlans(DUMP, layout()).unwrap();

        // gi12-14 -> Rx1..Rx3, gi20 -> Rx9
        assert_eq!(routes.get(ReceiverId(1)), Some(TransmitterId(1)));
        assert_eq!(routes.get(ReceiverId(3)), Some(TransmitterId(1)));
        assert_eq!(routes.get(ReceiverId(9)), Some(TransmitterId(1)));
        // gi15 -> Rx4
        assert_eq!(routes.get(ReceiverId(4)), Some(TransmitterId(2)));
        // Transmitter-facing ports never become receivers
        assert_eq!(routes.len(), 5);
    }

    #[test]
    fn test_multi_line_run_on() {
        let dump = " 13   TRANSMITTER_3     gi11,          static\n\
                    \x20                        12-14,\n\
                    \x20                        15\n";
        let routes = Cisco.decode_vlans(dump, PortLayout::new(0, 20)).unwrap();

        let ports: Vec<_> = routes.iter().collect();
        assert_eq!(
            ports,
            (11..=15)
                .map(|p| (ReceiverId(p - 1), TransmitterId(3)))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_marker_without_port_tag_ignored() {
        let dump = " 14   TRANSMITTER_4     te1/0/1     static\n";
        assert!(Cisco.decode_vlans(dump, layout()).unwrap().is_empty());
    }

    #[test]
    fn test_short_lines_ignored() {
        let dump = "TRANSMITTER_4 gi15\n\n 14 TRANSMITTER_4\n";
        assert!(Cisco.decode_vlans(dump, layout()).unwrap().is_empty());
    }

    #[test]
    fn test_later_block_wins() {
        let dump = " 11   TRANSMITTER_1     gi12     static\n \
                    12   TRANSMITTER_2     gi12     static\n";
        let routes = Cisco.decode_vlans(dump, layout()).unwrap();
        assert_eq!(routes.get(ReceiverId(1)), Some(TransmitterId(2)));
    }

    #[test]
    fn test_truncated_run_on_keeps_ports() {
        let dump = " 11   TRANSMITTER_1     gi12-13,     static\n";
        let routes = Cisco.decode_vlans(dump, layout()).unwrap();
        assert_eq!(routes.len(), 2);
    }

    #[test]
    fn test_bad_transmitter_id() {
        let dump = " 11   TRANSMITTER_one     gi12     static\n";
        assert_eq!(
            Cisco.decode_vlans(dump, layout()).unwrap_err(),
            ParseError::InvalidTransmitter("TRANSMITTER_one".into())
        );
    }

    #[test]
    fn test_route_command() {
        assert_eq!(
            Cisco.route_command(13, 17),
            "conf\r int ge13\r sw g al v r 11-399\r sw g al v a 17 u\r end\r"
        );
    }
}
