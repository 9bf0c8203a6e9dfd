//! Receiver endpoint shell commands
//!
//! Receivers run a small shell on the same telnet port. Only two commands
//! are used: reading the interface status to learn the MAC address, and
//! forcing the USB extender to reconnect after a route change.

use std::sync::LazyLock;

use regex::Regex;

/// Query the receiver's ethernet interface status
pub const MAC_QUERY: &str = "ifconfig | grep eth0:stat\r";

/// Force the receiver to renegotiate its USB-over-IP link
pub const USB_RECONNECT: &str = "e e_reconnect\r";

static MAC_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("([0-9A-F]{2}[:-]){5}[0-9A-F]{2}").expect("MAC address pattern")
});

/// Extract the first MAC address (`AA:BB:CC:DD:EE:FF` or dash separated) from shell output
///
/// Only upper-case hex digits are accepted, matching the receiver's ifconfig output.
pub fn parse_mac(text: &str) -> Option<String> {
    MAC_ADDRESS.find(text).map(|m| m.as_str().to_string())
}
