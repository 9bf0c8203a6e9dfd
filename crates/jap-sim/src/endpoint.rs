//! Virtual receiver endpoint for testing
//!
//! A minimal stand-in for the receiver's shell: answers the interface status
//! query with a MAC address and counts USB reconnect directives.

use std::time::Duration;

use jap_protocol::endpoint::{MAC_QUERY, USB_RECONNECT};
use tracing::debug;

const SHELL_PROMPT: &str = "/ # ";

/// Virtual receiver shell
pub struct VirtualEndpoint {
    hostname: String,
    mac: Option<String>,
    responsive: bool,
    response_delay: Duration,
    pending: Vec<u8>,
    /// Lines received (for test verification)
    commands: Vec<String>,
    usb_reconnects: usize,
}

impl VirtualEndpoint {
    pub fn new(hostname: impl Into<String>, mac: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            mac: Some(mac.into()),
            responsive: true,
            response_delay: Duration::ZERO,
            pending: Vec::new(),
            commands: Vec::new(),
            usb_reconnects: 0,
        }
    }

    /// Report interface status without a hardware address
    pub fn without_mac(mut self) -> Self {
        self.mac = None;
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn response_delay(&self) -> Duration {
        self.response_delay
    }

    pub fn set_response_delay(&mut self, delay: Duration) {
        self.response_delay = delay;
    }

    pub fn set_responsive(&mut self, responsive: bool) {
        self.responsive = responsive;
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Number of USB reconnect directives received
    pub fn usb_reconnects(&self) -> usize {
        self.usb_reconnects
    }

    pub fn greeting(&mut self) -> Vec<u8> {
        self.pending.clear();
        if !self.responsive {
            return Vec::new();
        }
        format!("\r\n\r\nBusyBox built-in shell (ash)\r\n\r\n{}", SHELL_PROMPT).into_bytes()
    }

    /// Feed raw bytes from the client and return the reply
    pub fn process_input(&mut self, data: &[u8]) -> Vec<u8> {
        self.pending.extend_from_slice(data);
        let mut output = Vec::new();

        while let Some(end) = self.pending.iter().position(|&b| b == b'\r' || b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line[..end]).trim().to_string();
            let reply = self.process_line(&line);
            if self.responsive {
                output.extend_from_slice(reply.as_bytes());
            }
        }

        output
    }

    fn process_line(&mut self, line: &str) -> String {
        if line.is_empty() {
            return format!("\r\n{}", SHELL_PROMPT);
        }
        self.commands.push(line.to_string());

        if line == MAC_QUERY.trim() {
            return match &self.mac {
                Some(mac) => format!(
                    "\r\neth0:stat Link encap:Ethernet  HWaddr {}\r\n{}",
                    mac, SHELL_PROMPT
                ),
                None => format!("\r\neth0:stat Link encap:Ethernet\r\n{}", SHELL_PROMPT),
            };
        }
        if line == USB_RECONNECT.trim() {
            self.usb_reconnects += 1;
            debug!("Virtual endpoint {} USB reconnect #{}", self.hostname, self.usb_reconnects);
            return format!("\r\n{}", SHELL_PROMPT);
        }

        format!("\r\n-sh: {}: not found\r\n{}", line, SHELL_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jap_protocol::endpoint::parse_mac;

    #[test]
    fn test_mac_reply_parses() {
        let mut endpoint = VirtualEndpoint::new("10.128.0.2", "00:0B:78:00:60:01");
        let reply = endpoint.process_input(MAC_QUERY.as_bytes());
        assert_eq!(
            parse_mac(&String::from_utf8_lossy(&reply)).as_deref(),
            Some("00:0B:78:00:60:01")
        );
    }

    #[test]
    fn test_usb_reconnect_counted() {
        let mut endpoint = VirtualEndpoint::new("10.128.0.2", "00:0B:78:00:60:01");
        let reply = endpoint.process_input(USB_RECONNECT.as_bytes());
        assert!(reply.ends_with(SHELL_PROMPT.as_bytes()));
        assert_eq!(endpoint.usb_reconnects(), 1);
    }

    #[test]
    fn test_unknown_command() {
        let mut endpoint = VirtualEndpoint::new("10.128.0.2", "00:0B:78:00:60:01");
        let reply = String::from_utf8_lossy(&endpoint.process_input(b"reboot\r")).into_owned();
        assert!(reply.contains("not found"));
        assert_eq!(endpoint.commands(), ["reboot"]);
    }
}
