//! Virtual managed switch for testing
//!
//! Speaks enough of the Cisco SG and Luxul CLIs to log in, dump the VLAN
//! table and apply the receiver port changes the control plane sends. VLAN
//! membership is tracked per port so a route change is visible in the next
//! dump.

use std::collections::BTreeMap;
use std::time::Duration;

use jap_protocol::layout::TRANSMITTER_VLAN_OFFSET;
use jap_protocol::{expand_range, PortLayout, ReceiverId, TransmitterId, Vendor};
use tracing::{debug, warn};

/// Width of the Cisco port column before the list wraps
const DEFAULT_WRAP_WIDTH: usize = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginState {
    AwaitUser,
    AwaitPassword,
    LoggedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Exec,
    Config,
    Interface(u16),
}

/// Virtual Just Add Power switch
pub struct VirtualSwitch {
    hostname: String,
    vendor: Vendor,
    layout: PortLayout,
    username: String,
    password: String,
    /// Name VLAN 1 `JAP_<tx>x<rx>`
    marker: bool,
    wrap_width: usize,
    response_delay: Duration,
    responsive: bool,
    /// Receiver port → untagged transmitter VLAN
    untagged: BTreeMap<u16, u16>,
    vlan_table_override: Option<String>,
    login: LoginState,
    attempted_user: String,
    mode: Mode,
    /// Partial line not yet terminated
    pending: Vec<u8>,
    /// Lines received after login (for test verification)
    commands: Vec<String>,
    unrecognized: Vec<String>,
    show_vlan_count: usize,
}

impl VirtualSwitch {
    /// Create a switch with `layout` ports and factory-default `cisco/cisco` login
    pub fn new(hostname: impl Into<String>, vendor: Vendor, layout: PortLayout) -> Self {
        Self {
            hostname: hostname.into(),
            vendor,
            layout,
            username: "cisco".to_string(),
            password: "cisco".to_string(),
            marker: true,
            wrap_width: DEFAULT_WRAP_WIDTH,
            response_delay: Duration::ZERO,
            responsive: true,
            untagged: BTreeMap::new(),
            vlan_table_override: None,
            login: LoginState::AwaitUser,
            attempted_user: String::new(),
            mode: Mode::Exec,
            pending: Vec::new(),
            commands: Vec::new(),
            unrecognized: Vec::new(),
            show_vlan_count: 0,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Leave the `JAP_<tx>x<rx>` marker out of the VLAN table
    pub fn without_marker(mut self) -> Self {
        self.marker = false;
        self
    }

    /// Wrap Cisco port lists at `width` characters
    pub fn with_wrap_width(mut self, width: usize) -> Self {
        self.wrap_width = width;
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn layout(&self) -> PortLayout {
        self.layout
    }

    /// Delay before each reply is written
    pub fn response_delay(&self) -> Duration {
        self.response_delay
    }

    pub fn set_response_delay(&mut self, delay: Duration) {
        self.response_delay = delay;
    }

    /// An unresponsive switch still applies commands but never answers
    pub fn is_responsive(&self) -> bool {
        self.responsive
    }

    pub fn set_responsive(&mut self, responsive: bool) {
        self.responsive = responsive;
    }

    /// Serve `table` verbatim for `show vlan` instead of the rendered table
    pub fn set_vlan_table_override(&mut self, table: Option<String>) {
        self.vlan_table_override = table;
    }

    /// Bind a receiver directly, bypassing the CLI
    pub fn set_route(&mut self, receiver: ReceiverId, transmitter: TransmitterId) {
        self.untagged.insert(
            self.layout.receiver_port(receiver),
            PortLayout::transmitter_vlan(transmitter),
        );
    }

    /// Transmitter whose VLAN the receiver's port is an untagged member of
    pub fn transmitter_for(&self, receiver: ReceiverId) -> Option<TransmitterId> {
        let vlan = *self.untagged.get(&self.layout.receiver_port(receiver))?;
        let id = vlan.checked_sub(TRANSMITTER_VLAN_OFFSET)?;
        (1..=self.layout.transmitters)
            .contains(&id)
            .then_some(TransmitterId(id))
    }

    /// Lines received after login, in arrival order
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Lines the CLI rejected
    pub fn unrecognized(&self) -> &[String] {
        &self.unrecognized
    }

    /// Number of `show vlan` commands served
    pub fn show_vlan_count(&self) -> usize {
        self.show_vlan_count
    }

    /// Start a new login; called for every new connection
    pub fn greeting(&mut self) -> Vec<u8> {
        self.login = LoginState::AwaitUser;
        self.mode = Mode::Exec;
        self.pending.clear();
        b"\r\n\r\nUser Name:".to_vec()
    }

    /// Feed raw bytes from the client and return the reply
    ///
    /// Lines end at `\r` or `\n`; partial lines are kept for the next call.
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
        match self.login {
            LoginState::AwaitUser => {
                self.attempted_user = line.to_string();
                self.login = LoginState::AwaitPassword;
                return "\r\nPassword:".to_string();
            }
            LoginState::AwaitPassword => {
                if self.attempted_user == self.username && line == self.password {
                    debug!("Virtual switch {} login as {}", self.hostname, self.username);
                    self.login = LoginState::LoggedIn;
                    return format!("\r\n{}", self.prompt());
                }
                warn!("Virtual switch {} rejected login", self.hostname);
                self.login = LoginState::AwaitUser;
                return "\r\n% Authentication failed\r\n\r\nUser Name:".to_string();
            }
            LoginState::LoggedIn => {}
        }

        if line.is_empty() {
            return format!("\r\n{}", self.prompt());
        }
        self.commands.push(line.to_string());

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let handled = match (self.mode, tokens.as_slice()) {
            (_, ["end"]) => {
                self.mode = Mode::Exec;
                true
            }
            (Mode::Exec, ["terminal", "datadump"]) => true,
            (Mode::Exec, ["show", "vlan"]) => {
                self.show_vlan_count += 1;
                return format!("\r\n{}\r\n{}", self.vlan_table(), self.prompt());
            }
            (Mode::Exec, ["conf"]) | (Mode::Exec, ["conf", "t"]) => {
                self.mode = Mode::Config;
                true
            }
            (Mode::Config, ["int", port]) | (Mode::Interface(_), ["int", port]) => {
                match port.strip_prefix("ge").and_then(|p| p.parse().ok()) {
                    Some(port) => {
                        self.mode = Mode::Interface(port);
                        true
                    }
                    None => false,
                }
            }
            (Mode::Interface(port), ["sw", rest @ ..]) => self.switchport(port, rest),
            (Mode::Interface(_), ["exit"]) => {
                self.mode = Mode::Config;
                true
            }
            (Mode::Config, ["exit"]) => {
                self.mode = Mode::Exec;
                true
            }
            _ => false,
        };

        if handled {
            format!("\r\n{}", self.prompt())
        } else {
            warn!("Virtual switch {} unrecognized command: {}", self.hostname, line);
            self.unrecognized.push(line.to_string());
            format!("\r\n% Unrecognized command\r\n{}", self.prompt())
        }
    }

    /// `switchport general|hybrid allowed vlan add|remove ...`
    fn switchport(&mut self, port: u16, args: &[&str]) -> bool {
        let (add, remove) = match self.vendor {
            Vendor::Cisco => (["g", "al", "v", "a"], ["g", "al", "v", "r"]),
            Vendor::Luxul => (["hy", "al", "vl", "ad"], ["hy", "al", "vl", "rem"]),
        };
        if args.len() < 5 {
            return false;
        }
        let (verb, operands) = args.split_at(4);

        if verb == remove {
            let Ok(vlans) = expand_range(operands[0]) else {
                return false;
            };
            if self.untagged.get(&port).is_some_and(|v| vlans.contains(v)) {
                self.untagged.remove(&port);
            }
            return true;
        }

        if verb == add {
            // Cisco adds untagged membership with a trailing `u`
            let untagged_ok = match self.vendor {
                Vendor::Cisco => operands.get(1) == Some(&"u"),
                Vendor::Luxul => operands.len() == 1,
            };
            let Ok(vlan) = operands[0].parse::<u16>() else {
                return false;
            };
            if !untagged_ok {
                return false;
            }
            debug!("Virtual switch {} port {} -> VLAN {}", self.hostname, port, vlan);
            self.untagged.insert(port, vlan);
            return true;
        }

        false
    }

    fn prompt(&self) -> String {
        match self.mode {
            Mode::Exec => format!("{}#", self.hostname),
            Mode::Config => format!("{}(config)#", self.hostname),
            Mode::Interface(_) => format!("{}(config-if)#", self.hostname),
        }
    }

    /// Ports per VLAN: VLAN 1 first, then one VLAN per transmitter
    fn memberships(&self) -> Vec<(u16, String, Vec<u16>)> {
        let tx_count = self.layout.transmitters;
        let total_ports = tx_count + 1 + self.layout.receivers;

        let mut vlans: Vec<(u16, String, Vec<u16>)> = (1..=tx_count)
            .map(|t| {
                let vlan = PortLayout::transmitter_vlan(TransmitterId(t));
                let name = match self.vendor {
                    Vendor::Cisco => format!("TRANSMITTER_{}", t),
                    Vendor::Luxul => format!("TX_{}", t),
                };
                let mut ports = vec![t];
                ports.extend(
                    self.untagged
                        .iter()
                        .filter(|(_, v)| **v == vlan)
                        .map(|(&port, _)| port),
                );
                (vlan, name, ports)
            })
            .collect();

        let default_ports = (1..=total_ports)
            .filter(|p| *p > tx_count && !self.untagged.contains_key(p))
            .collect();
        let default_name = if self.marker {
            format!("JAP_{}x{}", self.layout.transmitters, self.layout.receivers)
        } else {
            "default".to_string()
        };
        vlans.insert(0, (1, default_name, default_ports));
        vlans
    }

    fn vlan_table(&self) -> String {
        if let Some(table) = &self.vlan_table_override {
            return table.clone();
        }
        match self.vendor {
            Vendor::Cisco => self.render_cisco(),
            Vendor::Luxul => self.render_luxul(),
        }
    }

    fn render_cisco(&self) -> String {
        let mut out = String::from(
            "VLAN    Name              Ports                Type     Authorization\r\n\
             ---- --------------- ---------------------- --------- -------------\r\n",
        );
        for (vlan, name, ports) in self.memberships() {
            let elements: Vec<String> = port_runs(&ports)
                .into_iter()
                .map(|(lo, hi)| {
                    if lo == hi {
                        format!("gi{}", lo)
                    } else {
                        format!("gi{}-{}", lo, hi)
                    }
                })
                .collect();
            let lines = wrap(&elements, self.wrap_width);
            let kind = if vlan == 1 { "Default" } else { "static" };

            let first = lines.first().map(String::as_str).unwrap_or("");
            out.push_str(&format!(
                " {:<4} {:<17} {:<22} {:<9} Required\r\n",
                vlan, name, first, kind
            ));
            for line in lines.iter().skip(1) {
                out.push_str(&format!("{:24}{}\r\n", "", line));
            }
        }
        out
    }

    fn render_luxul(&self) -> String {
        let mut out = String::from("VID  VLAN Name      Interfaces\r\n---- ------------   ----------------\r\n");
        for (vlan, name, ports) in self.memberships() {
            let list: Vec<String> = port_runs(&ports)
                .into_iter()
                .map(|(lo, hi)| {
                    if lo == hi {
                        format!("1/{}", lo)
                    } else {
                        format!("1/{}-{}", lo, hi)
                    }
                })
                .collect();
            out.push_str(&format!("{:<4} {:<14} Gi {}\r\n", vlan, name, list.join(",")));
        }
        out
    }
}

/// Collapse sorted ports into inclusive runs
fn port_runs(ports: &[u16]) -> Vec<(u16, u16)> {
    let mut sorted = ports.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut runs: Vec<(u16, u16)> = Vec::new();
    for port in sorted {
        match runs.last_mut() {
            Some((_, hi)) if *hi + 1 == port => *hi = port,
            _ => runs.push((port, port)),
        }
    }
    runs
}

/// Greedy wrap; every line but the last ends with `,`
fn wrap(elements: &[String], width: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for element in elements {
        if !current.is_empty() && current.len() + 1 + element.len() > width {
            current.push(',');
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(',');
        }
        current.push_str(element);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use jap_protocol::vlan;

    fn logged_in(vendor: Vendor, layout: PortLayout) -> VirtualSwitch {
        let mut switch = VirtualSwitch::new("switch01", vendor, layout);
        switch.greeting();
        let reply = switch.process_input(b"cisco\rcisco\rterminal datadump\r");
        assert!(String::from_utf8_lossy(&reply).ends_with("switch01#"));
        switch
    }

    fn show_vlan(switch: &mut VirtualSwitch) -> String {
        String::from_utf8_lossy(&switch.process_input(b"show vlan\n")).into_owned()
    }

    #[test]
    fn test_login_rejects_bad_password() {
        let mut switch = VirtualSwitch::new("switch01", Vendor::Cisco, PortLayout::new(4, 4));
        switch.greeting();
        let reply = switch.process_input(b"cisco\rwrong\r");
        assert!(String::from_utf8_lossy(&reply).contains("Authentication failed"));
        assert!(switch.commands().is_empty());
    }

    #[test]
    fn test_partial_lines_are_buffered() {
        let mut switch = logged_in(Vendor::Cisco, PortLayout::new(4, 4));
        assert!(switch.process_input(b"show vl").is_empty());
        assert!(!switch.process_input(b"an\n").is_empty());
        assert_eq!(switch.show_vlan_count(), 1);
    }

    #[test]
    fn test_cisco_table_decodes() {
        let mut switch = logged_in(Vendor::Cisco, PortLayout::new(4, 10)).with_wrap_width(6);
        for rx in 1..=6 {
            switch.set_route(ReceiverId(rx), TransmitterId(2));
        }
        switch.set_route(ReceiverId(9), TransmitterId(3));

        let table = show_vlan(&mut switch);
        let decoded = vlan::decode(Vendor::Cisco, &table, None).unwrap();

        assert_eq!(decoded.layout, PortLayout::new(4, 10));
        for rx in 1..=6 {
            assert_eq!(decoded.routes.get(ReceiverId(rx)), Some(TransmitterId(2)));
        }
        assert_eq!(decoded.routes.get(ReceiverId(9)), Some(TransmitterId(3)));
        assert_eq!(decoded.routes.get(ReceiverId(7)), None);
    }

    #[test]
    fn test_cisco_route_command() {
        let layout = PortLayout::new(4, 4);
        let mut switch = logged_in(Vendor::Cisco, layout);
        let command = Vendor::Cisco.dialect().route_command(
            layout.receiver_port(ReceiverId(2)),
            PortLayout::transmitter_vlan(TransmitterId(3)),
        );

        let reply = String::from_utf8_lossy(&switch.process_input(command.as_bytes())).into_owned();

        assert!(reply.ends_with("switch01#"));
        assert!(switch.unrecognized().is_empty());
        assert_eq!(switch.transmitter_for(ReceiverId(2)), Some(TransmitterId(3)));
    }

    #[test]
    fn test_luxul_route_command() {
        let layout = PortLayout::new(4, 4);
        let mut switch = logged_in(Vendor::Luxul, layout);
        switch.set_route(ReceiverId(1), TransmitterId(1));
        let command = Vendor::Luxul.dialect().route_command(
            layout.receiver_port(ReceiverId(1)),
            PortLayout::transmitter_vlan(TransmitterId(4)),
        );

        switch.process_input(command.as_bytes());

        assert!(switch.unrecognized().is_empty());
        assert_eq!(switch.transmitter_for(ReceiverId(1)), Some(TransmitterId(4)));

        let table = show_vlan(&mut switch);
        let decoded = vlan::decode(Vendor::Luxul, &table, None).unwrap();
        assert_eq!(decoded.routes.get(ReceiverId(1)), Some(TransmitterId(4)));
    }

    #[test]
    fn test_wrong_dialect_rejected() {
        let mut switch = logged_in(Vendor::Luxul, PortLayout::new(4, 4));
        let command = Vendor::Cisco.dialect().route_command(7, 12);
        switch.process_input(command.as_bytes());
        assert!(!switch.unrecognized().is_empty());
        assert_eq!(switch.transmitter_for(ReceiverId(2)), None);
    }

    #[test]
    fn test_unresponsive_switch_applies_silently() {
        let mut switch = logged_in(Vendor::Cisco, PortLayout::new(4, 4));
        switch.set_responsive(false);
        assert!(switch.process_input(b"show vlan\n").is_empty());
        assert_eq!(switch.show_vlan_count(), 1);
    }

    #[test]
    fn test_wrap() {
        let elements: Vec<String> = ["gi1", "gi12-14", "gi20"].iter().map(|s| s.to_string()).collect();
        assert_eq!(wrap(&elements, 12), vec!["gi1,gi12-14,", "gi20"]);
        assert_eq!(wrap(&elements, 40), vec!["gi1,gi12-14,gi20"]);
    }

    #[test]
    fn test_port_runs() {
        assert_eq!(port_runs(&[20, 1, 12, 13, 14]), vec![(1, 1), (12, 14), (20, 20)]);
    }
}
