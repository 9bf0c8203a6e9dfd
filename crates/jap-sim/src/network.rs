//! In-memory network of virtual devices
//!
//! Maps hostnames to virtual switches and receivers. Opening a connection
//! spawns a device task on one end of a `tokio::io::duplex` pair and hands
//! back the other end.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::io::DuplexStream;
use tokio::sync::Mutex;
use tracing::debug;

use crate::endpoint::VirtualEndpoint;
use crate::switch::VirtualSwitch;
use crate::task::{run_virtual_device_task, VirtualDevice};

/// Buffer size of each simulated connection
const LINK_BUFFER: usize = 64 * 1024;

pub type SharedSwitch = Arc<Mutex<VirtualSwitch>>;
pub type SharedEndpoint = Arc<Mutex<VirtualEndpoint>>;

#[derive(Clone)]
enum Device {
    Switch(SharedSwitch),
    Endpoint(SharedEndpoint),
}

struct Host {
    device: Device,
    reachable: bool,
    connections: usize,
}

/// Hostname → virtual device table
#[derive(Default)]
pub struct VirtualNetwork {
    hosts: StdMutex<HashMap<String, Host>>,
}

impl VirtualNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a switch; returns a handle for inspecting it
    pub fn add_switch(&self, host: impl Into<String>, switch: VirtualSwitch) -> SharedSwitch {
        let shared = Arc::new(Mutex::new(switch));
        self.insert(host.into(), Device::Switch(shared.clone()));
        shared
    }

    /// Attach a receiver endpoint; returns a handle for inspecting it
    pub fn add_endpoint(&self, host: impl Into<String>, endpoint: VirtualEndpoint) -> SharedEndpoint {
        let shared = Arc::new(Mutex::new(endpoint));
        self.insert(host.into(), Device::Endpoint(shared.clone()));
        shared
    }

    /// Refuse new connections to `host` while `false`
    pub fn set_reachable(&self, host: &str, reachable: bool) {
        if let Some(entry) = self.lock().get_mut(host) {
            entry.reachable = reachable;
        }
    }

    /// Number of connections opened to `host` so far
    pub fn connection_count(&self, host: &str) -> usize {
        self.lock().get(host).map(|h| h.connections).unwrap_or(0)
    }

    /// Open a connection to `host`
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self, host: &str) -> io::Result<DuplexStream> {
        let device = {
            let mut hosts = self.lock();
            let entry = hosts
                .get_mut(host)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no route to {}", host)))?;
            if !entry.reachable {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    format!("{} unreachable", host),
                ));
            }
            entry.connections += 1;
            entry.device.clone()
        };

        let (client, server) = tokio::io::duplex(LINK_BUFFER);
        debug!("Opening virtual connection to {}", host);
        match device {
            Device::Switch(switch) => spawn_device(server, switch),
            Device::Endpoint(endpoint) => spawn_device(server, endpoint),
        }
        Ok(client)
    }

    fn insert(&self, host: String, device: Device) {
        self.lock().insert(
            host,
            Host {
                device,
                reachable: true,
                connections: 0,
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Host>> {
        self.hosts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn spawn_device<D: VirtualDevice>(server: DuplexStream, device: Arc<Mutex<D>>) {
    tokio::spawn(async move {
        if let Err(e) = run_virtual_device_task(server, device).await {
            debug!("Virtual device task failed: {}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use jap_protocol::{PortLayout, Vendor};

    #[tokio::test]
    async fn test_unknown_host() {
        let network = VirtualNetwork::new();
        let err = network.open("10.0.0.1").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let network = VirtualNetwork::new();
        network.add_switch("sw", VirtualSwitch::new("sw", Vendor::Cisco, PortLayout::new(2, 2)));
        network.set_reachable("sw", false);

        let err = network.open("sw").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
        assert_eq!(network.connection_count("sw"), 0);

        network.set_reachable("sw", true);
        assert!(network.open("sw").is_ok());
        assert_eq!(network.connection_count("sw"), 1);
    }
}
