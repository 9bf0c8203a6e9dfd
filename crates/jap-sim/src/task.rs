//! Virtual device connection task
//!
//! Drives one connection to a virtual switch or receiver: greets the client,
//! then feeds every chunk it sends into the device and writes back the reply.
//! The device itself is shared so tests can inspect or reconfigure it while
//! the connection is open.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::endpoint::VirtualEndpoint;
use crate::switch::VirtualSwitch;

/// A line-oriented device reachable over a byte stream
pub trait VirtualDevice: Send + 'static {
    /// Name used in logs
    fn hostname(&self) -> &str;

    /// Output written when a client connects
    fn greeting(&mut self) -> Vec<u8>;

    /// Feed client bytes, returning the reply
    fn process_input(&mut self, data: &[u8]) -> Vec<u8>;

    /// Delay before each reply
    fn response_delay(&self) -> Duration;
}

impl VirtualDevice for VirtualSwitch {
    fn hostname(&self) -> &str {
        VirtualSwitch::hostname(self)
    }

    fn greeting(&mut self) -> Vec<u8> {
        VirtualSwitch::greeting(self)
    }

    fn process_input(&mut self, data: &[u8]) -> Vec<u8> {
        VirtualSwitch::process_input(self, data)
    }

    fn response_delay(&self) -> Duration {
        VirtualSwitch::response_delay(self)
    }
}

impl VirtualDevice for VirtualEndpoint {
    fn hostname(&self) -> &str {
        VirtualEndpoint::hostname(self)
    }

    fn greeting(&mut self) -> Vec<u8> {
        VirtualEndpoint::greeting(self)
    }

    fn process_input(&mut self, data: &[u8]) -> Vec<u8> {
        VirtualEndpoint::process_input(self, data)
    }

    fn response_delay(&self) -> Duration {
        VirtualEndpoint::response_delay(self)
    }
}

/// Serve one connection until the client closes it
pub async fn run_virtual_device_task<S, D>(mut stream: S, device: Arc<Mutex<D>>) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    D: VirtualDevice,
{
    let (hostname, greeting) = {
        let mut device = device.lock().await;
        (device.hostname().to_string(), device.greeting())
    };
    info!("Starting virtual device task for {}", hostname);

    if !greeting.is_empty() {
        stream.write_all(&greeting).await?;
        stream.flush().await?;
    }

    let mut buf = [0u8; 1024];
    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => {
                debug!("Virtual device stream closed for {}", hostname);
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Virtual device {} stream error: {}", hostname, e);
                return Err(e);
            }
        };

        // Apply under the lock, reply outside it
        let (reply, delay) = {
            let mut device = device.lock().await;
            (device.process_input(&buf[..n]), device.response_delay())
        };
        if reply.is_empty() {
            continue;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Err(e) = stream.write_all(&reply).await {
            debug!("Virtual device {} client went away: {}", hostname, e);
            break;
        }
        let _ = stream.flush().await;
    }

    info!("Virtual device task ended for {}", hostname);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jap_protocol::{PortLayout, Vendor};
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_switch_session_over_stream() {
        let (mut client, server) = duplex(8192);
        let switch = Arc::new(Mutex::new(VirtualSwitch::new(
            "switch01",
            Vendor::Cisco,
            PortLayout::new(4, 4),
        )));
        let task = tokio::spawn(run_virtual_device_task(server, switch.clone()));

        client.write_all(b"cisco\rcisco\rshow vlan\n").await.unwrap();

        let mut seen = Vec::new();
        let mut buf = [0u8; 1024];
        while !String::from_utf8_lossy(&seen).contains("JAP_4x4") || !seen.ends_with(b"switch01#") {
            let n = client.read(&mut buf).await.unwrap();
            assert_ne!(n, 0);
            seen.extend_from_slice(&buf[..n]);
        }

        drop(client);
        task.await.unwrap().unwrap();
        assert_eq!(switch.lock().await.show_vlan_count(), 1);
    }
}
