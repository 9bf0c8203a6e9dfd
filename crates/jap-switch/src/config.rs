//! Matrix configuration
//!
//! Loaded from JSON, either from an explicit path or from
//! `$XDG_CONFIG_HOME/japswitch/config.json` (falling back to
//! `~/.config/japswitch/config.json`).

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jap_protocol::routing::{MAX_DEVICE_ID, MIN_DEVICE_ID};
use jap_protocol::{ReceiverId, TransmitterId, Vendor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::Transmitter;
use crate::error::ConfigError;
use crate::receiver::ReceiverInfo;
use crate::session::{Credentials, SessionConfig};
use crate::switch::SwitchConfig;

/// Switch connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchSettings {
    pub host: String,
    #[serde(default = "default_login")]
    pub username: String,
    #[serde(default = "default_login")]
    pub password: String,
    /// Network the receivers are numbered in; receiver N is at subnet + 1 + N
    #[serde(default = "default_rx_subnet")]
    pub rx_subnet: Ipv4Addr,
    /// Seconds between VLAN dumps
    #[serde(default = "default_refresh_secs")]
    pub min_refresh_interval: u64,
    #[serde(default, rename = "type")]
    pub vendor: Vendor,
}

fn default_login() -> String {
    "cisco".to_string()
}

fn default_rx_subnet() -> Ipv4Addr {
    Ipv4Addr::new(10, 128, 0, 0)
}

fn default_refresh_secs() -> u64 {
    10
}

/// Per-receiver settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiverSettings {
    pub name: String,
    #[serde(default)]
    pub usb: bool,
    /// Overrides the address derived from `rx_subnet`
    #[serde(default, deserialize_with = "empty_as_none")]
    pub ip_address: Option<Ipv4Addr>,
    #[serde(default)]
    pub image_pull: bool,
    /// Seconds between frame grabs
    #[serde(default = "default_refresh_secs")]
    pub image_pull_refresh: u64,
}

/// Per-transmitter settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransmitterSettings {
    pub name: String,
    #[serde(default)]
    pub usb: bool,
    /// Static preview image
    #[serde(default, deserialize_with = "empty_as_none")]
    pub url: Option<String>,
}

/// Accept `""` as "not set"
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Complete configuration of one matrix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatrixConfig {
    pub switch: SwitchSettings,
    #[serde(default)]
    pub receivers: BTreeMap<u16, ReceiverSettings>,
    #[serde(default)]
    pub transmitters: BTreeMap<u16, TransmitterSettings>,
    #[serde(default)]
    pub session: SessionConfig,
}

impl MatrixConfig {
    /// Get the XDG config directory for japswitch
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("japswitch"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("japswitch"))
    }

    /// Default location of the configuration file
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Self::config_dir()
            .map(|p| p.join("config.json"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate configuration text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every id is a usable device id
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |id: &u16| (MIN_DEVICE_ID..=MAX_DEVICE_ID).contains(id);
        if let Some(&id) = self.receivers.keys().find(|id| !in_range(id)) {
            return Err(ConfigError::IdOutOfRange { kind: "receiver", id });
        }
        if let Some(&id) = self.transmitters.keys().find(|id| !in_range(id)) {
            return Err(ConfigError::IdOutOfRange {
                kind: "transmitter",
                id,
            });
        }
        Ok(())
    }

    /// Address of a receiver: the configured one, else `rx_subnet + 1 + id`
    pub fn receiver_address(&self, id: ReceiverId) -> Result<Ipv4Addr, ConfigError> {
        if let Some(addr) = self.receivers.get(&id.as_u16()).and_then(|rx| rx.ip_address) {
            return Ok(addr);
        }
        u32::from(self.switch.rx_subnet)
            .checked_add(1)
            .and_then(|gateway| gateway.checked_add(u32::from(id.as_u16())))
            .map(Ipv4Addr::from)
            .ok_or(ConfigError::InvalidAddress(id))
    }

    pub fn switch_config(&self) -> SwitchConfig {
        SwitchConfig {
            host: self.switch.host.clone(),
            credentials: Credentials {
                username: self.switch.username.clone(),
                password: self.switch.password.clone(),
            },
            vendor: self.switch.vendor,
            min_refresh_interval: Duration::from_secs(self.switch.min_refresh_interval),
            session: self.session.clone(),
        }
    }

    pub fn receiver_ids(&self) -> impl Iterator<Item = ReceiverId> + '_ {
        self.receivers.keys().map(|&id| ReceiverId(id))
    }

    /// Receivers with their addresses resolved
    pub fn receiver_infos(&self) -> Result<Vec<ReceiverInfo>, ConfigError> {
        self.receivers
            .iter()
            .map(|(&id, rx)| {
                let id = ReceiverId(id);
                Ok(ReceiverInfo {
                    id,
                    name: rx.name.clone(),
                    address: self.receiver_address(id)?,
                    usb: rx.usb,
                    image_pull: rx.image_pull,
                    image_pull_refresh: Duration::from_secs(rx.image_pull_refresh),
                })
            })
            .collect()
    }

    pub fn transmitters(&self) -> Vec<Transmitter> {
        self.transmitters
            .iter()
            .map(|(&id, tx)| Transmitter {
                id: TransmitterId(id),
                name: tx.name.clone(),
                usb: tx.usb,
                image_url: tx.url.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "switch": { "host": "192.168.1.2" },
        "receivers": { "1": { "name": "Living Room" } },
        "transmitters": { "1": { "name": "Cable" } }
    }"#;

    #[test]
    fn test_defaults() {
        let config = MatrixConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.switch.username, "cisco");
        assert_eq!(config.switch.password, "cisco");
        assert_eq!(config.switch.rx_subnet, Ipv4Addr::new(10, 128, 0, 0));
        assert_eq!(config.switch.min_refresh_interval, 10);
        assert_eq!(config.switch.vendor, Vendor::Cisco);
        assert_eq!(config.session, SessionConfig::default());

        let rx = &config.receivers[&1];
        assert!(!rx.usb);
        assert!(!rx.image_pull);
        assert_eq!(rx.image_pull_refresh, 10);
        assert_eq!(rx.ip_address, None);
        assert_eq!(config.transmitters[&1].url, None);
    }

    #[test]
    fn test_derived_receiver_address() {
        let config = MatrixConfig::from_json(MINIMAL).unwrap();
        assert_eq!(
            config.receiver_address(ReceiverId(1)).unwrap(),
            Ipv4Addr::new(10, 128, 0, 2)
        );
        assert_eq!(
            config.receiver_address(ReceiverId(300)).unwrap(),
            Ipv4Addr::new(10, 128, 1, 45)
        );
    }

    #[test]
    fn test_explicit_receiver_address() {
        let config = MatrixConfig::from_json(
            r#"{
                "switch": { "host": "sw", "type": "luxul" },
                "receivers": {
                    "4": { "name": "Den", "ip_address": "10.0.0.44", "usb": true },
                    "5": { "name": "Bar", "ip_address": "" }
                },
                "transmitters": { "2": { "name": "Roku", "url": "" } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.switch.vendor, Vendor::Luxul);
        assert_eq!(
            config.receiver_address(ReceiverId(4)).unwrap(),
            Ipv4Addr::new(10, 0, 0, 44)
        );
        assert_eq!(
            config.receiver_address(ReceiverId(5)).unwrap(),
            Ipv4Addr::new(10, 128, 0, 6)
        );
        assert_eq!(config.transmitters()[0].image_url, None);
    }

    #[test]
    fn test_address_overflow() {
        let mut config = MatrixConfig::from_json(MINIMAL).unwrap();
        config.switch.rx_subnet = Ipv4Addr::new(255, 255, 255, 255);
        assert!(matches!(
            config.receiver_address(ReceiverId(1)),
            Err(ConfigError::InvalidAddress(ReceiverId(1)))
        ));
    }

    #[test]
    fn test_id_out_of_range() {
        let err = MatrixConfig::from_json(
            r#"{
                "switch": { "host": "sw" },
                "receivers": { "351": { "name": "Too far" } }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::IdOutOfRange {
                kind: "receiver",
                id: 351
            }
        ));

        let err = MatrixConfig::from_json(
            r#"{
                "switch": { "host": "sw" },
                "transmitters": { "0": { "name": "Zero" } }
            }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::IdOutOfRange {
                kind: "transmitter",
                id: 0
            }
        ));
    }

    #[test]
    fn test_missing_host_rejected() {
        assert!(matches!(
            MatrixConfig::from_json(r#"{ "switch": {} }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_switch_config() {
        let config = MatrixConfig::from_json(MINIMAL).unwrap();
        let switch = config.switch_config();
        assert_eq!(switch.host, "192.168.1.2");
        assert_eq!(switch.min_refresh_interval, Duration::from_secs(10));
        assert_eq!(switch.credentials.username, "cisco");
    }
}
