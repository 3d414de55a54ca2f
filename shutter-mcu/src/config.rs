//! Provisioned configuration
//!
//! Peer addresses and UUIDs are fixed ahead of time; nothing here is
//! discovered at runtime. `RemoteConfig::default()` carries the values the
//! remote ships with, and hosts may load an override from JSON.

use crate::error::ConfigError;
use crate::target::{CameraTarget, PeerId};
use serde::{Deserialize, Serialize};
use shutter_proto::ble as uuids;
use shutter_proto::ir::{self, SonyFrame};
use std::str::FromStr;

/// Six-byte Bluetooth device address, written `AA:BB:CC:DD:EE:FF`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(pub [u8; 6]);

impl FromStr for MacAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidMac(s.to_string());

        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(MacAddress(bytes))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// BLE role the remote plays towards a configured peer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerRole {
    /// We are the central and initiate the connection
    #[default]
    Client,
}

/// When a client peer gets connected
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectPolicy {
    /// On the first trigger aimed at it
    #[default]
    Lazy,
    /// As soon as the remote starts
    Eager,
}

/// A camera we connect out to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlePeerDescriptor {
    pub peer_id: PeerId,
    pub name: String,
    pub mac_address: MacAddress,
    pub service_uuid: String,
    pub characteristic_uuid: String,
    #[serde(default)]
    pub role: PeerRole,
    #[serde(default)]
    pub requires_pairing: bool,
    #[serde(default)]
    pub connect: ConnectPolicy,
}

impl BlePeerDescriptor {
    pub fn gopro(peer_id: PeerId, name: &str, mac: [u8; 6]) -> Self {
        Self {
            peer_id,
            name: name.to_string(),
            mac_address: MacAddress(mac),
            service_uuid: uuids::GOPRO_SERVICE_UUID.to_string(),
            characteristic_uuid: uuids::GOPRO_COMMAND_UUID.to_string(),
            role: PeerRole::Client,
            requires_pairing: true,
            connect: ConnectPolicy::Lazy,
        }
    }

    pub fn insta360(peer_id: PeerId, name: &str, mac: [u8; 6]) -> Self {
        Self {
            peer_id,
            name: name.to_string(),
            mac_address: MacAddress(mac),
            service_uuid: uuids::INSTA360_SERVICE_UUID.to_string(),
            characteristic_uuid: uuids::INSTA360_COMMAND_UUID.to_string(),
            role: PeerRole::Client,
            requires_pairing: true,
            connect: ConnectPolicy::Lazy,
        }
    }
}

/// How pairing requests are answered
///
/// The shipped defaults hand every peer the same passkey and accept every
/// confirmation. That suits a single-owner remote; set `auto_confirm` to
/// false to only confirm PINs matching `passkey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairingPolicy {
    pub passkey: u32,
    pub auto_confirm: bool,
    pub accept_security_requests: bool,
}

impl Default for PairingPolicy {
    fn default() -> Self {
        Self {
            passkey: shutter_proto::DEFAULT_PASSKEY,
            auto_confirm: true,
            accept_security_requests: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonyIrConfig {
    pub code: u32,
    pub bits: u8,
    pub repeats: u8,
    pub carrier_hz: u32,
}

impl SonyIrConfig {
    pub fn frame(&self) -> Result<SonyFrame, ConfigError> {
        Ok(SonyFrame::new(self.code, self.bits)?)
    }
}

impl Default for SonyIrConfig {
    fn default() -> Self {
        Self {
            code: ir::SONY_SHUTTER_CODE,
            bits: ir::SONY_SHUTTER_BITS,
            repeats: ir::SONY_MIN_REPEAT,
            carrier_hz: ir::SONY_CARRIER_HZ,
        }
    }
}

/// Our own GATT service, offered to the phone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub service_uuid: String,
    pub characteristic_uuid: String,
    pub notify_payload: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_uuid: uuids::REMOTE_SERVICE_UUID.to_string(),
            characteristic_uuid: uuids::REMOTE_SHUTTER_UUID.to_string(),
            notify_payload: shutter_proto::payload::SHUTTER_TRIGGERED,
        }
    }
}

/// Deadlines enforced by [`crate::PeerConnection::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// From connect request until READY
    pub connect_ms: u64,
    /// From write request until the stack acknowledges it
    pub write_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub device_name: String,
    pub default_target: CameraTarget,
    pub poll_interval_ms: u64,
    pub connect_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Byte written to client cameras to toggle recording
    pub shutter_payload: u8,
    pub pairing: PairingPolicy,
    pub ir: SonyIrConfig,
    pub peers: Vec<BlePeerDescriptor>,
    pub server: ServerConfig,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            device_name: shutter_proto::DEVICE_NAME.to_string(),
            default_target: CameraTarget::IrCamera,
            poll_interval_ms: 100,
            connect_timeout_ms: 10_000,
            write_timeout_ms: 300,
            shutter_payload: shutter_proto::payload::TOGGLE_RECORD,
            pairing: PairingPolicy::default(),
            ir: SonyIrConfig::default(),
            // Placeholders, replace with the real camera addresses.
            peers: vec![
                BlePeerDescriptor::gopro(PeerId(0), "GP05", [0xD0, 0x00, 0x00, 0x00, 0x00, 0x05]),
                BlePeerDescriptor::gopro(PeerId(1), "GP09", [0xD0, 0x00, 0x00, 0x00, 0x00, 0x09]),
                BlePeerDescriptor::gopro(PeerId(2), "GP12", [0xD0, 0x00, 0x00, 0x00, 0x00, 0x12]),
                BlePeerDescriptor::insta360(PeerId(3), "Insta360", [0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA]),
            ],
            server: ServerConfig::default(),
        }
    }
}

impl RemoteConfig {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect_ms: self.connect_timeout_ms,
            write_ms: self.write_timeout_ms,
        }
    }

    pub fn peer(&self, id: PeerId) -> Option<&BlePeerDescriptor> {
        self.peers.iter().find(|p| p.peer_id == id)
    }

    /// Checks that every client slot has exactly one well-formed descriptor
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = [false; PeerId::COUNT];
        for peer in &self.peers {
            let slot = seen
                .get_mut(peer.peer_id.index())
                .ok_or(ConfigError::UnknownPeer(peer.peer_id))?;
            if *slot {
                return Err(ConfigError::DuplicatePeer(peer.peer_id));
            }
            *slot = true;

            for uuid in [&peer.service_uuid, &peer.characteristic_uuid] {
                if !uuids::is_uuid_str(uuid) {
                    return Err(ConfigError::InvalidUuid {
                        owner: peer.name.clone(),
                        uuid: uuid.clone(),
                    });
                }
            }
        }

        if let Some(missing) = PeerId::all().find(|id| !seen[id.index()]) {
            // every slot below COUNT maps to a target
            let target = missing.target().ok_or(ConfigError::UnknownPeer(missing))?;
            return Err(ConfigError::MissingPeer(target));
        }

        for uuid in [&self.server.service_uuid, &self.server.characteristic_uuid] {
            if !uuids::is_uuid_str(uuid) {
                return Err(ConfigError::InvalidUuid {
                    owner: "server".to_string(),
                    uuid: uuid.clone(),
                });
            }
        }

        if !shutter_proto::is_valid_passkey(self.pairing.passkey) {
            return Err(ConfigError::InvalidPasskey(self.pairing.passkey));
        }

        self.ir.frame()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        RemoteConfig::default().validate().unwrap();
    }

    #[test]
    fn mac_parse_and_display() {
        let mac: MacAddress = "c0:ff:ee:00:00:05".parse().unwrap();
        assert_eq!(mac.0, [0xC0, 0xFF, 0xEE, 0x00, 0x00, 0x05]);
        assert_eq!(mac.to_string(), "C0:FF:EE:00:00:05");

        for bad in ["", "XX:XX:XX:XX:XX:XX", "C0:FF:EE:00:00", "C0:FF:EE:00:00:05:01", "C0F:F:EE:00:00:05"] {
            assert_eq!(bad.parse::<MacAddress>(), Err(ConfigError::InvalidMac(bad.to_string())));
        }
    }

    #[test]
    fn missing_peer_is_reported() {
        let mut config = RemoteConfig::default();
        config.peers.retain(|p| p.peer_id != PeerId(3));
        assert_eq!(config.validate(), Err(ConfigError::MissingPeer(CameraTarget::Ble360Peer)));
    }

    #[test]
    fn duplicate_and_out_of_range_peers_are_rejected() {
        let mut config = RemoteConfig::default();
        config.peers[1].peer_id = PeerId(0);
        assert_eq!(config.validate(), Err(ConfigError::DuplicatePeer(PeerId(0))));

        let mut config = RemoteConfig::default();
        config.peers[1].peer_id = PeerId(9);
        assert_eq!(config.validate(), Err(ConfigError::UnknownPeer(PeerId(9))));
    }

    #[test]
    fn bad_uuid_passkey_and_ir_are_rejected() {
        let mut config = RemoteConfig::default();
        config.peers[0].characteristic_uuid = "fea6".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUuid { .. })));

        let mut config = RemoteConfig::default();
        config.pairing.passkey = 1_000_000;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPasskey(1_000_000)));

        let mut config = RemoteConfig::default();
        config.ir.bits = 8;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidIr(_))));
    }
}
