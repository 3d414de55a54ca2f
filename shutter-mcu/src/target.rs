//! Camera targets and BLE peer identifiers

use serde::{Deserialize, Serialize};

/// Camera the remote is currently aimed at
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraTarget {
    /// Sony A6400, infrared
    #[default]
    IrCamera,
    /// GoPro GP05
    BlePeer1,
    /// GoPro GP09
    BlePeer2,
    /// GoPro GP12
    BlePeer3,
    /// Insta360 RS
    Ble360Peer,
    /// iPhone, connects inbound to our GATT server
    BleServerPeer,
}

/// How a target is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Ir,
    BleClient(PeerId),
    BleServer,
}

impl CameraTarget {
    /// Selection order, as shown in the menu
    pub const ALL: [CameraTarget; 6] = [
        CameraTarget::IrCamera,
        CameraTarget::BlePeer1,
        CameraTarget::BlePeer2,
        CameraTarget::BlePeer3,
        CameraTarget::Ble360Peer,
        CameraTarget::BleServerPeer,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            CameraTarget::IrCamera => "Sony A6400",
            CameraTarget::BlePeer1 => "GP05",
            CameraTarget::BlePeer2 => "GP09",
            CameraTarget::BlePeer3 => "GP12",
            CameraTarget::Ble360Peer => "Insta360",
            CameraTarget::BleServerPeer => "iPhone",
        }
    }

    pub fn transport(self) -> Transport {
        match self {
            CameraTarget::IrCamera => Transport::Ir,
            CameraTarget::BlePeer1 => Transport::BleClient(PeerId(0)),
            CameraTarget::BlePeer2 => Transport::BleClient(PeerId(1)),
            CameraTarget::BlePeer3 => Transport::BleClient(PeerId(2)),
            CameraTarget::Ble360Peer => Transport::BleClient(PeerId(3)),
            CameraTarget::BleServerPeer => Transport::BleServer,
        }
    }
}

impl std::fmt::Display for CameraTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Slot of a BLE client peer in the connection table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub u8);

impl PeerId {
    /// Number of BLE client peers the remote knows about
    pub const COUNT: usize = 4;

    pub fn all() -> impl Iterator<Item = PeerId> {
        (0..Self::COUNT as u8).map(PeerId)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn target(self) -> Option<CameraTarget> {
        CameraTarget::ALL
            .into_iter()
            .find(|t| t.transport() == Transport::BleClient(self))
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target() {
            Some(target) => write!(f, "{} (peer {})", target.label(), self.0),
            None => write!(f, "peer {}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_client_peer_maps_back_to_its_target() {
        for peer in PeerId::all() {
            let target = peer.target().unwrap();
            assert_eq!(target.transport(), Transport::BleClient(peer));
        }
        assert_eq!(PeerId(4).target(), None);
    }

    #[test]
    fn next_and_previous_are_inverse() {
        for t in CameraTarget::ALL {
            assert_eq!(t.next().previous(), t);
        }
        assert_eq!(CameraTarget::BleServerPeer.next(), CameraTarget::IrCamera);
        assert_eq!(CameraTarget::IrCamera.previous(), CameraTarget::BleServerPeer);
    }
}
