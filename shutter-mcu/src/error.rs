//! Error taxonomy for the control layer

use crate::target::{CameraTarget, PeerId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IrError {
    #[error("IR transmit failed: {0}")]
    TransmitFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BleError {
    #[error("not ready")]
    NotReady,
    #[error("write failed: {0}")]
    WriteFailure(String),
    #[error("no paired peer")]
    NoPeer,
    #[error("connect failed: {0}")]
    ConnectFailure(String),
    #[error("discovery failed: {0}")]
    DiscoveryFailure(String),
    #[error("pairing failed")]
    PairingFailure,
    #[error("advertising failed: {0}")]
    AdvertisingFailure(String),
}

/// What the dispatcher hands back to the UI, whatever the transport
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error(transparent)]
    Ir(#[from] IrError),
    #[error(transparent)]
    Ble(#[from] BleError),
    #[error("no BLE peer configured for {0}")]
    UnknownPeer(PeerId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid MAC address: {0:?}")]
    InvalidMac(String),
    #[error("invalid UUID {uuid:?} for {owner}")]
    InvalidUuid { owner: String, uuid: String },
    #[error("no peer configured for {0}")]
    MissingPeer(CameraTarget),
    #[error("{0} is configured more than once")]
    DuplicatePeer(PeerId),
    #[error("{0} is not a BLE client slot")]
    UnknownPeer(PeerId),
    #[error("passkey {0} does not fit in six digits")]
    InvalidPasskey(u32),
    #[error("invalid IR frame: {0}")]
    InvalidIr(#[from] shutter_proto::ir::FrameError),
}
