use shutter_mcu::{CharacteristicHandle, ConfigError, PeerId};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("no Bluetooth adapter found")]
    NoAdapter,
    #[error(transparent)]
    Bluetooth(#[from] btleplug::Error),
    #[error("no device with address {0} in range")]
    NotFound(String),
    #[error("{0} is not connected")]
    NotConnected(PeerId),
    #[error("{peer} has no characteristic {handle:?}")]
    UnknownHandle {
        peer: PeerId,
        handle: CharacteristicHandle,
    },
    #[error("invalid UUID {0:?}")]
    InvalidUuid(String),
    #[error("BLE peripheral role is not supported on this host")]
    PeripheralUnsupported,
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}
