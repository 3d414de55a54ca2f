//! `config.json` under the remote's home directory

use crate::HostError;
use log::info;
use shutter_mcu::RemoteConfig;
use std::path::Path;

/// Read the config at `path`, writing the defaults there first if it is missing
pub fn load_or_create(path: &Path) -> Result<RemoteConfig, HostError> {
    if !path.exists() {
        let config = RemoteConfig::default();
        save(path, &config)?;
        info!("wrote default config to {}", path.display());
        return Ok(config);
    }
    load(path)
}

pub fn load(path: &Path) -> Result<RemoteConfig, HostError> {
    let data = std::fs::read_to_string(path).map_err(|source| HostError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: RemoteConfig = serde_json::from_str(&data).map_err(|source| HostError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

pub fn save(path: &Path, config: &RemoteConfig) -> Result<(), HostError> {
    let io = |source| HostError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(io)?;
    }
    let data = serde_json::to_string_pretty(config).map_err(|source| HostError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, data).map_err(io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shutter_mcu::{CameraTarget, ConfigError, PeerId};
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("shutter-store-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("config.json")
    }

    #[test]
    fn missing_file_gets_defaults() {
        let path = scratch("defaults");
        let config = load_or_create(&path).unwrap();
        assert_eq!(config, RemoteConfig::default());
        assert!(path.exists());
        assert_eq!(load(&path).unwrap(), config);
    }

    #[test]
    fn edits_survive_a_round_trip() {
        let path = scratch("edits");
        let mut config = RemoteConfig::default();
        config.default_target = CameraTarget::Ble360Peer;
        config.pairing.auto_confirm = false;
        save(&path, &config).unwrap();
        assert_eq!(load_or_create(&path).unwrap(), config);
    }

    #[test]
    fn invalid_file_is_rejected() {
        let path = scratch("invalid");
        let mut config = RemoteConfig::default();
        config.peers[1].peer_id = PeerId(0);
        save(&path, &config).unwrap();
        assert!(matches!(
            load(&path),
            Err(HostError::Config(ConfigError::DuplicatePeer(PeerId(0))))
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load(&path), Err(HostError::Json { .. })));
    }
}
