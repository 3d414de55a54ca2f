//! Default GATT UUIDs for the supported camera families
//!
//! These are the values `RemoteConfig::default()` provisions. Deployments
//! override them in the configuration file when a camera uses other UUIDs.

/// GoPro control service (16-bit 0xFEA6)
pub const GOPRO_SERVICE_UUID: &str = "0000fea6-0000-1000-8000-00805f9b34fb";

/// GoPro command characteristic (write/notify)
pub const GOPRO_COMMAND_UUID: &str = "b5f90072-aa8d-11e3-9046-0002a5d5c51b";

/// Insta360 remote service (16-bit 0xBE80)
pub const INSTA360_SERVICE_UUID: &str = "0000be80-0000-1000-8000-00805f9b34fb";

/// Insta360 command characteristic
pub const INSTA360_COMMAND_UUID: &str = "0000be81-0000-1000-8000-00805f9b34fb";

/// Service the remote exposes to the phone when running as a GATT server
pub const REMOTE_SERVICE_UUID: &str = "5c4a1000-3b1f-4d8e-9a21-8f0c2e6d7a10";

/// Shutter characteristic on the remote's own service (read/notify)
pub const REMOTE_SHUTTER_UUID: &str = "5c4a1001-3b1f-4d8e-9a21-8f0c2e6d7a10";

/// Checks the canonical 8-4-4-4-12 hex layout of a 128-bit UUID string
pub fn is_uuid_str(s: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    let mut parts = s.split('-');
    for len in GROUPS {
        match parts.next() {
            Some(p) if p.len() == len && p.bytes().all(|b| b.is_ascii_hexdigit()) => {}
            _ => return false,
        }
    }
    parts.next().is_none()
}
