//! Shutter remote protocol definitions
//!
//! Transport-level constants shared by the controller logic (`shutter-mcu`)
//! and the host tooling (`shutter-host`, `shutter-remote`):
//! - [`ble`]: default GATT service and characteristic UUIDs per camera family
//! - [`ir`]: Sony SIRC frame encoding into mark/space timings
//!
//! This crate has no dependencies so it can be used from any firmware target.

pub mod ble;
pub mod ir;

/// Name the remote advertises when acting as a GATT server
pub const DEVICE_NAME: &str = "M5StickCPlus_CameraControl";

/// Payload bytes written to / notified on control characteristics
pub mod payload {
    /// Toggle (start/stop) recording on a BLE client camera
    pub const TOGGLE_RECORD: u8 = 0x01;

    /// "Shutter triggered" notification sent to the paired phone
    pub const SHUTTER_TRIGGERED: u8 = 0x01;
}

/// Passkey the remote answers with when a peer asks for one
pub const DEFAULT_PASSKEY: u32 = 123_456;

/// Largest passkey representable in the six-digit BLE passkey entry
pub const MAX_PASSKEY: u32 = 999_999;

/// Returns true when `passkey` fits in the six-digit passkey space
pub fn is_valid_passkey(passkey: u32) -> bool {
    passkey <= MAX_PASSKEY
}
