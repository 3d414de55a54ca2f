//! Peripheral role on hosts
//!
//! btleplug only implements the central role, so the phone target cannot be
//! served from a desktop. Selecting it reports an advertising error.

use crate::HostError;
use log::debug;
use shutter_mcu::{BlePeripheral, Link, PairingResponder};

#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedPeripheral;

impl PairingResponder for UnsupportedPeripheral {
    fn passkey_reply(&mut self, link: Link, _passkey: u32) {
        debug!("ignoring passkey reply for {link}");
    }

    fn confirm_reply(&mut self, link: Link, _accept: bool) {
        debug!("ignoring confirmation for {link}");
    }

    fn security_reply(&mut self, link: Link, _accept: bool) {
        debug!("ignoring security reply for {link}");
    }
}

impl BlePeripheral for UnsupportedPeripheral {
    type Error = HostError;

    fn start_advertising(
        &mut self,
        _device_name: &str,
        _service_uuid: &str,
        _characteristic_uuid: &str,
    ) -> Result<(), HostError> {
        Err(HostError::PeripheralUnsupported)
    }

    fn stop_advertising(&mut self) -> Result<(), HostError> {
        Ok(())
    }

    fn set_value(&mut self, _value: &[u8]) -> Result<(), HostError> {
        Err(HostError::PeripheralUnsupported)
    }

    fn notify(&mut self) -> Result<(), HostError> {
        Err(HostError::PeripheralUnsupported)
    }
}
