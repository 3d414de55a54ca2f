//! Recording doubles of the hardware traits, for unit tests

use crate::ble::{BleCentral, BlePeripheral, CharacteristicHandle, PairingResponder};
use crate::config::MacAddress;
use crate::events::Link;
use crate::ir::IrTransmitter;
use crate::target::PeerId;

#[derive(Debug, Default)]
pub struct MockIr {
    pub sent: Vec<(u32, Vec<u32>)>,
    pub fail: bool,
}

impl IrTransmitter for MockIr {
    type Error = String;

    fn transmit(&mut self, carrier_hz: u32, timings_us: &[u32]) -> Result<(), String> {
        if self.fail {
            return Err("emitter fault".to_string());
        }
        self.sent.push((carrier_hz, timings_us.to_vec()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CentralCall {
    Connect(PeerId, MacAddress),
    DiscoverService(PeerId, String),
    DiscoverCharacteristic(PeerId, String),
    Subscribe(PeerId, CharacteristicHandle),
    Write(PeerId, CharacteristicHandle, Vec<u8>),
    Secure(PeerId),
    Disconnect(PeerId),
    PasskeyReply(Link, u32),
    ConfirmReply(Link, bool),
    SecurityReply(Link, bool),
}

#[derive(Debug, Default)]
pub struct MockCentral {
    pub calls: Vec<CentralCall>,
    /// Every request fails synchronously while set
    pub reject: Option<String>,
}

impl MockCentral {
    pub fn connects(&self, peer: PeerId) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, CentralCall::Connect(p, _) if *p == peer))
            .count()
    }

    pub fn writes(&self) -> Vec<(PeerId, Vec<u8>)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                CentralCall::Write(p, _, data) => Some((*p, data.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, call: CentralCall) -> Result<(), String> {
        if let Some(reason) = &self.reject {
            return Err(reason.clone());
        }
        self.calls.push(call);
        Ok(())
    }
}

impl PairingResponder for MockCentral {
    fn passkey_reply(&mut self, link: Link, passkey: u32) {
        self.calls.push(CentralCall::PasskeyReply(link, passkey));
    }

    fn confirm_reply(&mut self, link: Link, accept: bool) {
        self.calls.push(CentralCall::ConfirmReply(link, accept));
    }

    fn security_reply(&mut self, link: Link, accept: bool) {
        self.calls.push(CentralCall::SecurityReply(link, accept));
    }
}

impl BleCentral for MockCentral {
    type Error = String;

    fn connect(&mut self, peer: PeerId, address: MacAddress) -> Result<(), String> {
        self.record(CentralCall::Connect(peer, address))
    }

    fn discover_service(&mut self, peer: PeerId, service_uuid: &str) -> Result<(), String> {
        self.record(CentralCall::DiscoverService(peer, service_uuid.to_string()))
    }

    fn discover_characteristic(
        &mut self,
        peer: PeerId,
        _service_uuid: &str,
        characteristic_uuid: &str,
    ) -> Result<(), String> {
        self.record(CentralCall::DiscoverCharacteristic(peer, characteristic_uuid.to_string()))
    }

    fn subscribe(&mut self, peer: PeerId, handle: CharacteristicHandle) -> Result<(), String> {
        self.record(CentralCall::Subscribe(peer, handle))
    }

    fn write(&mut self, peer: PeerId, handle: CharacteristicHandle, payload: &[u8]) -> Result<(), String> {
        self.record(CentralCall::Write(peer, handle, payload.to_vec()))
    }

    fn secure(&mut self, peer: PeerId) -> Result<(), String> {
        self.record(CentralCall::Secure(peer))
    }

    fn disconnect(&mut self, peer: PeerId) -> Result<(), String> {
        self.record(CentralCall::Disconnect(peer))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeripheralCall {
    StartAdvertising(String),
    StopAdvertising,
    SetValue(Vec<u8>),
    Notify,
    PasskeyReply(u32),
    ConfirmReply(bool),
    SecurityReply(bool),
}

#[derive(Debug, Default)]
pub struct MockPeripheral {
    pub calls: Vec<PeripheralCall>,
    pub fail_advertising: bool,
    pub fail_notify: bool,
}

impl MockPeripheral {
    pub fn notifications(&self) -> usize {
        self.calls.iter().filter(|c| **c == PeripheralCall::Notify).count()
    }

    pub fn advertising_starts(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, PeripheralCall::StartAdvertising(_)))
            .count()
    }
}

impl PairingResponder for MockPeripheral {
    fn passkey_reply(&mut self, _link: Link, passkey: u32) {
        self.calls.push(PeripheralCall::PasskeyReply(passkey));
    }

    fn confirm_reply(&mut self, _link: Link, accept: bool) {
        self.calls.push(PeripheralCall::ConfirmReply(accept));
    }

    fn security_reply(&mut self, _link: Link, accept: bool) {
        self.calls.push(PeripheralCall::SecurityReply(accept));
    }
}

impl BlePeripheral for MockPeripheral {
    type Error = String;

    fn start_advertising(&mut self, device_name: &str, _service_uuid: &str, _characteristic_uuid: &str) -> Result<(), String> {
        if self.fail_advertising {
            return Err("controller busy".to_string());
        }
        self.calls.push(PeripheralCall::StartAdvertising(device_name.to_string()));
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), String> {
        self.calls.push(PeripheralCall::StopAdvertising);
        Ok(())
    }

    fn set_value(&mut self, value: &[u8]) -> Result<(), String> {
        self.calls.push(PeripheralCall::SetValue(value.to_vec()));
        Ok(())
    }

    fn notify(&mut self) -> Result<(), String> {
        if self.fail_notify {
            return Err("notify queue full".to_string());
        }
        self.calls.push(PeripheralCall::Notify);
        Ok(())
    }
}
