//! BLE hardware traits
//!
//! MCU-specific crates implement these using their BLE stack. Every method
//! only *starts* an operation and returns at once; completions come back as
//! [`crate::StackEvent`]s pushed into the [`crate::EventSink`] the
//! implementation was built with.

use crate::config::MacAddress;
use crate::events::Link;
use crate::target::PeerId;

/// Stack-assigned handle of a discovered characteristic
///
/// Only valid for the link it was discovered on. Connection managers drop
/// it on every disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacteristicHandle(pub u16);

/// Answers the stack's pairing questions
pub trait PairingResponder {
    fn passkey_reply(&mut self, link: Link, passkey: u32);

    fn confirm_reply(&mut self, link: Link, accept: bool);

    fn security_reply(&mut self, link: Link, accept: bool);
}

/// Central (client) role, shared by all outbound peers
pub trait BleCentral: PairingResponder {
    type Error: std::fmt::Display;

    /// Connect by address. Completes with `Connected` or `ConnectFailed`.
    fn connect(&mut self, peer: PeerId, address: MacAddress) -> Result<(), Self::Error>;

    /// Completes with `ServiceDiscovered` or `ServiceNotFound`
    fn discover_service(&mut self, peer: PeerId, service_uuid: &str) -> Result<(), Self::Error>;

    /// Completes with `CharacteristicDiscovered` or `CharacteristicNotFound`
    fn discover_characteristic(
        &mut self,
        peer: PeerId,
        service_uuid: &str,
        characteristic_uuid: &str,
    ) -> Result<(), Self::Error>;

    /// Enable notifications. Completes with `Subscribed` or `SubscribeRejected`.
    fn subscribe(&mut self, peer: PeerId, handle: CharacteristicHandle) -> Result<(), Self::Error>;

    /// Completes with `WriteComplete` or `WriteFailed`
    fn write(
        &mut self,
        peer: PeerId,
        handle: CharacteristicHandle,
        payload: &[u8],
    ) -> Result<(), Self::Error>;

    /// Ask for link encryption. The result arrives as a security event.
    fn secure(&mut self, peer: PeerId) -> Result<(), Self::Error>;

    /// Completes with `Disconnected`
    fn disconnect(&mut self, peer: PeerId) -> Result<(), Self::Error>;
}

/// Peripheral (server) role for the inbound phone
///
/// Answers pairing questions for [`Link::Server`].
pub trait BlePeripheral: PairingResponder {
    type Error: std::fmt::Display;

    /// Register the service and start advertising
    fn start_advertising(
        &mut self,
        device_name: &str,
        service_uuid: &str,
        characteristic_uuid: &str,
    ) -> Result<(), Self::Error>;

    fn stop_advertising(&mut self) -> Result<(), Self::Error>;

    /// Update the characteristic value
    fn set_value(&mut self, value: &[u8]) -> Result<(), Self::Error>;

    /// Notify the connected peer of the current value
    fn notify(&mut self) -> Result<(), Self::Error>;
}
