//! GATT server role for the phone
//!
//! The remote advertises its own service and waits for the phone to connect
//! and pair. Pressing the shutter then notifies the phone, which takes the
//! picture itself.

use crate::ble::BlePeripheral;
use crate::config::ServerConfig;
use crate::error::BleError;
use crate::events::ServerEvent;
use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerConnectionState {
    Disconnected,
    Connected,
    Paired,
}

pub struct BlePeripheralRole<P> {
    peripheral: P,
    device_name: String,
    config: ServerConfig,
    state: ServerConnectionState,
    advertising: bool,
    notified: bool,
    last_error: Option<BleError>,
}

impl<P: BlePeripheral> BlePeripheralRole<P> {
    pub fn new(peripheral: P, device_name: impl Into<String>, config: ServerConfig) -> Self {
        Self {
            peripheral,
            device_name: device_name.into(),
            config,
            state: ServerConnectionState::Disconnected,
            advertising: false,
            notified: false,
            last_error: None,
        }
    }

    pub fn state(&self) -> ServerConnectionState {
        self.state
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn last_error(&self) -> Option<&BleError> {
        self.last_error.as_ref()
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    pub fn peripheral_mut(&mut self) -> &mut P {
        &mut self.peripheral
    }

    /// Register the service and advertise; a no-op while advertising or connected
    pub fn start(&mut self) -> Result<(), BleError> {
        if self.advertising || self.state != ServerConnectionState::Disconnected {
            return Ok(());
        }

        info!("advertising as {}", self.device_name);
        match self.peripheral.start_advertising(
            &self.device_name,
            &self.config.service_uuid,
            &self.config.characteristic_uuid,
        ) {
            Ok(()) => {
                self.advertising = true;
                if matches!(self.last_error, Some(BleError::AdvertisingFailure(_))) {
                    self.last_error = None;
                }
                Ok(())
            }
            Err(e) => {
                warn!("could not start advertising: {e}");
                let err = BleError::AdvertisingFailure(e.to_string());
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn stop(&mut self) -> Result<(), BleError> {
        if !self.advertising {
            return Ok(());
        }
        self.advertising = false;
        self.peripheral
            .stop_advertising()
            .map_err(|e| BleError::AdvertisingFailure(e.to_string()))
    }

    pub fn on_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Connected => self.on_connected(),
            ServerEvent::Disconnected => self.on_disconnected(),
            ServerEvent::NotifyFailed(reason) => {
                warn!("shutter notification not delivered: {reason}");
                self.notified = false;
                self.last_error = Some(BleError::WriteFailure(reason));
            }
        }
    }

    pub fn on_connected(&mut self) {
        info!("phone connected");
        // The stack stops advertising once a central connects.
        self.advertising = false;
        self.notified = false;
        if self.state == ServerConnectionState::Disconnected {
            self.state = ServerConnectionState::Connected;
        }
    }

    /// Back to DISCONNECTED and advertising again
    pub fn on_disconnected(&mut self) {
        if self.state != ServerConnectionState::Disconnected {
            info!("phone disconnected");
        }
        self.state = ServerConnectionState::Disconnected;
        self.advertising = false;
        self.notified = false;
        if let Err(e) = self.start() {
            debug!("re-advertising deferred: {e}");
        }
    }

    /// Pairing result for the inbound link
    ///
    /// A failure leaves the link CONNECTED, the phone may retry pairing.
    pub fn on_authentication_complete(&mut self, success: bool) {
        match (self.state, success) {
            (ServerConnectionState::Disconnected, _) => {
                debug!("pairing result without a phone connected");
            }
            (_, true) => {
                info!("phone paired");
                self.state = ServerConnectionState::Paired;
                self.last_error = None;
            }
            (_, false) => {
                warn!("phone pairing failed");
                self.state = ServerConnectionState::Connected;
                self.last_error = Some(BleError::PairingFailure);
            }
        }
    }

    /// Tell the paired phone to take a picture
    pub fn notify_shutter_triggered(&mut self) -> Result<(), BleError> {
        if self.state != ServerConnectionState::Paired {
            return Err(BleError::NoPeer);
        }

        let result = self
            .peripheral
            .set_value(&[self.config.notify_payload])
            .and_then(|()| self.peripheral.notify());
        match result {
            Ok(()) => {
                info!("shutter notification sent");
                self.notified = true;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("shutter notification failed: {e}");
                let err = BleError::WriteFailure(e.to_string());
                self.notified = false;
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn clear_status(&mut self) {
        self.notified = false;
        self.last_error = None;
    }

    pub fn status_text(&self) -> String {
        if let Some(e) = &self.last_error {
            return format!("Error: {e}");
        }
        match self.state {
            ServerConnectionState::Disconnected => "Waiting for pairing…".to_string(),
            ServerConnectionState::Connected => "Pairing…".to_string(),
            ServerConnectionState::Paired if self.notified => "Shutter triggered!".to_string(),
            ServerConnectionState::Paired => "Ready".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPeripheral, PeripheralCall};

    fn role() -> BlePeripheralRole<MockPeripheral> {
        BlePeripheralRole::new(MockPeripheral::default(), "Remote", ServerConfig::default())
    }

    #[test]
    fn start_is_idempotent() {
        let mut r = role();
        r.start().unwrap();
        r.start().unwrap();
        assert_eq!(r.peripheral().advertising_starts(), 1);
        assert_eq!(
            r.peripheral().calls[0],
            PeripheralCall::StartAdvertising("Remote".into())
        );
        assert_eq!(r.status_text(), "Waiting for pairing…");
    }

    #[test]
    fn notify_requires_paired_peer() {
        let mut r = role();
        assert_eq!(r.notify_shutter_triggered(), Err(BleError::NoPeer));
        r.on_connected();
        assert_eq!(r.notify_shutter_triggered(), Err(BleError::NoPeer));
        assert!(r.peripheral().calls.is_empty());
    }

    #[test]
    fn paired_phone_gets_notified() {
        let mut r = role();
        r.start().unwrap();
        r.on_event(ServerEvent::Connected);
        assert!(!r.is_advertising());
        r.on_authentication_complete(true);
        assert_eq!(r.state(), ServerConnectionState::Paired);

        r.notify_shutter_triggered().unwrap();
        assert_eq!(
            r.peripheral().calls[1..],
            [PeripheralCall::SetValue(vec![0x01]), PeripheralCall::Notify]
        );
        assert_eq!(r.status_text(), "Shutter triggered!");
    }

    #[test]
    fn pairing_failure_keeps_link() {
        let mut r = role();
        r.on_connected();
        r.on_authentication_complete(false);
        assert_eq!(r.state(), ServerConnectionState::Connected);
        assert_eq!(r.status_text(), "Error: pairing failed");

        r.on_authentication_complete(true);
        assert_eq!(r.state(), ServerConnectionState::Paired);
        assert_eq!(r.status_text(), "Ready");
    }

    #[test]
    fn disconnect_readvertises() {
        let mut r = role();
        r.start().unwrap();
        r.on_connected();
        r.on_authentication_complete(true);
        r.on_disconnected();
        assert_eq!(r.state(), ServerConnectionState::Disconnected);
        assert!(r.is_advertising());
        assert_eq!(r.peripheral().advertising_starts(), 2);
        assert_eq!(r.notify_shutter_triggered(), Err(BleError::NoPeer));
    }

    #[test]
    fn notify_fault_is_reported() {
        let mut r = role();
        r.on_connected();
        r.on_authentication_complete(true);
        r.peripheral_mut().fail_notify = true;
        assert!(matches!(
            r.notify_shutter_triggered(),
            Err(BleError::WriteFailure(_))
        ));
        assert!(r.status_text().starts_with("Error: write failed"));
    }

    #[test]
    fn late_notify_failure_is_reported() {
        let mut r = role();
        r.on_connected();
        r.on_authentication_complete(true);
        r.notify_shutter_triggered().unwrap();
        r.on_event(ServerEvent::NotifyFailed("link congested".into()));
        assert_eq!(r.status_text(), "Error: write failed: link congested");
        assert_eq!(r.state(), ServerConnectionState::Paired);
    }

    #[test]
    fn advertising_fault_then_retry() {
        let mut r = role();
        r.peripheral_mut().fail_advertising = true;
        assert!(matches!(r.start(), Err(BleError::AdvertisingFailure(_))));
        assert!(!r.is_advertising());

        r.peripheral_mut().fail_advertising = false;
        r.start().unwrap();
        assert!(r.is_advertising());
        assert_eq!(r.status_text(), "Waiting for pairing…");
    }

    #[test]
    fn stop_only_when_advertising() {
        let mut r = role();
        r.stop().unwrap();
        assert!(r.peripheral().calls.is_empty());
        r.start().unwrap();
        r.stop().unwrap();
        assert_eq!(r.peripheral().calls.last(), Some(&PeripheralCall::StopAdvertising));
    }
}
