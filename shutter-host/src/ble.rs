//! BLE central backed by btleplug
//!
//! [`HostCentral`] satisfies the synchronous [`BleCentral`] contract by
//! spawning each request onto the tokio runtime and pushing the completion
//! into the dispatcher's [`EventSink`].

use crate::HostError;
use btleplug::api::{
    BDAddr, Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use log::{debug, info, warn};
use shutter_mcu::{
    BleCentral, CharacteristicHandle, ClientEvent, EventSink, Link, MacAddress, PairingResponder,
    PeerId, SecurityEvent,
};
use shutter_proto::ble as uuids;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use uuid::Uuid;

/// A device seen during [`scan`]
#[derive(Debug, Clone)]
pub struct FoundDevice {
    pub name: String,
    pub address: String,
    pub rssi: Option<i16>,
    /// Advertises a GoPro or Insta360 control service
    pub is_camera: bool,
}

fn parse_uuid(s: &str) -> Result<Uuid, HostError> {
    Uuid::parse_str(s).map_err(|_| HostError::InvalidUuid(s.to_string()))
}

/// Get the default Bluetooth adapter
pub async fn get_adapter() -> Result<Adapter, HostError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters.into_iter().next().ok_or(HostError::NoAdapter)
}

/// Scan for BLE devices, to find the addresses to put in the config
pub async fn scan(duration_secs: u64) -> Result<Vec<FoundDevice>, HostError> {
    let adapter = get_adapter().await?;
    let camera_services = [
        parse_uuid(uuids::GOPRO_SERVICE_UUID)?,
        parse_uuid(uuids::INSTA360_SERVICE_UUID)?,
    ];

    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(duration_secs)).await;

    let peripherals = adapter.peripherals().await?;
    let mut devices = Vec::new();

    for peripheral in peripherals {
        if let Some(props) = peripheral.properties().await? {
            let is_camera = props.services.iter().any(|s| camera_services.contains(s));
            devices.push(FoundDevice {
                name: props.local_name.unwrap_or_else(|| "Unknown".to_string()),
                address: peripheral.address().to_string(),
                rssi: props.rssi,
                is_camera,
            });
        }
    }

    adapter.stop_scan().await?;
    Ok(devices)
}

async fn find_by_address(
    adapter: &Adapter,
    address: BDAddr,
    timeout: Duration,
) -> Result<Peripheral, HostError> {
    adapter.start_scan(ScanFilter::default()).await?;
    let deadline = tokio::time::Instant::now() + timeout;

    let found = loop {
        let peripherals = adapter.peripherals().await?;
        if let Some(p) = peripherals.into_iter().find(|p| p.address() == address) {
            break Some(p);
        }
        if tokio::time::Instant::now() >= deadline {
            break None;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    };

    adapter.stop_scan().await?;
    found.ok_or_else(|| HostError::NotFound(address.to_string()))
}

/// One camera's open link
struct PeerLink {
    peripheral: Peripheral,
    /// Indexed by [`CharacteristicHandle`]
    characteristics: Vec<Characteristic>,
}

type Links = Arc<Mutex<HashMap<PeerId, PeerLink>>>;

fn lock(links: &Links) -> MutexGuard<'_, HashMap<PeerId, PeerLink>> {
    links.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct HostCentral {
    runtime: Handle,
    adapter: Adapter,
    sink: EventSink,
    links: Links,
    scan_timeout: Duration,
}

impl HostCentral {
    /// Must be called from within a tokio runtime
    pub async fn new(sink: EventSink) -> Result<Self, HostError> {
        let adapter = get_adapter().await?;
        let central = Self {
            runtime: Handle::current(),
            adapter,
            sink,
            links: Links::default(),
            scan_timeout: Duration::from_secs(5),
        };
        central.watch_disconnects().await?;
        Ok(central)
    }

    /// How long `connect` scans for the address before giving up
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    async fn watch_disconnects(&self) -> Result<(), HostError> {
        let mut events = self.adapter.events().await?;
        let links = self.links.clone();
        let sink = self.sink.clone();

        self.runtime.spawn(async move {
            while let Some(event) = events.next().await {
                let CentralEvent::DeviceDisconnected(id) = event else {
                    continue;
                };
                let peer = {
                    let mut links = lock(&links);
                    let peer = links
                        .iter()
                        .find(|(_, link)| link.peripheral.id() == id)
                        .map(|(peer, _)| *peer);
                    if let Some(peer) = peer {
                        links.remove(&peer);
                    }
                    peer
                };
                if let Some(peer) = peer {
                    info!("{peer} dropped the link");
                    sink.client(peer, ClientEvent::Disconnected);
                }
            }
            debug!("adapter event stream ended");
        });
        Ok(())
    }

    fn peripheral(&self, peer: PeerId) -> Result<Peripheral, HostError> {
        lock(&self.links)
            .get(&peer)
            .map(|link| link.peripheral.clone())
            .ok_or(HostError::NotConnected(peer))
    }

    fn characteristic(
        &self,
        peer: PeerId,
        handle: CharacteristicHandle,
    ) -> Result<(Peripheral, Characteristic), HostError> {
        let links = lock(&self.links);
        let link = links.get(&peer).ok_or(HostError::NotConnected(peer))?;
        let characteristic = link
            .characteristics
            .get(usize::from(handle.0))
            .cloned()
            .ok_or(HostError::UnknownHandle { peer, handle })?;
        Ok((link.peripheral.clone(), characteristic))
    }
}

impl PairingResponder for HostCentral {
    // The OS bonding agent answers pairing prompts on a desktop.
    fn passkey_reply(&mut self, link: Link, _passkey: u32) {
        debug!("passkey for {link} left to the OS");
    }

    fn confirm_reply(&mut self, link: Link, accept: bool) {
        debug!("confirmation ({accept}) for {link} left to the OS");
    }

    fn security_reply(&mut self, link: Link, accept: bool) {
        debug!("security request ({accept}) for {link} left to the OS");
    }
}

impl BleCentral for HostCentral {
    type Error = HostError;

    fn connect(&mut self, peer: PeerId, address: MacAddress) -> Result<(), HostError> {
        let adapter = self.adapter.clone();
        let links = self.links.clone();
        let sink = self.sink.clone();
        let timeout = self.scan_timeout;
        let address = BDAddr::from(address.0);

        self.runtime.spawn(async move {
            let result = async {
                let peripheral = find_by_address(&adapter, address, timeout).await?;
                if !peripheral.is_connected().await? {
                    peripheral.connect().await?;
                }
                Ok::<_, HostError>(peripheral)
            }
            .await;

            let event = match result {
                Ok(peripheral) => {
                    lock(&links).insert(
                        peer,
                        PeerLink {
                            peripheral,
                            characteristics: Vec::new(),
                        },
                    );
                    ClientEvent::Connected
                }
                Err(e) => ClientEvent::ConnectFailed(e.to_string()),
            };
            sink.client(peer, event);
        });
        Ok(())
    }

    fn discover_service(&mut self, peer: PeerId, service_uuid: &str) -> Result<(), HostError> {
        let peripheral = self.peripheral(peer)?;
        let uuid = parse_uuid(service_uuid)?;
        let sink = self.sink.clone();

        self.runtime.spawn(async move {
            let event = match peripheral.discover_services().await {
                Ok(()) if peripheral.services().iter().any(|s| s.uuid == uuid) => {
                    ClientEvent::ServiceDiscovered
                }
                Ok(()) => ClientEvent::ServiceNotFound,
                Err(e) => {
                    warn!("{peer}: service discovery failed: {e}");
                    ClientEvent::ServiceNotFound
                }
            };
            sink.client(peer, event);
        });
        Ok(())
    }

    fn discover_characteristic(
        &mut self,
        peer: PeerId,
        service_uuid: &str,
        characteristic_uuid: &str,
    ) -> Result<(), HostError> {
        let service = parse_uuid(service_uuid)?;
        let uuid = parse_uuid(characteristic_uuid)?;

        // Services were discovered with their characteristics already.
        let event = {
            let mut links = lock(&self.links);
            let link = links.get_mut(&peer).ok_or(HostError::NotConnected(peer))?;
            let found = link
                .peripheral
                .characteristics()
                .into_iter()
                .find(|c| c.uuid == uuid && c.service_uuid == service);
            match found {
                Some(c) => {
                    let handle = CharacteristicHandle(link.characteristics.len() as u16);
                    link.characteristics.push(c);
                    ClientEvent::CharacteristicDiscovered(handle)
                }
                None => ClientEvent::CharacteristicNotFound,
            }
        };
        self.sink.client(peer, event);
        Ok(())
    }

    fn subscribe(&mut self, peer: PeerId, handle: CharacteristicHandle) -> Result<(), HostError> {
        let (peripheral, characteristic) = self.characteristic(peer, handle)?;
        let sink = self.sink.clone();

        self.runtime.spawn(async move {
            let notifies = characteristic
                .properties
                .intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE);
            let event = if !notifies {
                debug!("{peer}: {} has no notifications", characteristic.uuid);
                ClientEvent::Subscribed
            } else {
                match peripheral.subscribe(&characteristic).await {
                    Ok(()) => ClientEvent::Subscribed,
                    Err(e) => ClientEvent::SubscribeRejected(e.to_string()),
                }
            };
            sink.client(peer, event);
        });
        Ok(())
    }

    fn write(
        &mut self,
        peer: PeerId,
        handle: CharacteristicHandle,
        payload: &[u8],
    ) -> Result<(), HostError> {
        let (peripheral, characteristic) = self.characteristic(peer, handle)?;
        let payload = payload.to_vec();
        let sink = self.sink.clone();

        self.runtime.spawn(async move {
            let event = match peripheral
                .write(&characteristic, &payload, WriteType::WithResponse)
                .await
            {
                Ok(()) => ClientEvent::WriteComplete,
                Err(e) => ClientEvent::WriteFailed(e.to_string()),
            };
            sink.client(peer, event);
        });
        Ok(())
    }

    fn secure(&mut self, peer: PeerId) -> Result<(), HostError> {
        // btleplug has no pairing API; the OS bonds on first encrypted access.
        self.peripheral(peer)?;
        self.sink.security(
            Link::Client(peer),
            SecurityEvent::AuthenticationComplete { success: true },
        );
        Ok(())
    }

    fn disconnect(&mut self, peer: PeerId) -> Result<(), HostError> {
        let link = lock(&self.links).remove(&peer);
        let sink = self.sink.clone();

        match link {
            Some(link) => {
                self.runtime.spawn(async move {
                    if let Err(e) = link.peripheral.disconnect().await {
                        warn!("{peer}: disconnect failed: {e}");
                    }
                    sink.client(peer, ClientEvent::Disconnected);
                });
            }
            // A connect may still be in flight; its Connected is answered with another disconnect.
            None => sink.client(peer, ClientEvent::Disconnected),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_service_uuids_parse() {
        assert!(parse_uuid(uuids::GOPRO_SERVICE_UUID).is_ok());
        assert!(parse_uuid(uuids::INSTA360_COMMAND_UUID).is_ok());
        assert!(matches!(
            parse_uuid("fea6"),
            Err(HostError::InvalidUuid(s)) if s == "fea6"
        ));
    }

    #[test]
    fn mac_maps_to_bdaddr() {
        let mac: MacAddress = "D0:00:00:00:00:05".parse().unwrap();
        assert_eq!(BDAddr::from(mac.0).to_string(), "D0:00:00:00:00:05");
    }
}
