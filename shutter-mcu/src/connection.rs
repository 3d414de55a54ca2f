//! Outbound BLE connections, one state machine per camera
//!
//! A peer walks DISCONNECTED → CONNECTING → DISCOVERING_SERVICES →
//! DISCOVERING_CHARACTERISTICS → SUBSCRIBING → READY, one stage per stack
//! event. Any failure lands in ERROR; a link drop lands in DISCONNECTED from
//! anywhere and throws away all discovery results.
//!
//! Nothing here blocks. Requests go out through [`BleCentral`], completions
//! come back through [`PeerConnection::on_event`], and deadlines are checked
//! in [`PeerConnection::poll`].

use crate::ble::{BleCentral, CharacteristicHandle};
use crate::config::{BlePeerDescriptor, Timeouts};
use crate::controller::Readiness;
use crate::error::{BleError, ControlError};
use crate::events::ClientEvent;
use crate::target::PeerId;
use log::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BleConnectionState {
    Disconnected,
    Connecting,
    DiscoveringServices,
    DiscoveringCharacteristics,
    Subscribing,
    Ready,
    Error(BleError),
}

impl BleConnectionState {
    /// A connect sequence is running
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            BleConnectionState::Connecting
                | BleConnectionState::DiscoveringServices
                | BleConnectionState::DiscoveringCharacteristics
                | BleConnectionState::Subscribing
        )
    }
}

/// One camera's connection, exclusively owned by [`BleConnectionManager`]
#[derive(Debug)]
pub struct PeerConnection {
    descriptor: BlePeerDescriptor,
    timeouts: Timeouts,
    state: BleConnectionState,
    /// Tick the current connect sequence started at
    started_at: u64,
    link_up: bool,
    characteristic: Option<CharacteristicHandle>,
    subscribed: bool,
    authenticated: bool,
    /// Restart the sequence once the old link reports down
    reconnect: bool,
    pending_command: Option<Vec<u8>>,
    write_deadline: Option<u64>,
    recording: bool,
    last_error: Option<BleError>,
}

impl PeerConnection {
    pub fn new(descriptor: BlePeerDescriptor, timeouts: Timeouts) -> Self {
        Self {
            descriptor,
            timeouts,
            state: BleConnectionState::Disconnected,
            started_at: 0,
            link_up: false,
            characteristic: None,
            subscribed: false,
            authenticated: false,
            reconnect: false,
            pending_command: None,
            write_deadline: None,
            recording: false,
            last_error: None,
        }
    }

    pub fn peer_id(&self) -> PeerId {
        self.descriptor.peer_id
    }

    pub fn descriptor(&self) -> &BlePeerDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> &BleConnectionState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == BleConnectionState::Ready
    }

    pub fn last_error(&self) -> Option<&BleError> {
        self.last_error.as_ref()
    }

    pub fn has_pending_command(&self) -> bool {
        self.pending_command.is_some()
    }

    pub fn status_text(&self) -> String {
        use BleConnectionState as S;

        match (&self.state, &self.last_error) {
            (S::Error(_), _) if self.reconnect => "Reconnecting…".to_string(),
            (S::Error(e), _) | (_, Some(e)) => format!("Error: {e}"),
            (S::Disconnected, None) => "Disconnected".to_string(),
            (S::Connecting, None) => "Connecting…".to_string(),
            (S::DiscoveringServices, None) => "Discovering services…".to_string(),
            (S::DiscoveringCharacteristics, None) => "Discovering characteristics…".to_string(),
            (S::Subscribing, None) if self.subscribed => "Pairing…".to_string(),
            (S::Subscribing, None) => "Subscribing…".to_string(),
            (S::Ready, None) if self.recording => "Recording…".to_string(),
            (S::Ready, None) => "Ready".to_string(),
        }
    }

    /// Forget a reported error so the display shows the connection state again
    pub fn clear_status(&mut self) {
        if !matches!(self.state, BleConnectionState::Error(_)) {
            self.last_error = None;
        }
    }

    fn set_state(&mut self, state: BleConnectionState) {
        debug!("{}: {:?} -> {:?}", self.descriptor.name, self.state, state);
        self.state = state;
    }

    /// Start the connect sequence unless it is running or done
    ///
    /// Never issues a second connect while one is outstanding. From ERROR the
    /// sequence restarts from scratch, after the old link has gone down.
    pub fn ensure_ready<C: BleCentral>(
        &mut self,
        central: &mut C,
        now: u64,
    ) -> Result<Readiness, BleError> {
        if self.is_ready() {
            return Ok(Readiness::Ready);
        }
        if self.state.is_in_progress() {
            return Ok(Readiness::InProgress);
        }

        let failed = matches!(self.state, BleConnectionState::Error(_));
        if failed && self.reconnect {
            return Ok(Readiness::InProgress);
        }
        self.last_error = None;
        if failed && self.link_up {
            info!("{}: dropping failed link before reconnecting", self.descriptor.name);
            self.reconnect = true;
            match central.disconnect(self.peer_id()) {
                Ok(()) => return Ok(Readiness::InProgress),
                Err(e) => {
                    // No Disconnected event will follow a refused disconnect.
                    warn!("{}: disconnect failed: {e}", self.descriptor.name);
                    self.reconnect = false;
                    self.link_up = false;
                }
            }
        }
        self.start_connect(central, now)
    }

    fn start_connect<C: BleCentral>(
        &mut self,
        central: &mut C,
        now: u64,
    ) -> Result<Readiness, BleError> {
        info!(
            "{}: connecting to {}",
            self.descriptor.name, self.descriptor.mac_address
        );
        self.started_at = now;
        match central.connect(self.peer_id(), self.descriptor.mac_address) {
            Ok(()) => {
                self.set_state(BleConnectionState::Connecting);
                Ok(Readiness::InProgress)
            }
            Err(e) => {
                let err = BleError::ConnectFailure(e.to_string());
                self.fail(central, err.clone());
                Err(err)
            }
        }
    }

    /// Write `payload` to the control characteristic
    ///
    /// Only valid in READY; anywhere else nothing reaches the transport.
    pub fn write_command<C: BleCentral>(
        &mut self,
        central: &mut C,
        payload: &[u8],
        now: u64,
    ) -> Result<(), BleError> {
        let handle = match (&self.state, self.characteristic) {
            (BleConnectionState::Ready, Some(handle)) => handle,
            _ => {
                debug!("{}: write refused in {:?}", self.descriptor.name, self.state);
                return Err(BleError::NotReady);
            }
        };

        match central.write(self.peer_id(), handle, payload) {
            Ok(()) => {
                info!("{}: wrote {:02X?}", self.descriptor.name, payload);
                self.write_deadline = Some(now + self.timeouts.write_ms);
                self.recording = true;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("{}: write rejected: {e}", self.descriptor.name);
                let err = BleError::WriteFailure(e.to_string());
                self.recording = false;
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Hold `payload` until READY; a newer command replaces an older one
    pub fn queue_command(&mut self, payload: Vec<u8>) {
        if self.pending_command.replace(payload).is_some() {
            debug!("{}: pending command coalesced", self.descriptor.name);
        }
    }

    /// Advance the state machine with one stack completion
    pub fn on_event<C: BleCentral>(&mut self, central: &mut C, event: ClientEvent, now: u64) {
        use BleConnectionState as S;

        match (self.state.clone(), event) {
            (_, ClientEvent::Disconnected) => self.on_disconnected(central, now),

            (S::Connecting, ClientEvent::Connected) => {
                info!("{}: connected", self.descriptor.name);
                self.link_up = true;
                if self.descriptor.requires_pairing {
                    if let Err(e) = central.secure(self.peer_id()) {
                        warn!("{}: could not start pairing: {e}", self.descriptor.name);
                        self.fail(central, BleError::PairingFailure);
                        return;
                    }
                }
                let request = central.discover_service(self.peer_id(), &self.descriptor.service_uuid);
                self.advance(central, request, S::DiscoveringServices);
            }
            (S::Connecting, ClientEvent::ConnectFailed(reason)) => {
                self.fail(central, BleError::ConnectFailure(reason));
            }

            (S::DiscoveringServices, ClientEvent::ServiceDiscovered) => {
                let request = central.discover_characteristic(
                    self.peer_id(),
                    &self.descriptor.service_uuid,
                    &self.descriptor.characteristic_uuid,
                );
                self.advance(central, request, S::DiscoveringCharacteristics);
            }
            (S::DiscoveringServices, ClientEvent::ServiceNotFound) => {
                let reason = format!("service {} not found", self.descriptor.service_uuid);
                self.fail(central, BleError::DiscoveryFailure(reason));
            }

            (S::DiscoveringCharacteristics, ClientEvent::CharacteristicDiscovered(handle)) => {
                self.characteristic = Some(handle);
                let request = central.subscribe(self.peer_id(), handle);
                self.advance(central, request, S::Subscribing);
            }
            (S::DiscoveringCharacteristics, ClientEvent::CharacteristicNotFound) => {
                let reason = format!(
                    "characteristic {} not found",
                    self.descriptor.characteristic_uuid
                );
                self.fail(central, BleError::DiscoveryFailure(reason));
            }

            (S::Subscribing, ClientEvent::Subscribed) if !self.subscribed => {
                self.subscribed = true;
                self.try_become_ready(central, now);
            }
            (S::Subscribing, ClientEvent::SubscribeRejected(reason)) => {
                let reason = format!("subscription rejected: {reason}");
                self.fail(central, BleError::DiscoveryFailure(reason));
            }

            (S::Ready, ClientEvent::WriteComplete) => {
                debug!("{}: write acknowledged", self.descriptor.name);
                self.write_deadline = None;
            }
            (S::Ready, ClientEvent::WriteFailed(reason)) => {
                warn!("{}: write failed: {reason}", self.descriptor.name);
                self.write_deadline = None;
                self.recording = false;
                self.last_error = Some(BleError::WriteFailure(reason));
            }

            (S::Error(_) | S::Disconnected, ClientEvent::Connected) => {
                // Connected after we gave up on it, or after the cancel already
                // reported DISCONNECTED.
                self.link_up = true;
                if let Err(e) = central.disconnect(self.peer_id()) {
                    warn!("{}: disconnect failed: {e}", self.descriptor.name);
                }
            }

            (state, event) => {
                debug!(
                    "{}: ignoring {:?} in {:?}",
                    self.descriptor.name, event, state
                );
            }
        }
    }

    /// Result of pairing on this peer's link
    pub fn on_authentication_complete<C: BleCentral>(
        &mut self,
        central: &mut C,
        success: bool,
        now: u64,
    ) {
        if !self.link_up {
            debug!("{}: pairing result without a link", self.descriptor.name);
            return;
        }
        if success {
            self.authenticated = true;
            self.try_become_ready(central, now);
        } else {
            self.fail(central, BleError::PairingFailure);
        }
    }

    /// The link is gone; everything learned on it is discarded
    pub fn on_disconnected<C: BleCentral>(&mut self, central: &mut C, now: u64) {
        if self.state != BleConnectionState::Disconnected {
            info!("{}: disconnected", self.descriptor.name);
        }
        self.set_state(BleConnectionState::Disconnected);
        self.link_up = false;
        self.characteristic = None;
        self.subscribed = false;
        self.authenticated = false;
        self.write_deadline = None;
        self.recording = false;

        if std::mem::take(&mut self.reconnect) {
            // A pending command survives only an explicitly requested restart.
            let _ = self.start_connect(central, now);
        } else {
            self.pending_command = None;
        }
    }

    /// Enforce the connect and write deadlines
    pub fn poll<C: BleCentral>(&mut self, central: &mut C, now: u64) {
        if self.state.is_in_progress()
            && now.saturating_sub(self.started_at) >= self.timeouts.connect_ms
        {
            warn!("{}: connect timed out in {:?}", self.descriptor.name, self.state);
            let cancel = !self.link_up;
            self.fail(central, BleError::ConnectFailure("timed out".to_string()));
            if cancel {
                if let Err(e) = central.disconnect(self.peer_id()) {
                    debug!("{}: cancel connect failed: {e}", self.descriptor.name);
                }
            }
        }

        if self.write_deadline.is_some_and(|deadline| now >= deadline) {
            warn!("{}: write timed out", self.descriptor.name);
            self.write_deadline = None;
            self.recording = false;
            self.last_error = Some(BleError::WriteFailure("timed out".to_string()));
        }
    }

    fn advance<C: BleCentral>(
        &mut self,
        central: &mut C,
        request: Result<(), C::Error>,
        next: BleConnectionState,
    ) {
        match request {
            Ok(()) => self.set_state(next),
            Err(e) => {
                let reason = e.to_string();
                let err = match next {
                    BleConnectionState::Subscribing => {
                        BleError::DiscoveryFailure(format!("subscription rejected: {reason}"))
                    }
                    _ => BleError::DiscoveryFailure(reason),
                };
                self.fail(central, err);
            }
        }
    }

    fn try_become_ready<C: BleCentral>(&mut self, central: &mut C, now: u64) {
        if self.state != BleConnectionState::Subscribing || !self.subscribed {
            return;
        }
        if self.descriptor.requires_pairing && !self.authenticated {
            debug!("{}: subscribed, waiting for pairing", self.descriptor.name);
            return;
        }

        info!("{}: ready", self.descriptor.name);
        self.set_state(BleConnectionState::Ready);
        if let Some(payload) = self.pending_command.take() {
            if let Err(e) = self.write_command(central, &payload, now) {
                error!("{}: deferred command failed: {e}", self.descriptor.name);
            }
        }
    }

    fn fail<C: BleCentral>(&mut self, central: &mut C, err: BleError) {
        error!("{}: {err}", self.descriptor.name);
        self.set_state(BleConnectionState::Error(err.clone()));
        self.last_error = Some(err);
        self.characteristic = None;
        self.subscribed = false;
        self.authenticated = false;
        self.pending_command = None;
        self.write_deadline = None;
        self.recording = false;
        if self.link_up {
            if let Err(e) = central.disconnect(self.peer_id()) {
                warn!("{}: disconnect failed: {e}", self.descriptor.name);
            }
        }
    }
}

/// Fixed table of client peers, indexed by [`PeerId`]
pub struct BleConnectionManager<C> {
    central: C,
    peers: Vec<PeerConnection>,
    now: u64,
}

impl<C: BleCentral> BleConnectionManager<C> {
    /// `descriptors` must hold one entry per slot, see [`crate::RemoteConfig::validate`]
    pub fn new(
        central: C,
        descriptors: impl IntoIterator<Item = BlePeerDescriptor>,
        timeouts: Timeouts,
    ) -> Self {
        let mut peers: Vec<PeerConnection> = descriptors
            .into_iter()
            .map(|d| PeerConnection::new(d, timeouts))
            .collect();
        peers.sort_by_key(|p| p.peer_id());
        Self {
            central,
            peers,
            now: 0,
        }
    }

    pub fn central(&self) -> &C {
        &self.central
    }

    pub fn central_mut(&mut self) -> &mut C {
        &mut self.central
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerConnection> {
        self.peers.iter()
    }

    pub fn peer(&self, id: PeerId) -> Option<&PeerConnection> {
        self.peers.get(id.index()).filter(|p| p.peer_id() == id)
    }

    pub fn state(&self, id: PeerId) -> Option<&BleConnectionState> {
        self.peer(id).map(PeerConnection::state)
    }

    fn split(&mut self, id: PeerId) -> Result<(&mut PeerConnection, &mut C), ControlError> {
        let peer = self
            .peers
            .get_mut(id.index())
            .filter(|p| p.peer_id() == id)
            .ok_or(ControlError::UnknownPeer(id))?;
        Ok((peer, &mut self.central))
    }

    pub fn ensure_ready(&mut self, id: PeerId) -> Result<Readiness, ControlError> {
        let now = self.now;
        let (peer, central) = self.split(id)?;
        Ok(peer.ensure_ready(central, now)?)
    }

    pub fn write_command(&mut self, id: PeerId, payload: &[u8]) -> Result<(), ControlError> {
        let now = self.now;
        let (peer, central) = self.split(id)?;
        Ok(peer.write_command(central, payload, now)?)
    }

    pub fn queue_command(&mut self, id: PeerId, payload: Vec<u8>) -> Result<(), ControlError> {
        let (peer, _) = self.split(id)?;
        peer.queue_command(payload);
        Ok(())
    }

    pub fn clear_status(&mut self, id: PeerId) {
        if let Ok((peer, _)) = self.split(id) {
            peer.clear_status();
        }
    }

    pub fn on_event(&mut self, id: PeerId, event: ClientEvent) -> Result<(), ControlError> {
        let now = self.now;
        let (peer, central) = self.split(id)?;
        peer.on_event(central, event, now);
        Ok(())
    }

    pub fn on_authentication_complete(
        &mut self,
        id: PeerId,
        success: bool,
    ) -> Result<(), ControlError> {
        let now = self.now;
        let (peer, central) = self.split(id)?;
        peer.on_authentication_complete(central, success, now);
        Ok(())
    }

    /// Kick off peers configured to connect at start-up
    pub fn connect_eager(&mut self) {
        let now = self.now;
        for peer in &mut self.peers {
            if peer.descriptor().connect == crate::config::ConnectPolicy::Eager {
                if let Err(e) = peer.ensure_ready(&mut self.central, now) {
                    warn!("{}: eager connect failed: {e}", peer.descriptor().name);
                }
            }
        }
    }

    /// Time used by requests made before the next [`Self::poll`]
    pub fn advance_clock(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    /// Advance the clock and check every peer's deadlines
    pub fn poll(&mut self, now: u64) {
        self.advance_clock(now);
        for peer in &mut self.peers {
            peer.poll(&mut self.central, now);
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }
}
