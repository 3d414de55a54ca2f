//! Input handling and trigger routing
//!
//! [`CommandDispatcher`] owns every component and is the only thing the
//! main loop talks to. Each tick it drains the stack's events, advances the
//! connection state machines, and checks deadlines. Triggers go to whichever
//! [`CameraController`] backs the selected camera.

use crate::ble::{BleCentral, BlePeripheral, PairingResponder};
use crate::config::RemoteConfig;
use crate::connection::BleConnectionManager;
use crate::controller::{
    BleClientController, BleServerController, CameraCommand, CameraController, IrController,
    Readiness,
};
use crate::error::{ConfigError, ControlError};
use crate::events::{EventQueue, EventSink, Link, StackEvent};
use crate::ir::{IrCommandEncoder, IrTransmitter};
use crate::peripheral::BlePeripheralRole;
use crate::security::{BleSecurityNegotiator, PairingOutcome};
use crate::selector::CameraSelector;
use crate::target::{CameraTarget, Transport};
use log::{debug, info, warn};

/// Debounced button edges from the input layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    SelectNext,
    SelectPrevious,
    Trigger,
    Back,
}

pub struct CommandDispatcher<T, C, P> {
    selector: CameraSelector,
    ir: IrCommandEncoder<T>,
    ble: BleConnectionManager<C>,
    server: BlePeripheralRole<P>,
    security: BleSecurityNegotiator,
    events: EventQueue,
    shutter_payload: u8,
    /// Error from the last trigger, shown until Back or a new selection
    outcome: Option<ControlError>,
}

impl<T, C, P> CommandDispatcher<T, C, P>
where
    T: IrTransmitter,
    C: BleCentral,
    P: BlePeripheral,
{
    /// `events` must be the queue whose sinks were handed to `central` and `peripheral`
    pub fn new(
        config: &RemoteConfig,
        transmitter: T,
        central: C,
        peripheral: P,
        events: EventQueue,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            selector: CameraSelector::new(config.default_target),
            ir: IrCommandEncoder::new(transmitter, &config.ir)?,
            ble: BleConnectionManager::new(central, config.peers.iter().cloned(), config.timeouts()),
            server: BlePeripheralRole::new(peripheral, config.device_name.clone(), config.server.clone()),
            security: BleSecurityNegotiator::new(config.pairing),
            events,
            shutter_payload: config.shutter_payload,
            outcome: None,
        })
    }

    /// Advertise for the phone and connect eager peers
    pub fn start(&mut self) {
        if let Err(e) = self.server.start() {
            warn!("server role not advertising: {e}");
        }
        self.ble.connect_eager();
    }

    pub fn sink(&self) -> EventSink {
        self.events.sink()
    }

    pub fn current(&self) -> CameraTarget {
        self.selector.current()
    }

    /// Returns the trigger result for [`InputEvent::Trigger`], `None` otherwise
    pub fn handle_input(&mut self, input: InputEvent) -> Option<Result<(), ControlError>> {
        match input {
            InputEvent::SelectNext => {
                self.selector.select_next();
                self.clear_status();
                None
            }
            InputEvent::SelectPrevious => {
                self.selector.select_previous();
                self.clear_status();
                None
            }
            InputEvent::Trigger => Some(self.trigger()),
            InputEvent::Back => {
                self.clear_status();
                None
            }
        }
    }

    /// Fire the shutter of the selected camera
    ///
    /// A BLE camera that is not READY yet gets the command once it is; the
    /// call still returns `Ok` in that case.
    pub fn trigger(&mut self) -> Result<(), ControlError> {
        let target = self.selector.current();
        info!("trigger: {}", target.label());

        let result = self.with_controller(target, |ctl| {
            if ctl.ensure_ready()? == Readiness::InProgress {
                debug!("{} not ready yet: {}", target.label(), ctl.status_text());
            }
            ctl.send_command(CameraCommand::Shutter)
        });

        match &result {
            Ok(()) => self.outcome = None,
            Err(e) => {
                warn!("{}: {e}", target.label());
                self.outcome = Some(e.clone());
            }
        }
        result
    }

    /// Run `f` against the controller backing `target`
    pub fn with_controller<R>(
        &mut self,
        target: CameraTarget,
        f: impl FnOnce(&mut dyn CameraController) -> R,
    ) -> R {
        match target.transport() {
            Transport::Ir => f(&mut IrController::new(&mut self.ir)),
            Transport::BleClient(peer) => f(&mut BleClientController::new(
                &mut self.ble,
                peer,
                self.shutter_payload,
            )),
            Transport::BleServer => f(&mut BleServerController::new(&mut self.server)),
        }
    }

    /// One tick of the main loop
    pub fn poll(&mut self, now: u64) {
        self.ble.advance_clock(now);
        for event in self.events.drain() {
            self.apply(event);
        }
        self.ble.poll(now);
    }

    fn apply(&mut self, event: StackEvent) {
        match event {
            StackEvent::Client { peer, event } => {
                if let Err(e) = self.ble.on_event(peer, event) {
                    warn!("dropping event: {e}");
                }
            }
            StackEvent::Server(event) => self.server.on_event(event),
            StackEvent::Security { link, event } => {
                let responder: &mut dyn PairingResponder = match link {
                    Link::Client(_) => self.ble.central_mut(),
                    Link::Server => self.server.peripheral_mut(),
                };
                if let Some(outcome) = self.security.handle(link, event, responder) {
                    self.route_pairing_outcome(outcome);
                }
            }
        }
    }

    fn route_pairing_outcome(&mut self, outcome: PairingOutcome) {
        match outcome.link {
            Link::Client(peer) => {
                if let Err(e) = self.ble.on_authentication_complete(peer, outcome.success) {
                    warn!("dropping pairing result: {e}");
                }
            }
            Link::Server => self.server.on_authentication_complete(outcome.success),
        }
    }

    fn clear_status(&mut self) {
        self.outcome = None;
        match self.selector.current().transport() {
            Transport::Ir => self.ir.clear_status(),
            Transport::BleClient(peer) => self.ble.clear_status(peer),
            Transport::BleServer => self.server.clear_status(),
        }
    }

    /// "<camera>: <status>" for the selected camera
    pub fn status_text(&self) -> String {
        let target = self.selector.current();
        let status = match (&self.outcome, target.transport()) {
            (Some(e), _) => format!("Error: {e}"),
            (None, Transport::Ir) => self.ir.status_text(),
            (None, Transport::BleClient(peer)) => match self.ble.peer(peer) {
                Some(conn) => conn.status_text(),
                None => format!("Error: {}", ControlError::UnknownPeer(peer)),
            },
            (None, Transport::BleServer) => self.server.status_text(),
        };
        format!("{}: {status}", target.label())
    }

    pub fn ir(&self) -> &IrCommandEncoder<T> {
        &self.ir
    }

    pub fn ble(&self) -> &BleConnectionManager<C> {
        &self.ble
    }

    pub fn server(&self) -> &BlePeripheralRole<P> {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut BlePeripheralRole<P> {
        &mut self.server
    }

    pub fn security(&self) -> &BleSecurityNegotiator {
        &self.security
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::CharacteristicHandle;
    use crate::connection::BleConnectionState as S;
    use crate::error::BleError;
    use crate::events::{ClientEvent, SecurityEvent, ServerEvent};
    use crate::mock::{CentralCall, MockCentral, MockIr, MockPeripheral, PeripheralCall};
    use crate::target::PeerId;
    use shutter_proto::ir::SonyFrame;

    type Remote = CommandDispatcher<MockIr, MockCentral, MockPeripheral>;

    const GP05: PeerId = PeerId(0);
    const H: CharacteristicHandle = CharacteristicHandle(7);

    fn remote() -> Remote {
        CommandDispatcher::new(
            &RemoteConfig::default(),
            MockIr::default(),
            MockCentral::default(),
            MockPeripheral::default(),
            EventQueue::new(),
        )
        .unwrap()
    }

    /// Feed one event through the queue and run a tick
    fn deliver(remote: &mut Remote, now: u64, event: StackEvent) -> S {
        remote.sink().push(event);
        remote.poll(now);
        remote.ble().state(GP05).unwrap().clone()
    }

    fn client(event: ClientEvent) -> StackEvent {
        StackEvent::Client { peer: GP05, event }
    }

    fn gp05_link_up(remote: &mut Remote) -> Vec<S> {
        let mut seen = vec![remote.ble().state(GP05).unwrap().clone()];
        for (tick, event) in [
            client(ClientEvent::Connected),
            StackEvent::Security {
                link: Link::Client(GP05),
                event: SecurityEvent::PasskeyRequest,
            },
            StackEvent::Security {
                link: Link::Client(GP05),
                event: SecurityEvent::AuthenticationComplete { success: true },
            },
            client(ClientEvent::ServiceDiscovered),
            client(ClientEvent::CharacteristicDiscovered(H)),
            client(ClientEvent::Subscribed),
        ]
        .into_iter()
        .enumerate()
        {
            seen.push(deliver(remote, 100 * (tick as u64 + 1), event));
        }
        seen.dedup();
        seen
    }

    #[test]
    fn first_trigger_connects_then_records() {
        let mut remote = remote();
        assert_eq!(remote.status_text(), "Sony A6400: Ready");
        remote.handle_input(InputEvent::SelectNext);
        assert_eq!(remote.current(), CameraTarget::BlePeer1);
        assert_eq!(remote.status_text(), "GP05: Disconnected");

        assert_eq!(remote.handle_input(InputEvent::Trigger), Some(Ok(())));
        assert_eq!(remote.status_text(), "GP05: Connecting…");

        let seen = gp05_link_up(&mut remote);
        assert_eq!(
            seen,
            vec![
                S::Connecting,
                S::DiscoveringServices,
                S::DiscoveringCharacteristics,
                S::Subscribing,
                S::Ready,
            ]
        );
        assert_eq!(remote.ble().central().writes(), vec![(GP05, vec![0x01])]);
        assert!(remote
            .ble()
            .central()
            .calls
            .contains(&CentralCall::PasskeyReply(Link::Client(GP05), 123_456)));
        assert_eq!(remote.status_text(), "GP05: Recording…");
    }

    #[test]
    fn trigger_while_connecting_writes_once() {
        let mut remote = remote();
        remote.handle_input(InputEvent::SelectNext);
        remote.trigger().unwrap();
        remote.trigger().unwrap();
        assert_eq!(remote.ble().central().connects(GP05), 1);

        remote.trigger().unwrap();
        assert_eq!(remote.ble().central().connects(GP05), 1);

        gp05_link_up(&mut remote);
        assert_eq!(remote.ble().central().connects(GP05), 1);
        assert_eq!(remote.ble().central().writes().len(), 1);
    }

    #[test]
    fn ir_trigger_sends_shutter_code_only() {
        let mut remote = remote();
        assert_eq!(remote.current(), CameraTarget::IrCamera);
        remote.handle_input(InputEvent::Trigger).unwrap().unwrap();
        remote.poll(100);

        let sent = &remote.ir().transmitter().sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, SonyFrame::new(0xA90, 12).unwrap().timings(2));
        assert!(remote.ble().central().calls.is_empty());
        assert!(remote.server().peripheral().calls.is_empty());
        assert_eq!(remote.status_text(), "Sony A6400: Shutter sent");
    }

    #[test]
    fn phone_dropping_out_means_no_peer() {
        let mut remote = remote();
        remote.start();
        remote.handle_input(InputEvent::SelectPrevious);
        assert_eq!(remote.current(), CameraTarget::BleServerPeer);
        assert_eq!(remote.status_text(), "iPhone: Waiting for pairing…");

        let sink = remote.sink();
        sink.server(ServerEvent::Connected);
        sink.security(Link::Server, SecurityEvent::ConfirmPin(123_456));
        sink.security(Link::Server, SecurityEvent::AuthenticationComplete { success: true });
        remote.poll(100);
        assert!(remote
            .server()
            .peripheral()
            .calls
            .contains(&PeripheralCall::ConfirmReply(true)));

        remote.trigger().unwrap();
        assert_eq!(remote.server().peripheral().notifications(), 1);
        assert_eq!(remote.status_text(), "iPhone: Shutter triggered!");

        sink.server(ServerEvent::Disconnected);
        remote.poll(200);
        assert_eq!(
            remote.server_mut().notify_shutter_triggered(),
            Err(BleError::NoPeer)
        );
        assert_eq!(
            remote.trigger(),
            Err(ControlError::Ble(BleError::NoPeer))
        );
        assert_eq!(remote.server().peripheral().notifications(), 1);
        assert_eq!(remote.status_text(), "iPhone: Error: no paired peer");
    }

    #[test]
    fn back_clears_error_message() {
        let mut remote = remote();
        remote.handle_input(InputEvent::SelectPrevious);
        assert!(remote.trigger().is_err());
        remote.handle_input(InputEvent::Back);
        assert_eq!(remote.status_text(), "iPhone: Waiting for pairing…");
    }

    #[test]
    fn client_pairing_failure_is_reported_until_retry() {
        let mut remote = remote();
        remote.handle_input(InputEvent::SelectNext);
        remote.trigger().unwrap();
        deliver(&mut remote, 100, client(ClientEvent::Connected));
        let state = deliver(
            &mut remote,
            200,
            StackEvent::Security {
                link: Link::Client(GP05),
                event: SecurityEvent::AuthenticationComplete { success: false },
            },
        );
        assert_eq!(state, S::Error(BleError::PairingFailure));
        deliver(&mut remote, 300, client(ClientEvent::Disconnected));
        assert_eq!(remote.status_text(), "GP05: Error: pairing failed");

        remote.trigger().unwrap();
        assert_eq!(remote.ble().central().connects(GP05), 2);
        assert_eq!(remote.status_text(), "GP05: Connecting…");
    }

    #[test]
    fn connect_timeout_surfaces_in_status() {
        let mut remote = remote();
        remote.handle_input(InputEvent::SelectNext);
        remote.trigger().unwrap();
        remote.poll(10_000);
        assert_eq!(remote.status_text(), "GP05: Error: connect failed: timed out");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = RemoteConfig::default();
        config.peers.pop();
        let result = CommandDispatcher::new(
            &config,
            MockIr::default(),
            MockCentral::default(),
            MockPeripheral::default(),
            EventQueue::new(),
        );
        assert!(matches!(result, Err(ConfigError::MissingPeer(CameraTarget::Ble360Peer))));
    }
}
