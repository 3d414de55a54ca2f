//! One interface over the three ways of firing a shutter

use crate::ble::{BleCentral, BlePeripheral};
use crate::connection::BleConnectionManager;
use crate::error::ControlError;
use crate::ir::{IrCommandEncoder, IrTransmitter};
use crate::peripheral::{BlePeripheralRole, ServerConnectionState};
use crate::target::PeerId;
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// A connection or pairing is under way; commands are held until it completes
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraCommand {
    /// Take a picture, or toggle recording on cameras that film
    Shutter,
}

pub trait CameraController {
    /// Begin whatever the transport needs before it can take commands
    fn ensure_ready(&mut self) -> Result<Readiness, ControlError>;

    fn send_command(&mut self, command: CameraCommand) -> Result<(), ControlError>;

    fn status_text(&self) -> String;
}

pub struct IrController<'a, T> {
    encoder: &'a mut IrCommandEncoder<T>,
}

impl<'a, T: IrTransmitter> IrController<'a, T> {
    pub fn new(encoder: &'a mut IrCommandEncoder<T>) -> Self {
        Self { encoder }
    }
}

impl<T: IrTransmitter> CameraController for IrController<'_, T> {
    fn ensure_ready(&mut self) -> Result<Readiness, ControlError> {
        Ok(Readiness::Ready)
    }

    fn send_command(&mut self, command: CameraCommand) -> Result<(), ControlError> {
        match command {
            CameraCommand::Shutter => Ok(self.encoder.send_shutter_pulse()?),
        }
    }

    fn status_text(&self) -> String {
        self.encoder.status_text()
    }
}

/// A camera we connect out to
pub struct BleClientController<'a, C> {
    manager: &'a mut BleConnectionManager<C>,
    peer: PeerId,
    payload: u8,
}

impl<'a, C: BleCentral> BleClientController<'a, C> {
    pub fn new(manager: &'a mut BleConnectionManager<C>, peer: PeerId, payload: u8) -> Self {
        Self {
            manager,
            peer,
            payload,
        }
    }
}

impl<C: BleCentral> CameraController for BleClientController<'_, C> {
    fn ensure_ready(&mut self) -> Result<Readiness, ControlError> {
        self.manager.ensure_ready(self.peer)
    }

    /// Writes now if READY, otherwise holds the command for when it is
    fn send_command(&mut self, command: CameraCommand) -> Result<(), ControlError> {
        let CameraCommand::Shutter = command;
        let ready = self.manager.peer(self.peer).is_some_and(|p| p.is_ready());
        if ready {
            self.manager.write_command(self.peer, &[self.payload])
        } else {
            self.manager.queue_command(self.peer, vec![self.payload])
        }
    }

    fn status_text(&self) -> String {
        match self.manager.peer(self.peer) {
            Some(peer) => peer.status_text(),
            None => format!("Error: {}", ControlError::UnknownPeer(self.peer)),
        }
    }
}

/// The phone that connects in to us
pub struct BleServerController<'a, P> {
    role: &'a mut BlePeripheralRole<P>,
}

impl<'a, P: BlePeripheral> BleServerController<'a, P> {
    pub fn new(role: &'a mut BlePeripheralRole<P>) -> Self {
        Self { role }
    }
}

impl<P: BlePeripheral> CameraController for BleServerController<'_, P> {
    fn ensure_ready(&mut self) -> Result<Readiness, ControlError> {
        if self.role.state() == ServerConnectionState::Paired {
            return Ok(Readiness::Ready);
        }
        // No phone either way; the fault stays in the status line.
        if let Err(e) = self.role.start() {
            warn!("phone unreachable: {e}");
        }
        Ok(Readiness::InProgress)
    }

    fn send_command(&mut self, command: CameraCommand) -> Result<(), ControlError> {
        let CameraCommand::Shutter = command;
        Ok(self.role.notify_shutter_triggered()?)
    }

    fn status_text(&self) -> String {
        self.role.status_text()
    }
}
