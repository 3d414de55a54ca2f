//! Infrared shutter control

use crate::config::SonyIrConfig;
use crate::error::{ConfigError, IrError};
use log::{info, warn};
use shutter_proto::ir::{self, SonyFrame};

/// IR emitter hardware
///
/// `timings_us` alternates mark and space durations, starting with a mark.
/// The call blocks until the whole sequence is on air.
pub trait IrTransmitter {
    type Error: std::fmt::Display;

    fn transmit(&mut self, carrier_hz: u32, timings_us: &[u32]) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LastPulse {
    None,
    Sent,
    Failed(IrError),
}

/// Turns the shutter action into the camera's IR frame and fires it
pub struct IrCommandEncoder<T> {
    transmitter: T,
    carrier_hz: u32,
    timings: Vec<u32>,
    last: LastPulse,
}

impl<T: IrTransmitter> IrCommandEncoder<T> {
    pub fn new(transmitter: T, config: &SonyIrConfig) -> Result<Self, ConfigError> {
        let frame: SonyFrame = config.frame()?;
        Ok(Self {
            transmitter,
            carrier_hz: config.carrier_hz,
            timings: frame.timings(config.repeats),
            last: LastPulse::None,
        })
    }

    /// Blocks for the waveform duration, a few hundred milliseconds at most
    pub fn send_shutter_pulse(&mut self) -> Result<(), IrError> {
        info!(
            "sending IR shutter ({} edges, {} us)",
            self.timings.len(),
            ir::duration_us(&self.timings)
        );
        match self.transmitter.transmit(self.carrier_hz, &self.timings) {
            Ok(()) => {
                self.last = LastPulse::Sent;
                Ok(())
            }
            Err(e) => {
                warn!("IR transmit failed: {e}");
                let err = IrError::TransmitFailure(e.to_string());
                self.last = LastPulse::Failed(err.clone());
                Err(err)
            }
        }
    }

    pub fn timings(&self) -> &[u32] {
        &self.timings
    }

    pub fn status_text(&self) -> String {
        match &self.last {
            LastPulse::None => "Ready".to_string(),
            LastPulse::Sent => "Shutter sent".to_string(),
            LastPulse::Failed(e) => format!("Error: {e}"),
        }
    }

    /// Forget the last outcome, the display goes back to "Ready"
    pub fn clear_status(&mut self) {
        self.last = LastPulse::None;
    }

    pub fn transmitter(&self) -> &T {
        &self.transmitter
    }

    pub fn transmitter_mut(&mut self) -> &mut T {
        &mut self.transmitter
    }
}
