//! IR output for hosts without an emitter

use log::{debug, info};
use shutter_mcu::IrTransmitter;
use std::convert::Infallible;

/// Logs each waveform instead of emitting it
#[derive(Debug, Default)]
pub struct DryRunIr {
    sent: usize,
}

impl DryRunIr {
    /// Number of waveforms "sent" so far
    pub fn sent(&self) -> usize {
        self.sent
    }
}

impl IrTransmitter for DryRunIr {
    type Error = Infallible;

    fn transmit(&mut self, carrier_hz: u32, timings_us: &[u32]) -> Result<(), Infallible> {
        let total: u64 = timings_us.iter().map(|&t| u64::from(t)).sum();
        info!(
            "IR (dry run): {} edges at {} kHz, {} us",
            timings_us.len(),
            carrier_hz / 1000,
            total
        );
        debug!("IR timings: {timings_us:?}");
        self.sent += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shutter_mcu::{IrCommandEncoder, SonyIrConfig};

    #[test]
    fn encoder_drives_dry_run() {
        let mut enc = IrCommandEncoder::new(DryRunIr::default(), &SonyIrConfig::default()).unwrap();
        enc.send_shutter_pulse().unwrap();
        enc.send_shutter_pulse().unwrap();
        assert_eq!(enc.transmitter().sent(), 2);
    }
}
