//! Sony SIRC infrared framing
//!
//! A frame is a header mark, then one mark per data bit (long for 1, short
//! for 0), each followed by a fixed space. Bits go out MSB first. Every frame
//! is padded so consecutive frames start [`SONY_FRAME_LENGTH_US`] apart, and
//! the whole frame is repeated so the camera sees at least three copies.
//!
//! Timings are produced as alternating mark/space durations in microseconds,
//! starting with a mark, which is what IR transmit peripherals (RMT, PWM
//! carriers) consume.

/// Carrier frequency for Sony remotes
pub const SONY_CARRIER_HZ: u32 = 40_000;

pub const SONY_HEADER_MARK_US: u32 = 2400;
pub const SONY_SPACE_US: u32 = 600;
pub const SONY_ONE_MARK_US: u32 = 1200;
pub const SONY_ZERO_MARK_US: u32 = 600;

/// Minimum trailing gap after the last bit
pub const SONY_MIN_GAP_US: u32 = 10_000;

/// Start-to-start period of repeated frames
pub const SONY_FRAME_LENGTH_US: u32 = 45_000;

/// Extra copies sent after the first frame
pub const SONY_MIN_REPEAT: u8 = 2;

/// Sony A6400 shutter release
pub const SONY_SHUTTER_CODE: u32 = 0xA90;
pub const SONY_SHUTTER_BITS: u8 = 12;

/// Allowed SIRC frame widths
pub const SONY_VALID_BITS: [u8; 3] = [12, 15, 20];

/// One SIRC command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SonyFrame {
    pub code: u32,
    pub bits: u8,
}

/// Reasons a [`SonyFrame`] cannot be encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Width is not one of [`SONY_VALID_BITS`]
    UnsupportedWidth(u8),
    /// Code has bits set above the frame width
    CodeTooWide { code: u32, bits: u8 },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::UnsupportedWidth(bits) => write!(f, "unsupported SIRC width: {bits} bits"),
            FrameError::CodeTooWide { code, bits } => {
                write!(f, "code 0x{code:X} does not fit in {bits} bits")
            }
        }
    }
}

impl std::error::Error for FrameError {}

impl SonyFrame {
    pub fn new(code: u32, bits: u8) -> Result<Self, FrameError> {
        if !SONY_VALID_BITS.contains(&bits) {
            return Err(FrameError::UnsupportedWidth(bits));
        }
        if code >> bits != 0 {
            return Err(FrameError::CodeTooWide { code, bits });
        }
        Ok(Self { code, bits })
    }

    pub fn shutter() -> Self {
        Self {
            code: SONY_SHUTTER_CODE,
            bits: SONY_SHUTTER_BITS,
        }
    }

    /// Timings for a single frame, trailing gap included
    pub fn frame_timings(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(2 + 2 * self.bits as usize);
        out.push(SONY_HEADER_MARK_US);
        out.push(SONY_SPACE_US);

        for i in (0..self.bits).rev() {
            let mark = if (self.code >> i) & 1 == 1 {
                SONY_ONE_MARK_US
            } else {
                SONY_ZERO_MARK_US
            };
            out.push(mark);
            out.push(SONY_SPACE_US);
        }

        // The last bit's space becomes the inter-frame gap.
        let elapsed: u32 = out.iter().sum();
        let gap = SONY_FRAME_LENGTH_US
            .saturating_sub(elapsed - SONY_SPACE_US)
            .max(SONY_MIN_GAP_US);
        if let Some(last) = out.last_mut() {
            *last = gap;
        }
        out
    }

    /// Timings for the first frame followed by `repeats` copies
    pub fn timings(&self, repeats: u8) -> Vec<u32> {
        let frame = self.frame_timings();
        let mut out = Vec::with_capacity(frame.len() * (repeats as usize + 1));
        for _ in 0..=repeats {
            out.extend_from_slice(&frame);
        }
        out
    }
}

/// Total on-air duration of a timing sequence
pub fn duration_us(timings: &[u32]) -> u64 {
    timings.iter().map(|&t| t as u64).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutter_frame_layout() {
        let t = SonyFrame::shutter().frame_timings();
        // header pair + 12 bit pairs
        assert_eq!(t.len(), 26);
        assert_eq!(&t[..2], &[2400, 600]);

        // 0xA90 = 1010 1001 0000, MSB first
        let marks: Vec<u32> = t[2..].iter().step_by(2).copied().collect();
        assert_eq!(
            marks,
            vec![1200, 600, 1200, 600, 1200, 600, 600, 1200, 600, 600, 600, 600]
        );
    }

    #[test]
    fn frames_are_padded_to_period() {
        let t = SonyFrame::shutter().frame_timings();
        assert_eq!(duration_us(&t), SONY_FRAME_LENGTH_US as u64);
        assert_eq!(*t.last().unwrap(), 25_200);
    }

    #[test]
    fn long_frames_keep_minimum_gap() {
        let t = SonyFrame::new(0xFFFFF, 20).unwrap().frame_timings();
        assert_eq!(*t.last().unwrap(), SONY_MIN_GAP_US);
    }

    #[test]
    fn repeats_copy_the_frame() {
        let f = SonyFrame::shutter();
        let t = f.timings(SONY_MIN_REPEAT);
        assert_eq!(t.len(), 3 * f.frame_timings().len());
        assert_eq!(duration_us(&t), 3 * SONY_FRAME_LENGTH_US as u64);
    }

    #[test]
    fn rejects_bad_frames() {
        assert_eq!(SonyFrame::new(0xA90, 13), Err(FrameError::UnsupportedWidth(13)));
        assert_eq!(
            SonyFrame::new(0x1A90, 12),
            Err(FrameError::CodeTooWide { code: 0x1A90, bits: 12 })
        );
    }
}
