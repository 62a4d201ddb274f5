//! The data carried by one beat of the wide (burst) bus.
use std::fmt::{self, Debug, Formatter};

use serde::Serialize;

/// Number of byte lanes on the wide bus (1024 bits).
pub const LINE_BYTES: usize = 128;

/// One 1024-bit beat of bus data.  Byte lane 0 is the least
/// significant.  A narrow beat at address `a` occupies the byte lanes
/// starting at `a % LINE_BYTES`.
#[derive(Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Line(#[serde(with = "line_bytes")] [u8; LINE_BYTES]);

mod line_bytes {
    use super::LINE_BYTES;
    use serde::Serializer;

    pub(super) fn serialize<S: Serializer>(
        bytes: &[u8; LINE_BYTES],
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }
}

impl Default for Line {
    fn default() -> Line {
        Line::ZERO
    }
}

impl Line {
    pub const ZERO: Line = Line([0; LINE_BYTES]);

    /// Return the byte lane at which `addr` starts.
    pub const fn lane_of(addr: u32) -> usize {
        (addr as usize) % LINE_BYTES
    }

    pub fn bytes(&self) -> &[u8; LINE_BYTES] {
        &self.0
    }

    pub fn byte(&self, lane: usize) -> u8 {
        self.0[lane % LINE_BYTES]
    }

    pub fn set_byte(&mut self, lane: usize, value: u8) {
        self.0[lane % LINE_BYTES] = value;
    }

    /// Fetch the (little-endian) 32-bit word whose first byte is at the
    /// byte lane used by `addr`.  The address is rounded down to a
    /// word boundary.
    pub fn word_at(&self, addr: u32) -> u32 {
        let lane = Line::lane_of(addr & !3);
        u32::from_le_bytes([
            self.0[lane],
            self.0[lane + 1],
            self.0[lane + 2],
            self.0[lane + 3],
        ])
    }

    /// Store a 32-bit word at the byte lanes used by `addr` (rounded
    /// down to a word boundary).
    pub fn set_word_at(&mut self, addr: u32, value: u32) {
        let lane = Line::lane_of(addr & !3);
        self.0[lane..lane + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Build a line carrying a single word at the lanes for `addr`,
    /// together with the matching byte strobe.
    pub fn with_word(addr: u32, value: u32) -> (Line, u128) {
        let mut line = Line::ZERO;
        line.set_word_at(addr, value);
        (line, word_strobe(addr))
    }
}

/// The byte strobe selecting the four byte lanes of the word at `addr`.
pub fn word_strobe(addr: u32) -> u128 {
    0xF_u128 << Line::lane_of(addr & !3)
}

impl Debug for Line {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        // Most significant word first, as in a waveform viewer.
        for (i, chunk) in self.0.chunks(4).rev().enumerate() {
            if i > 0 {
                f.write_str("_")?;
            }
            write!(
                f,
                "{:08x}",
                u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
            )?;
        }
        Ok(())
    }
}

#[test]
fn test_word_lanes() {
    let (line, strobe) = Line::with_word(0x1000_0084, 0xCAFE_F00D);
    assert_eq!(strobe, 0xF0);
    assert_eq!(line.word_at(0x84), 0xCAFE_F00D);
    assert_eq!(line.word_at(0x2000_0004), 0xCAFE_F00D);
    assert_eq!(line.word_at(0x80), 0);
    assert_eq!(line.byte(4), 0x0D);
}

#[test]
fn test_last_word_lane() {
    let mut line = Line::ZERO;
    line.set_word_at(0x7F, 0x1234_5678);
    assert_eq!(line.word_at(0x7C), 0x1234_5678);
    assert_eq!(word_strobe(0x7C), 0xF_u128 << 124);
}
