//! Transaction descriptors.
//!
//! A transaction is created when a requester presents a valid address
//! phase and is consumed once its response phase completes.  Apart
//! from the beat address advancing during a burst, it is never
//! mutated in between.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

#[cfg(test)]
use test_strategy::Arbitrary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Read,
    Write,
}

/// The status code carried by write responses and read data.  Only
/// `Okay` is produced by the storage slaves and the engine; the other
/// codes come from the decode-error slave and from burst protocol
/// violations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Response {
    #[default]
    Okay,
    SlaveError,
    DecodeError,
}

impl Response {
    pub const fn is_okay(self) -> bool {
        matches!(self, Response::Okay)
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            Response::Okay => "OKAY",
            Response::SlaveError => "SLVERR",
            Response::DecodeError => "DECERR",
        })
    }
}

/// A single-beat transaction on the lite bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub address: u32,
    pub direction: Direction,
    pub data: u32,
    pub byte_enable: u8,
}

impl Transaction {
    /// Build the transaction for a generic request.  A non-zero byte
    /// enable mask makes it a write; otherwise it is a read.
    pub fn from_request(address: u32, data: u32, byte_enable: u8) -> Transaction {
        let byte_enable = byte_enable & 0xF;
        Transaction {
            address,
            direction: if byte_enable != 0 {
                Direction::Write
            } else {
                Direction::Read
            },
            data,
            byte_enable,
        }
    }
}

/// Merge `data` into `old`, replacing only the bytes selected by
/// `byte_enable` (bit 0 selects the least significant byte).
pub fn merge_bytes(old: u32, data: u32, byte_enable: u8) -> u32 {
    let mask = (0..4).fold(0u32, |mask, i| {
        if byte_enable & (1 << i) != 0 {
            mask | (0xFF << (8 * i))
        } else {
            mask
        }
    });
    (old & !mask) | (data & mask)
}

#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BurstMode {
    /// Every beat uses the same address (e.g. a FIFO port).
    Fixed,
    /// Each beat's address follows on from the previous beat.
    #[default]
    Incrementing,
}

/// The number of bytes transferred by each beat of a burst.
#[cfg_attr(test, derive(Arbitrary))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BeatSize {
    B1,
    B2,
    #[default]
    B4,
    B8,
    B16,
    B32,
    B64,
    B128,
}

impl BeatSize {
    pub const fn bytes(self) -> u32 {
        1 << (self as u32)
    }
}

pub const MAX_BURST_LEN: u16 = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BurstError {
    ZeroLength,
    TooLong(u16),
    Misaligned { address: u32, size: BeatSize },
    /// A write burst was given a different number of data beats than
    /// its descriptor declares.
    BeatCount { expected: u16, actual: usize },
}

impl Display for BurstError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            BurstError::ZeroLength => f.write_str("a burst must have at least one beat"),
            BurstError::TooLong(n) => {
                write!(f, "burst of {n} beats exceeds the maximum of {MAX_BURST_LEN}")
            }
            BurstError::Misaligned { address, size } => write!(
                f,
                "address {address:#010x} is not aligned to the {}-byte beat size",
                size.bytes()
            ),
            BurstError::BeatCount { expected, actual } => write!(
                f,
                "burst declares {expected} beats but {actual} data beats were supplied"
            ),
        }
    }
}

impl Error for BurstError {}

/// The address phase of a (possibly multi-beat) burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BurstDescriptor {
    pub id: u8,
    pub address: u32,
    /// Number of beats (1 to [`MAX_BURST_LEN`]).
    pub len: u16,
    pub size: BeatSize,
    pub mode: BurstMode,
}

impl Default for BurstDescriptor {
    fn default() -> BurstDescriptor {
        BurstDescriptor {
            id: 0,
            address: 0,
            len: 1,
            size: BeatSize::default(),
            mode: BurstMode::default(),
        }
    }
}

impl BurstDescriptor {
    pub fn new(
        id: u8,
        address: u32,
        len: u16,
        size: BeatSize,
        mode: BurstMode,
    ) -> Result<BurstDescriptor, BurstError> {
        if len == 0 {
            Err(BurstError::ZeroLength)
        } else if len > MAX_BURST_LEN {
            Err(BurstError::TooLong(len))
        } else if address % size.bytes() != 0 {
            Err(BurstError::Misaligned { address, size })
        } else {
            Ok(BurstDescriptor {
                id,
                address,
                len,
                size,
                mode,
            })
        }
    }

    /// The address used by beat number `beat` (counting from 0).
    pub fn beat_address(&self, beat: u16) -> u32 {
        match self.mode {
            BurstMode::Fixed => self.address,
            BurstMode::Incrementing => self
                .address
                .wrapping_add(u32::from(beat).wrapping_mul(self.size.bytes())),
        }
    }

    /// True when `beat` is the final beat of the burst.
    pub fn is_last(&self, beat: u16) -> bool {
        beat.saturating_add(1) >= self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_direction_follows_byte_enables() {
        assert_eq!(
            Transaction::from_request(0x10, 7, 0b0001).direction,
            Direction::Write
        );
        assert_eq!(
            Transaction::from_request(0x10, 7, 0).direction,
            Direction::Read
        );
        // Only the bottom four bits correspond to bytes of a word.
        assert_eq!(
            Transaction::from_request(0x10, 7, 0xF0).direction,
            Direction::Read
        );
    }

    #[test]
    fn test_merge_bytes() {
        assert_eq!(merge_bytes(0x1122_3344, 0xAABB_CCDD, 0b0000), 0x1122_3344);
        assert_eq!(merge_bytes(0x1122_3344, 0xAABB_CCDD, 0b0101), 0x11BB_33DD);
        assert_eq!(merge_bytes(0x1122_3344, 0xAABB_CCDD, 0b1111), 0xAABB_CCDD);
    }

    #[test]
    fn test_incrementing_burst_addresses() {
        let d = BurstDescriptor::new(3, 0x1000_0010, 4, BeatSize::B4, BurstMode::Incrementing)
            .expect("valid burst");
        let addrs: Vec<u32> = (0..d.len).map(|b| d.beat_address(b)).collect();
        assert_eq!(addrs, vec![0x1000_0010, 0x1000_0014, 0x1000_0018, 0x1000_001C]);
        assert!(!d.is_last(2));
        assert!(d.is_last(3));
    }

    #[test]
    fn test_fixed_burst_repeats_address() {
        let d = BurstDescriptor::new(0, 0x2000_0020, 3, BeatSize::B4, BurstMode::Fixed)
            .expect("valid burst");
        assert!((0..3).all(|b| d.beat_address(b) == 0x2000_0020));
    }

    #[test]
    fn test_bad_bursts() {
        assert_eq!(
            BurstDescriptor::new(0, 0, 0, BeatSize::B4, BurstMode::Fixed),
            Err(BurstError::ZeroLength)
        );
        assert_eq!(
            BurstDescriptor::new(0, 0, 257, BeatSize::B4, BurstMode::Fixed),
            Err(BurstError::TooLong(257))
        );
        assert_eq!(
            BurstDescriptor::new(0, 0x42, 1, BeatSize::B4, BurstMode::Fixed),
            Err(BurstError::Misaligned {
                address: 0x42,
                size: BeatSize::B4
            })
        );
    }

    #[proptest]
    fn last_beat_is_beat_len_minus_one(
        #[strategy(1u16..=MAX_BURST_LEN)] len: u16,
        size: BeatSize,
        mode: BurstMode,
    ) {
        let d = BurstDescriptor::new(0, 0x1000_0000, len, size, mode).expect("aligned");
        let lasts: Vec<u16> = (0..len).filter(|b| d.is_last(*b)).collect();
        assert_eq!(lasts, vec![len - 1]);
    }
}
