//! Flat word storage.
//!
//! This is the array behind the program and data storage slaves.  It
//! has no timing of its own; the slave in front of it implements the
//! handshake and the response latency.
use std::fmt::{self, Debug, Formatter};

/// Word-addressed storage.  Offsets are in bytes from the start of
/// the slave's window; accesses beyond the end of the storage read
/// as zero and writes to them are dropped.
#[derive(Clone)]
pub struct WordStorage {
    words: Vec<u32>,
    writable: bool,
}

fn words_for_bytes(size: u32) -> usize {
    // A window need not be a multiple of 4 bytes; round up so that
    // every byte in it is backed.
    usize::try_from(size.div_ceil(4)).unwrap_or(usize::MAX)
}

impl WordStorage {
    /// Writable storage covering `size` bytes, initially zero.
    pub fn ram(size: u32) -> WordStorage {
        WordStorage {
            words: vec![0; words_for_bytes(size)],
            writable: true,
        }
    }

    /// Read-only storage covering `size` bytes whose first words are
    /// `image`.  Words of the image beyond the size are not used.
    pub fn rom(size: u32, image: &[u32]) -> WordStorage {
        let mut words = vec![0; words_for_bytes(size)];
        for (dest, src) in words.iter_mut().zip(image) {
            *dest = *src;
        }
        WordStorage {
            words,
            writable: false,
        }
    }

    /// Read the word containing byte `offset`.
    pub fn read(&self, offset: u32) -> u32 {
        usize::try_from(offset / 4)
            .ok()
            .and_then(|i| self.words.get(i))
            .copied()
            .unwrap_or(0)
    }

    /// Update the bytes of the word containing byte `offset` which are
    /// selected by `byte_enable`.  Returns false (and changes nothing)
    /// if the storage is read-only.
    pub fn write(&mut self, offset: u32, data: u32, byte_enable: u8) -> bool {
        if !self.writable {
            return false;
        }
        if let Some(word) = usize::try_from(offset / 4)
            .ok()
            .and_then(|i| self.words.get_mut(i))
        {
            *word = base::merge_bytes(*word, data, byte_enable);
        }
        true
    }

    pub fn read_byte(&self, offset: u32) -> u8 {
        self.read(offset).to_le_bytes()[(offset % 4) as usize]
    }

    pub fn write_byte(&mut self, offset: u32, value: u8) -> bool {
        let shift = 8 * (offset % 4);
        self.write(offset, u32::from(value) << shift, 1 << (offset % 4))
    }
}

impl Debug for WordStorage {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        // The contents are too large to be useful in a debug dump.
        f.debug_struct("WordStorage")
            .field("words", &self.words.len())
            .field("writable", &self.writable)
            .finish()
    }
}

#[test]
fn test_ram_byte_enables() {
    let mut ram = WordStorage::ram(16);
    assert!(ram.write(4, 0xAABB_CCDD, 0b1111));
    assert!(ram.write(4, 0x0000_1100, 0b0010));
    assert_eq!(ram.read(4), 0xAABB_11DD);
    assert_eq!(ram.read(5), 0xAABB_11DD);
    assert_eq!(ram.read_byte(7), 0xAA);
    assert!(ram.write_byte(6, 0x42));
    assert_eq!(ram.read(4), 0xAA42_11DD);
}

#[test]
fn test_rom_ignores_writes() {
    let mut rom = WordStorage::rom(8, &[1, 2, 3]);
    assert_eq!(rom.read(0), 1);
    assert_eq!(rom.read(4), 2);
    // The third image word does not fit.
    assert_eq!(rom.read(8), 0);
    assert!(!rom.write(0, 99, 0xF));
    assert_eq!(rom.read(0), 1);
}

#[test]
fn test_out_of_range_access() {
    let mut ram = WordStorage::ram(6);
    assert!(ram.write(4, 0xFFFF_FFFF, 0xF));
    assert_eq!(ram.read(4), 0xFFFF_FFFF);
    assert!(ram.write(8, 1, 0xF));
    assert_eq!(ram.read(8), 0);
}
