//! Address decoding.
//!
//! The interconnect routes each address phase to the slave whose
//! window contains the address.  Windows are static configuration and
//! must not overlap; addresses outside every window are gaps.
//!
//! # Standard memory map
//!
//! | Base          | Size       | Contents                         |
//! | ------------- | ---------- | -------------------------------- |
//! | `0x0000_0000` | 64 KiB     | Program storage (ROM)            |
//! | `0x1000_0000` | 64 KiB     | Data storage (RAM)               |
//! | `0x2000_0000` | 256 bytes  | Compute engine register block    |
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

pub const PROGRAM_STORAGE_BASE: u32 = 0x0000_0000;
pub const PROGRAM_STORAGE_SIZE: u32 = 0x0001_0000;
pub const DATA_STORAGE_BASE: u32 = 0x1000_0000;
pub const DATA_STORAGE_SIZE: u32 = 0x0001_0000;
pub const ENGINE_BASE: u32 = 0x2000_0000;
pub const ENGINE_SIZE: u32 = 0x0000_0100;

/// A contiguous range of addresses served by one slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub base: u32,
    pub size: u32,
}

impl Window {
    pub const fn new(base: u32, size: u32) -> Window {
        Window { base, size }
    }

    /// One past the last address of the window.  This is a `u64`
    /// because a window may end exactly at the top of the address
    /// space.
    pub const fn end(&self) -> u64 {
        self.base as u64 + self.size as u64
    }

    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.base && ((addr - self.base) as u64) < self.size as u64
    }

    /// Offset of `addr` from the start of the window.
    pub const fn offset_of(&self, addr: u32) -> u32 {
        addr.wrapping_sub(self.base)
    }

    fn overlaps(&self, other: &Window) -> bool {
        u64::from(self.base) < other.end() && u64::from(other.base) < self.end()
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[{:#010x}, {:#011x})", self.base, self.end())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryMapError {
    /// A window of size zero can never be selected.
    EmptyWindow(Window),
    /// The window extends past the top of the 32-bit address space.
    WindowOverflow(Window),
    /// Two windows share at least one address.
    Overlap(Window, Window),
}

impl Display for MemoryMapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            MemoryMapError::EmptyWindow(w) => write!(f, "window at {:#010x} is empty", w.base),
            MemoryMapError::WindowOverflow(w) => {
                write!(f, "window {w} extends past the end of the address space")
            }
            MemoryMapError::Overlap(a, b) => write!(f, "windows {a} and {b} overlap"),
        }
    }
}

impl Error for MemoryMapError {}

/// The set of slave windows, in slave-port order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryMap {
    windows: Vec<Window>,
}

impl MemoryMap {
    pub fn new(windows: Vec<Window>) -> Result<MemoryMap, MemoryMapError> {
        for (i, w) in windows.iter().enumerate() {
            if w.size == 0 {
                return Err(MemoryMapError::EmptyWindow(*w));
            }
            if w.end() > 1u64 << 32 {
                return Err(MemoryMapError::WindowOverflow(*w));
            }
            if let Some(other) = windows[..i].iter().find(|other| other.overlaps(w)) {
                return Err(MemoryMapError::Overlap(*other, *w));
            }
        }
        Ok(MemoryMap { windows })
    }

    /// Program storage, data storage and the engine, in that order.
    pub fn standard() -> MemoryMap {
        MemoryMap {
            windows: vec![
                Window::new(PROGRAM_STORAGE_BASE, PROGRAM_STORAGE_SIZE),
                Window::new(DATA_STORAGE_BASE, DATA_STORAGE_SIZE),
                Window::new(ENGINE_BASE, ENGINE_SIZE),
            ],
        }
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Return the index of the window containing `addr`, or `None` if
    /// the address falls in a gap.  Since windows never overlap, at
    /// most one window can match.
    pub fn decode(&self, addr: u32) -> Option<usize> {
        self.windows.iter().position(|w| w.contains(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_standard_map_decode() {
        let map = MemoryMap::standard();
        assert_eq!(map.decode(0x0000_0000), Some(0));
        assert_eq!(map.decode(0x0000_FFFC), Some(0));
        assert_eq!(map.decode(0x0001_0000), None);
        assert_eq!(map.decode(0x1000_0010), Some(1));
        assert_eq!(map.decode(0x2000_0018), Some(2));
        assert_eq!(map.decode(0x2000_0100), None);
        assert_eq!(map.decode(0xFFFF_FFFF), None);
    }

    #[test]
    fn test_adjacent_windows_are_allowed() {
        let map = MemoryMap::new(vec![Window::new(0, 0x100), Window::new(0x100, 0x100)])
            .expect("adjacent windows do not overlap");
        assert_eq!(map.decode(0xFF), Some(0));
        assert_eq!(map.decode(0x100), Some(1));
    }

    #[test]
    fn test_overlap_is_rejected() {
        let a = Window::new(0x1000, 0x100);
        let b = Window::new(0x10FC, 0x10);
        assert_eq!(
            MemoryMap::new(vec![a, b]),
            Err(MemoryMapError::Overlap(a, b))
        );
    }

    #[test]
    fn test_degenerate_windows_are_rejected() {
        let empty = Window::new(0x40, 0);
        assert_eq!(
            MemoryMap::new(vec![empty]),
            Err(MemoryMapError::EmptyWindow(empty))
        );
        let top = Window::new(0xFFFF_FF00, 0x100);
        assert!(MemoryMap::new(vec![top]).is_ok());
        assert!(top.contains(0xFFFF_FFFF));
        let past_top = Window::new(0xFFFF_FF00, 0x101);
        assert_eq!(
            MemoryMap::new(vec![past_top]),
            Err(MemoryMapError::WindowOverflow(past_top))
        );
    }

    #[proptest]
    fn decode_agrees_with_window_bounds(addr: u32) {
        let map = MemoryMap::standard();
        let matching: Vec<usize> = map
            .windows()
            .iter()
            .enumerate()
            .filter(|(_, w)| u64::from(w.base) <= u64::from(addr) && u64::from(addr) < w.end())
            .map(|(i, _)| i)
            .collect();
        assert!(matching.len() <= 1);
        assert_eq!(map.decode(addr), matching.first().copied());
    }
}
