//! Various convenience utilities for splitting 32-bit words into
//! equal-width lanes and for joining them together.
//!
//! Lane 0 is always the least-significant lane.  A 32-bit word split
//! into 8-bit lanes therefore yields the bytes of the word in
//! little-endian order.
use super::ops::Precision;

/// Width of the words handled by the engine and by the lite bus.
pub const WORD_BITS: u32 = 32;

/// The narrowest supported lane is 4 bits wide, so a word never has
/// more than this many lanes.
pub const MAX_LANES: usize = 8;

/// Return a mask covering the bottom `width` bits of a word.
pub const fn lane_mask(width: u32) -> u32 {
    if width >= WORD_BITS {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// The lanes of a single word.  Values are always held right-aligned
/// (that is, lane `i` of a word `w` with lane width `n` is `(w >>
/// (i * n)) & mask`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lanes {
    precision: Precision,
    values: [u32; MAX_LANES],
}

impl Lanes {
    pub fn width(&self) -> u32 {
        self.precision.lane_width()
    }

    pub fn len(&self) -> usize {
        self.precision.lane_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, lane: usize) -> Option<u32> {
        self.values[..self.len()].get(lane).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.values[..self.len()].iter().copied()
    }

    /// Reassemble the word these lanes came from.
    pub fn join(&self) -> u32 {
        join_lanes(self.precision, &self.values[..self.len()])
    }
}

/// Split a 32-bit word into the lanes of `precision`.
pub fn split_lanes(word: u32, precision: Precision) -> Lanes {
    let width = precision.lane_width();
    let mask = lane_mask(width);
    let mut values = [0u32; MAX_LANES];
    for (i, value) in values.iter_mut().take(precision.lane_count()).enumerate() {
        // `i * width` is at most 28 when width < 32, and 0 otherwise.
        *value = word.checked_shr(i as u32 * width).unwrap_or(0) & mask;
    }
    Lanes { precision, values }
}

/// Join lanes (least-significant first) into a 32-bit word.  Each lane
/// value is truncated to the lane width, so no lane can carry into its
/// neighbour.  Lanes beyond those of `precision` are ignored.
pub fn join_lanes(precision: Precision, lanes: &[u32]) -> u32 {
    let width = precision.lane_width();
    let mask = lane_mask(width);
    lanes
        .iter()
        .take(precision.lane_count())
        .enumerate()
        .fold(0u32, |acc, (i, lane)| {
            acc | (lane & mask).checked_shl(i as u32 * width).unwrap_or(0)
        })
}

/// Apply `f` independently to each pair of corresponding lanes of `a`
/// and `b`, truncating each result to the lane width.
pub fn map_lanes<F>(a: u32, b: u32, precision: Precision, mut f: F) -> u32
where
    F: FnMut(u32, u32) -> u32,
{
    let left = split_lanes(a, precision);
    let right = split_lanes(b, precision);
    let mut out = [0u32; MAX_LANES];
    for (i, (x, y)) in left.iter().zip(right.iter()).enumerate() {
        out[i] = f(x, y);
    }
    join_lanes(precision, &out[..left.len()])
}
