//! The prelude exports the structs which are useful in representing
//! bus traffic and engine operations.  Providing this prelude is the
//! main purpose of the base crate.
pub use super::lanes::{join_lanes, lane_mask, map_lanes, split_lanes, Lanes, MAX_LANES};
pub use super::line::{word_strobe, Line, LINE_BYTES};
pub use super::memorymap::*;
pub use super::ops::*;
pub use super::transaction::*;
