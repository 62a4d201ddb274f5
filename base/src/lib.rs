//! The `base` crate defines the representations which are useful to
//! both the bus simulator and other associated tools (for example
//! something that prepares request scripts or inspects phase logs).
//! The idea is that such a tool would depend on the base crate but
//! would not need to depend on the simulator library itself.

mod lanes;
mod line;
mod memorymap;
mod ops;
mod transaction;

pub mod prelude;

pub use crate::lanes::*;
pub use crate::line::*;
pub use crate::memorymap::*;
pub use crate::ops::*;
pub use crate::transaction::*;
