//! Slave devices attached to the interconnect (other than the
//! compute engine).
mod burst_storage;
mod decode_error;
mod lite_storage;
mod storage;

pub use burst_storage::BurstStorageSlave;
pub use decode_error::{BurstDecodeError, LiteDecodeError};
pub use lite_storage::StorageSlave;
pub use storage::WordStorage;
