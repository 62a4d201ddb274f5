//! Cycle-level simulation of a small compute subsystem: a requester,
//! a bus adapter, an address-decoding interconnect, storage slaves
//! and a multi-precision compute engine.
#![crate_name = "soc"]

mod adapter;
mod bus;
mod config;
mod context;
mod device;
mod engine;
mod host;
mod interconnect;
mod master;
mod monitor;
mod system;

pub use adapter::BusAdapter;
pub use bus::*;
pub use config::{ConfigError, SystemConfig, UnmappedPolicy};
pub use context::Context;
pub use device::{BurstDecodeError, BurstStorageSlave, LiteDecodeError, StorageSlave, WordStorage};
pub use engine::{
    compute, execute, BoundedFifo, ComputeEngine, EngineConfig, EngineVariant, FifoFull, Outcome,
    QueuedEngine, RegisterFile, UnsupportedPolicy, REG_LEVELS, REG_OPCODE, REG_OPERAND_A,
    REG_OPERAND_B, REG_POP_RESULT, REG_PRECISION, REG_PUSH_A, REG_PUSH_B, REG_RESULT, REG_START,
    REG_STATUS, STATUS_DONE, STATUS_UNSUPPORTED,
};
pub use host::{Completion, HostOp, HostRequest, HostResponse, Requester, ScriptedHost};
pub use interconnect::{AttachedSlave, Interconnect, Routed};
pub use master::{BurstCommand, BurstCompletion, BurstMaster};
pub use monitor::{PhaseLog, PhaseRecord};
pub use system::{BurstSystem, RunError, System, DATA_PORT, ENGINE_PORT, PROGRAM_PORT};
