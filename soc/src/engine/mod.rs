//! The multi-precision compute engine.
//!
//! Software controls the engine through a small block of registers.
//! Writing the operands, the opcode and the precision mode and then
//! writing 1 to the start register performs one operation; one cycle
//! later the result register holds the result and the done bit of the
//! status register is set.  The done bit stays set until the next
//! start.
//!
//! The queued variant of the engine adds operand and result queues;
//! see [`QueuedEngine`].
use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use base::prelude::*;

mod alu;
mod fifo;
mod lite;
mod queued;

pub use alu::{compute, execute, Outcome};
pub use fifo::{BoundedFifo, FifoFull};
pub use lite::ComputeEngine;
pub use queued::QueuedEngine;

pub const REG_OPERAND_A: u32 = 0x00;
pub const REG_OPERAND_B: u32 = 0x04;
pub const REG_OPCODE: u32 = 0x08;
pub const REG_PRECISION: u32 = 0x0C;
pub const REG_START: u32 = 0x10;
pub const REG_RESULT: u32 = 0x14;
pub const REG_STATUS: u32 = 0x18;
pub const REG_PUSH_A: u32 = 0x20;
pub const REG_PUSH_B: u32 = 0x24;
pub const REG_POP_RESULT: u32 = 0x28;
pub const REG_LEVELS: u32 = 0x2C;

pub const STATUS_DONE: u32 = 1 << 0;
pub const STATUS_UNSUPPORTED: u32 = 1 << 1;

/// Which arithmetic units the engine was built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineVariant {
    /// The 32-bit and 16-bit modes use IEEE binary32 and binary16
    /// arithmetic.
    #[default]
    FloatingPoint,
    /// The 32-bit mode is signed integer arithmetic (division by zero
    /// yields zero) and the 16-bit mode is two integer lanes.
    IntegerOnly,
}

/// What the engine does when asked for an operation it does not
/// implement.  Either way the result is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnsupportedPolicy {
    /// Report nothing; the zero result is indistinguishable from a
    /// computed zero.
    Zero,
    /// Set the unsupported bit of the status register.
    #[default]
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub variant: EngineVariant,
    pub unsupported: UnsupportedPolicy,
    /// Capacity of each of the queued engine's operand and result
    /// queues.
    pub fifo_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            variant: EngineVariant::default(),
            unsupported: UnsupportedPolicy::default(),
            fifo_depth: 8,
        }
    }
}

impl EngineConfig {
    /// Perform one operation, returning the result and whether the
    /// status register should report it as unsupported.
    pub fn evaluate(&self, opcode: u32, precision: u32, a: u32, b: u32) -> (u32, bool) {
        match execute(self.variant, opcode, precision, a, b) {
            Outcome::Value(v) => (v, false),
            Outcome::Unsupported => (0, self.unsupported == UnsupportedPolicy::Flag),
        }
    }
}

/// The control and status registers shared by both engines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterFile {
    pub operand_a: u32,
    pub operand_b: u32,
    pub opcode: u32,
    pub precision: u32,
    /// Set by a write to the start register; cleared when the
    /// operation is performed.
    pub start: bool,
    pub result: u32,
    pub done: bool,
    pub unsupported: bool,
}

impl RegisterFile {
    pub fn status(&self) -> u32 {
        let mut status = 0;
        if self.done {
            status |= STATUS_DONE;
        }
        if self.unsupported {
            status |= STATUS_UNSUPPORTED;
        }
        status
    }

    /// The value of the register at `offset`, or zero for offsets
    /// which are not part of the block.
    pub fn read(&self, offset: u32) -> u32 {
        match offset & !3 {
            REG_OPERAND_A => self.operand_a,
            REG_OPERAND_B => self.operand_b,
            REG_OPCODE => self.opcode,
            REG_PRECISION => self.precision,
            REG_START => u32::from(self.start),
            REG_RESULT => self.result,
            REG_STATUS => self.status(),
            _ => 0,
        }
    }

    /// Write the enabled bytes of `data` to the register at `offset`.
    /// Writes to the read-only registers and to offsets outside the
    /// block are ignored; the return value says whether the write
    /// had an effect.
    pub fn write(&mut self, offset: u32, data: u32, byte_enable: u8) -> bool {
        let target = match offset & !3 {
            REG_OPERAND_A => &mut self.operand_a,
            REG_OPERAND_B => &mut self.operand_b,
            REG_OPCODE => &mut self.opcode,
            REG_PRECISION => &mut self.precision,
            REG_START => {
                if merge_bytes(0, data, byte_enable) & 1 != 0 {
                    self.start = true;
                    self.done = false;
                }
                return true;
            }
            _ => return false,
        };
        *target = merge_bytes(*target, data, byte_enable);
        true
    }

    /// Perform the pending operation, if any.
    pub fn step(&mut self, config: &EngineConfig, cycle: u64) {
        if !self.start {
            return;
        }
        let (result, unsupported) =
            config.evaluate(self.opcode, self.precision, self.operand_a, self.operand_b);
        if unsupported {
            event!(
                Level::WARN,
                "cycle {cycle}: opcode {} is not supported at precision {}",
                self.opcode,
                self.precision
            );
        } else {
            event!(
                Level::DEBUG,
                "cycle {cycle}: op {} prec {}: {:#010x}, {:#010x} -> {:#010x}",
                self.opcode,
                self.precision,
                self.operand_a,
                self.operand_b,
                result
            );
        }
        self.result = result;
        self.unsupported = unsupported;
        self.done = true;
        self.start = false;
    }
}
