//! Encodings of the compute engine's opcode and precision registers.
use std::error::Error;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// The operations the compute engine can be asked to perform.  The
/// discriminant is the value written to the opcode register.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Opcode {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    And = 4,
    Or = 5,
    Xor = 6,
    SetLessThan = 7,
}

impl Opcode {
    #[must_use]
    pub const fn all() -> [Opcode; 8] {
        [
            Opcode::Add,
            Opcode::Sub,
            Opcode::Mul,
            Opcode::Div,
            Opcode::And,
            Opcode::Or,
            Opcode::Xor,
            Opcode::SetLessThan,
        ]
    }

    /// The value to write to the opcode register.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }
}

impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::SetLessThan => "SLT",
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownOpcode(pub u32);

impl Display for UnknownOpcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "unknown opcode {:#x}", self.0)
    }
}

impl Error for UnknownOpcode {}

impl TryFrom<u32> for Opcode {
    type Error = UnknownOpcode;
    fn try_from(code: u32) -> Result<Opcode, UnknownOpcode> {
        Opcode::all()
            .into_iter()
            .find(|op| op.code() == code)
            .ok_or(UnknownOpcode(code))
    }
}

/// How an operand word is divided into independent lanes.  The
/// discriminant is the value written to the precision register.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Precision {
    /// One 32-bit lane (binary32 in the floating-point engine).
    Fp32 = 0,
    /// Two 16-bit lanes (binary16 in the floating-point engine).
    Fp16x2 = 1,
    /// Four 8-bit integer lanes.
    Int8x4 = 2,
    /// Eight 4-bit integer lanes.
    Int4x8 = 3,
}

impl Precision {
    #[must_use]
    pub const fn all() -> [Precision; 4] {
        [
            Precision::Fp32,
            Precision::Fp16x2,
            Precision::Int8x4,
            Precision::Int4x8,
        ]
    }

    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    #[must_use]
    pub const fn lane_width(self) -> u32 {
        match self {
            Precision::Fp32 => 32,
            Precision::Fp16x2 => 16,
            Precision::Int8x4 => 8,
            Precision::Int4x8 => 4,
        }
    }

    #[must_use]
    pub const fn lane_count(self) -> usize {
        (32 / self.lane_width()) as usize
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            Precision::Fp32 => "FP32",
            Precision::Fp16x2 => "FP16x2",
            Precision::Int8x4 => "INT8x4",
            Precision::Int4x8 => "INT4x8",
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownPrecision(pub u32);

impl Display for UnknownPrecision {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "unknown precision mode {:#x}", self.0)
    }
}

impl Error for UnknownPrecision {}

impl TryFrom<u32> for Precision {
    type Error = UnknownPrecision;
    fn try_from(code: u32) -> Result<Precision, UnknownPrecision> {
        Precision::all()
            .into_iter()
            .find(|p| p.code() == code)
            .ok_or(UnknownPrecision(code))
    }
}

#[test]
fn test_opcode_round_trip() {
    for op in Opcode::all() {
        assert_eq!(Opcode::try_from(op.code()), Ok(op));
    }
    assert_eq!(Opcode::try_from(8), Err(UnknownOpcode(8)));
}

#[test]
fn test_precision_lanes() {
    for p in Precision::all() {
        assert_eq!(Precision::try_from(p.code()), Ok(p));
        assert_eq!(p.lane_width() * p.lane_count() as u32, 32);
    }
    assert!(Precision::try_from(4).is_err());
}
