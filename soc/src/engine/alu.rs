//! Multi-precision arithmetic.
//!
//! An operand word is divided into independent lanes according to the
//! precision mode.  Each lane is computed separately; nothing carries
//! or borrows between lanes.
use half::f16;

use base::prelude::*;

use super::EngineVariant;

/// The result of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Value(u32),
    /// The opcode is not defined at this precision (or the opcode or
    /// precision register holds an unknown code).
    Unsupported,
}

/// Perform the operation described by the raw contents of the opcode
/// and precision registers.
pub fn execute(variant: EngineVariant, opcode: u32, precision: u32, a: u32, b: u32) -> Outcome {
    match (Opcode::try_from(opcode), Precision::try_from(precision)) {
        (Ok(op), Ok(p)) => compute(variant, op, p, a, b),
        _ => Outcome::Unsupported,
    }
}

pub fn compute(variant: EngineVariant, op: Opcode, precision: Precision, a: u32, b: u32) -> Outcome {
    match (variant, precision) {
        (EngineVariant::FloatingPoint, Precision::Fp32) => binary32(op, a, b),
        (EngineVariant::FloatingPoint, Precision::Fp16x2) => binary16_lanes(op, a, b),
        (EngineVariant::IntegerOnly, Precision::Fp32) => int32(op, a, b),
        (_, p) => integer_lanes(op, p, a, b),
    }
}

fn binary32(op: Opcode, a: u32, b: u32) -> Outcome {
    let (x, y) = (f32::from_bits(a), f32::from_bits(b));
    Outcome::Value(match op {
        Opcode::Add => (x + y).to_bits(),
        Opcode::Sub => (x - y).to_bits(),
        Opcode::Mul => (x * y).to_bits(),
        Opcode::Div => (x / y).to_bits(),
        Opcode::And => a & b,
        Opcode::Or => a | b,
        Opcode::Xor => a ^ b,
        Opcode::SetLessThan => u32::from(x < y),
    })
}

fn binary16_lanes(op: Opcode, a: u32, b: u32) -> Outcome {
    let f: fn(f16, f16) -> f16 = match op {
        Opcode::Add => |x, y| x + y,
        Opcode::Sub => |x, y| x - y,
        Opcode::Mul => |x, y| x * y,
        Opcode::Div => |x, y| x / y,
        _ => return Outcome::Unsupported,
    };
    Outcome::Value(map_lanes(a, b, Precision::Fp16x2, |x, y| {
        // Lanes are 16 bits wide so the truncation is exact.
        let r = f(f16::from_bits(x as u16), f16::from_bits(y as u16));
        u32::from(r.to_bits())
    }))
}

fn int32(op: Opcode, a: u32, b: u32) -> Outcome {
    let (x, y) = (a as i32, b as i32);
    Outcome::Value(match op {
        Opcode::Add => x.wrapping_add(y) as u32,
        Opcode::Sub => x.wrapping_sub(y) as u32,
        Opcode::Mul => x.wrapping_mul(y) as u32,
        // Division by zero yields zero rather than trapping.
        Opcode::Div if y == 0 => 0,
        Opcode::Div => x.wrapping_div(y) as u32,
        Opcode::And => a & b,
        Opcode::Or => a | b,
        Opcode::Xor => a ^ b,
        Opcode::SetLessThan => u32::from(x < y),
    })
}

fn integer_lanes(op: Opcode, precision: Precision, a: u32, b: u32) -> Outcome {
    match op {
        Opcode::Add => Outcome::Value(map_lanes(a, b, precision, u32::wrapping_add)),
        Opcode::Sub => Outcome::Value(map_lanes(a, b, precision, u32::wrapping_sub)),
        _ => Outcome::Unsupported,
    }
}
