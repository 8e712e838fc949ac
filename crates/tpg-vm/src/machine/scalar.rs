//! Scalar interpretation
//!
//! Per instruction: resolve the source, resolve the destination, apply the
//! operation to (destination, source), normalize the written value. The
//! result is register 0 after the last instruction.

use super::{normalize, SharedBank};
use crate::program::instruction::{Instruction, ScalarOp};

/// Run `instructions` over `input`.
///
/// `registers` is zeroed first and holds the final register file afterwards.
/// Only `registers` and group `share_group` of `shared` are written.
pub fn execute(
    input: &[f64],
    registers: &mut [f64],
    instructions: &[Instruction],
    shared: &mut SharedBank,
    share_group: usize,
) -> f64 {
    if registers.is_empty() {
        return 0.0;
    }
    registers.fill(0.0);
    let reg_len = registers.len();

    for inst in instructions {
        let src = if inst.reads_input() {
            read_input(input, inst.src)
        } else if inst.reads_shared() {
            shared.get(share_group, inst.src as usize)
        } else {
            registers[inst.src as usize % reg_len]
        };

        let dest = if inst.writes_shared() {
            shared.slot_mut(share_group, inst.dest as usize)
        } else {
            &mut registers[inst.dest as usize % reg_len]
        };

        apply(ScalarOp::from_code(inst.op), dest, src);
    }

    registers[0]
}

#[inline]
fn read_input(input: &[f64], index: u32) -> f64 {
    if input.is_empty() {
        0.0
    } else {
        input[index as usize % input.len()]
    }
}

#[inline]
fn apply(op: ScalarOp, dest: &mut f64, src: f64) {
    let value = match op {
        ScalarOp::Add => *dest + src,
        ScalarOp::Sub => *dest - src,
        ScalarOp::Mul => *dest * src,
        ScalarOp::Div => {
            if src == 0.0 {
                return;
            }
            *dest / src
        }
        ScalarOp::Log => {
            if src <= 0.0 {
                return;
            }
            src.ln()
        }
        ScalarOp::Exp => src.exp(),
        ScalarOp::Sin => src.sin(),
        ScalarOp::Negate => -*dest,
    };
    *dest = normalize(value);
}
