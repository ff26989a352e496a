//! Peephole simplification.
//!
//! An ordered pattern set applied left to right, repeated until the stream
//! stops shrinking (removing one no-op frequently exposes the next):
//!
//! - `LoadLocal n; StoreLocal n`: a store of what was just loaded
//! - `Dup; Pop`: a copy immediately discarded
//! - `LoadConstant 0; Add` and `LoadConstant 1; Mul`: arithmetic identities
//! - `Neg; Neg` and `Not; Not`: double inversions
//! - `Jump` to the very next offset — a jump to fall-through
//!
//! A pair whose *second* instruction is a jump target is left alone:
//! landing there mid-pair executes only half the pattern, which is not the
//! no-op the whole pair is.

use std::collections::HashSet;

use ouroboros_base::Diagnostics;

use crate::bytecode::Bytecode;
use crate::decode::Instruction;
use crate::opcode::Opcode;
use crate::value::Constant;

use super::{decode_or_skip, jump_target_set, rebuild};

const PASS: &str = "peephole";

pub(crate) fn run(input: Bytecode, sink: &mut Diagnostics) -> Bytecode {
    let Some(mut instructions) = decode_or_skip(&input, PASS, sink) else {
        return input;
    };
    let protected = jump_target_set(&instructions);

    let mut changed_any = false;
    loop {
        let mut out: Vec<Instruction> = Vec::with_capacity(instructions.len());
        let mut changed = false;
        let mut i = 0;
        while i < instructions.len() {
            if let Some(consumed) = removable_at(&instructions[i..], &input.constants, &protected) {
                i += consumed;
                changed = true;
            } else {
                out.push(instructions[i].clone());
                i += 1;
            }
        }
        instructions = out;
        if !changed {
            break;
        }
        changed_any = true;
    }

    if !changed_any {
        return input;
    }
    rebuild(input, instructions, PASS, sink)
}

/// Number of instructions to drop at the window's head, if a pattern holds.
fn removable_at(
    window: &[Instruction],
    constants: &[Constant],
    protected: &HashSet<usize>,
) -> Option<usize> {
    let first = window.first()?;

    // Jump to the immediately following instruction.
    if first.opcode == Opcode::Jump && first.jump_target() == Some(first.end()) {
        return Some(1);
    }

    let second = window.get(1)?;
    if protected.contains(&second.offset) {
        return None;
    }

    let pair = (first.opcode, second.opcode);
    let removable = match pair {
        (Opcode::LoadLocal, Opcode::StoreLocal) => first.operand == second.operand,
        (Opcode::Dup, Opcode::Pop) => true,
        (Opcode::Neg, Opcode::Neg) | (Opcode::Not, Opcode::Not) => true,
        (Opcode::LoadConstant, Opcode::Add) => {
            is_integer_constant(constants, first, 0)
        }
        (Opcode::LoadConstant, Opcode::Mul) => {
            is_integer_constant(constants, first, 1)
        }
        _ => false,
    };
    removable.then_some(2)
}

fn is_integer_constant(constants: &[Constant], instruction: &Instruction, value: i64) -> bool {
    let Some(index) = instruction.operand.as_i32() else {
        return false;
    };
    match constants.get(index as usize) {
        Some(Constant::Int(v)) => i64::from(*v) == value,
        Some(Constant::Long(v)) => *v == value,
        _ => false,
    }
}
