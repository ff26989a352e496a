//! Instruction combining.
//!
//! Recognises multi-instruction idioms the VM has dedicated opcodes for:
//!
//! - `LoadLocal n; LoadConstant ±1; Add|Sub; StoreLocal n` becomes
//!   `PostIncrement n` / `PostDecrement n`
//! - `Dup; Dup` becomes `Dup2`
//!
//! As everywhere in the optimizer, a pattern whose interior contains a jump
//! target is left alone.

use std::collections::HashSet;

use ouroboros_base::Diagnostics;

use crate::bytecode::Bytecode;
use crate::decode::{Instruction, Operand};
use crate::opcode::Opcode;
use crate::value::Constant;

use super::{decode_or_skip, jump_target_set, rebuild};

const PASS: &str = "instruction combining";

pub(crate) fn run(input: Bytecode, sink: &mut Diagnostics) -> Bytecode {
    let Some(instructions) = decode_or_skip(&input, PASS, sink) else {
        return input;
    };
    let protected = jump_target_set(&instructions);

    let mut out: Vec<Instruction> = Vec::with_capacity(instructions.len());
    let mut changed = false;
    let mut i = 0;
    while i < instructions.len() {
        if let Some((replacement, consumed)) =
            combine_at(&instructions[i..], &input.constants, &protected)
        {
            out.push(replacement);
            i += consumed;
            changed = true;
        } else {
            out.push(instructions[i].clone());
            i += 1;
        }
    }

    if !changed {
        return input;
    }
    rebuild(input, out, PASS, sink)
}

fn combine_at(
    window: &[Instruction],
    constants: &[Constant],
    protected: &HashSet<usize>,
) -> Option<(Instruction, usize)> {
    let first = window.first()?;

    // Dup; Dup → Dup2
    if first.opcode == Opcode::Dup {
        let second = window.get(1)?;
        if second.opcode == Opcode::Dup && !protected.contains(&second.offset) {
            return Some((
                Instruction::new(first.offset, Opcode::Dup2, Operand::None),
                2,
            ));
        }
        return None;
    }

    // LoadLocal n; LoadConstant ±1; Add|Sub; StoreLocal n
    if first.opcode != Opcode::LoadLocal || window.len() < 4 {
        return None;
    }
    let (load_const, op, store) = (&window[1], &window[2], &window[3]);
    if load_const.opcode != Opcode::LoadConstant
        || store.opcode != Opcode::StoreLocal
        || store.operand != first.operand
    {
        return None;
    }
    if [load_const, op, store]
        .iter()
        .any(|i| protected.contains(&i.offset))
    {
        return None;
    }
    let step = match constants.get(load_const.operand.as_i32()? as usize)? {
        Constant::Int(v) => i64::from(*v),
        Constant::Long(v) => *v,
        _ => return None,
    };
    let combined = match (op.opcode, step) {
        (Opcode::Add, 1) | (Opcode::Sub, -1) => Opcode::PostIncrement,
        (Opcode::Add, -1) | (Opcode::Sub, 1) => Opcode::PostDecrement,
        _ => return None,
    };
    Some((
        Instruction::new(first.offset, combined, first.operand.clone()),
        4,
    ))
}
