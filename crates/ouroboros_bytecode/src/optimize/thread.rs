//! Jump threading.
//!
//! Two passes over the stream: the first records, for every jump whose
//! target is an unconditional `Jump`, the end of that chain; the second
//! rewrites the recorded operands. Chains are followed all the way down
//! with a visited set (a cycle of jumps is left untouched — it is an
//! infinite loop whichever of its members you enter at), so after the pass
//! no jump's target is itself a jump.
//!
//! Threading only rewrites operands; no instruction moves, so offsets are
//! stable and no reassembly is needed.

use std::collections::HashSet;

use ouroboros_base::Diagnostics;

use crate::bytecode::Bytecode;
use crate::decode::{encode, Instruction, Operand};
use crate::opcode::Opcode;

use super::decode_or_skip;

const PASS: &str = "jump threading";

pub(crate) fn run(input: Bytecode, sink: &mut Diagnostics) -> Bytecode {
    let Some(mut instructions) = decode_or_skip(&input, PASS, sink) else {
        return input;
    };

    // First pass: resolve each jump's final target.
    let mut rewrites: Vec<(usize, usize)> = Vec::new(); // (instruction index, final target)
    for (index, instruction) in instructions.iter().enumerate() {
        if !instruction.opcode.is_jump() {
            continue;
        }
        let Some(first_target) = instruction.jump_target() else {
            continue;
        };
        let final_target = follow(&instructions, first_target);
        if final_target != first_target {
            rewrites.push((index, final_target));
        }
    }

    if rewrites.is_empty() {
        return input;
    }

    // Second pass: rewrite the recorded operands in place.
    for (index, target) in rewrites {
        let end = instructions[index].end();
        instructions[index].operand = Operand::I32((target as i64 - end as i64) as i32);
    }

    let mut out = input;
    out.code = encode(&instructions);
    out
}

/// Follows a chain of unconditional jumps to its final landing offset.
fn follow(instructions: &[Instruction], mut target: usize) -> usize {
    let mut visited = HashSet::new();
    loop {
        if !visited.insert(target) {
            // A jump cycle; leave the last target before re-entry.
            return target;
        }
        let Ok(index) = instructions.binary_search_by_key(&target, |i| i.offset) else {
            return target;
        };
        let instruction = &instructions[index];
        if instruction.opcode != Opcode::Jump {
            return target;
        }
        match instruction.jump_target() {
            Some(next) => target = next,
            None => return target,
        }
    }
}
