//! Dead-code elimination by reachability.
//!
//! A work-list walk of the control-flow view of the stream, seeded at
//! offset 0: unconditional jumps contribute their target, conditional jumps
//! their target and fall-through, terminators nothing, everything else the
//! fall-through. Only reachable instructions survive.
//!
//! Because every reachable jump's target is itself reachable, the offset
//! remap after deletion is exact — there is no "nearest preceding offset"
//! guesswork. A jump into the middle of an instruction is a malformed
//! stream and skips the pass.

use ouroboros_base::Diagnostics;

use crate::bytecode::Bytecode;
use crate::decode::{Instruction, MalformedBytecode};

use super::{decode_or_skip, rebuild, report_skip};

const PASS: &str = "dead-code elimination";

pub(crate) fn run(input: Bytecode, sink: &mut Diagnostics) -> Bytecode {
    let Some(instructions) = decode_or_skip(&input, PASS, sink) else {
        return input;
    };
    if instructions.is_empty() {
        return input;
    }

    let reachable = match reachable_set(&instructions, input.code.len()) {
        Ok(reachable) => reachable,
        Err(e) => {
            report_skip(PASS, &e, sink);
            return input;
        }
    };

    if reachable.iter().all(|&r| r) {
        return input;
    }

    let kept: Vec<Instruction> = instructions
        .into_iter()
        .zip(&reachable)
        .filter(|(_, &r)| r)
        .map(|(i, _)| i)
        .collect();
    rebuild(input, kept, PASS, sink)
}

/// Marks each instruction reachable from offset 0.
fn reachable_set(
    instructions: &[Instruction],
    code_len: usize,
) -> Result<Vec<bool>, MalformedBytecode> {
    let index_of = |offset: usize| -> Option<usize> {
        instructions
            .binary_search_by_key(&offset, |i| i.offset)
            .ok()
    };

    let mut reachable = vec![false; instructions.len()];
    let mut work = vec![0usize];
    while let Some(offset) = work.pop() {
        if offset == code_len {
            // A jump to the very end of the stream is a valid exit.
            continue;
        }
        let Some(index) = index_of(offset) else {
            return Err(MalformedBytecode {
                offset,
                reason: "jump lands inside an instruction".to_string(),
            });
        };
        if reachable[index] {
            continue;
        }
        reachable[index] = true;

        let instruction = &instructions[index];
        let opcode = instruction.opcode;
        if opcode.is_jump() {
            let target = instruction.jump_target().ok_or_else(|| MalformedBytecode {
                offset: instruction.offset,
                reason: format!("jump {opcode} without an i32 operand"),
            })?;
            if target > code_len {
                return Err(MalformedBytecode {
                    offset: instruction.offset,
                    reason: format!("jump target {target} is outside the stream"),
                });
            }
            work.push(target);
            if opcode.is_conditional_jump() {
                work.push(instruction.end());
            }
        } else if opcode.is_terminator() {
            // Nothing falls through.
        } else if instruction.end() < code_len {
            work.push(instruction.end());
        }
    }
    Ok(reachable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BytecodeBuilder;
    use crate::decode::decode;
    use crate::opcode::Opcode;

    fn sink() -> Diagnostics {
        Diagnostics::new("test.ob")
    }

    #[test]
    fn tail_after_return_is_removed() {
        let mut builder = BytecodeBuilder::new();
        builder.emit(Opcode::Return);
        builder.emit_with(Opcode::Push, 0);
        builder.emit(Opcode::Return);
        let bytecode = builder.finalize().expect("clean build");

        let out = run(bytecode, &mut sink());
        let instructions = decode(&out.code).expect("valid output");
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].opcode, Opcode::Return);
    }

    #[test]
    fn both_branches_of_a_conditional_survive() {
        let mut builder = BytecodeBuilder::new();
        let site = builder.emit_jump(Opcode::JumpIfTrue);
        builder.emit_with(Opcode::Push, 1);
        builder.emit(Opcode::Return);
        builder.patch_jump(site).expect("pending");
        builder.emit_with(Opcode::Push, 2);
        builder.emit(Opcode::Return);
        let bytecode = builder.finalize().expect("clean build");

        let before = decode(&bytecode.code).expect("valid input").len();
        let out = run(bytecode, &mut sink());
        let after = decode(&out.code).expect("valid output").len();
        assert_eq!(before, after);
    }

    #[test]
    fn code_behind_an_unconditional_jump_is_removed_and_targets_remap() {
        let mut builder = BytecodeBuilder::new();
        let site = builder.emit_jump(Opcode::Jump);
        builder.emit_with(Opcode::Push, 9); // dead
        builder.emit(Opcode::Pop); // dead
        builder.patch_jump(site).expect("pending");
        builder.emit(Opcode::Halt);
        let bytecode = builder.finalize().expect("clean build");

        let out = run(bytecode, &mut sink());
        let instructions = decode(&out.code).expect("valid output");
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].opcode, Opcode::Jump);
        // The jump lands exactly on the surviving Halt.
        assert_eq!(
            instructions[0].jump_target(),
            Some(instructions[1].offset)
        );
        assert_eq!(instructions[1].opcode, Opcode::Halt);
    }

    #[test]
    fn every_reachable_offset_survives() {
        let mut builder = BytecodeBuilder::new();
        builder.emit_with(Opcode::Push, 1);
        let site = builder.emit_jump(Opcode::JumpIfFalse);
        builder.emit_with(Opcode::Push, 2);
        builder.patch_jump(site).expect("pending");
        builder.emit(Opcode::Halt);
        let bytecode = builder.finalize().expect("clean build");

        let before = decode(&bytecode.code).expect("valid input");
        let out = run(bytecode.clone(), &mut sink());
        let after = decode(&out.code).expect("valid output");
        // Everything was reachable; the stream is untouched.
        assert_eq!(before.len(), after.len());
        assert_eq!(bytecode.code, out.code);
    }

    #[test]
    fn back_edges_keep_loops_alive() {
        let mut builder = BytecodeBuilder::new();
        let start = builder.offset();
        builder.emit_with(Opcode::Push, 1);
        builder.emit(Opcode::Pop);
        builder.emit_loop(start);
        let bytecode = builder.finalize().expect("clean build");

        let out = run(bytecode.clone(), &mut sink());
        assert_eq!(out.code, bytecode.code);
    }
}
