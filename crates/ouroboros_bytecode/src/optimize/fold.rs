//! Constant folding with operand look-ahead.
//!
//! A forward scan for `LoadConstant a; LoadConstant b; <op>` triples where
//! both constants share a numeric family, plus the string-concat and
//! boolean-negation forms. The scan repeats until nothing changes, so
//! chains like `2 3 Add 4 Add` collapse fully in one pass — and a second
//! run of the pass is a no-op, which the Debug-level idempotence guarantee
//! relies on.
//!
//! Folds that would change runtime behaviour are skipped: division and
//! modulo by zero stay in the stream (the VM's trap is the observable
//! semantics), as does integer overflow. A triple whose interior is a jump
//! target is never folded.

use std::collections::HashSet;

use ouroboros_base::Diagnostics;

use crate::bytecode::Bytecode;
use crate::decode::{Instruction, Operand};
use crate::opcode::Opcode;
use crate::value::Constant;

use super::{decode_or_skip, jump_target_set, rebuild};

const PASS: &str = "constant folding";

pub(crate) fn run(input: Bytecode, sink: &mut Diagnostics) -> Bytecode {
    let Some(mut instructions) = decode_or_skip(&input, PASS, sink) else {
        return input;
    };
    let protected = jump_target_set(&instructions);
    let mut constants = input.constants.clone();

    let mut changed_any = false;
    loop {
        let mut out: Vec<Instruction> = Vec::with_capacity(instructions.len());
        let mut changed = false;
        let mut i = 0;
        while i < instructions.len() {
            if let Some(folded) = fold_at(&instructions[i..], &mut constants, &protected) {
                let consumed = folded.consumed;
                out.push(folded.replacement);
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
    let mut rebuilt = rebuild(input, instructions, PASS, sink);
    rebuilt.constants = constants;
    rebuilt
}

struct Fold {
    replacement: Instruction,
    consumed: usize,
}

fn fold_at(
    window: &[Instruction],
    constants: &mut Vec<Constant>,
    protected: &HashSet<usize>,
) -> Option<Fold> {
    // LoadTrue/LoadFalse; Not
    if window.len() >= 2 {
        let (a, b) = (&window[0], &window[1]);
        if b.opcode == Opcode::Not && !protected.contains(&b.offset) {
            let negated = match a.opcode {
                Opcode::LoadTrue => Some(Opcode::LoadFalse),
                Opcode::LoadFalse => Some(Opcode::LoadTrue),
                _ => None,
            };
            if let Some(opcode) = negated {
                return Some(Fold {
                    replacement: Instruction::new(a.offset, opcode, Operand::None),
                    consumed: 2,
                });
            }
        }
    }

    // LoadConstant a; LoadConstant b; <op>
    if window.len() < 3 {
        return None;
    }
    let (a, b, op) = (&window[0], &window[1], &window[2]);
    if a.opcode != Opcode::LoadConstant || b.opcode != Opcode::LoadConstant {
        return None;
    }
    if protected.contains(&b.offset) || protected.contains(&op.offset) {
        return None;
    }
    let lhs = constants.get(a.operand.as_i32()? as usize)?.clone();
    let rhs = constants.get(b.operand.as_i32()? as usize)?.clone();

    let folded = match op.opcode {
        Opcode::StringConcat => match (&lhs, &rhs) {
            (Constant::Str(x), Constant::Str(y)) => Some(Constant::Str(format!("{x}{y}"))),
            _ => None,
        },
        opcode if opcode.is_foldable_arithmetic() => eval(opcode, &lhs, &rhs),
        _ => None,
    }?;

    let index = intern(constants, folded) as i32;
    Some(Fold {
        replacement: Instruction::new(a.offset, Opcode::LoadConstant, Operand::I32(index)),
        consumed: 3,
    })
}

/// Evaluates a binary arithmetic op on same-family constants, or declines.
fn eval(opcode: Opcode, lhs: &Constant, rhs: &Constant) -> Option<Constant> {
    match (lhs, rhs) {
        (Constant::Int(a), Constant::Int(b)) => {
            let result = match opcode {
                Opcode::Add => a.checked_add(*b),
                Opcode::Sub => a.checked_sub(*b),
                Opcode::Mul => a.checked_mul(*b),
                Opcode::Div => a.checked_div(*b),
                Opcode::Mod => a.checked_rem(*b),
                _ => None,
            }?;
            Some(Constant::Int(result))
        }
        (Constant::Long(a), Constant::Long(b)) => {
            let result = match opcode {
                Opcode::Add => a.checked_add(*b),
                Opcode::Sub => a.checked_sub(*b),
                Opcode::Mul => a.checked_mul(*b),
                Opcode::Div => a.checked_div(*b),
                Opcode::Mod => a.checked_rem(*b),
                _ => None,
            }?;
            Some(Constant::Long(result))
        }
        (Constant::Double(a), Constant::Double(b)) => {
            // Division by zero keeps the VM's behaviour observable.
            if matches!(opcode, Opcode::Div | Opcode::Mod) && *b == 0.0 {
                return None;
            }
            let result = match opcode {
                Opcode::Add => a + b,
                Opcode::Sub => a - b,
                Opcode::Mul => a * b,
                Opcode::Div => a / b,
                Opcode::Mod => a % b,
                _ => return None,
            };
            Some(Constant::Double(result))
        }
        _ => None,
    }
}

fn intern(constants: &mut Vec<Constant>, value: Constant) -> usize {
    if let Some(index) = constants.iter().position(|c| *c == value) {
        return index;
    }
    constants.push(value);
    constants.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BytecodeBuilder;
    use crate::decode::decode;

    fn sink() -> Diagnostics {
        Diagnostics::new("test.ob")
    }

    fn load_constants_and(op: Opcode, a: Constant, b: Constant) -> Bytecode {
        let mut builder = BytecodeBuilder::new();
        let ai = builder.add_constant(a) as i32;
        let bi = builder.add_constant(b) as i32;
        builder.emit_with(Opcode::LoadConstant, ai);
        builder.emit_with(Opcode::LoadConstant, bi);
        builder.emit(op);
        builder.emit(Opcode::Return);
        builder.finalize().expect("clean build")
    }

    #[test]
    fn folds_integer_addition() {
        let bytecode = load_constants_and(Opcode::Add, Constant::Int(2), Constant::Int(3));
        let out = run(bytecode, &mut sink());
        let instructions = decode(&out.code).expect("valid output");
        assert_eq!(instructions.len(), 2);
        let index = instructions[0].operand.as_i32().unwrap() as usize;
        assert_eq!(out.constants[index], Constant::Int(5));
        // The original pool entries may stay behind unused.
        assert!(out.constants.contains(&Constant::Int(2)));
    }

    #[test]
    fn folds_chains_to_a_fixpoint() {
        let mut builder = BytecodeBuilder::new();
        let one = builder.add_constant(Constant::Int(1)) as i32;
        let two = builder.add_constant(Constant::Int(2)) as i32;
        let four = builder.add_constant(Constant::Int(4)) as i32;
        builder.emit_with(Opcode::LoadConstant, one);
        builder.emit_with(Opcode::LoadConstant, two);
        builder.emit(Opcode::Add);
        builder.emit_with(Opcode::LoadConstant, four);
        builder.emit(Opcode::Mul);
        builder.emit(Opcode::Return);
        let bytecode = builder.finalize().expect("clean build");

        let out = run(bytecode, &mut sink());
        let instructions = decode(&out.code).expect("valid output");
        assert_eq!(instructions.len(), 2);
        let index = instructions[0].operand.as_i32().unwrap() as usize;
        assert_eq!(out.constants[index], Constant::Int(12));
    }

    #[test]
    fn division_by_zero_is_not_folded() {
        let bytecode = load_constants_and(Opcode::Div, Constant::Int(1), Constant::Int(0));
        let before = bytecode.code.clone();
        let out = run(bytecode, &mut sink());
        assert_eq!(out.code, before);
    }

    #[test]
    fn mixed_families_are_not_folded() {
        let bytecode = load_constants_and(Opcode::Add, Constant::Int(1), Constant::Double(2.0));
        let before = bytecode.code.clone();
        let out = run(bytecode, &mut sink());
        assert_eq!(out.code, before);
    }

    #[test]
    fn folds_string_concat() {
        let bytecode = load_constants_and(
            Opcode::StringConcat,
            Constant::Str("foo".into()),
            Constant::Str("bar".into()),
        );
        let out = run(bytecode, &mut sink());
        let instructions = decode(&out.code).expect("valid output");
        let index = instructions[0].operand.as_i32().unwrap() as usize;
        assert_eq!(out.constants[index], Constant::Str("foobar".into()));
    }

    #[test]
    fn folds_boolean_negation() {
        let mut builder = BytecodeBuilder::new();
        builder.emit(Opcode::LoadTrue);
        builder.emit(Opcode::Not);
        builder.emit(Opcode::Return);
        let bytecode = builder.finalize().expect("clean build");

        let out = run(bytecode, &mut sink());
        let instructions = decode(&out.code).expect("valid output");
        assert_eq!(instructions[0].opcode, Opcode::LoadFalse);
        assert_eq!(instructions.len(), 2);
    }

    #[test]
    fn folded_value_reuses_an_existing_pool_entry() {
        let mut builder = BytecodeBuilder::new();
        let two = builder.add_constant(Constant::Int(2)) as i32;
        let three = builder.add_constant(Constant::Int(3)) as i32;
        let five = builder.add_constant(Constant::Int(5));
        builder.emit_with(Opcode::LoadConstant, two);
        builder.emit_with(Opcode::LoadConstant, three);
        builder.emit(Opcode::Add);
        builder.emit(Opcode::Return);
        let bytecode = builder.finalize().expect("clean build");
        let pool_size = bytecode.constants.len();

        let out = run(bytecode, &mut sink());
        let instructions = decode(&out.code).expect("valid output");
        let index = instructions[0].operand.as_i32().unwrap() as usize;
        assert_eq!(index, five);
        assert_eq!(out.constants.len(), pool_size);
    }

    #[test]
    fn triple_with_a_jump_target_inside_is_left_alone() {
        let mut builder = BytecodeBuilder::new();
        let two = builder.add_constant(Constant::Int(2)) as i32;
        let three = builder.add_constant(Constant::Int(3)) as i32;
        builder.emit_with(Opcode::LoadConstant, two);
        let target = builder.offset();
        builder.emit_with(Opcode::LoadConstant, three);
        builder.emit(Opcode::Add);
        builder.emit(Opcode::Return);
        builder.emit_jump_to(Opcode::Jump, target); // someone jumps between the loads
        let bytecode = builder.finalize().expect("clean build");

        let before = bytecode.code.clone();
        let out = run(bytecode, &mut sink());
        assert_eq!(out.code, before);
    }
}
