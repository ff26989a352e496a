//! Common-subexpression elimination over constant operand pairs.
//!
//! For every foldable arithmetic opcode preceded by two `LoadConstant`s,
//! the triple `(a, op, b)` is a key. Its first occurrence is computed once
//! and cached in a fresh local (`Dup; StoreLocal k`); every later
//! occurrence collapses to `LoadLocal k`.
//!
//! Guard rails:
//!
//! - fresh cache locals respect [`MAX_LOCALS`]; once the frame is full,
//!   later candidates simply recompute;
//! - a later occurrence is only collapsed when no jump target falls
//!   between the cached computation and it — execution cannot reach the
//!   collapsed form without having filled the cache;
//! - an occurrence already followed by `Dup; StoreLocal` is adopted as the
//!   cache rather than re-cached, so running the pass twice changes
//!   nothing.

use std::collections::HashMap;

use ouroboros_base::Diagnostics;

use crate::bytecode::Bytecode;
use crate::decode::{Instruction, Operand};
use crate::opcode::Opcode;

use super::{decode_or_skip, jump_target_set, rebuild};

const PASS: &str = "common-subexpression elimination";

/// The per-function local-slot ceiling cache locals must respect.
pub(crate) const MAX_LOCALS: i32 = 256;

pub(crate) fn run(input: Bytecode, sink: &mut Diagnostics) -> Bytecode {
    let Some(instructions) = decode_or_skip(&input, PASS, sink) else {
        return input;
    };
    let protected = jump_target_set(&instructions);

    // Cache slots start past every local the stream already touches.
    let mut next_local = highest_local(&instructions).map_or(0, |n| n + 1);

    // key → (local slot, offset just past the cached computation)
    let mut cache: HashMap<(i32, Opcode, i32), (i32, usize)> = HashMap::new();
    let mut out: Vec<Instruction> = Vec::with_capacity(instructions.len());
    let mut changed = false;
    let mut i = 0;
    while i < instructions.len() {
        let Some(key) = key_at(&instructions[i..]) else {
            out.push(instructions[i].clone());
            i += 1;
            continue;
        };
        let (load_a, load_b, op) = (&instructions[i], &instructions[i + 1], &instructions[i + 2]);
        let interior_protected =
            protected.contains(&load_b.offset) || protected.contains(&op.offset);

        if let Some(&(slot, cached_end)) = cache.get(&key) {
            // Collapse only when no jump lands between the cache fill and
            // here; otherwise the slot may be cold on some path.
            let safe = !interior_protected
                && !protected.contains(&load_a.offset)
                && protected
                    .iter()
                    .all(|&t| t <= cached_end || t > load_a.offset);
            if safe {
                out.push(Instruction::new(
                    load_a.offset,
                    Opcode::LoadLocal,
                    Operand::I32(slot),
                ));
                i += 3;
                changed = true;
                continue;
            }
        } else if !interior_protected {
            // Adopt an existing Dup; StoreLocal as the cache if present.
            if let (Some(dup), Some(store)) = (instructions.get(i + 3), instructions.get(i + 4)) {
                if dup.opcode == Opcode::Dup && store.opcode == Opcode::StoreLocal {
                    if let Some(slot) = store.operand.as_i32() {
                        cache.insert(key, (slot, store.end()));
                        out.extend(instructions[i..i + 5].iter().cloned());
                        i += 5;
                        continue;
                    }
                }
            }
            if next_local < MAX_LOCALS {
                let slot = next_local;
                next_local += 1;
                out.extend(instructions[i..i + 3].iter().cloned());
                out.push(Instruction::new(op.offset, Opcode::Dup, Operand::None));
                out.push(Instruction::new(
                    op.offset,
                    Opcode::StoreLocal,
                    Operand::I32(slot),
                ));
                cache.insert(key, (slot, op.end()));
                i += 3;
                changed = true;
                continue;
            }
        }

        out.push(instructions[i].clone());
        i += 1;
    }

    if !changed {
        return input;
    }
    rebuild(input, out, PASS, sink)
}

/// `LoadConstant a; LoadConstant b; <foldable op>` at the window head.
fn key_at(window: &[Instruction]) -> Option<(i32, Opcode, i32)> {
    if window.len() < 3 {
        return None;
    }
    let (a, b, op) = (&window[0], &window[1], &window[2]);
    if a.opcode != Opcode::LoadConstant || b.opcode != Opcode::LoadConstant {
        return None;
    }
    if !op.opcode.is_foldable_arithmetic() && op.opcode != Opcode::Power {
        return None;
    }
    Some((a.operand.as_i32()?, op.opcode, b.operand.as_i32()?))
}

/// The highest local slot any instruction references.
fn highest_local(instructions: &[Instruction]) -> Option<i32> {
    instructions
        .iter()
        .filter(|i| {
            matches!(
                i.opcode,
                Opcode::LoadLocal
                    | Opcode::StoreLocal
                    | Opcode::PostIncrement
                    | Opcode::PostDecrement
            )
        })
        .filter_map(|i| i.operand.as_i32())
        .max()
}
