//! Loop optimization: unrolling for tiny bodies, invariant hoisting for
//! the rest.
//!
//! Loops are recognised by back-edges: any jump whose target precedes it
//! defines a `{start, end}` region. Overlapping regions keep only the first
//! (outermost-found); each accepted loop then takes one of two transforms:
//!
//! - **2× unroll**, only when the back-edge is an *unconditional* jump and
//!   the body is straight-line (no jumps, no calls, no terminators, no
//!   interior jump targets). Duplicating such a body is exactly equivalent:
//!   the loop runs its iterations two at a time.
//! - **Invariant hoisting** otherwise: `LoadConstant k; StoreLocal n` and
//!   `LoadGlobal g; StoreLocal n` pairs move in front of the loop when `n`
//!   has no other write in the body, `n` is not read before the pair, the
//!   pair sits before the body's first branch, and — for globals — no
//!   `StoreGlobal g` occurs anywhere in the body. Bare loads are never
//!   hoisted; only load/store pairs keep the operand stack balanced.

use std::collections::{HashMap, HashSet};

use ouroboros_base::Diagnostics;

use crate::bytecode::Bytecode;
use crate::decode::Instruction;
use crate::opcode::Opcode;

use super::{decode_or_skip, jump_target_set, rebuild};

const PASS: &str = "loop optimization";

/// Bodies shorter than this many bytes unroll; everything else hoists.
const UNROLL_LIMIT: usize = 16;

struct Loop {
    start_idx: usize,
    back_idx: usize,
    start_offset: usize,
    end_offset: usize,
}

pub(crate) fn run(input: Bytecode, sink: &mut Diagnostics) -> Bytecode {
    let Some(instructions) = decode_or_skip(&input, PASS, sink) else {
        return input;
    };
    let protected = jump_target_set(&instructions);

    let loops = find_disjoint_loops(&instructions);
    if loops.is_empty() {
        return input;
    }

    // start_idx → hoisted instruction indices, in order
    let mut hoists: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut hoisted: HashSet<usize> = HashSet::new();
    // back_idx → start_idx
    let mut unrolls: HashMap<usize, usize> = HashMap::new();

    for lp in &loops {
        if can_unroll(lp, &instructions, &protected) {
            unrolls.insert(lp.back_idx, lp.start_idx);
        } else if lp.start_idx > 0 {
            let pairs = hoistable_pairs(lp, &instructions, &protected);
            if !pairs.is_empty() {
                for &(load, store) in &pairs {
                    hoisted.insert(load);
                    hoisted.insert(store);
                }
                hoists.insert(
                    lp.start_idx,
                    pairs.iter().flat_map(|&(l, s)| [l, s]).collect(),
                );
            }
        }
    }

    if hoists.is_empty() && unrolls.is_empty() {
        return input;
    }

    let mut out: Vec<Instruction> = Vec::with_capacity(instructions.len());
    for idx in 0..instructions.len() {
        if let Some(moved) = hoists.get(&idx) {
            // Anchor the hoisted pair on the previous instruction's offset:
            // the back-edge (which targets the loop start) then re-enters
            // *after* the pair, while jumps at or before the anchor are
            // unaffected.
            let anchor = instructions[idx - 1].offset;
            for &h in moved {
                let mut clone = instructions[h].clone();
                clone.offset = anchor;
                out.push(clone);
            }
        }
        if hoisted.contains(&idx) {
            continue;
        }
        if let Some(&start_idx) = unrolls.get(&idx) {
            let anchor = instructions[idx].offset;
            for j in start_idx..idx {
                let mut clone = instructions[j].clone();
                clone.offset = anchor;
                out.push(clone);
            }
        }
        out.push(instructions[idx].clone());
    }

    rebuild(input, out, PASS, sink)
}

/// Back-edge jumps define loops; overlapping regions keep the first found.
fn find_disjoint_loops(instructions: &[Instruction]) -> Vec<Loop> {
    let mut loops: Vec<Loop> = Vec::new();
    for (idx, instruction) in instructions.iter().enumerate() {
        if !instruction.opcode.is_jump() {
            continue;
        }
        let Some(target) = instruction.jump_target() else {
            continue;
        };
        if target >= instruction.offset {
            continue;
        }
        let Ok(start_idx) = instructions.binary_search_by_key(&target, |i| i.offset) else {
            continue;
        };
        let candidate = Loop {
            start_idx,
            back_idx: idx,
            start_offset: target,
            end_offset: instruction.end(),
        };
        let overlaps = loops.iter().any(|l| {
            candidate.start_offset < l.end_offset && l.start_offset < candidate.end_offset
        });
        if !overlaps {
            loops.push(candidate);
        }
    }
    loops
}

fn can_unroll(lp: &Loop, instructions: &[Instruction], protected: &HashSet<usize>) -> bool {
    let back = &instructions[lp.back_idx];
    if back.opcode != Opcode::Jump {
        return false;
    }
    let body_len = back.offset - lp.start_offset;
    if body_len == 0 || body_len >= UNROLL_LIMIT {
        return false;
    }
    let body = &instructions[lp.start_idx..lp.back_idx];
    let straight_line = body.iter().all(|i| {
        !i.opcode.is_jump() && !i.opcode.is_terminator() && i.opcode != Opcode::Call
    });
    if !straight_line {
        return false;
    }
    // No jump may land inside the body or on the back-edge itself.
    protected
        .iter()
        .all(|&t| t <= lp.start_offset || t > back.offset)
}

/// Invariant `Load…; StoreLocal n` pairs safe to move before the loop.
fn hoistable_pairs(
    lp: &Loop,
    instructions: &[Instruction],
    protected: &HashSet<usize>,
) -> Vec<(usize, usize)> {
    let body = &instructions[lp.start_idx..lp.back_idx];

    // The prefix of the body that dominates every iteration: everything
    // before the first jump or interior jump target.
    let first_branch = body
        .iter()
        .position(|i| {
            i.opcode.is_jump()
                || i.opcode.is_terminator()
                || (i.offset != lp.start_offset && protected.contains(&i.offset))
        })
        .unwrap_or(body.len());

    let stored_globals: HashSet<i32> = body
        .iter()
        .filter(|i| i.opcode == Opcode::StoreGlobal)
        .filter_map(|i| i.operand.as_i32())
        .collect();

    let writes_to = |slot: i32, skip: usize| {
        body.iter().enumerate().any(|(j, i)| {
            j != skip
                && matches!(
                    i.opcode,
                    Opcode::StoreLocal | Opcode::PostIncrement | Opcode::PostDecrement
                )
                && i.operand.as_i32() == Some(slot)
        })
    };
    let read_before = |slot: i32, before: usize| {
        body.iter().take(before).any(|i| {
            i.opcode == Opcode::LoadLocal && i.operand.as_i32() == Some(slot)
        })
    };

    let mut pairs = Vec::new();
    let mut j = 0;
    while j + 1 < first_branch {
        let (load, store) = (&body[j], &body[j + 1]);
        let invariant_load = matches!(load.opcode, Opcode::LoadConstant | Opcode::LoadGlobal);
        if invariant_load && store.opcode == Opcode::StoreLocal {
            let Some(slot) = store.operand.as_i32() else {
                j += 1;
                continue;
            };
            let global_safe = load.opcode != Opcode::LoadGlobal
                || load
                    .operand
                    .as_i32()
                    .map_or(false, |g| !stored_globals.contains(&g));
            if global_safe && !writes_to(slot, j + 1) && !read_before(slot, j) {
                pairs.push((lp.start_idx + j, lp.start_idx + j + 1));
                j += 2;
                continue;
            }
        }
        j += 1;
    }
    pairs
}
