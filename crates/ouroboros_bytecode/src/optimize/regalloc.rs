//! Graph-colouring register allocation over sixteen registers.
//!
//! 1. **Lifetimes** — for every local touched by `LoadLocal`/`StoreLocal`,
//!    record its first and last use offset. Locals also touched by
//!    `PostIncrement`/`PostDecrement` are pinned to memory (there is no
//!    register form of those opcodes).
//! 2. **Interference** — two lifetimes interfere iff their ranges overlap.
//! 3. **Colouring** — greedy, highest interference degree first, lowest
//!    free colour wins. Registers the stream already uses explicitly
//!    (inline-assembly `MOV`s) are withheld from the palette. A node with
//!    no free colour spills: it simply keeps its memory form.
//! 4. **Rewrite** — coloured locals' `LoadLocal n`/`StoreLocal n` become
//!    `LoadRegister c`/`StoreRegister c`. Operand widths are identical, so
//!    offsets and jumps are untouched.

use std::collections::{HashMap, HashSet};

use ouroboros_base::Diagnostics;

use crate::bytecode::Bytecode;
use crate::decode::encode;
use crate::opcode::Opcode;

use super::decode_or_skip;

const PASS: &str = "register allocation";

const REGISTER_COUNT: i32 = 16;

#[derive(Debug, Clone, Copy)]
struct Lifetime {
    first: usize,
    last: usize,
}

impl Lifetime {
    fn overlaps(&self, other: &Lifetime) -> bool {
        self.first <= other.last && other.first <= self.last
    }
}

pub(crate) fn run(input: Bytecode, sink: &mut Diagnostics) -> Bytecode {
    let Some(mut instructions) = decode_or_skip(&input, PASS, sink) else {
        return input;
    };

    // Lifetime analysis.
    let mut lifetimes: HashMap<i32, Lifetime> = HashMap::new();
    let mut pinned: HashSet<i32> = HashSet::new();
    let mut reserved: HashSet<i32> = HashSet::new();
    for instruction in &instructions {
        let Some(slot) = instruction.operand.as_i32() else {
            continue;
        };
        match instruction.opcode {
            Opcode::LoadLocal | Opcode::StoreLocal => {
                lifetimes
                    .entry(slot)
                    .and_modify(|l| l.last = instruction.offset)
                    .or_insert(Lifetime {
                        first: instruction.offset,
                        last: instruction.offset,
                    });
            }
            Opcode::PostIncrement | Opcode::PostDecrement => {
                pinned.insert(slot);
            }
            Opcode::LoadRegister | Opcode::StoreRegister => {
                reserved.insert(slot);
            }
            _ => {}
        }
    }
    for slot in &pinned {
        lifetimes.remove(slot);
    }
    if lifetimes.is_empty() {
        return input;
    }

    // Interference graph, nodes ordered by descending degree.
    let slots: Vec<i32> = lifetimes.keys().copied().collect();
    let degree = |slot: i32| {
        let own = lifetimes[&slot];
        slots
            .iter()
            .filter(|&&other| other != slot && own.overlaps(&lifetimes[&other]))
            .count()
    };
    let mut order: Vec<i32> = slots.clone();
    order.sort_by_key(|&slot| (std::cmp::Reverse(degree(slot)), slot));

    // Greedy colouring.
    let mut colour_of: HashMap<i32, i32> = HashMap::new();
    for &slot in &order {
        let own = lifetimes[&slot];
        let taken: HashSet<i32> = slots
            .iter()
            .filter(|&&other| other != slot && own.overlaps(&lifetimes[&other]))
            .filter_map(|other| colour_of.get(other).copied())
            .collect();
        let free = (0..REGISTER_COUNT)
            .find(|c| !taken.contains(c) && !reserved.contains(c));
        if let Some(colour) = free {
            colour_of.insert(slot, colour);
        }
        // No colour: the local spills and keeps its memory form.
    }
    if colour_of.is_empty() {
        return input;
    }

    // Rewrite.
    for instruction in &mut instructions {
        let Some(slot) = instruction.operand.as_i32() else {
            continue;
        };
        let Some(&colour) = colour_of.get(&slot) else {
            continue;
        };
        match instruction.opcode {
            Opcode::LoadLocal => {
                instruction.opcode = Opcode::LoadRegister;
                instruction.operand = crate::decode::Operand::I32(colour);
            }
            Opcode::StoreLocal => {
                instruction.opcode = Opcode::StoreRegister;
                instruction.operand = crate::decode::Operand::I32(colour);
            }
            _ => {}
        }
    }

    let mut out = input;
    out.code = encode(&instructions);
    out
}
