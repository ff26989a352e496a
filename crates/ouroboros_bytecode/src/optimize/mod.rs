//! The multi-pass bytecode optimizer.
//!
//! Passes all have the same shape — take a [`Bytecode`], return a new one —
//! and run in a fixed order chosen by the [`OptimizationLevel`]:
//!
//! | Level | Passes |
//! |-------|--------|
//! | `Debug` | dead-code elimination, constant folding, peephole |
//! | `Release` | + instruction combining, jump threading, CSE |
//! | `Aggressive` | + loop optimization, inlining, register allocation |
//!
//! Every pass must preserve observable semantics. Two shared rules make
//! that tractable:
//!
//! - passes work on the decoded stream ([`crate::decode`]); a stream that
//!   does not decode makes the pass a no-op with a recorded diagnostic, and
//!   later passes see the unchanged bytes;
//! - a pass that deletes or inserts instructions rebuilds offsets through
//!   [`crate::decode::reassemble`], and never touches a pattern whose
//!   interior is a jump target.

mod combine;
mod cse;
mod dce;
mod fold;
mod inline;
mod loops;
mod peephole;
mod regalloc;
mod thread;

use std::collections::HashSet;

use ouroboros_base::Diagnostics;

use crate::bytecode::Bytecode;
use crate::decode::{self, Instruction, MalformedBytecode};

/// How hard the pipeline tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum OptimizationLevel {
    #[default]
    Debug,
    Release,
    Aggressive,
}

/// Runs the pass pipeline for a chosen level.
#[derive(Debug, Clone, Copy, Default)]
pub struct Optimizer {
    level: OptimizationLevel,
}

impl Optimizer {
    pub fn new(level: OptimizationLevel) -> Self {
        Optimizer { level }
    }

    pub fn level(&self) -> OptimizationLevel {
        self.level
    }

    /// Threads the bytecode through every pass active at this level.
    ///
    /// Diagnostics record passes that skipped themselves; the pipeline
    /// always proceeds.
    pub fn optimize(&self, bytecode: Bytecode, sink: &mut Diagnostics) -> Bytecode {
        let mut current = bytecode;
        current = dce::run(current, sink);
        current = fold::run(current, sink);
        current = peephole::run(current, sink);
        if self.level >= OptimizationLevel::Release {
            current = combine::run(current, sink);
            current = thread::run(current, sink);
            current = cse::run(current, sink);
        }
        if self.level >= OptimizationLevel::Aggressive {
            current = loops::run(current, sink);
            current = inline::run(current, sink);
            current = regalloc::run(current, sink);
        }
        current
    }
}

// ----------------------------------------------------------------------
// Helpers shared by the passes
// ----------------------------------------------------------------------

/// Decodes a pass's input, or records why the pass is skipping itself.
pub(crate) fn decode_or_skip(
    input: &Bytecode,
    pass: &str,
    sink: &mut Diagnostics,
) -> Option<Vec<Instruction>> {
    match decode::decode(&input.code) {
        Ok(instructions) => Some(instructions),
        Err(e) => {
            report_skip(pass, &e, sink);
            None
        }
    }
}

pub(crate) fn report_skip(pass: &str, error: &MalformedBytecode, sink: &mut Diagnostics) {
    sink.warning(
        format!("{pass}: {error}; pass skipped, stream unchanged"),
        0,
        0,
    );
}

/// Every absolute offset some jump in the stream lands on.
pub(crate) fn jump_target_set(instructions: &[Instruction]) -> HashSet<usize> {
    instructions
        .iter()
        .filter_map(Instruction::jump_target)
        .collect()
}

/// Reassembles a pass's surviving instructions into a fresh [`Bytecode`],
/// falling back to the input when offset rewriting fails.
///
/// Function bounds and exception handler ranges are remapped through the
/// same offset map as the jumps; descriptor tables never go stale.
pub(crate) fn rebuild(
    input: Bytecode,
    kept: Vec<Instruction>,
    pass: &str,
    sink: &mut Diagnostics,
) -> Bytecode {
    let old_len = input.code.len();
    match decode::reassemble(&kept, old_len) {
        Ok(reassembly) => {
            let mut out = input;
            for function in &mut out.functions {
                function.start = reassembly.map_offset(function.start);
                function.end = reassembly.map_offset(function.end);
            }
            for handler in &mut out.exception_handlers {
                handler.try_start = reassembly.map_offset(handler.try_start);
                handler.try_end = reassembly.map_offset(handler.try_end);
                handler.handler_start = reassembly.map_offset(handler.handler_start);
                handler.catch_start = reassembly.map_offset(handler.catch_start);
                handler.filter_start = handler.filter_start.map(|f| reassembly.map_offset(f));
            }
            out.code = reassembly.code;
            out
        }
        Err(e) => {
            report_skip(pass, &e, sink);
            input
        }
    }
}
