//! Call-site inlining for tiny functions.
//!
//! Call targets resolve through the module's own function table. A callee
//! is spliced in place of the `Call` when it is small (≤ [`INLINE_LIMIT`]
//! bytes), takes no parameters, touches no locals, contains no calls of its
//! own (which also rules out recursion), and is straight-line up to a
//! trailing return. The trailing `Return`/`ReturnVoid` is dropped from the
//! splice; any value the body pushed stays on the stack, exactly as the
//! call would have left it.

use std::collections::HashMap;

use ouroboros_base::Diagnostics;

use crate::bytecode::Bytecode;
use crate::decode::{self, Instruction};
use crate::opcode::Opcode;

use super::{decode_or_skip, rebuild};

const PASS: &str = "inlining";

/// Callee body size ceiling, in bytes, counting the trailing return.
const INLINE_LIMIT: usize = 10;

pub(crate) fn run(input: Bytecode, sink: &mut Diagnostics) -> Bytecode {
    let Some(instructions) = decode_or_skip(&input, PASS, sink) else {
        return input;
    };

    // Function index → splice body (trailing return stripped).
    let mut bodies: HashMap<i32, Vec<Instruction>> = HashMap::new();
    for (index, function) in input.functions.iter().enumerate() {
        if let Some(body) = splice_body(&input.code, function.start, function.end) {
            if function.param_count == 0 {
                bodies.insert(index as i32, body);
            }
        }
    }
    if bodies.is_empty() {
        return input;
    }

    let mut out: Vec<Instruction> = Vec::with_capacity(instructions.len());
    let mut changed = false;
    for instruction in &instructions {
        let target = (instruction.opcode == Opcode::Call)
            .then(|| instruction.operand.as_i32())
            .flatten()
            .and_then(|index| bodies.get(&index));
        match target {
            Some(body) => {
                for spliced in body {
                    let mut clone = spliced.clone();
                    clone.offset = instruction.offset;
                    out.push(clone);
                }
                changed = true;
            }
            None => out.push(instruction.clone()),
        }
    }

    if !changed {
        return input;
    }
    rebuild(input, out, PASS, sink)
}

/// The callee's instructions minus the trailing return, when every
/// inlining precondition holds.
fn splice_body(code: &[u8], start: usize, end: usize) -> Option<Vec<Instruction>> {
    if start >= end || end > code.len() || end - start > INLINE_LIMIT {
        return None;
    }
    let mut body = decode::decode(&code[start..end]).ok()?;
    let last = body.pop()?;
    if !matches!(last.opcode, Opcode::Return | Opcode::ReturnVoid) {
        return None;
    }
    let plain = body.iter().all(|i| {
        !i.opcode.is_jump()
            && !i.opcode.is_terminator()
            && !matches!(
                i.opcode,
                Opcode::Call
                    | Opcode::LoadLocal
                    | Opcode::StoreLocal
                    | Opcode::PostIncrement
                    | Opcode::PostDecrement
            )
    });
    plain.then_some(body)
}
