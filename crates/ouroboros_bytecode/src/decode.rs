//! Instruction stream decoding and reassembly.
//!
//! Every optimizer pass works on decoded [`Instruction`]s rather than raw
//! bytes, so malformed-stream handling lives in exactly one place: [`decode`]
//! rejects truncated operands and unassigned opcode bytes, and a pass that
//! sees the error reports it and returns its input untouched.
//!
//! Jump operands are *relative*: the stored i32 is the distance from the end
//! of the operand to the target, so a back-edge is negative. After a pass
//! deletes or inserts instructions, [`reassemble`] recomputes every offset
//! and rewrites every jump operand through the old-to-new offset map.

use crate::opcode::{Opcode, OperandClass};

/// The error for a stream the decoder cannot make sense of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedBytecode {
    pub offset: usize,
    pub reason: String,
}

impl std::fmt::Display for MalformedBytecode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed bytecode at offset {}: {}", self.offset, self.reason)
    }
}

impl std::error::Error for MalformedBytecode {}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    I32(i32),
    Bytes(Vec<u8>),
}

impl Operand {
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Operand::I32(v) => Some(*v),
            _ => None,
        }
    }
}

/// One decoded instruction, remembering where it sat in the input stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset in the stream this instruction was decoded from.
    pub offset: usize,
    pub opcode: Opcode,
    pub operand: Operand,
}

impl Instruction {
    pub fn new(offset: usize, opcode: Opcode, operand: Operand) -> Self {
        Instruction {
            offset,
            opcode,
            operand,
        }
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        1 + match &self.operand {
            Operand::None => 0,
            Operand::I32(_) => 4,
            Operand::Bytes(payload) => 4 + payload.len(),
        }
    }

    /// Byte offset just past this instruction.
    pub fn end(&self) -> usize {
        self.offset + self.size()
    }

    /// The absolute target of a jump, computed from the relative operand.
    pub fn jump_target(&self) -> Option<usize> {
        if !self.opcode.is_jump() {
            return None;
        }
        let delta = self.operand.as_i32()? as i64;
        let target = self.end() as i64 + delta;
        (target >= 0).then_some(target as usize)
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.opcode as u8);
        match &self.operand {
            Operand::None => {}
            Operand::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Operand::Bytes(payload) => {
                out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
                out.extend_from_slice(payload);
            }
        }
    }
}

/// Decodes a whole stream, or reports the first offset that cannot be read.
pub fn decode(code: &[u8]) -> Result<Vec<Instruction>, MalformedBytecode> {
    let mut instructions = Vec::new();
    let mut offset = 0;
    while offset < code.len() {
        let byte = code[offset];
        let opcode = Opcode::from_byte(byte).ok_or_else(|| MalformedBytecode {
            offset,
            reason: format!("unknown opcode byte 0x{byte:02X}"),
        })?;
        let operand = match opcode.operand_class() {
            OperandClass::None => Operand::None,
            OperandClass::I32 => {
                let bytes = code.get(offset + 1..offset + 5).ok_or_else(|| {
                    MalformedBytecode {
                        offset,
                        reason: format!("truncated operand for {opcode}"),
                    }
                })?;
                Operand::I32(i32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
            }
            OperandClass::Bytes => {
                let bytes = code.get(offset + 1..offset + 5).ok_or_else(|| {
                    MalformedBytecode {
                        offset,
                        reason: format!("truncated length prefix for {opcode}"),
                    }
                })?;
                let len = u32::from_le_bytes(bytes.try_into().expect("4-byte slice")) as usize;
                let payload = code.get(offset + 5..offset + 5 + len).ok_or_else(|| {
                    MalformedBytecode {
                        offset,
                        reason: format!("truncated payload for {opcode}"),
                    }
                })?;
                Operand::Bytes(payload.to_vec())
            }
        };
        let instruction = Instruction::new(offset, opcode, operand);
        offset = instruction.end();
        instructions.push(instruction);
    }
    Ok(instructions)
}

/// Re-encodes instructions verbatim, trusting their operands.
pub fn encode(instructions: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::new();
    for instruction in instructions {
        instruction.encode_into(&mut out);
    }
    out
}

/// The result of [`reassemble`]: the rebuilt bytes plus the old-to-new
/// offset map, so callers can remap descriptor tables (function bounds,
/// exception handler ranges) alongside the jumps.
#[derive(Debug)]
pub struct Reassembly {
    pub code: Vec<u8>,
    kept_old_offsets: Vec<usize>,
    new_offsets: Vec<usize>,
    old_len: usize,
    new_len: usize,
}

impl Reassembly {
    /// Maps an old stream offset to the rebuilt stream.
    ///
    /// A deleted offset resolves to the next surviving instruction; the old
    /// end maps to the new end.
    pub fn map_offset(&self, old: usize) -> usize {
        if old >= self.old_len {
            return self.new_len;
        }
        let idx = self.kept_old_offsets.partition_point(|&o| o < old);
        if idx < self.new_offsets.len() {
            self.new_offsets[idx]
        } else {
            self.new_len
        }
    }
}

/// Rebuilds a stream after instructions were deleted or inserted.
///
/// `kept` must be in ascending old-offset order; `old_len` is the input
/// stream's length so jumps to its end keep meaning "end". Every jump
/// operand is rewritten through the offset map; a target whose instruction
/// was deleted resolves to the next surviving instruction, which is exact
/// for the straight-line deletions the passes perform.
pub fn reassemble(kept: &[Instruction], old_len: usize) -> Result<Reassembly, MalformedBytecode> {
    // New offsets are the running sum of the kept instructions' sizes.
    let mut new_offsets = Vec::with_capacity(kept.len());
    let mut cursor = 0;
    for instruction in kept {
        new_offsets.push(cursor);
        cursor += instruction.size();
    }
    let new_len = cursor;

    let map_target = |old_target: usize| -> Option<usize> {
        if old_target >= old_len {
            return (old_target == old_len).then_some(new_len);
        }
        // First surviving instruction at or past the old target.
        let idx = kept.partition_point(|i| i.offset < old_target);
        if idx < kept.len() {
            Some(new_offsets[idx])
        } else {
            Some(new_len)
        }
    };

    let mut out = Vec::with_capacity(new_len);
    for (idx, instruction) in kept.iter().enumerate() {
        if instruction.opcode.is_jump() {
            let old_target = instruction.jump_target().ok_or_else(|| MalformedBytecode {
                offset: instruction.offset,
                reason: format!("jump {} without an i32 operand", instruction.opcode),
            })?;
            let new_target = map_target(old_target).ok_or_else(|| MalformedBytecode {
                offset: instruction.offset,
                reason: format!("jump target {old_target} is outside the stream"),
            })?;
            let new_end = new_offsets[idx] + instruction.size();
            let delta = new_target as i64 - new_end as i64;
            let mut patched = instruction.clone();
            patched.operand = Operand::I32(delta as i32);
            patched.encode_into(&mut out);
        } else {
            instruction.encode_into(&mut out);
        }
    }
    Ok(Reassembly {
        code: out,
        kept_old_offsets: kept.iter().map(|i| i.offset).collect(),
        new_offsets,
        old_len,
        new_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_mixed_stream() {
        let mut code = Vec::new();
        Instruction::new(0, Opcode::LoadConstant, Operand::I32(3)).encode_into(&mut code);
        Instruction::new(5, Opcode::Add, Operand::None).encode_into(&mut code);
        Instruction::new(6, Opcode::NativeInstruction, Operand::Bytes(vec![0x90, 0xF4]))
            .encode_into(&mut code);

        let decoded = decode(&code).expect("valid stream");
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].operand, Operand::I32(3));
        assert_eq!(decoded[1].offset, 5);
        assert_eq!(decoded[2].operand, Operand::Bytes(vec![0x90, 0xF4]));
        assert_eq!(encode(&decoded), code);
    }

    #[test]
    fn truncated_operand_is_rejected() {
        let code = [Opcode::LoadLocal as u8, 0x01, 0x00];
        let err = decode(&code).expect_err("truncated");
        assert_eq!(err.offset, 0);
        assert!(err.reason.contains("truncated"));
    }

    #[test]
    fn unknown_opcode_is_rejected() {
        let err = decode(&[0xFF]).expect_err("unknown");
        assert!(err.reason.contains("0xFF"));
    }

    #[test]
    fn jump_target_resolves_forward_and_back() {
        // 0: Jump +5 → target 10; 5: Jump -10 → target 0.
        let fwd = Instruction::new(0, Opcode::Jump, Operand::I32(5));
        assert_eq!(fwd.jump_target(), Some(10));
        let back = Instruction::new(5, Opcode::Jump, Operand::I32(-10));
        assert_eq!(back.jump_target(), Some(0));
    }

    #[test]
    fn reassemble_rewrites_jumps_after_deletion() {
        // 0: Jump → 11 (skip the two Nops and the Pop)
        // 5: Nop  6: Nop  7: Pop  ← delete the Nops
        // 8..: Halt at 8? build concretely below.
        let instructions = vec![
            Instruction::new(0, Opcode::Jump, Operand::I32(3)), // end 5, target 8
            Instruction::new(5, Opcode::Nop, Operand::None),
            Instruction::new(6, Opcode::Nop, Operand::None),
            Instruction::new(7, Opcode::Pop, Operand::None),
            Instruction::new(8, Opcode::Halt, Operand::None),
        ];
        let old_len = 9;
        // Drop the two Nops.
        let kept: Vec<Instruction> = instructions
            .iter()
            .filter(|i| i.opcode != Opcode::Nop)
            .cloned()
            .collect();
        let out = reassemble(&kept, old_len).expect("reassembles");
        let decoded = decode(&out.code).expect("valid output");
        // Jump now lands on Halt, which sits right after the Pop.
        assert_eq!(decoded[0].jump_target(), Some(6));
        assert_eq!(decoded[2].opcode, Opcode::Halt);
        assert_eq!(decoded[2].offset, 6);
    }

    #[test]
    fn reassemble_maps_deleted_target_to_next_survivor() {
        let instructions = vec![
            Instruction::new(0, Opcode::Jump, Operand::I32(1)), // end 5, target 6
            Instruction::new(5, Opcode::Nop, Operand::None),
            Instruction::new(6, Opcode::Nop, Operand::None), // the target, deleted
            Instruction::new(7, Opcode::Halt, Operand::None),
        ];
        let kept: Vec<Instruction> = instructions
            .iter()
            .filter(|i| i.opcode != Opcode::Nop)
            .cloned()
            .collect();
        let out = reassemble(&kept, 8).expect("reassembles");
        let decoded = decode(&out.code).expect("valid output");
        assert_eq!(decoded[0].jump_target(), Some(5));
        assert_eq!(decoded[1].opcode, Opcode::Halt);
    }

    #[test]
    fn jump_to_stream_end_is_preserved() {
        let instructions = vec![
            Instruction::new(0, Opcode::Jump, Operand::I32(1)), // end 5, target 6
            Instruction::new(5, Opcode::Nop, Operand::None),
        ];
        let kept = vec![instructions[0].clone()];
        let out = reassemble(&kept, 6).expect("reassembles");
        let decoded = decode(&out.code).expect("valid output");
        assert_eq!(decoded[0].jump_target(), Some(5));
    }
}
