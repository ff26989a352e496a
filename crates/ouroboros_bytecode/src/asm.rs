//! The inline-assembly sub-language behind `@asm` blocks.
//!
//! One textual instruction per line, dispatched by mnemonic:
//!
//! - stack-machine mnemonics (`PUSH`, `POP`, `ADD`, `JMP`, `CALL`, `RET`,
//!   `MOV`, …) lower to ordinary opcodes;
//! - known x86-64 mnemonics (`CPUID`, `RDTSC`, `SYSCALL`, the SSE packed
//!   ops, …) are emitted as [`Opcode::NativeInstruction`] escapes carrying
//!   the raw machine bytes — the VM treats them as opaque blobs;
//! - unknown mnemonics emit a single `Nop` and a warning.
//!
//! Registers resolve to indices 0–15 in `RAX`, `RBX`, `RCX`, `RDX`, `RSI`,
//! `RDI`, `RBP`, `RSP`, `R8`…`R15` order. `;` starts a comment.

use ouroboros_base::Diagnostics;

use crate::builder::BytecodeBuilder;
use crate::opcode::Opcode;

/// Raw encodings for the x86-64 mnemonics the assembler knows.
///
/// These are complete instructions or opcode stems; operands beyond the
/// stem are not encoded — the escape hatch exists so systems code can pin
/// exact bytes, not to be a full assembler.
fn native_encoding(mnemonic: &str) -> Option<&'static [u8]> {
    let bytes: &'static [u8] = match mnemonic {
        "HLT" => &[0xF4],
        "CPUID" => &[0x0F, 0xA2],
        "RDTSC" => &[0x0F, 0x31],
        "RDTSCP" => &[0x0F, 0x01, 0xF9],
        "CMPXCHG" => &[0x0F, 0xB1],
        "XCHG" => &[0x87],
        "MFENCE" => &[0x0F, 0xAE, 0xF0],
        "LFENCE" => &[0x0F, 0xAE, 0xE8],
        "SFENCE" => &[0x0F, 0xAE, 0xF8],
        "PAUSE" => &[0xF3, 0x90],
        "SYSCALL" => &[0x0F, 0x05],
        "SYSRET" => &[0x0F, 0x07],
        "INT3" => &[0xCC],
        "UD2" => &[0x0F, 0x0B],
        "MOVAPS" => &[0x0F, 0x28],
        "MOVUPS" => &[0x0F, 0x10],
        "ADDPS" => &[0x0F, 0x58],
        "SUBPS" => &[0x0F, 0x5C],
        "MULPS" => &[0x0F, 0x59],
        "DIVPS" => &[0x0F, 0x5E],
        "SQRTPS" => &[0x0F, 0x51],
        "XORPS" => &[0x0F, 0x57],
        "ANDPS" => &[0x0F, 0x54],
        "ORPS" => &[0x0F, 0x56],
        "MINPS" => &[0x0F, 0x5D],
        "MAXPS" => &[0x0F, 0x5F],
        _ => return None,
    };
    Some(bytes)
}

/// Maps `RAX`…`R15` (or a bare index) to a register number.
fn register_index(name: &str) -> Option<i32> {
    let index = match name {
        "RAX" => 0,
        "RBX" => 1,
        "RCX" => 2,
        "RDX" => 3,
        "RSI" => 4,
        "RDI" => 5,
        "RBP" => 6,
        "RSP" => 7,
        "R8" => 8,
        "R9" => 9,
        "R10" => 10,
        "R11" => 11,
        "R12" => 12,
        "R13" => 13,
        "R14" => 14,
        "R15" => 15,
        _ => return name.parse::<i32>().ok().filter(|i| (0..16).contains(i)),
    };
    Some(index)
}

fn parse_immediate(text: &str) -> Option<i32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok().map(|v| v as i32);
    }
    text.parse::<i32>().ok()
}

/// Assembles a whole `@asm` block into the builder's stream.
///
/// Problems never abort the block: malformed lines report an error and are
/// skipped, unknown mnemonics degrade to `Nop` with a warning.
pub fn assemble(source: &str, builder: &mut BytecodeBuilder, sink: &mut Diagnostics) {
    for (index, raw_line) in source.lines().enumerate() {
        let line_no = (index + 1) as u32;
        let line = match raw_line.find(';') {
            Some(comment) => &raw_line[..comment],
            None => raw_line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        assemble_line(line, line_no, builder, sink);
    }
}

fn assemble_line(line: &str, line_no: u32, builder: &mut BytecodeBuilder, sink: &mut Diagnostics) {
    let mut parts = line.splitn(2, char::is_whitespace);
    let mnemonic = parts.next().unwrap_or("").to_ascii_uppercase();
    let rest = parts.next().unwrap_or("").trim();
    let operands: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',').map(str::trim).collect()
    };

    match mnemonic.as_str() {
        "NOP" => builder.emit(Opcode::Nop),
        "POP" => builder.emit(Opcode::Pop),
        "DUP" => builder.emit(Opcode::Dup),
        "SWAP" => builder.emit(Opcode::Swap),
        "ADD" => builder.emit(Opcode::Add),
        "SUB" => builder.emit(Opcode::Sub),
        "MUL" => builder.emit(Opcode::Mul),
        "DIV" => builder.emit(Opcode::Div),
        "MOD" => builder.emit(Opcode::Mod),
        "NEG" => builder.emit(Opcode::Neg),
        "NOT" => builder.emit(Opcode::Not),
        "RET" => builder.emit(Opcode::Return),
        "RETV" => builder.emit(Opcode::ReturnVoid),
        "HALT" => builder.emit(Opcode::Halt),

        "PUSH" => match operands.first().and_then(|o| parse_immediate(o)) {
            Some(value) => builder.emit_with(Opcode::Push, value),
            None => sink.error("PUSH needs an integer immediate", line_no, 1),
        },

        "CALL" => match operands.first().and_then(|o| parse_immediate(o)) {
            Some(index) => builder.emit_with(Opcode::Call, index),
            None => sink.error("CALL needs a function index", line_no, 1),
        },

        "JMP" => match operands.first() {
            Some(operand) => {
                if let Some(target) = parse_immediate(operand) {
                    builder.emit_jump_to(Opcode::Jump, target as usize);
                } else if let Some(target) = builder.label_offset(operand) {
                    builder.emit_jump_to(Opcode::Jump, target);
                } else {
                    sink.error(format!("unknown jump target '{operand}'"), line_no, 1);
                }
            }
            None => sink.error("JMP needs a target", line_no, 1),
        },

        "MOV" => {
            let (dst, src) = match (operands.first(), operands.get(1)) {
                (Some(d), Some(s)) => (*d, *s),
                _ => {
                    sink.error("MOV needs two registers", line_no, 1);
                    return;
                }
            };
            match (register_index(dst), register_index(src)) {
                (Some(dst), Some(src)) => {
                    builder.emit_with(Opcode::LoadRegister, src);
                    builder.emit_with(Opcode::StoreRegister, dst);
                }
                _ => sink.error(
                    format!("unknown register in 'MOV {dst}, {src}'"),
                    line_no,
                    1,
                ),
            }
        }

        "LDR" => match operands.first().and_then(|o| register_index(o)) {
            Some(register) => builder.emit_with(Opcode::LoadRegister, register),
            None => sink.error("LDR needs a register", line_no, 1),
        },

        "STR" => match operands.first().and_then(|o| register_index(o)) {
            Some(register) => builder.emit_with(Opcode::StoreRegister, register),
            None => sink.error("STR needs a register", line_no, 1),
        },

        other => match native_encoding(other) {
            Some(bytes) => builder.emit_bytes(Opcode::NativeInstruction, bytes),
            None => {
                builder.emit(Opcode::Nop);
                sink.warning(
                    format!("unknown mnemonic '{other}', emitting NOP"),
                    line_no,
                    1,
                );
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, Operand};

    fn run(source: &str) -> (Vec<crate::decode::Instruction>, Diagnostics) {
        let mut builder = BytecodeBuilder::new();
        let mut sink = Diagnostics::new("block.asm");
        assemble(source, &mut builder, &mut sink);
        let bytecode = builder.finalize().expect("no pending jumps");
        (decode(&bytecode.code).expect("valid stream"), sink)
    }

    #[test]
    fn stack_mnemonics_lower_to_opcodes() {
        let (instructions, sink) = run("PUSH 2\nPUSH 3\nADD\nRET");
        assert!(sink.is_empty());
        let opcodes: Vec<Opcode> = instructions.iter().map(|i| i.opcode).collect();
        assert_eq!(
            opcodes,
            vec![Opcode::Push, Opcode::Push, Opcode::Add, Opcode::Return]
        );
        assert_eq!(instructions[1].operand, Operand::I32(3));
    }

    #[test]
    fn native_mnemonics_become_escapes() {
        let (instructions, sink) = run("CPUID\nRDTSC\nSYSCALL");
        assert!(sink.is_empty());
        assert_eq!(instructions[0].operand, Operand::Bytes(vec![0x0F, 0xA2]));
        assert_eq!(instructions[1].operand, Operand::Bytes(vec![0x0F, 0x31]));
        assert_eq!(instructions[2].operand, Operand::Bytes(vec![0x0F, 0x05]));
    }

    #[test]
    fn mov_expands_to_register_transfer() {
        let (instructions, sink) = run("MOV RBX, RAX");
        assert!(sink.is_empty());
        assert_eq!(instructions[0].opcode, Opcode::LoadRegister);
        assert_eq!(instructions[0].operand, Operand::I32(0)); // RAX
        assert_eq!(instructions[1].opcode, Opcode::StoreRegister);
        assert_eq!(instructions[1].operand, Operand::I32(1)); // RBX
    }

    #[test]
    fn registers_follow_the_documented_order() {
        assert_eq!(register_index("RAX"), Some(0));
        assert_eq!(register_index("RBX"), Some(1));
        assert_eq!(register_index("RSP"), Some(7));
        assert_eq!(register_index("R15"), Some(15));
        assert_eq!(register_index("XMM0"), None);
    }

    #[test]
    fn unknown_mnemonic_degrades_to_nop_with_warning() {
        let (instructions, sink) = run("FROBNICATE");
        assert_eq!(instructions[0].opcode, Opcode::Nop);
        assert_eq!(sink.len(), 1);
        assert!(!sink.has_errors());
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let (instructions, sink) = run("; setup\n\nNOP ; trailing\n");
        assert!(sink.is_empty());
        assert_eq!(instructions.len(), 1);
    }

    #[test]
    fn missing_operand_reports_and_continues() {
        let (instructions, sink) = run("PUSH\nHALT");
        assert!(sink.has_errors());
        assert_eq!(instructions[0].opcode, Opcode::Halt);
    }

    #[test]
    fn hex_immediates_parse() {
        let (instructions, _) = run("PUSH 0xFF");
        assert_eq!(instructions[0].operand, Operand::I32(255));
    }
}
