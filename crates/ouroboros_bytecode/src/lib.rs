//! # ouroboros-bytecode
//!
//! The back half of the Ouroboros front end: everything between the type
//! checker's annotated AST and the VM.
//!
//! ```text
//! annotated AST ──(codegen, external)──▶ BytecodeBuilder ──finalize──▶ Bytecode
//!                                                                        │
//!                                                                   Optimizer
//!                                                                        │
//!                                                                        ▼
//!                                                              optimized Bytecode ──▶ VM
//! ```
//!
//! - [`opcode::Opcode`]: the VM's instruction set, with operand classes
//! - [`value::Constant`]: the de-duplicated constant pool's values
//! - [`builder::BytecodeBuilder`]: append instructions, patch jumps,
//!   track loops, collect descriptors
//! - [`asm`]: the inline-assembly sub-language (`@asm` blocks)
//! - [`optimize`]: the ordered rewrite passes, grouped by
//!   [`optimize::OptimizationLevel`]
//!
//! Instruction encoding is variable length: one opcode byte, then a 4-byte
//! little-endian operand for the operand-carrying class, then nothing — with
//! the single exception of the raw-byte escapes (`NativeInstruction`,
//! `RawBytes`), which carry a 4-byte length prefix plus payload.

pub mod asm;
pub mod builder;
pub mod bytecode;
pub mod decode;
pub mod opcode;
pub mod optimize;
pub mod value;

pub use builder::{BuildError, BytecodeBuilder};
pub use bytecode::Bytecode;
pub use decode::{decode, Instruction, MalformedBytecode, Operand};
pub use opcode::Opcode;
pub use optimize::{OptimizationLevel, Optimizer};
pub use value::Constant;
