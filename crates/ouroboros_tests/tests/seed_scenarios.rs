//! End-to-end scenarios exercising one behaviour per stage, front to back.

use ouroboros_base::{Diagnostics, Interner};
use ouroboros_bytecode::opcode::Opcode;
use ouroboros_bytecode::{decode, BytecodeBuilder, Constant, OptimizationLevel, Optimizer};
use ouroboros_language::token::{Token, TokenKind, Value};
use ouroboros_language::{Lexer, UnitLiteral};

fn lex(source: &str) -> (Vec<Token>, Diagnostics, Interner) {
    let mut interner = Interner::new();
    let mut sink = Diagnostics::new("seed.ob");
    let tokens = Lexer::new(source, "seed.ob", &mut interner, &mut sink).tokenize();
    (tokens, sink, interner)
}

#[test]
fn unit_literal_lexes_as_one_token() {
    let (tokens, sink, _) = lex("220 V");
    assert!(sink.is_empty());
    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].kind, TokenKind::UnitLiteral);
    assert_eq!(tokens[0].column, 1);
    assert_eq!(
        tokens[0].value,
        Some(Value::Unit(UnitLiteral::new(220.0, "V")))
    );
}

#[test]
fn greek_superscript_assignment_lexes_as_identifier() {
    let (tokens, sink, interner) = lex("σ² = 1.0");
    assert!(sink.is_empty());
    let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Identifier,
            TokenKind::Assign,
            TokenKind::FloatLiteral,
            TokenKind::EndOfFile,
        ]
    );
    assert_eq!(interner.resolve(tokens[0].lexeme), "σ²");
    assert_eq!(tokens[2].value, Some(Value::Float(1.0)));
}

#[test]
fn constant_folding_collapses_two_loads_and_an_add() {
    let mut builder = BytecodeBuilder::new();
    let two = builder.add_constant(Constant::Int(2)) as i32;
    let three = builder.add_constant(Constant::Int(3)) as i32;
    builder.emit_with(Opcode::LoadConstant, two);
    builder.emit_with(Opcode::LoadConstant, three);
    builder.emit(Opcode::Add);
    builder.emit(Opcode::Return);
    let bytecode = builder.finalize().expect("clean build");

    let mut sink = Diagnostics::new("seed.ob");
    let out = Optimizer::new(OptimizationLevel::Debug).optimize(bytecode, &mut sink);
    let instructions = decode(&out.code).expect("valid output");
    assert_eq!(instructions[0].opcode, Opcode::LoadConstant);
    let index = instructions[0].operand.as_i32().unwrap() as usize;
    assert_eq!(out.constants[index], Constant::Int(5));
    // The original pool entries may remain behind, unused.
    assert!(out.constants.contains(&Constant::Int(2)));
    assert!(out.constants.contains(&Constant::Int(3)));
}

#[test]
fn dead_tail_after_return_is_eliminated() {
    let mut builder = BytecodeBuilder::new();
    builder.emit(Opcode::Return);
    builder.emit_with(Opcode::Push, 0);
    builder.emit(Opcode::Return);
    let bytecode = builder.finalize().expect("clean build");

    let mut sink = Diagnostics::new("seed.ob");
    let out = Optimizer::new(OptimizationLevel::Debug).optimize(bytecode, &mut sink);
    let instructions = decode(&out.code).expect("valid output");
    assert_eq!(instructions.len(), 1);
    assert_eq!(instructions[0].opcode, Opcode::Return);
}

#[test]
fn jump_threading_skips_the_trampoline() {
    // JumpIfTrue L1; Return; L1: Jump L2; Return; L2: Nop
    let mut builder = BytecodeBuilder::new();
    let l1_site = builder.emit_jump(Opcode::JumpIfTrue);
    builder.emit(Opcode::Return);
    builder.patch_jump(l1_site).expect("pending");
    let l2_site = builder.emit_jump(Opcode::Jump);
    builder.emit(Opcode::Return);
    builder.patch_jump(l2_site).expect("pending");
    builder.emit(Opcode::Nop);
    let bytecode = builder.finalize().expect("clean build");

    let mut sink = Diagnostics::new("seed.ob");
    let out = Optimizer::new(OptimizationLevel::Release).optimize(bytecode, &mut sink);
    let instructions = decode(&out.code).expect("valid output");
    let conditional = instructions
        .iter()
        .find(|i| i.opcode.is_conditional_jump())
        .expect("the conditional jump survives");
    let landing_offset = conditional.jump_target().expect("has a target");
    let landing = instructions
        .iter()
        .find(|i| i.offset == landing_offset)
        .expect("lands on an instruction");
    assert_ne!(landing.opcode, Opcode::Jump);
}

#[test]
fn every_jump_decodes_back_to_its_patched_target() {
    let mut builder = BytecodeBuilder::new();
    let a = builder.emit_jump(Opcode::JumpIfFalse);
    builder.emit_with(Opcode::Push, 1);
    let b = builder.emit_jump(Opcode::Jump);
    builder.patch_jump(a).expect("pending");
    builder.emit_with(Opcode::Push, 2);
    builder.patch_jump(b).expect("pending");
    builder.emit(Opcode::Halt);
    let bytecode = builder.finalize().expect("clean build");

    let instructions = decode(&bytecode.code).expect("valid stream");
    // a patched to the Push 2 instruction, b to the Halt.
    assert_eq!(instructions[0].jump_target(), Some(instructions[3].offset));
    assert_eq!(instructions[2].jump_target(), Some(instructions[4].offset));
}
