//! # ouroboros-language
//!
//! The Ouroboros front end: everything between raw source text and the
//! bytecode builder.
//!
//! ## Pipeline position
//!
//! ```text
//! source text ──lexer──▶ tokens ──(parser, external)──▶ AST
//!                                                        │
//!                                              type checker / contracts
//!                                                        │
//!                                                        ▼
//!                                           annotated AST + diagnostics
//! ```
//!
//! The parser itself lives outside this crate; [`ast`] defines the tree it
//! produces and [`checker`] consumes.
//!
//! ## Syntax levels
//!
//! Ouroboros sources mix three syntax strata selected by `@high` / `@medium`
//! / `@low` / `@asm` pragmas. The lexer carries the active
//! [`token::SyntaxLevel`] on every token it emits; downstream stages treat
//! the level as a tag and may refuse constructs inappropriate to it.

pub mod ast;
pub mod checker;
pub mod contracts;
pub mod lexer;
pub mod scope;
pub mod symbols;
pub mod token;
pub mod types;
pub mod unify;
pub mod units;

pub use checker::{TypeCheckError, TypeChecker};
pub use lexer::Lexer;
pub use token::{SyntaxLevel, Token, TokenKind, Value};
pub use units::UnitLiteral;
