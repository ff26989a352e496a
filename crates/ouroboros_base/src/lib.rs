//! # ouroboros-base
//!
//! Structural atoms shared by every stage of the Ouroboros compiler.
//!
//! This crate provides the foundational types the rest of the pipeline is
//! built from:
//!
//! - [`Span`]/[`Pos`]: source location tracking
//! - [`Interner`]/[`Symbol`]: string interning for O(1) name comparison
//! - [`Arena`]: bump allocation for stable AST references
//! - [`Diagnostic`]/[`Diagnostics`]: the error sink every stage reports into
//!
//! # Design Principles
//!
//! This crate knows nothing about tokens, types, or bytecode. It provides
//! only generic infrastructure that the lexer, type checker, and bytecode
//! stages build upon, so it never needs to change when the language does.

pub mod arena;
pub mod diagnostic;
pub mod intern;
pub mod span;

pub use arena::Arena;
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use intern::{Interner, Symbol};
pub use span::{Pos, Span};
