//! # ouroboros-lsp
//!
//! The bridge between the compiler's diagnostics and the Language Server
//! Protocol. The JSON-RPC transport lives elsewhere; this crate owns the
//! parts that touch compiler internals:
//!
//! - [`LineIndex`]: byte offsets and 1-based compiler positions to LSP's
//!   0-based, UTF-16 `Position`s
//! - [`diagnostics`]: core [`ouroboros_base::Diagnostic`]s to
//!   `lsp_types::Diagnostic`s
//! - [`AnalysisPipeline`]: the per-document entry point that re-invokes
//!   the lexer (and the type checker, when a parsed program is supplied)
//!
//! Documents are analysed independently; the only state shared between
//! analyses is the interner the caller threads through.

pub mod diagnostics;
pub mod line_index;
pub mod pipeline;

pub use diagnostics::convert_diagnostics;
pub use line_index::LineIndex;
pub use pipeline::AnalysisPipeline;
