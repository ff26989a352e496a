//! The per-document analysis pipeline.
//!
//! Each document version is analysed from scratch: lex always, type-check
//! when the caller supplies the parsed program. The pipeline owns nothing
//! between runs — the interner is threaded in by the caller so symbols stay
//! stable across versions of the same workspace.

use tower_lsp::lsp_types::Diagnostic;

use ouroboros_base::{Diagnostics, Interner};
use ouroboros_language::ast::Program;
use ouroboros_language::checker::TypeChecker;
use ouroboros_language::lexer::Lexer;
use ouroboros_language::token::Token;

use crate::diagnostics::convert_diagnostics;
use crate::line_index::LineIndex;

/// What one analysis run hands back to the server layer.
pub struct AnalysisOutcome {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Default)]
pub struct AnalysisPipeline;

impl AnalysisPipeline {
    pub fn new() -> Self {
        AnalysisPipeline
    }

    /// Lexes a document and converts every lexical diagnostic.
    pub fn analyze(
        &self,
        source: &str,
        file_name: &str,
        interner: &mut Interner,
    ) -> AnalysisOutcome {
        let index = LineIndex::new(source);
        let mut sink = Diagnostics::new(file_name);
        let tokens = Lexer::new(source, file_name, interner, &mut sink).tokenize();
        log::debug!(
            "analyzed {file_name}: {} token(s), {} diagnostic(s)",
            tokens.len(),
            sink.len()
        );
        AnalysisOutcome {
            tokens,
            diagnostics: convert_diagnostics(sink.entries(), &index),
        }
    }

    /// Type-checks an already-parsed program against its source text.
    pub fn check<'a>(
        &self,
        source: &str,
        file_name: &str,
        interner: &'a Interner,
        program: &Program<'a>,
    ) -> Vec<Diagnostic> {
        let index = LineIndex::new(source);
        match TypeChecker::new(interner, file_name).check_program(program) {
            Ok(analysis) => convert_diagnostics(&analysis.diagnostics, &index),
            Err(error) => convert_diagnostics(&error.diagnostics, &index),
        }
    }
}
