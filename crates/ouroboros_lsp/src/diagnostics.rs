//! Core diagnostics to LSP diagnostics.
//!
//! The compiler's diagnostic shape is `{message, line, column, severity,
//! help}`; the LSP shape adds ranges, sources, and numeric severities.
//! Help text travels in the message body on its own `help:` line, which
//! every LSP client renders.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Range};

use ouroboros_base::{Diagnostic as CoreDiagnostic, Severity};

use crate::line_index::LineIndex;

/// Converts one compilation's diagnostics for a document.
pub fn convert_diagnostics(
    diagnostics: &[CoreDiagnostic],
    index: &LineIndex,
) -> Vec<Diagnostic> {
    diagnostics
        .iter()
        .map(|d| convert_one(d, index))
        .collect()
}

fn convert_one(diagnostic: &CoreDiagnostic, index: &LineIndex) -> Diagnostic {
    let start = index.position_of(diagnostic.line, diagnostic.column);
    let end = index.position_of(diagnostic.line, diagnostic.column + 1);
    let message = match &diagnostic.help {
        Some(help) => format!("{}\nhelp: {}", diagnostic.message, help),
        None => diagnostic.message.clone(),
    };
    Diagnostic {
        range: Range { start, end },
        severity: Some(severity_of(diagnostic.severity)),
        source: Some("ouroboros".to_string()),
        message,
        ..Default::default()
    }
}

fn severity_of(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Info => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ouroboros_base::Diagnostic as CoreDiagnostic;

    #[test]
    fn positions_become_zero_based_ranges() {
        let index = LineIndex::new("let xs = 1\nprint(x)\n");
        let core = CoreDiagnostic::error("'x' is not defined in this scope", 2, 7);
        let lsp = convert_one(&core, &index);
        assert_eq!(lsp.range.start.line, 1);
        assert_eq!(lsp.range.start.character, 6);
        assert_eq!(lsp.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(lsp.source.as_deref(), Some("ouroboros"));
    }

    #[test]
    fn help_joins_the_message() {
        let index = LineIndex::new("print(x)\n");
        let core =
            CoreDiagnostic::error("'x' is not defined", 1, 7).with_help("did you mean 'xs'?");
        let lsp = convert_one(&core, &index);
        assert!(lsp.message.contains("help: did you mean 'xs'?"));
    }

    #[test]
    fn warnings_map_to_warning_severity() {
        let index = LineIndex::new("x\n");
        let core = CoreDiagnostic::warning("unused", 1, 1);
        let lsp = convert_one(&core, &index);
        assert_eq!(lsp.severity, Some(DiagnosticSeverity::WARNING));
    }
}
