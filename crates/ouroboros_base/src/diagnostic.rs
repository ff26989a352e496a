//! The diagnostic sink every compiler stage reports into.
//!
//! Stages never print and never abort mid-scan: the lexer records a
//! diagnostic and keeps scanning, the type checker collects its findings and
//! fails once at the end, optimizer passes record and fall back to their
//! input. A [`Diagnostics`] sink owns the collected list for one compilation
//! of one file; diagnostics come out in the order they were reported, which
//! each stage guarantees is source order.
//!
//! # Rendering
//!
//! User-visible messages always carry file, line, and column:
//!
//! ```text
//! reactor.ob:12:5: error: cannot add 'int[m]' to 'int[s]'
//!   help: convert one operand so both carry the same unit
//! ```

use serde::{Deserialize, Serialize};

/// How severe a diagnostic is, ordered from worst to mildest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        };
        f.write_str(text)
    }
}

/// A single finding at a source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column, counted in code points.
    pub column: u32,
    pub severity: Severity,
    /// An optional suggestion rendered on its own `help:` line.
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            severity: Severity::Error,
            help: None,
        }
    }

    pub fn warning(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            severity: Severity::Warning,
            help: None,
        }
    }

    /// Attaches a `help:` suggestion line.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Collects diagnostics for one compilation of one file.
#[derive(Debug, Default)]
pub struct Diagnostics {
    file: String,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            entries: Vec::new(),
        }
    }

    /// The file this sink reports against.
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, line: u32, column: u32) {
        self.report(Diagnostic::error(message, line, column));
    }

    pub fn warning(&mut self, message: impl Into<String>, line: u32, column: u32) {
        self.report(Diagnostic::warning(message, line, column));
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any entry is an [`Severity::Error`].
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// Drains the collected entries, leaving the sink empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }

    /// Renders every entry in the `file:line:col: severity: message` shape.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for d in &self.entries {
            out.push_str(&format!(
                "{}:{}:{}: {}: {}\n",
                self.file, d.line, d.column, d.severity, d.message
            ));
            if let Some(help) = &d.help {
                out.push_str(&format!("  help: {}\n", help));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_errors_ignores_warnings() {
        let mut sink = Diagnostics::new("test.ob");
        sink.warning("unused unit suffix", 1, 1);
        assert!(!sink.has_errors());
        sink.error("unterminated string", 2, 8);
        assert!(sink.has_errors());
    }

    #[test]
    fn render_includes_file_line_column() {
        let mut sink = Diagnostics::new("reactor.ob");
        sink.report(Diagnostic::error("bad digit", 3, 9).with_help("remove the underscore"));
        let text = sink.render();
        assert!(text.contains("reactor.ob:3:9: error: bad digit"));
        assert!(text.contains("help: remove the underscore"));
    }

    #[test]
    fn entries_keep_report_order() {
        let mut sink = Diagnostics::new("a.ob");
        sink.error("first", 1, 1);
        sink.error("second", 2, 1);
        let messages: Vec<&str> = sink.entries().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn take_empties_the_sink() {
        let mut sink = Diagnostics::new("a.ob");
        sink.error("x", 1, 1);
        let drained = sink.take();
        assert_eq!(drained.len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn severity_orders_error_first() {
        assert!(Severity::Error < Severity::Hint);
    }
}
