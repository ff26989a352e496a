//! Position translation between the compiler and the LSP.
//!
//! The compiler reports 1-based lines and code-point columns; LSP wants
//! 0-based lines and UTF-16 code-unit characters. A [`LineIndex`] is built
//! once per document version and answers both translations.

use tower_lsp::lsp_types::Position;

pub struct LineIndex {
    text: String,
    /// Byte offset of each line's first character; line 0 starts at 0.
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        LineIndex {
            text: text.to_string(),
            line_starts,
        }
    }

    /// The LSP position of a byte offset.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        let character = self.text[line_start..offset].encode_utf16().count();
        Position {
            line: line as u32,
            character: character as u32,
        }
    }

    /// The LSP position of a compiler position (1-based line, 1-based
    /// code-point column).
    pub fn position_of(&self, line: u32, column: u32) -> Position {
        let line_idx = (line.max(1) - 1) as usize;
        let Some(&line_start) = self.line_starts.get(line_idx) else {
            return Position {
                line: line.max(1) - 1,
                character: column.max(1) - 1,
            };
        };
        let line_end = self
            .line_starts
            .get(line_idx + 1)
            .map(|&next| next - 1)
            .unwrap_or(self.text.len());
        let line_text = &self.text[line_start..line_end];
        let character: usize = line_text
            .chars()
            .take((column.max(1) - 1) as usize)
            .map(char::len_utf16)
            .sum();
        Position {
            line: line_idx as u32,
            character: character as u32,
        }
    }

    /// Number of lines in the document.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
