//! The multi-level Ouroboros lexer.
//!
//! A single forward pass over the source text, dispatching on the leading
//! character of each token. The lexer is Unicode-aware (Greek letters, math
//! symbols, super/subscripts), understands unit literals (`220 V`), and
//! carries a current [`SyntaxLevel`] that `@high` / `@medium` / `@low` /
//! `@asm` pragmas reset mid-stream.
//!
//! Errors never abort scanning: each problem is reported to the
//! [`Diagnostics`] sink and the scanner advances one code point.
//!
//! ## `//` disambiguation
//!
//! `//` is both the integer-division operator and the line-comment opener.
//! The rule here is whitespace discipline: `//` lexes as [`TokenKind::IntegerDivide`]
//! only when it immediately abuts the previous character (no whitespace) and
//! the previous token can end an expression (`7//2`, `x//y`, `(a+b)//2`).
//! Every other `//` starts a comment. This replaces the operand-lookahead
//! heuristics older implementations used; the trade-off is that `7 // 2`
//! is a comment, which the spaced form always was in practice.
//!
//! ## Numeric suffixes versus units
//!
//! An alphanumeric run abutting a number is tried as a suffix first
//! (`5m` is the decimal 5), then as a unit (`5km` is kilometres). A unit
//! may also follow after exactly one space (`220 V`).

use ouroboros_base::{Diagnostics, Interner, Span, Symbol};

use crate::symbols::{self, GreekLetter, MathSymbol};
use crate::token::{keyword_kind, AttributeTag, SyntaxLevel, Token, TokenKind, Value};
use crate::units::{self, UnitLiteral};

const INTEGER_SUFFIXES: &[&str] = &[
    "u8", "u16", "u32", "u64", "i8", "i16", "i32", "i64", "usize", "isize", "U", "L", "UL",
];
const FLOAT_SUFFIXES: &[&str] = &["f", "f32", "f64", "d", "D"];
const DECIMAL_SUFFIXES: &[&str] = &["m", "M"];

pub struct Lexer<'a> {
    source: &'a str,
    /// `(byte offset, code point)` pairs; indices below are into this.
    chars: Vec<(usize, char)>,
    current: usize,
    start: usize,
    line: u32,
    column: u32,
    start_line: u32,
    start_column: u32,
    level: SyntaxLevel,
    file: Symbol,
    /// Kind of the last emitted token, for `//` and `.5` disambiguation.
    prev_kind: Option<TokenKind>,
    tokens: Vec<Token>,
    interner: &'a mut Interner,
    sink: &'a mut Diagnostics,
}

impl<'a> Lexer<'a> {
    pub fn new(
        source: &'a str,
        file_name: &str,
        interner: &'a mut Interner,
        sink: &'a mut Diagnostics,
    ) -> Self {
        let file = interner.intern(file_name);
        Lexer {
            source,
            chars: source.char_indices().collect(),
            current: 0,
            start: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
            level: SyntaxLevel::default(),
            file,
            prev_kind: None,
            tokens: Vec::new(),
            interner,
            sink,
        }
    }

    /// Scans the whole input, always ending with an `EndOfFile` token.
    pub fn tokenize(mut self) -> Vec<Token> {
        while !self.at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_column = self.column;
            self.scan_token();
        }
        self.start = self.current;
        self.start_line = self.line;
        self.start_column = self.column;
        self.push(TokenKind::EndOfFile, None);
        self.tokens
    }

    // ------------------------------------------------------------------
    // Cursor primitives
    // ------------------------------------------------------------------

    fn at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.current).map(|&(_, c)| c)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.current + n).map(|&(_, c)| c)
    }

    fn advance(&mut self) -> char {
        let (_, c) = self.chars[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn byte_at(&self, index: usize) -> usize {
        self.chars
            .get(index)
            .map(|&(b, _)| b)
            .unwrap_or(self.source.len())
    }

    fn text(&self, from: usize, to: usize) -> &str {
        &self.source[self.byte_at(from)..self.byte_at(to)]
    }

    fn push(&mut self, kind: TokenKind, value: Option<Value>) {
        let span = Span::new(self.byte_at(self.start), self.byte_at(self.current));
        let lexeme = self.interner.intern(&self.source[span.start..span.end]);
        self.tokens.push(Token {
            kind,
            lexeme,
            value,
            line: self.start_line,
            column: self.start_column,
            span,
            file: self.file,
            level: self.level,
        });
        self.prev_kind = Some(kind);
    }

    fn error(&mut self, message: impl Into<String>) {
        self.sink
            .error(message, self.start_line, self.start_column);
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            ' ' | '\t' | '\r' | '\n' => {}

            '(' => self.push(TokenKind::LParen, None),
            ')' => self.push(TokenKind::RParen, None),
            '{' => self.push(TokenKind::LBrace, None),
            '}' => self.push(TokenKind::RBrace, None),
            '[' => self.push(TokenKind::LBracket, None),
            ']' => self.push(TokenKind::RBracket, None),
            ',' => self.push(TokenKind::Comma, None),
            ';' => self.push(TokenKind::Semicolon, None),
            '~' => self.push(TokenKind::Tilde, None),

            ':' => {
                let kind = if self.match_char(':') {
                    TokenKind::ColonColon
                } else {
                    TokenKind::Colon
                };
                self.push(kind, None);
            }

            '+' => {
                let kind = if self.match_char('=') {
                    TokenKind::PlusAssign
                } else if self.match_char('+') {
                    TokenKind::Increment
                } else {
                    TokenKind::Plus
                };
                self.push(kind, None);
            }

            '-' => {
                let kind = if self.match_char('>') {
                    TokenKind::Arrow
                } else if self.match_char('=') {
                    TokenKind::MinusAssign
                } else if self.match_char('-') {
                    TokenKind::Decrement
                } else {
                    TokenKind::Minus
                };
                self.push(kind, None);
            }

            '*' => {
                let kind = if self.match_char('*') {
                    if self.match_char('=') {
                        TokenKind::PowerAssign
                    } else {
                        TokenKind::Power
                    }
                } else if self.match_char('=') {
                    TokenKind::StarAssign
                } else {
                    TokenKind::Star
                };
                self.push(kind, None);
            }

            '/' => self.slash(),

            '%' => {
                let kind = if self.match_char('=') {
                    TokenKind::PercentAssign
                } else {
                    TokenKind::Percent
                };
                self.push(kind, None);
            }

            '=' => {
                let kind = if self.match_char('=') {
                    TokenKind::Equal
                } else if self.match_char('>') {
                    TokenKind::FatArrow
                } else {
                    TokenKind::Assign
                };
                self.push(kind, None);
            }

            '!' => {
                let kind = if self.match_char('=') {
                    TokenKind::NotEqual
                } else {
                    TokenKind::Bang
                };
                self.push(kind, None);
            }

            '<' => {
                let kind = if self.match_char('=') {
                    if self.match_char('>') {
                        TokenKind::Spaceship
                    } else {
                        TokenKind::LessEqual
                    }
                } else if self.match_char('<') {
                    if self.match_char('=') {
                        TokenKind::ShlAssign
                    } else {
                        TokenKind::Shl
                    }
                } else {
                    TokenKind::Less
                };
                self.push(kind, None);
            }

            '>' => {
                let kind = if self.match_char('=') {
                    TokenKind::GreaterEqual
                } else if self.match_char('>') {
                    if self.match_char('=') {
                        TokenKind::ShrAssign
                    } else {
                        TokenKind::Shr
                    }
                } else {
                    TokenKind::Greater
                };
                self.push(kind, None);
            }

            '&' => {
                let kind = if self.match_char('&') {
                    TokenKind::AndAnd
                } else if self.match_char('=') {
                    TokenKind::AmpAssign
                } else {
                    TokenKind::Ampersand
                };
                self.push(kind, None);
            }

            '|' => {
                let kind = if self.match_char('|') {
                    TokenKind::OrOr
                } else if self.match_char('=') {
                    TokenKind::PipeAssign
                } else {
                    TokenKind::Pipe
                };
                self.push(kind, None);
            }

            '^' => {
                let kind = if self.match_char('=') {
                    TokenKind::CaretAssign
                } else {
                    TokenKind::Caret
                };
                self.push(kind, None);
            }

            '?' => {
                let kind = if self.match_char('?') {
                    if self.match_char('=') {
                        TokenKind::CoalesceAssign
                    } else {
                        TokenKind::Coalesce
                    }
                } else if self.match_char('.') {
                    TokenKind::QuestionDot
                } else {
                    TokenKind::Question
                };
                self.push(kind, None);
            }

            '.' => self.dot(),
            '"' => self.string(false),
            '$' => {
                if self.match_char('"') {
                    self.string(true);
                } else {
                    self.error("unrecognised character '$'");
                }
            }
            '\'' => self.char_literal(),
            '@' => self.at_sign(),
            '#' => self.hash(),

            '0'..='9' => self.number(c),
            'a'..='z' | 'A'..='Z' | '_' => self.identifier(),

            _ if !c.is_ascii() => self.unicode(c),

            _ => self.error(format!("unrecognised character '{c}'")),
        }
    }

    // ------------------------------------------------------------------
    // Comments and integer division
    // ------------------------------------------------------------------

    fn slash(&mut self) {
        if self.match_char('=') {
            self.push(TokenKind::SlashAssign, None);
        } else if self.peek() == Some('/') {
            if self.integer_divide_context() {
                self.advance();
                self.push(TokenKind::IntegerDivide, None);
            } else {
                while !self.at_end() && self.peek() != Some('\n') {
                    self.advance();
                }
            }
        } else if self.peek() == Some('*') {
            self.advance();
            self.block_comment();
        } else {
            self.push(TokenKind::Slash, None);
        }
    }

    /// `//` is the operator only when it abuts an expression-ending token.
    fn integer_divide_context(&self) -> bool {
        let prev_ends_expression = self.prev_kind.map_or(false, TokenKind::ends_expression);
        let abuts = self.start > 0 && !self.chars[self.start - 1].1.is_whitespace();
        prev_ends_expression && abuts
    }

    fn block_comment(&mut self) {
        loop {
            if self.at_end() {
                self.error("unterminated block comment");
                return;
            }
            if self.advance() == '*' && self.peek() == Some('/') {
                self.advance();
                return;
            }
        }
    }

    // ------------------------------------------------------------------
    // Punctuation with look-ahead
    // ------------------------------------------------------------------

    fn dot(&mut self) {
        if self.peek() == Some('.') {
            self.advance();
            let kind = if self.match_char('.') {
                TokenKind::Ellipsis
            } else {
                TokenKind::DotDot
            };
            self.push(kind, None);
            return;
        }
        // `.5` opens a fractional literal only when the previous token
        // cannot receive member access; `t.0` stays Dot + IntLiteral.
        let fraction = matches!(self.peek(), Some(c) if c.is_ascii_digit())
            && !self.prev_kind.map_or(false, TokenKind::ends_expression);
        if fraction {
            self.number('.');
        } else {
            self.push(TokenKind::Dot, None);
        }
    }

    // ------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------

    fn number(&mut self, first: char) {
        if first == '0' {
            match self.peek() {
                Some('x') | Some('X') => {
                    self.advance();
                    return self.based_number(16);
                }
                Some('o') | Some('O') => {
                    self.advance();
                    return self.based_number(8);
                }
                Some('b') | Some('B') => {
                    self.advance();
                    return self.based_number(2);
                }
                _ => {}
            }
        }

        let mut literal = String::new();
        let mut is_float = first == '.';
        if is_float {
            literal.push_str("0.");
        } else {
            literal.push(first);
        }

        self.digits_into(&mut literal);

        if !is_float
            && self.peek() == Some('.')
            && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit())
        {
            is_float = true;
            self.advance();
            literal.push('.');
            self.digits_into(&mut literal);
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let exponent_ok = match self.peek_at(1) {
                Some(c) if c.is_ascii_digit() => true,
                Some('+') | Some('-') => {
                    matches!(self.peek_at(2), Some(c) if c.is_ascii_digit())
                }
                _ => false,
            };
            if exponent_ok {
                is_float = true;
                literal.push(self.advance());
                if matches!(self.peek(), Some('+') | Some('-')) {
                    literal.push(self.advance());
                }
                self.digits_into(&mut literal);
            }
        }

        let suffix = self.take_numeric_suffix();
        let (kind, value) = match suffix {
            Some(s) if DECIMAL_SUFFIXES.contains(&s) => {
                let v = literal.parse::<f64>().unwrap_or_default();
                (TokenKind::DecimalLiteral, Value::Decimal(v))
            }
            Some(s) if FLOAT_SUFFIXES.contains(&s) => {
                let v = literal.parse::<f64>().unwrap_or_default();
                (TokenKind::FloatLiteral, Value::Float(v))
            }
            Some(_) => match literal.parse::<i64>() {
                Ok(v) => (TokenKind::IntLiteral, Value::Int(v)),
                Err(_) => {
                    self.error("integer literal out of range");
                    (TokenKind::IntLiteral, Value::Int(0))
                }
            },
            None if is_float => {
                let v = literal.parse::<f64>().unwrap_or_default();
                (TokenKind::FloatLiteral, Value::Float(v))
            }
            None => match literal.parse::<i64>() {
                Ok(v) => (TokenKind::IntLiteral, Value::Int(v)),
                Err(_) => {
                    self.error("integer literal out of range");
                    (TokenKind::IntLiteral, Value::Int(0))
                }
            },
        };

        if let Some(unit) = self.try_unit() {
            let numeric = match &value {
                Value::Int(v) => *v as f64,
                Value::Float(v) | Value::Decimal(v) => *v,
                _ => 0.0,
            };
            self.push(
                TokenKind::UnitLiteral,
                Some(Value::Unit(UnitLiteral::new(numeric, unit))),
            );
        } else {
            self.push(kind, Some(value));
        }
    }

    fn digits_into(&mut self, literal: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                literal.push(c);
                self.advance();
            } else if c == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn based_number(&mut self, radix: u32) {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c == '_' {
                self.advance();
            } else if c.is_digit(radix) {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if digits.is_empty() {
            self.error("missing digits in numeric literal");
            self.push(TokenKind::IntLiteral, Some(Value::Int(0)));
            return;
        }
        let _ = self.take_numeric_suffix();
        match i64::from_str_radix(&digits, radix) {
            Ok(v) => self.push(TokenKind::IntLiteral, Some(Value::Int(v))),
            Err(_) => {
                self.error("integer literal out of range");
                self.push(TokenKind::IntLiteral, Some(Value::Int(0)));
            }
        }
    }

    /// Consumes the abutting alphanumeric run when it exactly matches one of
    /// the numeric suffixes; leaves the cursor alone otherwise.
    fn take_numeric_suffix(&mut self) -> Option<&'static str> {
        let mut run = String::new();
        let mut n = 0;
        while let Some(c) = self.peek_at(n) {
            if c.is_ascii_alphanumeric() && run.len() < 6 {
                run.push(c);
                n += 1;
            } else {
                break;
            }
        }
        // A run longer than any suffix is an abutting identifier or unit.
        if matches!(self.peek_at(n), Some(c) if c.is_ascii_alphanumeric()) {
            return None;
        }
        let matched = INTEGER_SUFFIXES
            .iter()
            .chain(FLOAT_SUFFIXES)
            .chain(DECIMAL_SUFFIXES)
            .find(|s| **s == run)?;
        for _ in 0..n {
            self.advance();
        }
        Some(matched)
    }

    /// Attempts to attach a recognised unit after a numeric literal.
    ///
    /// At most one space may intervene; the match is longest-first and must
    /// end at an identifier boundary, so `220 Voltage` attaches nothing.
    fn try_unit(&mut self) -> Option<String> {
        let mut idx = self.current;
        if self.chars.get(idx).map(|&(_, c)| c) == Some(' ') {
            idx += 1;
        }

        let mut candidate = String::new();
        let mut lengths = Vec::new();
        let mut j = idx;
        while let Some(&(_, c)) = self.chars.get(j) {
            if lengths.len() >= units::MAX_UNIT_CHARS {
                break;
            }
            let joins = c.is_alphabetic()
                || matches!(c, '°' | '²' | '³' | '/')
                || (c == ' ' && candidate == "fl");
            if !joins {
                break;
            }
            candidate.push(c);
            lengths.push(j + 1 - idx);
            j += 1;
        }

        while !candidate.is_empty() {
            if units::is_recognized(&candidate) {
                let consumed_chars = idx - self.current + lengths[candidate.chars().count() - 1];
                let after = self.current + consumed_chars;
                let boundary_ok = match self.chars.get(after) {
                    None => true,
                    Some(&(_, c)) => !symbols::continues_identifier(c),
                };
                if boundary_ok {
                    for _ in 0..consumed_chars {
                        self.advance();
                    }
                    return Some(candidate);
                }
            }
            candidate.pop();
        }
        None
    }

    // ------------------------------------------------------------------
    // Strings and characters
    // ------------------------------------------------------------------

    fn string(&mut self, dollar_prefixed: bool) {
        let mut content = String::new();
        let mut is_interpolated = dollar_prefixed;
        let mut depth = 0usize;

        loop {
            match self.peek() {
                None => {
                    self.error("unterminated string literal");
                    break;
                }
                Some('"') if depth == 0 => {
                    self.advance();
                    break;
                }
                Some('\\') if depth == 0 => {
                    self.advance();
                    match self.peek() {
                        None => {
                            self.error("unterminated string literal");
                            break;
                        }
                        Some(e) => {
                            self.advance();
                            match e {
                                'n' => content.push('\n'),
                                't' => content.push('\t'),
                                'r' => content.push('\r'),
                                '\\' => content.push('\\'),
                                '"' => content.push('"'),
                                '\'' => content.push('\''),
                                '0' => content.push('\0'),
                                // Unrecognised escapes keep both characters.
                                other => {
                                    content.push('\\');
                                    content.push(other);
                                }
                            }
                        }
                    }
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    is_interpolated = true;
                    depth += 1;
                    content.push('$');
                    content.push('{');
                    self.advance();
                    self.advance();
                }
                Some('}') if depth > 0 => {
                    depth -= 1;
                    content.push('}');
                    self.advance();
                }
                Some('"') if depth > 0 => {
                    // A nested string inside an interpolation; copied verbatim
                    // so its braces and quotes cannot end the outer literal.
                    content.push('"');
                    self.advance();
                    loop {
                        match self.peek() {
                            None => {
                                self.error("unterminated string literal");
                                return;
                            }
                            Some('\\') => {
                                content.push('\\');
                                self.advance();
                                if let Some(c) = self.peek() {
                                    content.push(c);
                                    self.advance();
                                }
                            }
                            Some('"') => {
                                content.push('"');
                                self.advance();
                                break;
                            }
                            Some(c) => {
                                content.push(c);
                                self.advance();
                            }
                        }
                    }
                }
                Some(c) => {
                    content.push(c);
                    self.advance();
                }
            }
        }

        let sym = self.interner.intern(&content);
        let kind = if is_interpolated {
            TokenKind::InterpolatedString
        } else {
            TokenKind::StringLiteral
        };
        self.push(kind, Some(Value::Str(sym)));
    }

    fn char_literal(&mut self) {
        let c = match self.peek() {
            None => {
                self.error("unterminated character literal");
                return;
            }
            Some('\'') => {
                self.advance();
                self.error("empty character literal");
                return;
            }
            Some('\\') => {
                self.advance();
                match self.peek() {
                    None => {
                        self.error("unterminated character literal");
                        return;
                    }
                    Some(e) => {
                        self.advance();
                        match e {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '\\' => '\\',
                            '\'' => '\'',
                            '"' => '"',
                            '0' => '\0',
                            other => other,
                        }
                    }
                }
            }
            Some(c) => {
                self.advance();
                c
            }
        };
        if !self.match_char('\'') {
            self.error("unterminated character literal");
        }
        self.push(TokenKind::CharLiteral, Some(Value::Char(c)));
    }

    // ------------------------------------------------------------------
    // Identifiers and keywords
    // ------------------------------------------------------------------

    fn identifier(&mut self) {
        self.consume_identifier_tail();
        let text = self.text(self.start, self.current);
        match keyword_kind(text) {
            Some(kind) => {
                let value = match kind {
                    TokenKind::True => Some(Value::Bool(true)),
                    TokenKind::False => Some(Value::Bool(false)),
                    TokenKind::Null => Some(Value::Null),
                    TokenKind::NoneLiteral => Some(Value::None),
                    _ => None,
                };
                self.push(kind, value);
            }
            None => self.push(TokenKind::Identifier, None),
        }
    }

    fn consume_identifier_tail(&mut self) {
        while let Some(c) = self.peek() {
            if symbols::continues_identifier(c) {
                self.advance();
            } else if c == '\''
                && self.level == SyntaxLevel::High
                && matches!(self.peek_at(1), Some(n) if n.is_ascii_alphabetic())
            {
                // High-level possessive: John's stays one identifier.
                self.advance();
                self.advance();
            } else {
                break;
            }
        }
    }

    // ------------------------------------------------------------------
    // Unicode compounds
    // ------------------------------------------------------------------

    fn unicode(&mut self, first: char) {
        // Operator folds: one spelling per operator for the parser.
        match first {
            '≤' => return self.push(TokenKind::LessEqual, None),
            '≥' => return self.push(TokenKind::GreaterEqual, None),
            '≠' => return self.push(TokenKind::NotEqual, None),
            '→' => return self.push(TokenKind::Arrow, None),
            _ => {}
        }

        let mut compound = String::new();
        compound.push(first);
        while let Some(c) = self.peek() {
            if symbols::is_compound_part(c) {
                compound.push(c);
                self.advance();
            } else {
                break;
            }
        }

        if let Some(sym) = MathSymbol::from_compound(&compound) {
            self.push(TokenKind::Math(sym), None);
            return;
        }

        // Compound abutting ASCII identifier characters is promoted to an
        // identifier, as is any multi-character compound (`σ²`).
        let abuts_identifier =
            matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_');
        if abuts_identifier {
            self.consume_identifier_tail();
            self.push(TokenKind::Identifier, None);
            return;
        }
        if compound.chars().count() > 1 {
            self.push(TokenKind::Identifier, None);
            return;
        }

        if let Some(letter) = GreekLetter::from_char(first) {
            self.push(TokenKind::Greek(letter), None);
            return;
        }

        self.error(format!("unrecognised character '{first}'"));
    }

    // ------------------------------------------------------------------
    // `@` and `#` forms
    // ------------------------------------------------------------------

    fn at_sign(&mut self) {
        if !matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.push(TokenKind::At, None);
            return;
        }
        let name_start = self.current;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        let name = self.text(name_start, self.current).to_string();

        if let Some(level) = SyntaxLevel::from_pragma(&name) {
            self.level = level;
            self.push(TokenKind::LevelPragma(level), None);
        } else if let Some(tag) = AttributeTag::from_name(&name) {
            self.push(TokenKind::Attribute(tag), None);
        } else {
            // Unknown tag: emit the bare `@`; the name lexes as an identifier.
            self.current = name_start;
            self.column = self.start_column + 1;
            self.push(TokenKind::At, None);
        }
    }

    fn hash(&mut self) {
        let name_start = self.current;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphabetic()) {
            self.advance();
        }
        let name = self.text(name_start, self.current);
        if name == "region" || name == "endregion" {
            while !self.at_end() && self.peek() != Some('\n') {
                self.advance();
            }
        } else {
            self.current = name_start;
            self.column = self.start_column + 1;
            self.push(TokenKind::Hash, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (Vec<Token>, Diagnostics, Interner) {
        let mut interner = Interner::new();
        let mut sink = Diagnostics::new("test.ob");
        let tokens = Lexer::new(source, "test.ob", &mut interner, &mut sink).tokenize();
        (tokens, sink, interner)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn unit_literal_is_one_token() {
        let (tokens, sink, _) = lex("220 V");
        assert!(sink.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::UnitLiteral);
        assert_eq!(tokens[0].column, 1);
        assert_eq!(
            tokens[0].value,
            Some(Value::Unit(UnitLiteral::new(220.0, "V")))
        );
        assert_eq!(tokens[1].kind, TokenKind::EndOfFile);
    }

    #[test]
    fn greek_superscript_identifier() {
        let (tokens, sink, interner) = lex("σ² = 1.0");
        assert!(sink.is_empty());
        assert_eq!(
            kinds(&tokens),
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
    fn lone_greek_letter_is_greek_token() {
        let (tokens, _, _) = lex("σ + τ");
        assert_eq!(tokens[0].kind, TokenKind::Greek(GreekLetter::Sigma));
        assert_eq!(tokens[2].kind, TokenKind::Greek(GreekLetter::Tau));
    }

    #[test]
    fn math_symbols_lex_individually() {
        let (tokens, _, _) = lex("∂ ∑ ∈");
        assert_eq!(tokens[0].kind, TokenKind::Math(MathSymbol::PartialDerivative));
        assert_eq!(tokens[1].kind, TokenKind::Math(MathSymbol::Sum));
        assert_eq!(tokens[2].kind, TokenKind::Math(MathSymbol::ElementOf));
    }

    #[test]
    fn unicode_comparison_folds_to_operator() {
        let (tokens, _, _) = lex("a ≤ b ≠ c");
        assert_eq!(tokens[1].kind, TokenKind::LessEqual);
        assert_eq!(tokens[3].kind, TokenKind::NotEqual);
    }

    #[test]
    fn abutting_integer_divide() {
        let (tokens, _, _) = lex("7//2");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::IntLiteral,
                TokenKind::IntegerDivide,
                TokenKind::IntLiteral,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn spaced_double_slash_is_comment() {
        let (tokens, _, _) = lex("x = 1 // trailing note\ny");
        let ks = kinds(&tokens);
        assert!(!ks.contains(&TokenKind::IntegerDivide));
        assert_eq!(ks[3], TokenKind::Identifier); // y survives on the next line
    }

    #[test]
    fn block_comment_is_skipped() {
        let (tokens, sink, _) = lex("a /* ignore\nme */ b");
        assert!(sink.is_empty());
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_block_comment_reports() {
        let (_, sink, _) = lex("a /* never closed");
        assert!(sink.has_errors());
    }

    #[test]
    fn operators_match_longest_first() {
        let (tokens, _, _) = lex("**= ** <<= << <=> <= ??= ?? ?. ... .. .");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::PowerAssign,
                TokenKind::Power,
                TokenKind::ShlAssign,
                TokenKind::Shl,
                TokenKind::Spaceship,
                TokenKind::LessEqual,
                TokenKind::CoalesceAssign,
                TokenKind::Coalesce,
                TokenKind::QuestionDot,
                TokenKind::Ellipsis,
                TokenKind::DotDot,
                TokenKind::Dot,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn fraction_after_assign_but_member_after_identifier() {
        let (tokens, _, _) = lex("x = .5");
        assert_eq!(tokens[2].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[2].value, Some(Value::Float(0.5)));

        let (tokens, _, _) = lex("t.0");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(tokens[2].kind, TokenKind::IntLiteral);
    }

    #[test]
    fn based_literals_and_separators() {
        let (tokens, _, _) = lex("0xFF 0o17 0b1010 1_000_000");
        assert_eq!(tokens[0].value, Some(Value::Int(255)));
        assert_eq!(tokens[1].value, Some(Value::Int(15)));
        assert_eq!(tokens[2].value, Some(Value::Int(10)));
        assert_eq!(tokens[3].value, Some(Value::Int(1_000_000)));
    }

    #[test]
    fn numeric_suffixes() {
        let (tokens, _, _) = lex("10u32 3f 2.5d 4m 7UL");
        assert_eq!(tokens[0].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[1].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[2].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[3].kind, TokenKind::DecimalLiteral);
        assert_eq!(tokens[4].kind, TokenKind::IntLiteral);
    }

    #[test]
    fn abutting_unit_without_space() {
        let (tokens, _, _) = lex("5km");
        assert_eq!(tokens[0].kind, TokenKind::UnitLiteral);
        assert_eq!(
            tokens[0].value,
            Some(Value::Unit(UnitLiteral::new(5.0, "km")))
        );
    }

    #[test]
    fn compound_unit_with_superscript() {
        let (tokens, _, _) = lex("9.8 m/s²");
        assert_eq!(
            tokens[0].value,
            Some(Value::Unit(UnitLiteral::new(9.8, "m/s²")))
        );
    }

    #[test]
    fn unit_requires_identifier_boundary() {
        let (tokens, _, _) = lex("220 Voltage");
        assert_eq!(tokens[0].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn string_escapes() {
        let (tokens, _, interner) = lex(r#""a\tb\qc""#);
        let Some(Value::Str(sym)) = tokens[0].value else {
            panic!("expected string value");
        };
        // \t decodes; \q is unrecognised and keeps both characters.
        assert_eq!(interner.resolve(sym), "a\tb\\qc");
    }

    #[test]
    fn interpolated_string_detection() {
        let (tokens, _, _) = lex(r#"$"x = ${x}" "plain" "v: ${v}""#);
        assert_eq!(tokens[0].kind, TokenKind::InterpolatedString);
        assert_eq!(tokens[1].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[2].kind, TokenKind::InterpolatedString);
    }

    #[test]
    fn interpolation_braces_respect_nested_strings() {
        let (tokens, sink, _) = lex(r#""${lookup("}")}" next"#);
        assert!(sink.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::InterpolatedString);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
    }

    #[test]
    fn unterminated_string_reports_and_scanning_continues() {
        let (tokens, sink, _) = lex("\"open");
        assert!(sink.has_errors());
        assert_eq!(tokens.last().unwrap().kind, TokenKind::EndOfFile);
    }

    #[test]
    fn char_literals() {
        let (tokens, _, _) = lex(r"'a' '\n'");
        assert_eq!(tokens[0].value, Some(Value::Char('a')));
        assert_eq!(tokens[1].value, Some(Value::Char('\n')));
    }

    #[test]
    fn level_pragma_switches_level() {
        let (tokens, _, _) = lex("@medium x @high y");
        assert_eq!(tokens[0].kind, TokenKind::LevelPragma(SyntaxLevel::Medium));
        assert_eq!(tokens[1].level, SyntaxLevel::Medium);
        assert_eq!(tokens[3].level, SyntaxLevel::High);
    }

    #[test]
    fn possessive_apostrophe_in_high_level() {
        let (tokens, _, interner) = lex("@high John's");
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(interner.resolve(tokens[1].lexeme), "John's");
    }

    #[test]
    fn attribute_and_unknown_at() {
        let (tokens, _, interner) = lex("@inline @warp");
        assert_eq!(tokens[0].kind, TokenKind::Attribute(AttributeTag::Inline));
        assert_eq!(tokens[1].kind, TokenKind::At);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(interner.resolve(tokens[2].lexeme), "warp");
    }

    #[test]
    fn region_directives_consume_the_line() {
        let (tokens, _, _) = lex("#region setup\nx\n#endregion\ny # z");
        let ks = kinds(&tokens);
        assert_eq!(
            ks,
            vec![
                TokenKind::Identifier, // x
                TokenKind::Identifier, // y
                TokenKind::Hash,
                TokenKind::Identifier, // z
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn keywords_across_levels() {
        let (tokens, _, _) = lex("repeat otherwise lim approaches while");
        assert_eq!(
            kinds(&tokens)[..5],
            [
                TokenKind::Repeat,
                TokenKind::Otherwise,
                TokenKind::Lim,
                TokenKind::Approaches,
                TokenKind::While,
            ]
        );
    }

    #[test]
    fn unrecognised_character_recovers() {
        let (tokens, sink, _) = lex("a ¢ b");
        assert!(sink.has_errors());
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn tokens_stay_on_code_point_boundaries() {
        let source = "σ² = \"héllo\" + 1.5µs";
        let (tokens, _, _) = lex(source);
        for token in &tokens {
            assert!(source.is_char_boundary(token.span.start));
            assert!(source.is_char_boundary(token.span.end));
            assert!(token.span.end <= source.len());
        }
    }

    #[test]
    fn line_and_column_tracking() {
        let (tokens, _, _) = lex("a\n  b");
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }
}
