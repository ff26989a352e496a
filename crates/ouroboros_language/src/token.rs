//! Token types for the Ouroboros lexer and parser.
//!
//! Tokens are the atomic syntactic units produced by the lexer and consumed
//! by the parser. Every token records where it came from (span, line,
//! column, file) and which [`SyntaxLevel`] was active when it was scanned.
//!
//! ## Token Categories
//!
//! | Category | Examples | Payload |
//! |----------|----------|---------|
//! | Literals | `42`, `1.5`, `"hi"`, `220 V` | [`Value`] |
//! | Keywords | `if`, `repeat`, `otherwise`, `lim` | — |
//! | Operators | `**=`, `<=>`, `??`, `//` | — |
//! | Attributes | `@inline`, `@gpu`, `@contract` | [`AttributeTag`] |
//! | Greek letters | `α`, `Ω` | [`symbols::GreekLetter`] |
//! | Math symbols | `∂`, `∑`, `∈` | [`symbols::MathSymbol`] |
//!
//! [`symbols::GreekLetter`]: crate::symbols::GreekLetter
//! [`symbols::MathSymbol`]: crate::symbols::MathSymbol

use ouroboros_base::{Span, Symbol};

use crate::symbols::{GreekLetter, MathSymbol};
use crate::units::UnitLiteral;

/// The syntax stratum active at a point in the source.
///
/// Selected by the `@high` / `@medium` / `@low` / `@asm` pragmas and carried
/// on every token. The lexer's own heuristics (possessive apostrophes,
/// natural-language keywords) key off it; the parser may refuse constructs
/// inappropriate to the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyntaxLevel {
    /// Natural-language surface syntax.
    High,
    /// Conventional curly-brace syntax.
    #[default]
    Medium,
    /// Hardware-adjacent syntax.
    Low,
    /// Inline assembly blocks.
    Assembly,
}

impl SyntaxLevel {
    /// Maps a pragma name (`@high`, `@asm`, …) to its level.
    pub fn from_pragma(name: &str) -> Option<SyntaxLevel> {
        match name {
            "high" => Some(SyntaxLevel::High),
            "medium" => Some(SyntaxLevel::Medium),
            "low" => Some(SyntaxLevel::Low),
            "asm" => Some(SyntaxLevel::Assembly),
            _ => None,
        }
    }
}

/// The literal payload of a token, present for literal kinds only.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Decimal(f64),
    Str(Symbol),
    Char(char),
    Bool(bool),
    Null,
    None,
    Unit(UnitLiteral),
}

/// `@`-prefixed attribute tags recognised by the lexer.
///
/// Unknown `@name` forms are not an error; they lex as an `At` token
/// followed by an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeTag {
    Inline,
    NoInline,
    Gpu,
    Kernel,
    Simd,
    Parallel,
    Contract,
    Shader,
    Verified,
    Pure,
    Deprecated,
    Test,
    Benchmark,
    Async,
    Atomic,
    Volatile,
    Packed,
    Aligned,
    Export,
    Import,
    Extern,
    Unsafe,
    Safe,
    Hot,
    Cold,
    Likely,
    Unlikely,
    TailCall,
    Memoize,
    Cache,
    Profile,
    Trace,
    Debug,
    Release,
    Optimize,
    NoOptimize,
    Vectorize,
    Unroll,
    NoUnroll,
    Prefetch,
    Native,
    Intrinsic,
    Override,
    Virtual,
    Abstract,
    Sealed,
    Serializable,
    Component,
    System,
    Entity,
    Event,
    Handler,
    Route,
    Get,
    Post,
    Middleware,
    Auth,
    Validate,
    Transaction,
    Main,
}

impl AttributeTag {
    /// Looks up the tag for an `@name` spelling.
    pub fn from_name(name: &str) -> Option<AttributeTag> {
        use AttributeTag::*;
        let tag = match name {
            "inline" => Inline,
            "noinline" => NoInline,
            "gpu" => Gpu,
            "kernel" => Kernel,
            "simd" => Simd,
            "parallel" => Parallel,
            "contract" => Contract,
            "shader" => Shader,
            "verified" => Verified,
            "pure" => Pure,
            "deprecated" => Deprecated,
            "test" => Test,
            "benchmark" => Benchmark,
            "async" => Async,
            "atomic" => Atomic,
            "volatile" => Volatile,
            "packed" => Packed,
            "aligned" => Aligned,
            "export" => Export,
            "import" => Import,
            "extern" => Extern,
            "unsafe" => Unsafe,
            "safe" => Safe,
            "hot" => Hot,
            "cold" => Cold,
            "likely" => Likely,
            "unlikely" => Unlikely,
            "tailcall" => TailCall,
            "memoize" => Memoize,
            "cache" => Cache,
            "profile" => Profile,
            "trace" => Trace,
            "debug" => Debug,
            "release" => Release,
            "optimize" => Optimize,
            "nooptimize" => NoOptimize,
            "vectorize" => Vectorize,
            "unroll" => Unroll,
            "nounroll" => NoUnroll,
            "prefetch" => Prefetch,
            "native" => Native,
            "intrinsic" => Intrinsic,
            "override" => Override,
            "virtual" => Virtual,
            "abstract" => Abstract,
            "sealed" => Sealed,
            "serializable" => Serializable,
            "component" => Component,
            "system" => System,
            "entity" => Entity,
            "event" => Event,
            "handler" => Handler,
            "route" => Route,
            "get" => Get,
            "post" => Post,
            "middleware" => Middleware,
            "auth" => Auth,
            "validate" => Validate,
            "transaction" => Transaction,
            "main" => Main,
            _ => return Option::None,
        };
        Some(tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    IntLiteral,
    FloatLiteral,
    DecimalLiteral,
    StringLiteral,
    InterpolatedString,
    CharLiteral,
    UnitLiteral,
    True,
    False,
    Null,
    NoneLiteral,

    Identifier,

    // Declaration keywords
    Let,
    Var,
    Const,
    Func,
    Class,
    Struct,
    Interface,
    Enum,
    Namespace,
    TypeAlias,
    Module,
    Import,
    Using,
    Component,
    System,
    Entity,

    // Control flow
    If,
    Else,
    While,
    Do,
    For,
    Foreach,
    In,
    Break,
    Continue,
    Return,
    Match,
    Case,
    Default,
    Try,
    Catch,
    Finally,
    Throw,

    // Modifiers
    Static,
    Public,
    Private,
    Protected,
    Async,
    Await,
    Yield,
    New,
    This,
    As,
    Is,

    // Contract keywords
    Requires,
    Ensures,
    Invariant,

    // Multi-level / natural-language keywords
    Repeat,
    Iterate,
    Forever,
    Print,
    Taking,
    Through,
    From,
    To,
    Each,
    Otherwise,
    Lim,
    Origin,
    Means,
    Approaches,

    // Arithmetic operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    IntegerDivide,

    // Assignment operators
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    PowerAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,
    CoalesceAssign,

    // Increment / decrement
    Increment,
    Decrement,

    // Comparison
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Spaceship,

    // Logical / bitwise
    AndAnd,
    OrOr,
    Bang,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,

    // Null handling
    Question,
    Coalesce,
    QuestionDot,

    // Arrows
    Arrow,
    FatArrow,

    // Punctuation
    Dot,
    DotDot,
    Ellipsis,
    Comma,
    Colon,
    ColonColon,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // Unicode families
    Greek(GreekLetter),
    Math(MathSymbol),

    // `@` forms
    Attribute(AttributeTag),
    LevelPragma(SyntaxLevel),
    At,
    Hash,

    EndOfFile,
}

impl TokenKind {
    /// Whether a token of this kind can end an expression.
    ///
    /// Drives two lexer disambiguations: `//` as integer division versus a
    /// comment, and `.5` as a fractional literal versus member access.
    pub fn ends_expression(self) -> bool {
        matches!(
            self,
            TokenKind::IntLiteral
                | TokenKind::FloatLiteral
                | TokenKind::DecimalLiteral
                | TokenKind::UnitLiteral
                | TokenKind::StringLiteral
                | TokenKind::CharLiteral
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Identifier
                | TokenKind::This
                | TokenKind::RParen
                | TokenKind::RBracket
        )
    }
}

/// One lexed token.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// The source text of the token, interned.
    pub lexeme: Symbol,
    /// Literal payload; `None` for non-literal kinds.
    pub value: Option<Value>,
    /// 1-based source line of the first character.
    pub line: u32,
    /// 1-based source column of the first character, counted in code points.
    pub column: u32,
    /// Byte range in the source.
    pub span: Span,
    /// The file this token was scanned from, interned.
    pub file: Symbol,
    /// The syntax level active when the token was scanned.
    pub level: SyntaxLevel,
}

/// Maps an identifier spelling to its keyword kind, if it is one.
///
/// The map is level-independent; the parser decides which keywords are
/// meaningful at which level.
pub fn keyword_kind(text: &str) -> Option<TokenKind> {
    use TokenKind::*;
    let kind = match text {
        "true" => True,
        "false" => False,
        "null" => Null,
        "none" => NoneLiteral,
        "let" => Let,
        "var" => Var,
        "const" => Const,
        "func" | "fn" => Func,
        "class" => Class,
        "struct" => Struct,
        "interface" => Interface,
        "enum" => Enum,
        "namespace" => Namespace,
        "type" => TypeAlias,
        "module" => Module,
        "import" => Import,
        "using" => Using,
        "component" => Component,
        "system" => System,
        "entity" => Entity,
        "if" => If,
        "else" => Else,
        "while" => While,
        "do" => Do,
        "for" => For,
        "foreach" => Foreach,
        "in" => In,
        "break" => Break,
        "continue" => Continue,
        "return" => Return,
        "match" => Match,
        "case" => Case,
        "default" => Default,
        "try" => Try,
        "catch" => Catch,
        "finally" => Finally,
        "throw" => Throw,
        "static" => Static,
        "public" => Public,
        "private" => Private,
        "protected" => Protected,
        "async" => Async,
        "await" => Await,
        "yield" => Yield,
        "new" => New,
        "this" => This,
        "as" => As,
        "is" => Is,
        "requires" => Requires,
        "ensures" => Ensures,
        "invariant" => Invariant,
        "repeat" => Repeat,
        "iterate" => Iterate,
        "forever" => Forever,
        "print" => Print,
        "taking" => Taking,
        "through" => Through,
        "from" => From,
        "to" => To,
        "each" => Each,
        "otherwise" => Otherwise,
        "lim" => Lim,
        "origin" => Origin,
        "means" => Means,
        "approaches" => Approaches,
        _ => return Option::None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_map_covers_multi_level_words() {
        assert_eq!(keyword_kind("repeat"), Some(TokenKind::Repeat));
        assert_eq!(keyword_kind("otherwise"), Some(TokenKind::Otherwise));
        assert_eq!(keyword_kind("approaches"), Some(TokenKind::Approaches));
        assert_eq!(keyword_kind("velocity"), None);
    }

    #[test]
    fn fn_and_func_are_the_same_keyword() {
        assert_eq!(keyword_kind("fn"), keyword_kind("func"));
    }

    #[test]
    fn pragma_names_map_to_levels() {
        assert_eq!(SyntaxLevel::from_pragma("high"), Some(SyntaxLevel::High));
        assert_eq!(SyntaxLevel::from_pragma("asm"), Some(SyntaxLevel::Assembly));
        assert_eq!(SyntaxLevel::from_pragma("hi"), None);
    }

    #[test]
    fn attribute_lookup_is_exact() {
        assert_eq!(AttributeTag::from_name("inline"), Some(AttributeTag::Inline));
        assert_eq!(AttributeTag::from_name("gpu"), Some(AttributeTag::Gpu));
        assert_eq!(AttributeTag::from_name("warp"), None);
    }

    #[test]
    fn ends_expression_distinguishes_receivers() {
        assert!(TokenKind::Identifier.ends_expression());
        assert!(TokenKind::RParen.ends_expression());
        assert!(!TokenKind::Assign.ends_expression());
        assert!(!TokenKind::Comma.ends_expression());
    }
}
