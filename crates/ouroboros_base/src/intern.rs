//! String interning.
//!
//! Identifiers, keywords, unit names, and file names are compared constantly
//! during lexing and type checking. Interning stores each distinct string
//! once and hands out a [`Symbol`]: a `Copy` integer handle — so every
//! comparison afterwards is a single integer equality instead of a string
//! walk.
//!
//! ```
//! use ouroboros_base::Interner;
//!
//! let mut interner = Interner::new();
//! let sigma = interner.intern("σ²");
//! assert_eq!(sigma, interner.intern("σ²"));
//! assert_eq!(interner.resolve(sigma), "σ²");
//! ```

use std::collections::HashMap;

/// A handle to an interned string.
///
/// Symbols created by different [`Interner`]s are not interchangeable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Symbol(u32);

impl Symbol {
    /// The empty string, pre-interned at index 0 in every interner.
    pub const EMPTY: Symbol = Symbol(0);

    /// The raw index, usable for dense side tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Stores each distinct string once and resolves [`Symbol`]s back to text.
#[derive(Debug, Default)]
pub struct Interner {
    lookup: HashMap<String, Symbol>,
    strings: Vec<String>,
}

impl Interner {
    /// Creates an interner containing only the empty string.
    pub fn new() -> Self {
        let mut this = Interner {
            lookup: HashMap::new(),
            strings: Vec::new(),
        };
        this.strings.push(String::new());
        this.lookup.insert(String::new(), Symbol::EMPTY);
        this
    }

    /// Interns `text`, returning the existing symbol if it was seen before.
    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(&sym) = self.lookup.get(text) {
            return sym;
        }
        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(text.to_string());
        self.lookup.insert(text.to_string(), sym);
        sym
    }

    /// Returns the text behind `sym`.
    ///
    /// # Panics
    ///
    /// Panics if `sym` came from a different interner.
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.index()]
    }

    /// Looks up a string without interning it.
    pub fn get(&self, text: &str) -> Option<Symbol> {
        self.lookup.get(text).copied()
    }

    /// Number of distinct strings held, counting the pre-interned empty one.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether only the empty string has been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }

    /// Iterates over every interned string with its symbol.
    ///
    /// The type checker uses this for did-you-mean searches over in-scope
    /// names.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (Symbol(i as u32), s.as_str()))
    }
}
