//! The lexical scope stack used during type checking.
//!
//! Scopes form a parent chain: lookup walks outward from the innermost
//! scope, definition fails when the innermost scope already binds the name.
//! The global scope is pushed at construction and never popped.
//!
//! Type aliases and module aliases live in flat side maps on the table;
//! both are append-only within a compilation unit.

use std::collections::HashMap;

use ouroboros_base::Symbol;

use crate::types::Type;

/// What kind of thing a name is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingKind {
    Variable,
    Function,
}

/// One name bound in a scope.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: Symbol,
    pub ty: Type,
    pub kind: BindingKind,
    pub is_global: bool,
    /// Slot index: global index in the global scope, local index otherwise.
    pub index: usize,
    pub is_const: bool,
    pub mutable: bool,
}

/// The error returned when the innermost scope already binds a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyDefined;

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<HashMap<Symbol, Binding>>,
    globals_allocated: usize,
    locals_allocated: usize,
    type_aliases: HashMap<Symbol, Type>,
    module_aliases: HashMap<Symbol, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![HashMap::new()],
            globals_allocated: 0,
            locals_allocated: 0,
            type_aliases: HashMap::new(),
            module_aliases: HashMap::new(),
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pops the innermost scope. The global scope stays.
    pub fn exit_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn at_global_scope(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Resets the local slot counter; called per function body so locals
    /// index from zero within each frame.
    pub fn begin_frame(&mut self) -> usize {
        std::mem::replace(&mut self.locals_allocated, 0)
    }

    pub fn end_frame(&mut self, saved: usize) {
        self.locals_allocated = saved;
    }

    /// Binds `name` in the innermost scope, assigning the next slot index.
    pub fn define(
        &mut self,
        name: Symbol,
        ty: Type,
        kind: BindingKind,
        is_const: bool,
        mutable: bool,
    ) -> Result<(), AlreadyDefined> {
        let is_global = self.at_global_scope();
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        if scope.contains_key(&name) {
            return Err(AlreadyDefined);
        }
        let index = if is_global {
            let i = self.globals_allocated;
            self.globals_allocated += 1;
            i
        } else {
            let i = self.locals_allocated;
            self.locals_allocated += 1;
            i
        };
        scope.insert(
            name,
            Binding {
                name,
                ty,
                kind,
                is_global,
                index,
                is_const,
                mutable,
            },
        );
        Ok(())
    }

    /// Walks the scope chain outward for `name`.
    pub fn lookup(&self, name: Symbol) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name))
    }

    /// Every name visible from the current scope, innermost first.
    ///
    /// Feeds the did-you-mean suggestion search.
    pub fn visible_names(&self) -> Vec<Symbol> {
        let mut seen = Vec::new();
        for scope in self.scopes.iter().rev() {
            for name in scope.keys() {
                if !seen.contains(name) {
                    seen.push(*name);
                }
            }
        }
        seen
    }

    pub fn define_type_alias(&mut self, name: Symbol, target: Type) {
        self.type_aliases.insert(name, target);
    }

    pub fn type_alias(&self, name: Symbol) -> Option<&Type> {
        self.type_aliases.get(&name)
    }

    pub fn define_module_alias(&mut self, name: Symbol, target: Symbol) {
        self.module_aliases.insert(name, target);
    }

    pub fn module_alias(&self, name: Symbol) -> Option<Symbol> {
        self.module_aliases.get(&name).copied()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
