//! Contract extraction from function bodies.
//!
//! `requires(e)`, `ensures(e)`, and `invariant(e)` statements at the start
//! of a function body form the function's contract. They are extracted into
//! a [`ContractContext`] before the body is checked; the statements
//! themselves have no runtime effect at this stage — consumers (the
//! verifier, codegen) decide what to do with them.
//!
//! Contexts stack per nested function: an inner function's contract never
//! leaks into the enclosing one.

use crate::ast::{Stmt, StmtKind};
use crate::ast::Expr;

/// The three ordered contract clause lists of one function.
#[derive(Debug, Default)]
pub struct ContractContext<'a> {
    pub requires: Vec<&'a Expr<'a>>,
    pub ensures: Vec<&'a Expr<'a>>,
    pub invariants: Vec<&'a Expr<'a>>,
}

impl<'a> ContractContext<'a> {
    pub fn is_empty(&self) -> bool {
        self.requires.is_empty() && self.ensures.is_empty() && self.invariants.is_empty()
    }

    /// Every clause in extraction order, for uniform bool-typing checks.
    pub fn clauses(&self) -> impl Iterator<Item = &'a Expr<'a>> + '_ {
        self.requires
            .iter()
            .chain(&self.ensures)
            .chain(&self.invariants)
            .copied()
    }
}

/// Splits a function body into its contract prefix and the remaining
/// statements.
///
/// Extraction stops at the first non-contract statement; contract
/// statements appearing later in the body are left in place (and the
/// checker rejects them there).
pub fn extract<'a>(body: &'a [Stmt<'a>]) -> (ContractContext<'a>, &'a [Stmt<'a>]) {
    let mut context = ContractContext::default();
    let mut rest = body;
    for (i, stmt) in body.iter().enumerate() {
        match &stmt.kind {
            StmtKind::Requires(e) => context.requires.push(e),
            StmtKind::Ensures(e) => context.ensures.push(e),
            StmtKind::Invariant(e) => context.invariants.push(e),
            _ => {
                rest = &body[i..];
                return (context, rest);
            }
        }
        rest = &body[i + 1..];
    }
    (context, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprKind;
    use ouroboros_base::{Arena, Pos};

    fn bool_expr<'a>(arena: &'a Arena<Expr<'a>>, value: bool) -> &'a Expr<'a> {
        arena.alloc(Expr {
            kind: ExprKind::Bool(value),
            pos: Pos::new(1, 1),
        })
    }

    #[test]
    fn extracts_leading_clauses_in_order() {
        let exprs: Arena<Expr> = Arena::new();
        let stmts: Arena<Stmt> = Arena::new();
        let body = stmts.alloc_slice(vec![
            Stmt {
                kind: StmtKind::Requires(bool_expr(&exprs, true)),
                pos: Pos::new(1, 1),
            },
            Stmt {
                kind: StmtKind::Ensures(bool_expr(&exprs, true)),
                pos: Pos::new(2, 1),
            },
            Stmt {
                kind: StmtKind::Return { value: None },
                pos: Pos::new(3, 1),
            },
        ]);
        let (context, rest) = extract(body);
        assert_eq!(context.requires.len(), 1);
        assert_eq!(context.ensures.len(), 1);
        assert!(context.invariants.is_empty());
        assert_eq!(rest.len(), 1);
    }

    #[test]
    fn extraction_stops_at_first_ordinary_statement() {
        let exprs: Arena<Expr> = Arena::new();
        let stmts: Arena<Stmt> = Arena::new();
        let body = stmts.alloc_slice(vec![
            Stmt {
                kind: StmtKind::Return { value: None },
                pos: Pos::new(1, 1),
            },
            Stmt {
                kind: StmtKind::Requires(bool_expr(&exprs, true)),
                pos: Pos::new(2, 1),
            },
        ]);
        let (context, rest) = extract(body);
        assert!(context.is_empty());
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn empty_body_yields_empty_context() {
        let (context, rest) = extract(&[]);
        assert!(context.is_empty());
        assert!(rest.is_empty());
    }
}
