//! The semantic type checker.
//!
//! A type-returning traversal over the AST: every expression yields its
//! inferred type, statements yield none, declarations introduce bindings
//! into the current scope. Errors are collected — the walk never stops
//! early — and surfaced as one [`TypeCheckError`] carrying the whole list in
//! source order.
//!
//! Diagnostics aim to be actionable: undefined identifiers run a
//! Levenshtein search (distance ≤ 2) over every in-scope name and suggest
//! the closest match.

use ouroboros_base::{Diagnostic, Diagnostics, Interner, Pos, Symbol};

use crate::ast::{
    BinaryOp, Expr, ExprKind, FunctionDecl, Program, Stmt, StmtKind, TypeExpr, TypeExprKind,
    UnaryOp,
};
use crate::contracts::{self, ContractContext};
use crate::scope::{BindingKind, SymbolTable};
use crate::types::{primitive, Type};
use crate::unify;

/// The checker's failure value: the collected diagnostics of one run.
#[derive(Debug)]
pub struct TypeCheckError {
    pub diagnostics: Vec<Diagnostic>,
}

impl std::fmt::Display for TypeCheckError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "type checking failed with {} diagnostic(s)",
            self.diagnostics.len()
        )
    }
}

impl std::error::Error for TypeCheckError {}

/// What a successful check hands back to consumers.
#[derive(Debug)]
pub struct Analysis<'a> {
    /// Extracted contracts per function, in source order.
    pub contracts: Vec<(Symbol, ContractContext<'a>)>,
    /// Non-error diagnostics (warnings, hints) from the run.
    pub diagnostics: Vec<Diagnostic>,
}

pub struct TypeChecker<'a> {
    interner: &'a Interner,
    table: SymbolTable,
    sink: Diagnostics,
    /// Return types of enclosing functions, innermost last.
    return_types: Vec<Type>,
    contracts: Vec<(Symbol, ContractContext<'a>)>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(interner: &'a Interner, file: &str) -> Self {
        TypeChecker {
            interner,
            table: SymbolTable::new(),
            sink: Diagnostics::new(file),
            return_types: Vec::new(),
            contracts: Vec::new(),
        }
    }

    /// Checks a whole program, returning the analysis or every diagnostic.
    pub fn check_program(mut self, program: &Program<'a>) -> Result<Analysis<'a>, TypeCheckError> {
        self.predeclare_functions(program.stmts);
        for stmt in program.stmts {
            self.check_stmt(stmt);
        }
        if self.sink.has_errors() {
            Err(TypeCheckError {
                diagnostics: self.sink.take(),
            })
        } else {
            Ok(Analysis {
                contracts: self.contracts,
                diagnostics: self.sink.take(),
            })
        }
    }

    fn name(&self, sym: Symbol) -> &'a str {
        self.interner.resolve(sym)
    }

    fn error(&mut self, message: impl Into<String>, pos: Pos) {
        self.sink.error(message, pos.line, pos.column);
    }

    fn error_with_help(&mut self, message: impl Into<String>, help: impl Into<String>, pos: Pos) {
        self.sink
            .report(Diagnostic::error(message, pos.line, pos.column).with_help(help));
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Hoists function bindings so calls may precede definitions.
    fn predeclare_functions(&mut self, stmts: &'a [Stmt<'a>]) {
        for stmt in stmts {
            if let StmtKind::Function(decl) = &stmt.kind {
                let signature = self.function_signature(decl);
                if self
                    .table
                    .define(decl.name, signature, BindingKind::Function, false, false)
                    .is_err()
                {
                    let name = self.name(decl.name).to_string();
                    self.error(
                        format!("function '{name}' is already defined in this scope"),
                        decl.pos,
                    );
                }
            }
        }
    }

    fn function_signature(&mut self, decl: &'a FunctionDecl<'a>) -> Type {
        let params: Vec<Type> = decl
            .params
            .iter()
            .map(|p| self.resolve_type(p.ty, decl.type_params))
            .collect();
        let ret = decl
            .return_type
            .map(|t| self.resolve_type(t, decl.type_params))
            .unwrap_or(Type::Void);
        if decl.type_params.is_empty() {
            Type::function(params, ret)
        } else {
            Type::GenericFunction {
                type_params: decl
                    .type_params
                    .iter()
                    .map(|tp| self.name(*tp).to_string())
                    .collect(),
                params,
                ret: Box::new(ret),
            }
        }
    }

    /// Resolves a syntactic annotation to a semantic type. Names listed in
    /// `type_params` become type variables.
    fn resolve_type(&mut self, ty: &'a TypeExpr<'a>, type_params: &'a [Symbol]) -> Type {
        match &ty.kind {
            TypeExprKind::Named(sym) => {
                if type_params.contains(sym) {
                    return Type::Var(self.name(*sym).to_string());
                }
                if let Some(aliased) = self.table.type_alias(*sym) {
                    return aliased.clone();
                }
                let name = self.name(*sym);
                primitive(name).unwrap_or_else(|| Type::Named(name.to_string()))
            }
            TypeExprKind::Array { elem, rank } => {
                let mut t = self.resolve_type(elem, type_params);
                for _ in 0..(*rank).max(1) {
                    t = Type::array(t);
                }
                t
            }
            TypeExprKind::Nullable(inner) => {
                Type::nullable(self.resolve_type(inner, type_params))
            }
            TypeExprKind::Pointer(inner) => {
                Type::Pointer(Box::new(self.resolve_type(inner, type_params)))
            }
            TypeExprKind::Generic { base, args } => Type::Generic {
                name: self.name(*base).to_string(),
                args: args
                    .iter()
                    .map(|a| self.resolve_type(a, type_params))
                    .collect(),
            },
            TypeExprKind::Function { params, ret } => Type::function(
                params
                    .iter()
                    .map(|p| self.resolve_type(p, type_params))
                    .collect(),
                self.resolve_type(ret, type_params),
            ),
            TypeExprKind::Unit { base, unit } => {
                let base_ty = self.resolve_type(base, type_params);
                if !base_ty.is_numeric() {
                    self.error(
                        format!("unit types need a numeric base, found '{base_ty}'"),
                        ty.pos,
                    );
                    return Type::Unknown;
                }
                Type::unit(base_ty, self.name(*unit))
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn check_stmt(&mut self, stmt: &'a Stmt<'a>) {
        match &stmt.kind {
            StmtKind::Expr(e) => {
                self.check_expr(e);
            }
            StmtKind::VarDecl {
                name,
                declared,
                init,
                is_const,
                mutable,
            } => self.check_var_decl(*name, *declared, *init, *is_const, *mutable, stmt.pos),
            StmtKind::Block(stmts) => {
                self.table.enter_scope();
                self.predeclare_functions(stmts);
                for s in *stmts {
                    self.check_stmt(s);
                }
                self.table.exit_scope();
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expect_bool(cond, "if condition");
                self.check_stmt(then_branch);
                if let Some(e) = else_branch {
                    self.check_stmt(e);
                }
            }
            StmtKind::While { cond, body } => {
                self.expect_bool(cond, "while condition");
                self.check_stmt(body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.check_stmt(body);
                self.expect_bool(cond, "do-while condition");
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.table.enter_scope();
                if let Some(i) = init {
                    self.check_stmt(i);
                }
                if let Some(c) = cond {
                    self.expect_bool(c, "for condition");
                }
                if let Some(s) = step {
                    self.check_expr(s);
                }
                self.check_stmt(body);
                self.table.exit_scope();
            }
            StmtKind::ForEach {
                var,
                iterable,
                body,
            } => {
                let iter_ty = self.check_expr(iterable);
                let elem = match &iter_ty {
                    Type::Array(elem) => (**elem).clone(),
                    Type::Str => Type::Char,
                    Type::Unknown => Type::Unknown,
                    other => {
                        self.error(
                            format!("cannot iterate over a value of type '{other}'"),
                            iterable.pos,
                        );
                        Type::Unknown
                    }
                };
                self.table.enter_scope();
                self.define_local(*var, elem, false, false, stmt.pos);
                self.check_stmt(body);
                self.table.exit_scope();
            }
            StmtKind::Iterate {
                var,
                from,
                to,
                body,
            } => {
                let from_ty = self.check_expr(from);
                let to_ty = self.check_expr(to);
                for (ty, expr) in [(&from_ty, from), (&to_ty, to)] {
                    if !ty.is_numeric() && !ty.is_unknown() {
                        self.error(
                            format!("iterate bounds must be numeric, found '{ty}'"),
                            expr.pos,
                        );
                    }
                }
                let var_ty = Type::widen(&from_ty, &to_ty).unwrap_or(Type::Int);
                self.table.enter_scope();
                self.define_local(*var, var_ty, false, false, stmt.pos);
                self.check_stmt(body);
                self.table.exit_scope();
            }
            StmtKind::Return { value } => self.check_return(*value, stmt.pos),
            StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Function(decl) => self.check_function(decl),
            StmtKind::Class { name, members } => {
                self.table
                    .define_type_alias(*name, Type::Named(self.name(*name).to_string()));
                self.table.enter_scope();
                self.predeclare_functions(members);
                for member in *members {
                    self.check_stmt(member);
                }
                self.table.exit_scope();
            }
            StmtKind::Struct { name, fields } => {
                self.table
                    .define_type_alias(*name, Type::Named(self.name(*name).to_string()));
                for field in *fields {
                    self.resolve_type(field.ty, &[]);
                }
            }
            StmtKind::Namespace { body, .. } => {
                self.table.enter_scope();
                self.predeclare_functions(body);
                for s in *body {
                    self.check_stmt(s);
                }
                self.table.exit_scope();
            }
            StmtKind::TypeAlias { name, target } => {
                let resolved = self.resolve_type(target, &[]);
                self.table.define_type_alias(*name, resolved);
            }
            StmtKind::ModuleAlias { name, target } => {
                self.table.define_module_alias(*name, *target);
            }
            StmtKind::Requires(_) | StmtKind::Ensures(_) | StmtKind::Invariant(_) => {
                self.error_with_help(
                    "contract clause outside a function prefix",
                    "requires/ensures/invariant must be the first statements of a function body",
                    stmt.pos,
                );
            }
        }
    }

    fn check_var_decl(
        &mut self,
        name: Symbol,
        declared: Option<&'a TypeExpr<'a>>,
        init: Option<&'a Expr<'a>>,
        is_const: bool,
        mutable: bool,
        pos: Pos,
    ) {
        let declared_ty = declared.map(|t| self.resolve_type(t, &[]));
        let init_ty = init.map(|e| self.check_expr(e));

        if is_const && init.is_none() {
            let n = self.name(name).to_string();
            self.error_with_help(
                format!("constant '{n}' must have an initializer"),
                "add `= <value>` or declare it as a variable",
                pos,
            );
        }

        let ty = match (&declared_ty, &init_ty) {
            (Some(decl_ty), Some(init_ty)) => {
                if !init_ty.assignable_to(decl_ty) {
                    let n = self.name(name).to_string();
                    self.error_with_help(
                        format!(
                            "cannot initialize '{n}: {decl_ty}' with a value of type '{init_ty}'"
                        ),
                        format!("change the declared type to '{init_ty}' or convert the value"),
                        pos,
                    );
                }
                decl_ty.clone()
            }
            (Some(decl_ty), None) => decl_ty.clone(),
            (None, Some(init_ty)) => init_ty.clone(),
            (None, None) => {
                let n = self.name(name).to_string();
                self.error_with_help(
                    format!("cannot infer a type for '{n}'"),
                    "add a type annotation or an initializer",
                    pos,
                );
                Type::Unknown
            }
        };

        self.define_local(name, ty, is_const, mutable, pos);
    }

    fn define_local(&mut self, name: Symbol, ty: Type, is_const: bool, mutable: bool, pos: Pos) {
        if self
            .table
            .define(name, ty, BindingKind::Variable, is_const, mutable)
            .is_err()
        {
            let n = self.name(name).to_string();
            self.error_with_help(
                format!("'{n}' is already defined in this scope"),
                "rename one of the declarations or assign instead of redeclaring",
                pos,
            );
        }
    }

    fn check_function(&mut self, decl: &'a FunctionDecl<'a>) {
        let ret = decl
            .return_type
            .map(|t| self.resolve_type(t, decl.type_params))
            .unwrap_or(Type::Void);

        self.table.enter_scope();
        let frame = self.table.begin_frame();
        for param in decl.params {
            let ty = self.resolve_type(param.ty, decl.type_params);
            self.define_local(param.name, ty, false, true, param.pos);
        }

        let (context, rest) = contracts::extract(decl.body);
        for clause in context.clauses() {
            let ty = self.check_expr(clause);
            if ty != Type::Bool && !ty.is_unknown() {
                self.error_with_help(
                    format!("contract clause must be 'bool', found '{ty}'"),
                    "write a boolean condition, e.g. `requires(n > 0)`",
                    clause.pos,
                );
            }
        }

        self.predeclare_functions(rest);
        self.return_types.push(ret.clone());
        for stmt in rest {
            self.check_stmt(stmt);
        }
        self.return_types.pop();

        if ret != Type::Void && !always_returns(rest) {
            let n = self.name(decl.name).to_string();
            self.error_with_help(
                format!("function '{n}' does not return a value on every path"),
                format!("add a `return` of type '{ret}' at the end of the body"),
                decl.pos,
            );
        }

        self.contracts.push((decl.name, context));
        self.table.end_frame(frame);
        self.table.exit_scope();
    }

    fn check_return(&mut self, value: Option<&'a Expr<'a>>, pos: Pos) {
        let Some(expected) = self.return_types.last().cloned() else {
            self.error("'return' outside of a function", pos);
            if let Some(v) = value {
                self.check_expr(v);
            }
            return;
        };
        match value {
            Some(v) => {
                let actual = self.check_expr(v);
                if expected == Type::Void {
                    self.error_with_help(
                        "this function does not return a value",
                        "remove the return value or declare a return type",
                        v.pos,
                    );
                } else if !actual.assignable_to(&expected) {
                    self.error_with_help(
                        format!("expected a return value of type '{expected}', found '{actual}'"),
                        format!("convert the value to '{expected}'"),
                        v.pos,
                    );
                }
            }
            None => {
                if expected != Type::Void {
                    self.error_with_help(
                        format!("expected a return value of type '{expected}'"),
                        "return a value or change the return type to 'void'",
                        pos,
                    );
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn check_expr(&mut self, expr: &'a Expr<'a>) -> Type {
        match &expr.kind {
            ExprKind::Int(_) => Type::Int,
            ExprKind::Float(_) => Type::Double,
            ExprKind::Decimal(_) => Type::Decimal,
            ExprKind::Str(_) => Type::Str,
            ExprKind::Char(_) => Type::Char,
            ExprKind::Bool(_) => Type::Bool,
            ExprKind::Null => Type::Null,
            ExprKind::Unit(literal) => Type::unit(Type::Double, literal.unit.clone()),
            ExprKind::Interpolated(parts) => {
                for part in *parts {
                    self.check_expr(part);
                }
                Type::Str
            }
            ExprKind::Ident(sym) => self.check_ident(*sym, expr.pos),
            ExprKind::Array(elems) => {
                if elems.is_empty() {
                    return Type::array(Type::Object);
                }
                let mut elem_ty = self.check_expr(&elems[0]);
                for e in &elems[1..] {
                    let next = self.check_expr(e);
                    elem_ty = Type::common(&elem_ty, &next);
                }
                Type::array(elem_ty)
            }
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs, expr.pos),
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand),
            ExprKind::Assign { target, value } => self.check_assign(target, value),
            ExprKind::Call {
                callee,
                type_args,
                args,
            } => self.check_call(callee, type_args, args, expr.pos),
            ExprKind::Index { object, index } => {
                let obj_ty = self.check_expr(object);
                let idx_ty = self.check_expr(index);
                if !idx_ty.is_integer() && !idx_ty.is_unknown() {
                    self.error(
                        format!("index must be an integer, found '{idx_ty}'"),
                        index.pos,
                    );
                }
                match obj_ty {
                    Type::Array(elem) => *elem,
                    Type::Str => Type::Char,
                    Type::Unknown => Type::Unknown,
                    other => {
                        self.error(
                            format!("cannot index a value of type '{other}'"),
                            object.pos,
                        );
                        Type::Unknown
                    }
                }
            }
            ExprKind::Member { object, name } => {
                let obj_ty = self.check_expr(object);
                let member = self.name(*name);
                match (&obj_ty, member) {
                    (Type::Str, "Length" | "length") => Type::Int,
                    (Type::Array(_), "Length" | "length") => Type::Int,
                    (Type::Unknown, _) => Type::Unknown,
                    // Other members stay opaque; resolving them fully is a
                    // consumer concern.
                    _ => Type::Named(format!("{obj_ty}.{member}")),
                }
            }
            ExprKind::Lambda { params, body } => {
                self.table.enter_scope();
                let mut param_types = Vec::with_capacity(params.len());
                for param in *params {
                    let ty = self.resolve_type(param.ty, &[]);
                    param_types.push(ty.clone());
                    self.define_local(param.name, ty, false, true, param.pos);
                }
                let ret = self.check_expr(body);
                self.table.exit_scope();
                Type::function(param_types, ret)
            }
        }
    }

    fn check_ident(&mut self, sym: Symbol, pos: Pos) -> Type {
        if let Some(binding) = self.table.lookup(sym) {
            return binding.ty.clone();
        }
        let name = self.name(sym).to_string();
        let message = format!("'{name}' is not defined in this scope");
        match self.closest_name(&name) {
            Some(suggestion) => {
                self.error_with_help(message, format!("did you mean '{suggestion}'?"), pos)
            }
            None => self.error_with_help(message, "declare it before use", pos),
        }
        Type::Unknown
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
        pos: Pos,
    ) -> Type {
        let lt = self.check_expr(lhs);
        let rt = self.check_expr(rhs);

        if lt.is_unknown() || rt.is_unknown() {
            return if op.is_comparison() || op.is_logical() {
                Type::Bool
            } else {
                Type::Unknown
            };
        }

        if op.is_logical() {
            for (ty, side) in [(&lt, lhs), (&rt, rhs)] {
                if *ty != Type::Bool {
                    self.error_with_help(
                        format!("'{}' needs 'bool' operands, found '{ty}'", op.symbol()),
                        "use a comparison to produce a bool first",
                        side.pos,
                    );
                }
            }
            return Type::Bool;
        }

        if op.is_comparison() {
            if !lt.comparable_with(&rt) {
                self.error_with_help(
                    format!(
                        "cannot compare '{lt}' with '{rt}' using '{}'",
                        op.symbol()
                    ),
                    "convert the operands to a common type",
                    pos,
                );
            }
            return Type::Bool;
        }

        // String concatenation: `+` with a string on either side.
        if op == BinaryOp::Add && (lt == Type::Str || rt == Type::Str) {
            return Type::Str;
        }

        // Unit-bearing arithmetic.
        if let (Some((lb, lu)), Some((rb, ru))) = (lt.as_unit_parts(), rt.as_unit_parts()) {
            if !lu.is_empty() || !ru.is_empty() {
                return self.check_unit_arithmetic(op, lb, lu, rb, ru, &lt, &rt, pos);
            }
        }

        match Type::widen(&lt, &rt) {
            Some(ty) => ty,
            None => {
                self.error_with_help(
                    format!(
                        "cannot apply '{}' to '{lt}' and '{rt}'",
                        op.symbol()
                    ),
                    "arithmetic needs numeric operands",
                    pos,
                );
                Type::Unknown
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_unit_arithmetic(
        &mut self,
        op: BinaryOp,
        lb: &Type,
        lu: &str,
        rb: &Type,
        ru: &str,
        lt: &Type,
        rt: &Type,
        pos: Pos,
    ) -> Type {
        let Some(base) = Type::widen(lb, rb) else {
            self.error(
                format!("cannot apply '{}' to '{lt}' and '{rt}'", op.symbol()),
                pos,
            );
            return Type::Unknown;
        };
        match op {
            BinaryOp::Mul => Type::unit_product(base, lu, ru),
            BinaryOp::Div | BinaryOp::IntDiv => Type::unit_quotient(base, lu, ru),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mod => {
                if lu != ru {
                    self.error_with_help(
                        format!(
                            "cannot apply '{}' to mismatched units '{lt}' and '{rt}'",
                            op.symbol()
                        ),
                        "convert one operand so both carry the same unit",
                        pos,
                    );
                    return Type::Unknown;
                }
                Type::unit(base, lu)
            }
            _ => {
                self.error_with_help(
                    format!(
                        "'{}' is not defined for unit-bearing operands '{lt}' and '{rt}'",
                        op.symbol()
                    ),
                    "strip the units first or use * and /",
                    pos,
                );
                Type::Unknown
            }
        }
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &'a Expr<'a>) -> Type {
        let ty = self.check_expr(operand);
        if ty.is_unknown() {
            return Type::Unknown;
        }
        match op {
            UnaryOp::Not => {
                if ty != Type::Bool {
                    self.error_with_help(
                        format!("'!' needs a 'bool' operand, found '{ty}'"),
                        "use a comparison to produce a bool first",
                        operand.pos,
                    );
                }
                Type::Bool
            }
            UnaryOp::Neg | UnaryOp::Plus | UnaryOp::Increment | UnaryOp::Decrement => {
                let numeric = matches!(ty.as_unit_parts(), Some(_));
                if !numeric {
                    self.error(
                        format!("'{}' needs a numeric operand, found '{ty}'", op.symbol()),
                        operand.pos,
                    );
                    return Type::Unknown;
                }
                ty
            }
        }
    }

    fn check_assign(&mut self, target: &'a Expr<'a>, value: &'a Expr<'a>) -> Type {
        let value_ty = self.check_expr(value);

        if let ExprKind::Ident(sym) = &target.kind {
            let is_const = self.table.lookup(*sym).map_or(false, |b| b.is_const);
            if is_const {
                let n = self.name(*sym).to_string();
                self.error_with_help(
                    format!("cannot assign to constant '{n}'"),
                    "declare it with 'let' instead of 'const'",
                    target.pos,
                );
            }
        }

        let target_ty = self.check_expr(target);
        if !value_ty.assignable_to(&target_ty) && !target_ty.is_unknown() {
            self.error_with_help(
                format!("cannot assign a value of type '{value_ty}' to '{target_ty}'"),
                format!("convert the value to '{target_ty}'"),
                value.pos,
            );
        }
        target_ty
    }

    fn check_call(
        &mut self,
        callee: &'a Expr<'a>,
        type_args: &'a [TypeExpr<'a>],
        args: &'a [Expr<'a>],
        pos: Pos,
    ) -> Type {
        // Built-ins resolve only when no binding shadows them.
        if let ExprKind::Ident(sym) = &callee.kind {
            if self.table.lookup(*sym).is_none() {
                if let Some(ty) = self.check_builtin_call(*sym, args, pos) {
                    return ty;
                }
            }
        }

        let callee_ty = self.check_expr(callee);
        let arg_types: Vec<Type> = args.iter().map(|a| self.check_expr(a)).collect();

        match callee_ty {
            Type::Function { params, ret } => {
                self.check_args(&params, &arg_types, args, pos);
                *ret
            }
            Type::GenericFunction {
                type_params,
                params,
                ret,
            } => {
                if !type_args.is_empty() {
                    if type_args.len() != type_params.len() {
                        self.error(
                            format!(
                                "expected {} type argument(s), found {}",
                                type_params.len(),
                                type_args.len()
                            ),
                            pos,
                        );
                        return Type::Unknown;
                    }
                    let mut subst = unify::Subst::new();
                    for (name, ta) in type_params.iter().zip(type_args) {
                        let resolved = self.resolve_type(ta, &[]);
                        subst.insert(name.clone(), resolved);
                    }
                    let instantiated: Vec<Type> =
                        params.iter().map(|p| unify::apply(&subst, p)).collect();
                    self.check_args(&instantiated, &arg_types, args, pos);
                    return unify::apply(&subst, &ret);
                }
                match unify::instantiate(&params, &ret, &arg_types) {
                    Some((instantiated, ret)) => {
                        self.check_args(&instantiated, &arg_types, args, pos);
                        ret
                    }
                    None => {
                        self.error_with_help(
                            "cannot infer type arguments for this call",
                            "annotate the call with explicit type arguments",
                            pos,
                        );
                        Type::Unknown
                    }
                }
            }
            Type::Unknown => Type::Unknown,
            other => {
                self.error(
                    format!("a value of type '{other}' is not callable"),
                    callee.pos,
                );
                Type::Unknown
            }
        }
    }

    fn check_builtin_call(&mut self, sym: Symbol, args: &'a [Expr<'a>], pos: Pos) -> Option<Type> {
        let name = self.name(sym);
        match name {
            "print" | "println" => {
                for arg in args {
                    self.check_expr(arg);
                }
                Some(Type::Void)
            }
            "len" | "length" => {
                if args.len() != 1 {
                    self.error(
                        format!("'{name}' expects exactly one argument, found {}", args.len()),
                        pos,
                    );
                    return Some(Type::Int);
                }
                let arg_ty = self.check_expr(&args[0]);
                if !matches!(arg_ty, Type::Str | Type::Array(_) | Type::Unknown) {
                    self.error(
                        format!("'{name}' needs a string or array, found '{arg_ty}'"),
                        args[0].pos,
                    );
                }
                Some(Type::Int)
            }
            _ => None,
        }
    }

    fn check_args(
        &mut self,
        params: &[Type],
        arg_types: &[Type],
        args: &'a [Expr<'a>],
        pos: Pos,
    ) {
        if params.len() != arg_types.len() {
            self.error_with_help(
                format!(
                    "expected {} argument(s), found {}",
                    params.len(),
                    arg_types.len()
                ),
                "check the function's signature",
                pos,
            );
            return;
        }
        for ((param, arg_ty), arg) in params.iter().zip(arg_types).zip(args) {
            if !arg_ty.assignable_to(param) {
                self.error_with_help(
                    format!("expected an argument of type '{param}', found '{arg_ty}'"),
                    format!("convert the argument to '{param}'"),
                    arg.pos,
                );
            }
        }
    }

    fn expect_bool(&mut self, expr: &'a Expr<'a>, what: &str) {
        let ty = self.check_expr(expr);
        if ty != Type::Bool && !ty.is_unknown() {
            self.error_with_help(
                format!("{what} must be 'bool', found '{ty}'"),
                "use a comparison to produce a bool",
                expr.pos,
            );
        }
    }

    /// The closest in-scope name within Levenshtein distance 2.
    fn closest_name(&self, target: &str) -> Option<String> {
        let mut best: Option<(usize, String)> = None;
        for sym in self.table.visible_names() {
            let candidate = self.name(sym);
            let distance = levenshtein(target, candidate);
            if distance <= 2 {
                match &best {
                    Some((d, _)) if *d <= distance => {}
                    _ => best = Some((distance, candidate.to_string())),
                }
            }
        }
        best.map(|(_, name)| name)
    }
}

/// Whether every path through `stmts` reaches a return.
///
/// A deliberately simple sufficient check: a return anywhere at this level,
/// or an if-else whose branches both always return.
fn always_returns(stmts: &[Stmt<'_>]) -> bool {
    stmts.iter().any(stmt_always_returns)
}

fn stmt_always_returns(stmt: &Stmt<'_>) -> bool {
    match &stmt.kind {
        StmtKind::Return { .. } => true,
        StmtKind::Block(stmts) => always_returns(stmts),
        StmtKind::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => stmt_always_returns(then_branch) && stmt_always_returns(else_branch),
        _ => false,
    }
}

/// Classic two-row edit distance, in code points.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            row[j + 1] = substitution.min(prev[j + 1] + 1).min(row[j] + 1);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}
