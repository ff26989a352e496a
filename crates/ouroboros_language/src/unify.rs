//! Type-variable unification for generic call inference.
//!
//! When a call omits explicit type arguments on a generic function, each
//! parameter pattern is unified against the inferred argument type, binding
//! type variables into a [`Subst`]. The rules are deliberately small:
//!
//! - a type variable unifies with anything, binding it; a later occurrence
//!   must unify with the existing binding;
//! - two `Generic` types unify iff their names match and their arguments
//!   unify pairwise;
//! - structural types (arrays, nullables, functions) unify componentwise;
//! - everything else must match exactly.

use std::collections::HashMap;

use crate::types::Type;

/// A substitution from type-variable names to bound types.
pub type Subst = HashMap<String, Type>;

/// Unifies `pattern` against `actual`, extending `subst`.
///
/// Returns `false` (leaving `subst` partially extended) when the two cannot
/// be made equal; callers treat any failure as an inference error, so the
/// partial state is never observed.
pub fn unify(pattern: &Type, actual: &Type, subst: &mut Subst) -> bool {
    match (pattern, actual) {
        (Type::Var(name), _) => match subst.get(name) {
            Some(bound) => {
                let bound = bound.clone();
                unify(&bound, actual, subst)
            }
            None => {
                subst.insert(name.clone(), actual.clone());
                true
            }
        },
        (
            Type::Generic { name: a, args: xs },
            Type::Generic { name: b, args: ys },
        ) => a == b && xs.len() == ys.len() && {
            xs.iter().zip(ys).all(|(x, y)| unify(x, y, subst))
        },
        (Type::Array(a), Type::Array(b)) => unify(a, b, subst),
        (Type::Nullable(a), Type::Nullable(b)) => unify(a, b, subst),
        (Type::Pointer(a), Type::Pointer(b)) => unify(a, b, subst),
        (
            Type::Function { params: ps, ret: pr },
            Type::Function { params: qs, ret: qr },
        ) => {
            ps.len() == qs.len()
                && ps.iter().zip(qs).all(|(p, q)| unify(p, q, subst))
                && unify(pr, qr, subst)
        }
        (
            Type::Unit { base: a, unit: ua },
            Type::Unit { base: b, unit: ub },
        ) => ua == ub && unify(a, b, subst),
        (a, b) => a == b,
    }
}

/// Replaces every bound type variable in `ty` with its substitution.
///
/// Unbound variables are left in place so the caller can report which
/// parameters could not be inferred.
pub fn apply(subst: &Subst, ty: &Type) -> Type {
    match ty {
        Type::Var(name) => subst.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Type::Array(elem) => Type::Array(Box::new(apply(subst, elem))),
        Type::Nullable(inner) => Type::Nullable(Box::new(apply(subst, inner))),
        Type::Pointer(inner) => Type::Pointer(Box::new(apply(subst, inner))),
        Type::Function { params, ret } => Type::Function {
            params: params.iter().map(|p| apply(subst, p)).collect(),
            ret: Box::new(apply(subst, ret)),
        },
        Type::Generic { name, args } => Type::Generic {
            name: name.clone(),
            args: args.iter().map(|a| apply(subst, a)).collect(),
        },
        Type::Unit { base, unit } => Type::Unit {
            base: Box::new(apply(subst, base)),
            unit: unit.clone(),
        },
        other => other.clone(),
    }
}

/// Infers a generic function's instantiation from its argument types.
///
/// Returns the instantiated `(params, ret)` pair, or `None` when any
/// argument fails to unify with its parameter pattern.
pub fn instantiate(
    params: &[Type],
    ret: &Type,
    args: &[Type],
) -> Option<(Vec<Type>, Type)> {
    if params.len() != args.len() {
        return None;
    }
    let mut subst = Subst::new();
    for (pattern, actual) in params.iter().zip(args) {
        if !unify(pattern, actual, &mut subst) {
            return None;
        }
    }
    let instantiated = params.iter().map(|p| apply(&subst, p)).collect();
    Some((instantiated, apply(&subst, ret)))
}
