//! The semantic type model and its promotion rules.
//!
//! Types are plain owned values: the checker builds and compares them
//! freely, and `Display` renders the surface spelling diagnostics use
//! (`int[m/s]`, `double[]`, `fn(int, int) -> bool`).
//!
//! ## Numeric lattice
//!
//! Two chains, `byte < short < int < long` and `float < double`, with every
//! integer widening into either float. `long` and `float` are incomparable
//! and promote to `double`. `decimal` sits above `double`.

use crate::units;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Bool,
    Char,
    Str,
    Void,
    Null,
    Object,
    Array(Box<Type>),
    Nullable(Box<Type>),
    Pointer(Box<Type>),
    Function {
        params: Vec<Type>,
        ret: Box<Type>,
    },
    GenericFunction {
        type_params: Vec<String>,
        params: Vec<Type>,
        ret: Box<Type>,
    },
    Generic {
        name: String,
        args: Vec<Type>,
    },
    /// A numeric base carrying a unit algebra string, e.g. `int[m/s]`.
    Unit {
        base: Box<Type>,
        unit: String,
    },
    /// An unbound type variable inside a generic signature.
    Var(String),
    /// A nominal type the checker treats opaquely (classes, member types).
    Named(String),
    /// Recovery type after an error; compatible with everything so one
    /// mistake does not cascade.
    Unknown,
}

impl Type {
    pub fn array(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn nullable(inner: Type) -> Type {
        Type::Nullable(Box::new(inner))
    }

    pub fn unit(base: Type, unit: impl Into<String>) -> Type {
        Type::Unit {
            base: Box::new(base),
            unit: unit.into(),
        }
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        Type::Function {
            params,
            ret: Box::new(ret),
        }
    }

    /// Whether the type belongs to either numeric chain.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Type::Byte | Type::Short | Type::Int | Type::Long | Type::Float | Type::Double | Type::Decimal
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Byte | Type::Short | Type::Int | Type::Long)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    /// Rank in the widening order; incomparable pairs are resolved by
    /// [`Type::widen`].
    fn numeric_rank(&self) -> Option<u8> {
        let rank = match self {
            Type::Byte => 0,
            Type::Short => 1,
            Type::Int => 2,
            Type::Long => 3,
            Type::Float => 4,
            Type::Double => 5,
            Type::Decimal => 6,
            _ => return None,
        };
        Some(rank)
    }

    /// The promoted type of an arithmetic operation on two numerics.
    ///
    /// Returns `None` when either operand is non-numeric.
    pub fn widen(a: &Type, b: &Type) -> Option<Type> {
        let ra = a.numeric_rank()?;
        let rb = b.numeric_rank()?;
        // long and float are incomparable: neither can hold the other.
        if (a == &Type::Long && b == &Type::Float) || (a == &Type::Float && b == &Type::Long) {
            return Some(Type::Double);
        }
        Some(if ra >= rb { a.clone() } else { b.clone() })
    }

    /// Whether a value of type `self` can be assigned where `target` is
    /// expected: identical types, numeric widening, or `null` into a
    /// nullable.
    pub fn assignable_to(&self, target: &Type) -> bool {
        if self.is_unknown() || target.is_unknown() {
            return true;
        }
        if self == target {
            return true;
        }
        match (self, target) {
            (Type::Null, Type::Nullable(_)) => true,
            (inner, Type::Nullable(t)) => inner.assignable_to(t),
            _ => {
                if let (Some(ra), Some(rb)) = (self.numeric_rank(), target.numeric_rank()) {
                    // Widening only, and never across the long/float gap.
                    if *self == Type::Long && *target == Type::Float {
                        return false;
                    }
                    ra <= rb
                } else {
                    false
                }
            }
        }
    }

    /// The common type of two array elements: identical, widest numeric,
    /// otherwise `object`.
    pub fn common(a: &Type, b: &Type) -> Type {
        if a == b {
            return a.clone();
        }
        if a.is_unknown() {
            return b.clone();
        }
        if b.is_unknown() {
            return a.clone();
        }
        Type::widen(a, b).unwrap_or(Type::Object)
    }

    /// Whether two types can be compared with `==`/`<`/…: same name, both
    /// numeric, or `null` against a nullable.
    pub fn comparable_with(&self, other: &Type) -> bool {
        if self.is_unknown() || other.is_unknown() {
            return true;
        }
        if self == other {
            return true;
        }
        if self.is_numeric() && other.is_numeric() {
            return true;
        }
        matches!(
            (self, other),
            (Type::Null, Type::Nullable(_)) | (Type::Nullable(_), Type::Null)
        )
    }

    /// Unit-aware multiplication: `T[u₁] * T[u₂]` is `T[u₁·u₂]`.
    pub fn unit_product(base: Type, u1: &str, u2: &str) -> Type {
        let unit = units::unit_mul(u1, u2);
        if unit.is_empty() {
            base
        } else {
            Type::unit(base, unit)
        }
    }

    /// Unit-aware division: `T[u] / T[u]` cancels back to `T`.
    pub fn unit_quotient(base: Type, u1: &str, u2: &str) -> Type {
        let unit = units::unit_div(u1, u2);
        if unit.is_empty() {
            base
        } else {
            Type::unit(base, unit)
        }
    }

    /// Splits a type into its numeric base and unit string; a bare numeric
    /// has the empty unit.
    pub fn as_unit_parts(&self) -> Option<(&Type, &str)> {
        match self {
            Type::Unit { base, unit } => Some((base, unit)),
            t if t.is_numeric() => Some((t, "")),
            _ => None,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Byte => write!(f, "byte"),
            Type::Short => write!(f, "short"),
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Decimal => write!(f, "decimal"),
            Type::Bool => write!(f, "bool"),
            Type::Char => write!(f, "char"),
            Type::Str => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Null => write!(f, "null"),
            Type::Object => write!(f, "object"),
            Type::Unknown => write!(f, "?"),
            Type::Array(elem) => write!(f, "{elem}[]"),
            Type::Nullable(inner) => write!(f, "{inner}?"),
            Type::Pointer(inner) => write!(f, "{inner}*"),
            Type::Unit { base, unit } => write!(f, "{base}[{unit}]"),
            Type::Var(name) => write!(f, "{name}"),
            Type::Named(name) => write!(f, "{name}"),
            Type::Generic { name, args } => {
                write!(f, "{name}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            Type::Function { params, ret } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            Type::GenericFunction {
                type_params,
                params,
                ret,
            } => {
                write!(f, "fn<")?;
                for (i, tp) in type_params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{tp}")?;
                }
                write!(f, ">(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
        }
    }
}

/// Resolves a primitive type name; anything else is nominal.
pub fn primitive(name: &str) -> Option<Type> {
    let ty = match name {
        "byte" | "u8" | "i8" => Type::Byte,
        "short" | "i16" | "u16" => Type::Short,
        "int" | "i32" | "u32" => Type::Int,
        "long" | "i64" | "u64" => Type::Long,
        "float" | "f32" => Type::Float,
        "double" | "f64" => Type::Double,
        "decimal" => Type::Decimal,
        "bool" => Type::Bool,
        "char" => Type::Char,
        "string" | "str" => Type::Str,
        "void" => Type::Void,
        "object" => Type::Object,
        _ => return None,
    };
    Some(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_follows_the_lattice() {
        assert_eq!(Type::widen(&Type::Byte, &Type::Int), Some(Type::Int));
        assert_eq!(Type::widen(&Type::Int, &Type::Long), Some(Type::Long));
        assert_eq!(Type::widen(&Type::Float, &Type::Double), Some(Type::Double));
        assert_eq!(Type::widen(&Type::Int, &Type::Float), Some(Type::Float));
        assert_eq!(Type::widen(&Type::Str, &Type::Int), None);
    }

    #[test]
    fn long_and_float_promote_to_double() {
        assert_eq!(Type::widen(&Type::Long, &Type::Float), Some(Type::Double));
        assert_eq!(Type::widen(&Type::Float, &Type::Long), Some(Type::Double));
    }

    #[test]
    fn assignability_widens_but_never_narrows() {
        assert!(Type::Int.assignable_to(&Type::Long));
        assert!(!Type::Long.assignable_to(&Type::Int));
        assert!(!Type::Long.assignable_to(&Type::Float));
        assert!(Type::Null.assignable_to(&Type::nullable(Type::Str)));
        assert!(!Type::Null.assignable_to(&Type::Str));
    }

    #[test]
    fn common_type_falls_back_to_object() {
        assert_eq!(Type::common(&Type::Int, &Type::Int), Type::Int);
        assert_eq!(Type::common(&Type::Int, &Type::Double), Type::Double);
        assert_eq!(Type::common(&Type::Int, &Type::Str), Type::Object);
    }

    #[test]
    fn unit_product_squares_and_cancels() {
        let m = Type::unit(Type::Int, "m");
        assert_eq!(
            Type::unit_product(Type::Int, "m", "m"),
            Type::unit(Type::Int, "m²")
        );
        assert_eq!(Type::unit_quotient(Type::Int, "m", "m"), Type::Int);
        assert_eq!(m.to_string(), "int[m]");
    }

    #[test]
    fn display_renders_compound_types() {
        assert_eq!(Type::array(Type::Double).to_string(), "double[]");
        assert_eq!(
            Type::function(vec![Type::Int, Type::Int], Type::Bool).to_string(),
            "fn(int, int) -> bool"
        );
        assert_eq!(Type::nullable(Type::Str).to_string(), "string?");
    }

    #[test]
    fn primitive_lookup_covers_aliases() {
        assert_eq!(primitive("int"), Some(Type::Int));
        assert_eq!(primitive("f64"), Some(Type::Double));
        assert_eq!(primitive("Widget"), None);
    }
}
