//! Constant pool values.
//!
//! The pool is de-duplicated on insertion, so equality here is structural
//! and total: floats compare bit-exactly (`NaN == NaN`, `0.0 != -0.0`),
//! which keeps pool indices stable under re-insertion of any value.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(f64),
    Str(String),
    Char(char),
    Bool(bool),
    Null,
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        use Constant::*;
        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Decimal(a), Decimal(b)) => a.to_bits() == b.to_bits(),
            (Str(a), Str(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (Null, Null) => true,
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl std::fmt::Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Long(v) => write!(f, "{v}L"),
            Constant::Float(v) => write!(f, "{v}f"),
            Constant::Double(v) => write!(f, "{v}"),
            Constant::Decimal(v) => write!(f, "{v}m"),
            Constant::Str(s) => write!(f, "{s:?}"),
            Constant::Char(c) => write!(f, "{c:?}"),
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::Null => write!(f, "null"),
        }
    }
}
