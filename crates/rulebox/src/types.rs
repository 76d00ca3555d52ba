//! Static value types used by the binder.

use std::fmt;

/// The statically known type of a bound expression.
///
/// `Dynamic` covers bag fields and anything whose type depends on data only
/// known at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    UInt,
    Float,
    Decimal,
    Char,
    String,
    DateTime,
    Guid,
    Null,
    List,
    Json,
    Dynamic,
}

impl ValueType {
    /// Returns true for the four numeric types.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueType::Int | ValueType::UInt | ValueType::Float | ValueType::Decimal
        )
    }

    /// Returns true if the type is `Dynamic`.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, ValueType::Dynamic)
    }

    /// Numeric promotion of two static types, mirroring the runtime rules.
    ///
    /// Returns `Dynamic` when either side is dynamic and `None` when the pair
    /// is not numeric at all.
    pub fn promote(self, other: ValueType) -> Option<ValueType> {
        use ValueType::*;
        match (self, other) {
            (Dynamic, t) | (t, Dynamic) if t.is_numeric() || t.is_dynamic() => Some(Dynamic),
            (Int, Int) => Some(Int),
            (UInt, UInt) => Some(UInt),
            // Mixed signedness can land on any of the three integer-capable
            // representations depending on the values.
            (Int, UInt) | (UInt, Int) => Some(Dynamic),
            (Float, t) | (t, Float) if t.is_numeric() => Some(Float),
            (Decimal, t) | (t, Decimal) if t.is_numeric() => Some(Decimal),
            _ => None,
        }
    }

    /// Display name used in diagnostics.
    pub fn display_name(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "long",
            ValueType::UInt => "ulong",
            ValueType::Float => "double",
            ValueType::Decimal => "decimal",
            ValueType::Char => "char",
            ValueType::String => "string",
            ValueType::DateTime => "DateTime",
            ValueType::Guid => "Guid",
            ValueType::Null => "null",
            ValueType::List => "array",
            ValueType::Json => "JsonElement",
            ValueType::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
