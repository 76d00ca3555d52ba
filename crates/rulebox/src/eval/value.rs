//! Runtime values for predicate evaluation.
//!
//! `Value` is the closed set of things an expression can observe. Bag inputs
//! are coerced into it once, when the bag is built, and every operator and
//! builtin works on it directly.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::numeric::{self, NumPair};
use crate::types::ValueType;

/// Display format for date-times, matching the invariant culture.
pub(crate) const DATETIME_DISPLAY_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Signed 64-bit integer. Every narrower integer input lands here.
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Char(char),
    /// Unicode string (Arc for cheap cloning).
    String(Arc<str>),
    DateTime(NaiveDateTime),
    Guid(Uuid),
    /// Host-supplied list or array literal.
    List(Arc<[Value]>),
    /// Parsed structured text (a JSON document or one of its elements).
    Json(Arc<serde_json::Value>),
}

impl Value {
    /// Create a string value.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// Create a list value.
    pub fn list(items: impl Into<Arc<[Value]>>) -> Self {
        Value::List(items.into())
    }

    /// The runtime type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Int(_) => ValueType::Int,
            Value::UInt(_) => ValueType::UInt,
            Value::Float(_) => ValueType::Float,
            Value::Decimal(_) => ValueType::Decimal,
            Value::Char(_) => ValueType::Char,
            Value::String(_) => ValueType::String,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Guid(_) => ValueType::Guid,
            Value::List(_) => ValueType::List,
            Value::Json(_) => ValueType::Json,
        }
    }

    /// Type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.value_type().display_name()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Equality as the `==` operator sees it.
    ///
    /// Numbers compare by value across representations; any other pair of
    /// different kinds is unequal (`'J'` is not `"J"`).
    pub fn equals(&self, other: &Value) -> bool {
        if let Some(pair) = numeric::promote(self, other) {
            return pair.compare() == Some(Ordering::Equal);
        }

        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Guid(a), Value::Guid(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Json(a), Value::Json(b)) => a == b,
            _ => false,
        }
    }

    /// Ordering for the relational operators.
    ///
    /// Returns `None` for kinds with no ordering and for comparisons involving
    /// NaN; use [`Value::is_ordered_with`] to tell the two apart.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if let Some(pair) = numeric::promote(self, other) {
            return pair.compare();
        }

        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Whether the two values are of kinds that can be ordered at all.
    pub fn is_ordered_with(&self, other: &Value) -> bool {
        if numeric::promote(self, other).is_some() {
            return true;
        }
        matches!(
            (self, other),
            (Value::String(_), Value::String(_))
                | (Value::Char(_), Value::Char(_))
                | (Value::DateTime(_), Value::DateTime(_))
        )
    }

    /// Numeric view of the value, if it has one.
    pub(crate) fn to_f64(&self) -> Option<f64> {
        numeric::to_f64(self)
    }

    /// Promote a pair of numeric values to a common representation.
    pub(crate) fn numeric_pair(&self, other: &Value) -> Option<NumPair> {
        numeric::promote(self, other)
    }
}

fn format_float(f: f64, out: &mut fmt::Formatter<'_>) -> fmt::Result {
    if f.is_nan() {
        out.write_str("NaN")
    } else if f.is_infinite() {
        out.write_str(if f > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(out, "{}", f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{}", i),
            Value::UInt(u) => write!(f, "{}", u),
            Value::Float(v) => format_float(*v, f),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Char(c) => write!(f, "{}", c),
            Value::String(s) => f.write_str(s),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_DISPLAY_FORMAT)),
            Value::Guid(g) => write!(f, "{}", g.hyphenated()),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Json(json) => match json.as_ref() {
                serde_json::Value::String(s) => f.write_str(s),
                other => write!(f, "{}", other),
            },
        }
    }
}

// === Conversions ===

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Value::Int(u as i64)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Uuid> for Value {
    fn from(g: Uuid) -> Self {
        Value::Guid(g)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items.into())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::Json(Arc::new(json))
    }
}
