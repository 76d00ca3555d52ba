//! LINQ-style sequence predicates.
//!
//! # Members on sequences
//!
//! - `All(x => ...)`, `Any(x => ...)` - bound by the binder as quantifiers,
//!   the lambda body runs once per element
//! - `Any()`, `Count()`, `Contains(v)`, `Length`
//!
//! A sequence is a list value (array literal or host list), a string (its
//! characters) or a JSON array. Sequences are always finite, so every
//! quantifier terminates.

use std::sync::Arc;

use crate::error::RuntimeError;
use crate::eval::Value;
use crate::functions::{Member, Receiver};
use crate::types::ValueType;

pub const LINQ_MODULE: &str = "System.Linq";

/// Returns the members available on sequences.
pub fn linq_members() -> Vec<Member> {
    vec![
        Member::method("Any", LINQ_MODULE, Receiver::Sequence).with_overload(
            0,
            ValueType::Bool,
            |args| Ok(Value::Bool(len(&args[0])? > 0)),
        ),
        Member::method("Count", LINQ_MODULE, Receiver::Sequence).with_overload(
            0,
            ValueType::Int,
            |args| Ok(Value::Int(len(&args[0])? as i64)),
        ),
        Member::property("Length", LINQ_MODULE, Receiver::Sequence, ValueType::Int, |args| {
            Ok(Value::Int(len(&args[0])? as i64))
        }),
        Member::method("Contains", LINQ_MODULE, Receiver::Sequence).with_overload(
            1,
            ValueType::Bool,
            |args| {
                let needle = &args[1];
                Ok(Value::Bool(
                    elements(&args[0])?.iter().any(|item| item.equals(needle)),
                ))
            },
        ),
    ]
}

fn len(v: &Value) -> Result<usize, RuntimeError> {
    match v {
        Value::List(items) => Ok(items.len()),
        Value::String(s) => Ok(s.chars().count()),
        Value::Json(json) => json
            .as_array()
            .map(Vec::len)
            .ok_or_else(|| not_a_sequence(v)),
        other => Err(not_a_sequence(other)),
    }
}

fn not_a_sequence(v: &Value) -> RuntimeError {
    RuntimeError::expected("sequence operation", "a sequence", v.type_name())
}

/// The elements of a sequence value.
pub fn elements(v: &Value) -> Result<Vec<Value>, RuntimeError> {
    match v {
        Value::List(items) => Ok(items.to_vec()),
        Value::String(s) => Ok(s.chars().map(Value::Char).collect()),
        Value::Json(json) => json
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| Value::Json(Arc::new(item.clone())))
                    .collect()
            })
            .ok_or_else(|| not_a_sequence(v)),
        other => Err(not_a_sequence(other)),
    }
}
