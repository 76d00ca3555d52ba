//! Coercion of loosely-typed inputs into runtime values.
//!
//! Text inputs go through an ordered trial-parse cascade and become the first
//! type that accepts them:
//!
//! 1. `Bool` (`true`/`false`, any case, surrounding whitespace ignored)
//! 2. byte, 32-bit and 64-bit integers, all stored as `Int`
//! 3. `UInt` for integers above `i64::MAX`
//! 4. 32-bit then 64-bit floats, only when the binary value is exact
//! 5. `Decimal`
//! 6. `Char` for single-character text (can be switched off)
//! 7. `DateTime`
//! 8. `Guid`
//! 9. otherwise the original `String`
//!
//! Step 4 keeps text such as `19.99` away from binary floats, which cannot
//! hold it, so it lands on `Decimal` instead.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use super::Value;

/// Options for the coercion cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoercionOptions {
    /// Coerce single-character text to `Char` rather than leaving it a
    /// `String`. On by default for compatibility; note that it makes
    /// `item.Initial == "J"` false when `Initial` is `"J"`.
    pub single_char_as_char: bool,
}

impl Default for CoercionOptions {
    fn default() -> Self {
        Self {
            single_char_as_char: true,
        }
    }
}

/// A caller-supplied input value, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Already a runtime value; passed through unchanged.
    Value(Value),
    /// Text to run through the cascade.
    Text(String),
    /// A calendar date; coerced through its text form to a midnight `DateTime`.
    Date(NaiveDate),
    /// A list whose items are coerced individually.
    List(Vec<RawValue>),
}

impl RawValue {
    /// Coerce with default options.
    pub fn coerce(self) -> Value {
        coerce(self, &CoercionOptions::default())
    }
}

/// Coerce a raw input into a runtime value.
pub fn coerce(raw: RawValue, options: &CoercionOptions) -> Value {
    match raw {
        RawValue::Value(v) => v,
        RawValue::Text(s) => coerce_text(&s, options),
        RawValue::Date(d) => coerce_text(&d.format("%Y-%m-%d").to_string(), options),
        RawValue::List(items) => Value::list(
            items
                .into_iter()
                .map(|item| coerce(item, options))
                .collect::<Vec<_>>(),
        ),
    }
}

type Stage = fn(&str, &CoercionOptions) -> Option<Value>;

/// The cascade, in order. First match wins.
const CASCADE: &[(&str, Stage)] = &[
    ("bool", parse_bool),
    ("byte", parse_byte),
    ("int32", parse_int32),
    ("int64", parse_int64),
    ("uint64", parse_uint64),
    ("float32", parse_float32),
    ("float64", parse_float64),
    ("decimal", parse_decimal),
    ("char", parse_char),
    ("datetime", parse_datetime_stage),
    ("guid", parse_guid),
];

/// Run text through the cascade.
pub fn coerce_text(text: &str, options: &CoercionOptions) -> Value {
    match cascade_match(text, options) {
        Some((stage, value)) => {
            trace!(event = "bag.value_coerced", stage, value_type = value.type_name());
            value
        }
        None => Value::string(text),
    }
}

/// The first stage accepting `text`, with the value it produced.
fn cascade_match(text: &str, options: &CoercionOptions) -> Option<(&'static str, Value)> {
    CASCADE
        .iter()
        .find_map(|&(name, stage)| stage(text, options).map(|value| (name, value)))
}

fn parse_bool(text: &str, _: &CoercionOptions) -> Option<Value> {
    let t = text.trim();
    if t.eq_ignore_ascii_case("true") {
        Some(Value::Bool(true))
    } else if t.eq_ignore_ascii_case("false") {
        Some(Value::Bool(false))
    } else {
        None
    }
}

fn parse_byte(text: &str, _: &CoercionOptions) -> Option<Value> {
    text.trim().parse::<u8>().ok().map(|b| Value::Int(b as i64))
}

fn parse_int32(text: &str, _: &CoercionOptions) -> Option<Value> {
    text.trim().parse::<i32>().ok().map(|i| Value::Int(i as i64))
}

fn parse_int64(text: &str, _: &CoercionOptions) -> Option<Value> {
    text.trim().parse::<i64>().ok().map(Value::Int)
}

fn parse_uint64(text: &str, _: &CoercionOptions) -> Option<Value> {
    text.trim().parse::<u64>().ok().map(Value::UInt)
}

/// A float stage accepts text only when nothing is lost: either the text is
/// not representable as a decimal at all (exponents, NaN, very large
/// magnitudes), or the decimal it denotes equals the float exactly.
fn exact_in_binary(text: &str, retained: Option<Decimal>) -> bool {
    match Decimal::from_str(text) {
        Ok(exact) => retained == Some(exact),
        Err(_) => true,
    }
}

fn is_float_text(text: &str) -> bool {
    // Rust also accepts "inf" and "infinity"; restrict specials to the
    // spellings the invariant culture produces.
    let body = text.trim_start_matches(['+', '-']);
    body.starts_with(|c: char| c.is_ascii_digit() || c == '.') || body == "NaN" || body == "Infinity"
}

fn parse_float32(text: &str, _: &CoercionOptions) -> Option<Value> {
    let t = text.trim();
    if !is_float_text(t) {
        return None;
    }
    let f: f32 = t.parse().ok()?;
    if f.is_infinite() && !t.ends_with("Infinity") {
        return None;
    }
    exact_in_binary(t, Decimal::from_f32_retain(f)).then(|| Value::Float(f as f64))
}

fn parse_float64(text: &str, _: &CoercionOptions) -> Option<Value> {
    let t = text.trim();
    if !is_float_text(t) {
        return None;
    }
    let f: f64 = t.parse().ok()?;
    if f.is_infinite() && !t.ends_with("Infinity") {
        return None;
    }
    exact_in_binary(t, Decimal::from_f64_retain(f)).then_some(Value::Float(f))
}

fn parse_decimal(text: &str, _: &CoercionOptions) -> Option<Value> {
    Decimal::from_str(text.trim()).ok().map(Value::Decimal)
}

fn parse_char(text: &str, options: &CoercionOptions) -> Option<Value> {
    if !options.single_char_as_char {
        return None;
    }
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(Value::Char(c)),
        _ => None,
    }
}

fn parse_datetime_stage(text: &str, _: &CoercionOptions) -> Option<Value> {
    parse_datetime(text).map(Value::DateTime)
}

fn parse_guid(text: &str, _: &CoercionOptions) -> Option<Value> {
    Uuid::parse_str(text.trim()).ok().map(Value::Guid)
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse the date-time text forms the cascade accepts.
///
/// Offsets in RFC 3339 input are normalised to UTC.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(t, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(t, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// === Conversions into RawValue ===

impl From<Value> for RawValue {
    fn from(v: Value) -> Self {
        RawValue::Value(v)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(d: NaiveDate) -> Self {
        RawValue::Date(d)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(items: Vec<T>) -> Self {
        RawValue::List(items.into_iter().map(Into::into).collect())
    }
}

macro_rules! raw_value_from_native {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for RawValue {
                fn from(v: $ty) -> Self {
                    RawValue::Value(Value::from(v))
                }
            }
        )*
    };
}

raw_value_from_native!(
    bool,
    i32,
    i64,
    u32,
    u64,
    f64,
    char,
    Decimal,
    NaiveDateTime,
    Uuid,
    serde_json::Value,
);
