//! `System.Convert` functions.
//!
//! # Functions
//!
//! - `Convert.ToInt64(v)` - numbers round half to even, strings parse as
//!   integers
//! - `Convert.ToDouble(v)`, `Convert.ToDecimal(v)`
//! - `Convert.ToString(v)`
//! - `Convert.ToBoolean(v)` - `"true"`/`"false"` in any case, or non-zero numbers
//!
//! `null` converts to the target type's zero (`0`, `0.0`, `""`, `false`).

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::RuntimeError;
use crate::eval::Value;
use crate::functions::{Function, Module};
use crate::types::ValueType;

pub const CONVERT_MODULE: &str = "System.Convert";

/// Returns the `System.Convert` module.
pub fn convert_module() -> Module {
    Module::new(CONVERT_MODULE)
        .with_alias("Convert")
        .with_function(Function::new("ToInt64").with_overload(1, ValueType::Int, to_int64))
        .with_function(Function::new("ToDouble").with_overload(1, ValueType::Float, to_double))
        .with_function(Function::new("ToDecimal").with_overload(1, ValueType::Decimal, to_decimal))
        .with_function(Function::new("ToString").with_overload(1, ValueType::String, |args| {
            Ok(Value::string(args[0].to_string()))
        }))
        .with_function(Function::new("ToBoolean").with_overload(1, ValueType::Bool, to_boolean))
}

fn bad_format(name: &str) -> RuntimeError {
    RuntimeError::function_failed(name, "input string was not in a correct format")
}

fn unsupported(name: &str, v: &Value) -> RuntimeError {
    RuntimeError::function_failed(name, format!("cannot convert from {}", v.type_name()))
}

fn to_int64(args: &[Value]) -> Result<Value, RuntimeError> {
    const NAME: &str = "Convert.ToInt64";
    let v = &args[0];
    let i = match v {
        Value::Null => 0,
        Value::Int(i) => *i,
        Value::UInt(u) => i64::try_from(*u).map_err(|_| RuntimeError::overflow())?,
        Value::Bool(b) => *b as i64,
        Value::Char(c) => *c as i64,
        Value::Float(f) => {
            let rounded = f.round_ties_even();
            if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
                return Err(RuntimeError::overflow());
            }
            rounded as i64
        }
        Value::Decimal(d) => d
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_i64()
            .ok_or_else(RuntimeError::overflow)?,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| bad_format(NAME))?,
        other => return Err(unsupported(NAME, other)),
    };
    Ok(Value::Int(i))
}

fn to_double(args: &[Value]) -> Result<Value, RuntimeError> {
    const NAME: &str = "Convert.ToDouble";
    let v = &args[0];
    let f = match v {
        Value::Null => 0.0,
        Value::Bool(b) => *b as i64 as f64,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| bad_format(NAME))?,
        other => other.to_f64().ok_or_else(|| unsupported(NAME, other))?,
    };
    Ok(Value::Float(f))
}

fn to_decimal(args: &[Value]) -> Result<Value, RuntimeError> {
    const NAME: &str = "Convert.ToDecimal";
    let v = &args[0];
    let d = match v {
        Value::Null => Decimal::ZERO,
        Value::Bool(b) => Decimal::from(*b as i64),
        Value::Int(i) => Decimal::from(*i),
        Value::UInt(u) => Decimal::from(*u),
        Value::Decimal(d) => *d,
        Value::Float(f) => Decimal::from_f64(*f).ok_or_else(RuntimeError::overflow)?,
        Value::String(s) => s.trim().parse::<Decimal>().map_err(|_| bad_format(NAME))?,
        other => return Err(unsupported(NAME, other)),
    };
    Ok(Value::Decimal(d))
}

fn to_boolean(args: &[Value]) -> Result<Value, RuntimeError> {
    const NAME: &str = "Convert.ToBoolean";
    let v = &args[0];
    let b = match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::UInt(u) => *u != 0,
        Value::Float(f) => *f != 0.0,
        Value::Decimal(d) => !d.is_zero(),
        Value::String(s) => {
            let t = s.trim();
            if t.eq_ignore_ascii_case("true") {
                true
            } else if t.eq_ignore_ascii_case("false") {
                false
            } else {
                return Err(bad_format(NAME));
            }
        }
        other => return Err(unsupported(NAME, other)),
    };
    Ok(Value::Bool(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, v: Value) -> Result<Value, RuntimeError> {
        convert_module()
            .function(name)
            .and_then(|f| f.find(1))
            .expect("function exists")
            .call(&[v])
    }

    #[test]
    fn to_int64() {
        assert_eq!(call("ToInt64", Value::string(" 42 ")), Ok(Value::Int(42)));
        assert_eq!(call("ToInt64", Value::Float(2.5)), Ok(Value::Int(2)));
        assert_eq!(call("ToInt64", Value::Float(3.5)), Ok(Value::Int(4)));
        assert_eq!(call("ToInt64", Value::Null), Ok(Value::Int(0)));
        assert_eq!(call("ToInt64", Value::UInt(u64::MAX)), Err(RuntimeError::overflow()));
        assert!(matches!(
            call("ToInt64", Value::string("abc")),
            Err(RuntimeError::FunctionFailed { .. })
        ));
    }

    #[test]
    fn to_double_and_decimal() {
        assert_eq!(call("ToDouble", Value::Int(3)), Ok(Value::Float(3.0)));
        assert_eq!(call("ToDouble", Value::string("1.5")), Ok(Value::Float(1.5)));
        assert_eq!(
            call("ToDecimal", Value::string("19.99")),
            Ok(Value::Decimal(Decimal::new(1999, 2)))
        );
    }

    #[test]
    fn to_boolean_and_string() {
        assert_eq!(call("ToBoolean", Value::string("TRUE")), Ok(Value::Bool(true)));
        assert_eq!(call("ToBoolean", Value::Int(0)), Ok(Value::Bool(false)));
        assert_eq!(call("ToString", Value::Bool(true)), Ok(Value::string("True")));
    }
}
