//! `System.Math` functions.
//!
//! # Functions
//!
//! - `Math.Abs(x)`, `Math.Sign(x)`
//! - `Math.Min(a, b)`, `Math.Max(a, b)`, `Math.Clamp(x, min, max)`
//! - `Math.Round(x)`, `Math.Round(x, digits)` - midpoints round to even
//! - `Math.Floor(x)`, `Math.Ceiling(x)`, `Math.Truncate(x)`
//! - `Math.Pow(x, y)`, `Math.Sqrt(x)` - always double
//! - constants `Math.PI`, `Math.E`
//!
//! The module is static-imported, so `Min(1, 2)` resolves as well.
//! Integer inputs to the rounding functions come back unchanged.

use std::cmp::Ordering;

use crate::error::RuntimeError;
use crate::eval::Value;
use crate::functions::{Function, Module};
use crate::types::ValueType;

pub const MATH_MODULE: &str = "System.Math";

/// Returns the `System.Math` module.
pub fn math_module() -> Module {
    Module::new(MATH_MODULE)
        .with_alias("Math")
        .with_static_import()
        .with_constant("PI", std::f64::consts::PI)
        .with_constant("E", std::f64::consts::E)
        .with_function(Function::new("Abs").with_promoted_overload(1, abs))
        .with_function(
            Function::new("Min").with_promoted_overload(2, |args| min_max("Math.Min", args, Ordering::Less)),
        )
        .with_function(
            Function::new("Max")
                .with_promoted_overload(2, |args| min_max("Math.Max", args, Ordering::Greater)),
        )
        .with_function(Function::new("Clamp").with_promoted_overload(3, clamp))
        .with_function(
            Function::new("Round")
                .with_promoted_overload(1, |args| rounding("Math.Round", &args[0], round_half_even, |d| d.round()))
                .with_promoted_overload(2, round_digits),
        )
        .with_function(
            Function::new("Floor")
                .with_promoted_overload(1, |args| rounding("Math.Floor", &args[0], f64::floor, |d| d.floor())),
        )
        .with_function(
            Function::new("Ceiling")
                .with_promoted_overload(1, |args| rounding("Math.Ceiling", &args[0], f64::ceil, |d| d.ceil())),
        )
        .with_function(
            Function::new("Truncate")
                .with_promoted_overload(1, |args| rounding("Math.Truncate", &args[0], f64::trunc, |d| d.trunc())),
        )
        .with_function(Function::new("Pow").with_overload(2, ValueType::Float, pow))
        .with_function(Function::new("Sqrt").with_overload(1, ValueType::Float, sqrt))
        .with_function(Function::new("Sign").with_overload(1, ValueType::Int, sign))
}

fn not_a_number(name: &str, v: &Value) -> RuntimeError {
    RuntimeError::expected(name, "a number", v.type_name())
}

fn as_f64(name: &str, v: &Value) -> Result<f64, RuntimeError> {
    v.to_f64().ok_or_else(|| not_a_number(name, v))
}

/// Round half to even, the default midpoint rule of `Math.Round`.
fn round_half_even(v: f64) -> f64 {
    if (v - v.trunc()).abs() == 0.5 {
        2.0 * (v / 2.0).round()
    } else {
        v.round()
    }
}

fn abs(args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Int(v) => v.checked_abs().map(Value::Int).ok_or_else(RuntimeError::overflow),
        Value::UInt(v) => Ok(Value::UInt(*v)),
        Value::Float(v) => Ok(Value::Float(v.abs())),
        Value::Decimal(v) => Ok(Value::Decimal(v.abs())),
        other => Err(not_a_number("Math.Abs", other)),
    }
}

fn min_max(name: &str, args: &[Value], want: Ordering) -> Result<Value, RuntimeError> {
    let pair = args[0].numeric_pair(&args[1]).ok_or_else(|| {
        RuntimeError::type_mismatch(
            name,
            format!("expected two numbers, got {} and {}", args[0].type_name(), args[1].type_name()),
        )
    })?;
    Ok(if want == Ordering::Less {
        pair.min()
    } else {
        pair.max()
    })
}

fn clamp(args: &[Value]) -> Result<Value, RuntimeError> {
    let (value, lo, hi) = (&args[0], &args[1], &args[2]);
    let bounds = lo.numeric_pair(hi).ok_or_else(|| not_a_number("Math.Clamp", lo))?;
    if bounds.compare() == Some(Ordering::Greater) {
        return Err(RuntimeError::function_failed(
            "Math.Clamp",
            "'min' cannot be greater than 'max'",
        ));
    }
    let raised = min_max("Math.Clamp", &[value.clone(), lo.clone()], Ordering::Greater)?;
    min_max("Math.Clamp", &[raised, hi.clone()], Ordering::Less)
}

fn rounding(
    name: &str,
    v: &Value,
    float: fn(f64) -> f64,
    decimal: fn(&rust_decimal::Decimal) -> rust_decimal::Decimal,
) -> Result<Value, RuntimeError> {
    match v {
        Value::Int(_) | Value::UInt(_) => Ok(v.clone()),
        Value::Float(f) => Ok(Value::Float(float(*f))),
        Value::Decimal(d) => Ok(Value::Decimal(decimal(d))),
        other => Err(not_a_number(name, other)),
    }
}

fn round_digits(args: &[Value]) -> Result<Value, RuntimeError> {
    let digits = match &args[1] {
        Value::Int(d) if (0..=15).contains(d) => *d as u32,
        Value::Int(_) => {
            return Err(RuntimeError::function_failed(
                "Math.Round",
                "rounding digits must be between 0 and 15",
            ))
        }
        other => return Err(RuntimeError::expected("Math.Round", "long", other.type_name())),
    };

    match &args[0] {
        Value::Int(_) | Value::UInt(_) => Ok(args[0].clone()),
        Value::Float(f) => {
            let scale = 10f64.powi(digits as i32);
            Ok(Value::Float(round_half_even(f * scale) / scale))
        }
        Value::Decimal(d) => Ok(Value::Decimal(d.round_dp(digits))),
        other => Err(not_a_number("Math.Round", other)),
    }
}

fn pow(args: &[Value]) -> Result<Value, RuntimeError> {
    let x = as_f64("Math.Pow", &args[0])?;
    let y = as_f64("Math.Pow", &args[1])?;
    Ok(Value::Float(x.powf(y)))
}

fn sqrt(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Float(as_f64("Math.Sqrt", &args[0])?.sqrt()))
}

fn sign(args: &[Value]) -> Result<Value, RuntimeError> {
    let s = match &args[0] {
        Value::Int(v) => v.signum(),
        Value::UInt(v) => (*v > 0) as i64,
        Value::Float(v) if v.is_nan() => {
            return Err(RuntimeError::function_failed(
                "Math.Sign",
                "the value is not a number (NaN)",
            ))
        }
        Value::Float(v) if *v == 0.0 => 0,
        Value::Float(v) if *v > 0.0 => 1,
        Value::Float(_) => -1,
        Value::Decimal(d) if d.is_zero() => 0,
        Value::Decimal(d) if d.is_sign_negative() => -1,
        Value::Decimal(_) => 1,
        other => return Err(not_a_number("Math.Sign", other)),
    };
    Ok(Value::Int(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn call(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        math_module()
            .function(name)
            .and_then(|f| f.find(args.len()))
            .expect("function exists")
            .call(args)
    }

    #[test]
    fn min_max() {
        assert_eq!(call("Min", &[Value::Int(1), Value::Int(2)]), Ok(Value::Int(1)));
        assert_eq!(call("Max", &[Value::Int(1), Value::Float(2.5)]), Ok(Value::Float(2.5)));
        assert!(matches!(
            call("Min", &[Value::string("a"), Value::Int(2)]),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn abs_overflow() {
        assert_eq!(call("Abs", &[Value::Int(-5)]), Ok(Value::Int(5)));
        assert_eq!(call("Abs", &[Value::Int(i64::MIN)]), Err(RuntimeError::overflow()));
    }

    #[test]
    fn round_to_even() {
        assert_eq!(call("Round", &[Value::Float(2.5)]), Ok(Value::Float(2.0)));
        assert_eq!(call("Round", &[Value::Float(3.5)]), Ok(Value::Float(4.0)));
        assert_eq!(call("Round", &[Value::Float(-2.5)]), Ok(Value::Float(-2.0)));
        assert_eq!(
            call("Round", &[Value::Decimal(Decimal::new(25, 1))]),
            Ok(Value::Decimal(Decimal::new(2, 0)))
        );
        assert_eq!(
            call("Round", &[Value::Decimal(Decimal::new(1999, 2)), Value::Int(1)]),
            Ok(Value::Decimal(Decimal::new(200, 1)))
        );
        assert_eq!(call("Round", &[Value::Int(7)]), Ok(Value::Int(7)));
    }

    #[test]
    fn floor_ceiling_truncate() {
        assert_eq!(call("Floor", &[Value::Float(-1.5)]), Ok(Value::Float(-2.0)));
        assert_eq!(call("Ceiling", &[Value::Float(1.2)]), Ok(Value::Float(2.0)));
        assert_eq!(call("Truncate", &[Value::Float(-1.7)]), Ok(Value::Float(-1.0)));
    }

    #[test]
    fn sign() {
        assert_eq!(call("Sign", &[Value::Float(0.0)]), Ok(Value::Int(0)));
        assert_eq!(call("Sign", &[Value::Int(-9)]), Ok(Value::Int(-1)));
        assert!(matches!(
            call("Sign", &[Value::Float(f64::NAN)]),
            Err(RuntimeError::FunctionFailed { .. })
        ));
    }

    #[test]
    fn clamp() {
        let args = [Value::Int(15), Value::Int(0), Value::Int(10)];
        assert_eq!(call("Clamp", &args), Ok(Value::Int(10)));
        let inverted = [Value::Int(5), Value::Int(10), Value::Int(0)];
        assert!(matches!(
            call("Clamp", &inverted),
            Err(RuntimeError::FunctionFailed { .. })
        ));
    }

    #[test]
    fn pow_and_sqrt_are_double() {
        assert_eq!(call("Pow", &[Value::Int(2), Value::Int(10)]), Ok(Value::Float(1024.0)));
        assert_eq!(call("Sqrt", &[Value::Int(9)]), Ok(Value::Float(3.0)));
    }
}
