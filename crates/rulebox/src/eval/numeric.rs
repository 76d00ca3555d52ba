//! Numeric promotion and checked arithmetic.

use std::cmp::Ordering;

use rulebox_parser::BinaryOp;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::Value;
use crate::error::RuntimeError;

/// Two numeric operands promoted to a common representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum NumPair {
    Int(i64, i64),
    UInt(u64, u64),
    Float(f64, f64),
    Decimal(Decimal, Decimal),
}

pub(crate) fn to_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::UInt(u) => Some(*u as f64),
        Value::Float(f) => Some(*f),
        Value::Decimal(d) => d.to_f64(),
        _ => None,
    }
}

pub(crate) fn to_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::Int(i) => Some(Decimal::from(*i)),
        Value::UInt(u) => Some(Decimal::from(*u)),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

/// Mixed signed/unsigned operands: use the narrowest representation that
/// holds both values exactly.
fn mixed(signed: i64, unsigned: u64, signed_first: bool) -> NumPair {
    let pair = if let Ok(u) = i64::try_from(unsigned) {
        NumPair::Int(signed, u)
    } else if signed >= 0 {
        NumPair::UInt(signed as u64, unsigned)
    } else {
        NumPair::Decimal(Decimal::from(signed), Decimal::from(unsigned))
    };

    if signed_first {
        pair
    } else {
        pair.swap()
    }
}

/// Promote two values to a common numeric representation.
///
/// Floats win over everything, decimals over integers, and mixed
/// signedness picks whatever holds both operands exactly.
pub(crate) fn promote(a: &Value, b: &Value) -> Option<NumPair> {
    Some(match (a, b) {
        (Value::Int(x), Value::Int(y)) => NumPair::Int(*x, *y),
        (Value::UInt(x), Value::UInt(y)) => NumPair::UInt(*x, *y),
        (Value::Int(x), Value::UInt(y)) => mixed(*x, *y, true),
        (Value::UInt(x), Value::Int(y)) => mixed(*y, *x, false),
        (Value::Float(x), _) => NumPair::Float(*x, to_f64(b)?),
        (_, Value::Float(y)) => NumPair::Float(to_f64(a)?, *y),
        (Value::Decimal(x), _) => NumPair::Decimal(*x, to_decimal(b)?),
        (_, Value::Decimal(y)) => NumPair::Decimal(to_decimal(a)?, *y),
        _ => return None,
    })
}

impl NumPair {
    fn swap(self) -> Self {
        match self {
            NumPair::Int(a, b) => NumPair::Int(b, a),
            NumPair::UInt(a, b) => NumPair::UInt(b, a),
            NumPair::Float(a, b) => NumPair::Float(b, a),
            NumPair::Decimal(a, b) => NumPair::Decimal(b, a),
        }
    }

    /// Compare the two operands. `None` only when a NaN is involved.
    pub(crate) fn compare(&self) -> Option<Ordering> {
        match self {
            NumPair::Int(a, b) => Some(a.cmp(b)),
            NumPair::UInt(a, b) => Some(a.cmp(b)),
            NumPair::Float(a, b) => a.partial_cmp(b),
            NumPair::Decimal(a, b) => Some(a.cmp(b)),
        }
    }

    /// The smaller operand, in the promoted representation.
    pub(crate) fn min(&self) -> Value {
        self.pick(Ordering::Less)
    }

    /// The larger operand, in the promoted representation.
    pub(crate) fn max(&self) -> Value {
        self.pick(Ordering::Greater)
    }

    fn pick(&self, want: Ordering) -> Value {
        let first = matches!(self.compare(), Some(o) if o == want || o == Ordering::Equal);
        match (self, first) {
            (NumPair::Int(a, _), true) => Value::Int(*a),
            (NumPair::Int(_, b), false) => Value::Int(*b),
            (NumPair::UInt(a, _), true) => Value::UInt(*a),
            (NumPair::UInt(_, b), false) => Value::UInt(*b),
            // NaN propagates, as Math.Min/Math.Max do.
            (NumPair::Float(a, b), _) if a.is_nan() || b.is_nan() => Value::Float(f64::NAN),
            (NumPair::Float(a, _), true) => Value::Float(*a),
            (NumPair::Float(_, b), false) => Value::Float(*b),
            (NumPair::Decimal(a, _), true) => Value::Decimal(*a),
            (NumPair::Decimal(_, b), false) => Value::Decimal(*b),
        }
    }
}

/// Apply an arithmetic operator to two numeric values.
///
/// Returns `None` if the operands are not both numeric.
pub(crate) fn arithmetic(op: BinaryOp, a: &Value, b: &Value) -> Option<Result<Value, RuntimeError>> {
    let pair = promote(a, b)?;
    Some(match pair {
        NumPair::Int(x, y) => int_op(op, x, y).map(Value::Int),
        NumPair::UInt(x, y) => uint_op(op, x, y).map(Value::UInt),
        NumPair::Float(x, y) => float_op(op, x, y).map(Value::Float),
        NumPair::Decimal(x, y) => decimal_op(op, x, y).map(Value::Decimal),
    })
}

fn int_op(op: BinaryOp, x: i64, y: i64) -> Result<i64, RuntimeError> {
    let result = match op {
        BinaryOp::Add => x.checked_add(y),
        BinaryOp::Sub => x.checked_sub(y),
        BinaryOp::Mul => x.checked_mul(y),
        BinaryOp::Div | BinaryOp::Mod if y == 0 => return Err(RuntimeError::division_by_zero()),
        BinaryOp::Div => x.checked_div(y),
        BinaryOp::Mod => x.checked_rem(y),
        _ => return Err(non_arithmetic(op)),
    };
    result.ok_or_else(RuntimeError::overflow)
}

fn uint_op(op: BinaryOp, x: u64, y: u64) -> Result<u64, RuntimeError> {
    let result = match op {
        BinaryOp::Add => x.checked_add(y),
        BinaryOp::Sub => x.checked_sub(y),
        BinaryOp::Mul => x.checked_mul(y),
        BinaryOp::Div | BinaryOp::Mod if y == 0 => return Err(RuntimeError::division_by_zero()),
        BinaryOp::Div => x.checked_div(y),
        BinaryOp::Mod => x.checked_rem(y),
        _ => return Err(non_arithmetic(op)),
    };
    result.ok_or_else(RuntimeError::overflow)
}

fn float_op(op: BinaryOp, x: f64, y: f64) -> Result<f64, RuntimeError> {
    Ok(match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        BinaryOp::Mod => x % y,
        _ => return Err(non_arithmetic(op)),
    })
}

fn decimal_op(op: BinaryOp, x: Decimal, y: Decimal) -> Result<Decimal, RuntimeError> {
    let result = match op {
        BinaryOp::Add => x.checked_add(y),
        BinaryOp::Sub => x.checked_sub(y),
        BinaryOp::Mul => x.checked_mul(y),
        BinaryOp::Div | BinaryOp::Mod if y.is_zero() => {
            return Err(RuntimeError::division_by_zero())
        }
        BinaryOp::Div => x.checked_div(y),
        BinaryOp::Mod => x.checked_rem(y),
        _ => return Err(non_arithmetic(op)),
    };
    result.ok_or_else(RuntimeError::overflow)
}

fn non_arithmetic(op: BinaryOp) -> RuntimeError {
    RuntimeError::Unexpected(format!("'{}' is not an arithmetic operator", op.symbol()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(op: BinaryOp, a: Value, b: Value) -> Result<Value, RuntimeError> {
        arithmetic(op, &a, &b).expect("numeric operands")
    }

    #[test]
    fn integer_arithmetic_is_checked() {
        assert_eq!(apply(BinaryOp::Add, Value::Int(2), Value::Int(3)), Ok(Value::Int(5)));
        assert_eq!(
            apply(BinaryOp::Add, Value::Int(i64::MAX), Value::Int(1)),
            Err(RuntimeError::overflow())
        );
        assert_eq!(
            apply(BinaryOp::Div, Value::Int(1), Value::Int(0)),
            Err(RuntimeError::division_by_zero())
        );
        assert_eq!(
            apply(BinaryOp::Div, Value::Int(i64::MIN), Value::Int(-1)),
            Err(RuntimeError::overflow())
        );
        assert_eq!(apply(BinaryOp::Div, Value::Int(7), Value::Int(2)), Ok(Value::Int(3)));
        assert_eq!(apply(BinaryOp::Mod, Value::Int(-7), Value::Int(2)), Ok(Value::Int(-1)));
    }

    #[test]
    fn unsigned_underflow_is_an_error() {
        assert_eq!(
            apply(BinaryOp::Sub, Value::UInt(1), Value::UInt(2)),
            Err(RuntimeError::overflow())
        );
    }

    #[test]
    fn mixed_signedness() {
        assert_eq!(apply(BinaryOp::Add, Value::Int(-1), Value::UInt(2)), Ok(Value::Int(1)));
        assert_eq!(
            apply(BinaryOp::Add, Value::Int(1), Value::UInt(u64::MAX - 1)),
            Ok(Value::UInt(u64::MAX))
        );
        assert_eq!(
            apply(BinaryOp::Sub, Value::UInt(u64::MAX), Value::Int(-1)),
            Ok(Value::Decimal(Decimal::from(u64::MAX) + Decimal::ONE))
        );
    }

    #[test]
    fn float_division_follows_ieee() {
        assert_eq!(
            apply(BinaryOp::Div, Value::Float(1.0), Value::Int(0)),
            Ok(Value::Float(f64::INFINITY))
        );
    }

    #[test]
    fn decimal_arithmetic() {
        let a = Value::Decimal(Decimal::new(1999, 2));
        assert_eq!(
            apply(BinaryOp::Mul, a.clone(), Value::Int(2)),
            Ok(Value::Decimal(Decimal::new(3998, 2)))
        );
        assert_eq!(
            apply(BinaryOp::Div, a, Value::Decimal(Decimal::ZERO)),
            Err(RuntimeError::division_by_zero())
        );
    }

    #[test]
    fn non_numeric_operands() {
        assert!(arithmetic(BinaryOp::Add, &Value::from("a"), &Value::Int(1)).is_none());
        assert!(arithmetic(BinaryOp::Add, &Value::Float(1.0), &Value::from("a")).is_none());
    }

    #[test]
    fn min_max_promote() {
        let pair = promote(&Value::Int(1), &Value::Float(2.5)).unwrap();
        assert_eq!(pair.min(), Value::Float(1.0));
        assert_eq!(pair.max(), Value::Float(2.5));
    }
}
