//! Tree-walking evaluator for bound predicates.
//!
//! The evaluator performs a depth-first walk of the bound tree. It supports:
//!
//! - arithmetic, comparison and logical operators
//! - short-circuit evaluation for `&&`, `||` and the conditional operator
//! - static and instance calls into the builtin registry
//! - `All`/`Any` quantifiers over finite sequences
//!
//! Errors are returned as [`RuntimeError`]s; nothing in here panics on bad
//! input.

use std::cmp::Ordering;

use rulebox_parser::{BinaryOp, UnaryOp};

use super::{numeric, Activation, HierarchicalActivation, Value};
use crate::binder::{BoundExpr, BoundMember, QuantifierKind};
use crate::error::RuntimeError;
use crate::ext::linq_ext;

/// The predicate evaluator.
///
/// Evaluates a bound tree against an activation. Holds no state of its own,
/// so one compiled predicate can be evaluated from many threads at once.
pub struct Evaluator<'a> {
    activation: &'a dyn Activation,
}

impl<'a> Evaluator<'a> {
    /// Create a new evaluator.
    pub fn new(activation: &'a dyn Activation) -> Self {
        Self { activation }
    }

    /// Evaluate an expression.
    pub fn eval(&self, expr: &BoundExpr) -> Result<Value, RuntimeError> {
        match expr {
            BoundExpr::Constant(v) => Ok(v.clone()),
            BoundExpr::Field { bag, field } => self.activation.field(bag, field),
            BoundExpr::Local(slot) => self.activation.local(*slot).cloned().ok_or_else(|| {
                RuntimeError::Unexpected(format!("lambda parameter {} is not bound", slot))
            }),
            BoundExpr::Array(elements) => Ok(Value::list(
                elements
                    .iter()
                    .map(|e| self.eval(e))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            BoundExpr::Unary { op, operand } => self.eval_unary(*op, operand),
            BoundExpr::Binary { op, left, right } => self.eval_binary(*op, left, right),
            BoundExpr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.eval_bool("?:", cond)? {
                    self.eval(then_expr)
                } else {
                    self.eval(else_expr)
                }
            }
            BoundExpr::Index { target, index } => self.eval_index(target, index),
            BoundExpr::Call { overload, args, .. } => {
                let args = self.eval_args(args)?;
                overload.call(&args)
            }
            BoundExpr::Member {
                name,
                receiver,
                candidates,
                args,
            } => self.eval_member(name, receiver, candidates, args),
            BoundExpr::Quantifier {
                kind,
                receiver,
                slot,
                body,
            } => self.eval_quantifier(*kind, receiver, *slot, body),
        }
    }

    fn eval_args(&self, args: &[BoundExpr]) -> Result<Vec<Value>, RuntimeError> {
        args.iter().map(|a| self.eval(a)).collect()
    }

    fn eval_bool(&self, operation: &str, expr: &BoundExpr) -> Result<bool, RuntimeError> {
        let value = self.eval(expr)?;
        value
            .as_bool()
            .ok_or_else(|| RuntimeError::expected(operation, "bool", value.type_name()))
    }

    fn eval_unary(&self, op: UnaryOp, operand: &BoundExpr) -> Result<Value, RuntimeError> {
        match op {
            UnaryOp::Not => Ok(Value::Bool(!self.eval_bool("!", operand)?)),
            UnaryOp::Neg => match self.eval(operand)? {
                Value::Int(i) => i.checked_neg().map(Value::Int).ok_or_else(RuntimeError::overflow),
                Value::UInt(u) => 0i64
                    .checked_sub_unsigned(u)
                    .map(Value::Int)
                    .ok_or_else(RuntimeError::overflow),
                Value::Float(f) => Ok(Value::Float(-f)),
                Value::Decimal(d) => Ok(Value::Decimal(-d)),
                other => Err(RuntimeError::expected("-", "a number", other.type_name())),
            },
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        left: &BoundExpr,
        right: &BoundExpr,
    ) -> Result<Value, RuntimeError> {
        match op {
            BinaryOp::And => {
                Ok(Value::Bool(self.eval_bool("&&", left)? && self.eval_bool("&&", right)?))
            }
            BinaryOp::Or => {
                Ok(Value::Bool(self.eval_bool("||", left)? || self.eval_bool("||", right)?))
            }
            _ => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                apply_binary(op, &l, &r)
            }
        }
    }

    fn eval_index(&self, target: &BoundExpr, index: &BoundExpr) -> Result<Value, RuntimeError> {
        let target = self.eval(target)?;
        let index = self.eval(index)?;

        if let (Value::Json(json), Value::String(key)) = (&target, &index) {
            return json
                .get(key.as_ref())
                .map(|v| Value::from(v.clone()))
                .ok_or_else(|| {
                    RuntimeError::function_failed("JsonElement[]", "the requested key was not present")
                });
        }

        let i = match &index {
            Value::Int(i) => *i,
            Value::UInt(u) => i64::try_from(*u).unwrap_or(i64::MAX),
            other => {
                return Err(RuntimeError::expected("[]", "an integer index", other.type_name()))
            }
        };

        let (len, item) = match &target {
            Value::List(items) => (items.len(), checked(i, items.len()).map(|i| items[i].clone())),
            Value::String(s) => {
                let len = s.chars().count();
                let item = checked(i, len).and_then(|i| s.chars().nth(i)).map(Value::Char);
                (len, item)
            }
            Value::Json(json) if json.is_array() => {
                let items = json.as_array().map(Vec::as_slice).unwrap_or(&[]);
                (
                    items.len(),
                    checked(i, items.len()).map(|i| Value::from(items[i].clone())),
                )
            }
            other => return Err(RuntimeError::expected("[]", "a sequence", other.type_name())),
        };

        item.ok_or(RuntimeError::IndexOutOfRange { index: i, len })
    }

    fn eval_member(
        &self,
        name: &str,
        receiver: &BoundExpr,
        candidates: &[BoundMember],
        args: &[BoundExpr],
    ) -> Result<Value, RuntimeError> {
        let receiver = self.eval(receiver)?;
        let member = candidates
            .iter()
            .find(|c| c.receiver.accepts(&receiver))
            .ok_or_else(|| {
                RuntimeError::type_mismatch(
                    name,
                    format!("'{}' has no member '{}'", receiver.type_name(), name),
                )
            })?;

        let mut values = Vec::with_capacity(args.len() + 1);
        values.push(receiver);
        for arg in args {
            values.push(self.eval(arg)?);
        }
        member.overload.call(&values)
    }

    fn eval_quantifier(
        &self,
        kind: QuantifierKind,
        receiver: &BoundExpr,
        slot: usize,
        body: &BoundExpr,
    ) -> Result<Value, RuntimeError> {
        let items = linq_ext::elements(&self.eval(receiver)?)?;
        for item in items {
            let scope = HierarchicalActivation::new(self.activation, slot, item);
            let matched = Evaluator::new(&scope).eval_bool(kind.name(), body)?;
            match (kind, matched) {
                (QuantifierKind::All, false) => return Ok(Value::Bool(false)),
                (QuantifierKind::Any, true) => return Ok(Value::Bool(true)),
                _ => {}
            }
        }
        Ok(Value::Bool(kind == QuantifierKind::All))
    }
}

fn checked(index: i64, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|i| *i < len)
}

/// Apply a non-logical binary operator to two evaluated operands.
pub(crate) fn apply_binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(l.equals(r))),
        BinaryOp::Ne => Ok(Value::Bool(!l.equals(r))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let result = match l.compare(r) {
                Some(ord) => match op {
                    BinaryOp::Lt => ord == Ordering::Less,
                    BinaryOp::Le => ord != Ordering::Greater,
                    BinaryOp::Gt => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                },
                // NaN compares false with everything.
                None if l.is_ordered_with(r) => false,
                None => {
                    return Err(RuntimeError::type_mismatch(
                        op.symbol(),
                        format!("cannot compare {} and {}", l.type_name(), r.type_name()),
                    ))
                }
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::Add if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) => {
            Ok(Value::string(format!("{}{}", l, r)))
        }
        _ => numeric::arithmetic(op, l, r).unwrap_or_else(|| {
            Err(RuntimeError::type_mismatch(
                op.symbol(),
                format!("cannot apply to {} and {}", l.type_name(), r.type_name()),
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{BagActivation, Bags};
    use crate::functions::Registry;
    use std::sync::Arc;

    fn c(v: impl Into<Value>) -> Box<BoundExpr> {
        Box::new(BoundExpr::Constant(v.into()))
    }

    fn binary(op: BinaryOp, l: Box<BoundExpr>, r: Box<BoundExpr>) -> BoundExpr {
        BoundExpr::Binary { op, left: l, right: r }
    }

    fn eval_with(bags: &Bags, expr: &BoundExpr) -> Result<Value, RuntimeError> {
        let activation = BagActivation::new(bags);
        Evaluator::new(&activation).eval(expr)
    }

    fn eval(expr: &BoundExpr) -> Result<Value, RuntimeError> {
        eval_with(&Bags::new(), expr)
    }

    #[test]
    fn arithmetic_and_comparison() {
        let sum = binary(BinaryOp::Add, c(1i64), c(2.5));
        assert_eq!(eval(&sum), Ok(Value::Float(3.5)));

        let lt = binary(BinaryOp::Lt, c(1i64), c(2u64));
        assert_eq!(eval(&lt), Ok(Value::Bool(true)));

        let nan = binary(BinaryOp::Gt, c(f64::NAN), c(1i64));
        assert_eq!(eval(&nan), Ok(Value::Bool(false)));

        let bad = binary(BinaryOp::Lt, c(true), c(1i64));
        assert!(matches!(eval(&bad), Err(RuntimeError::TypeMismatch { .. })));
    }

    #[test]
    fn division_by_zero() {
        let div = binary(BinaryOp::Div, c(1i64), c(0i64));
        assert_eq!(eval(&div), Err(RuntimeError::division_by_zero()));
    }

    #[test]
    fn string_concatenation() {
        let concat = binary(BinaryOp::Add, c("a"), c(1i64));
        assert_eq!(eval(&concat), Ok(Value::string("a1")));
        let with_null = binary(BinaryOp::Add, c(Value::Null), c("b"));
        assert_eq!(eval(&with_null), Ok(Value::string("b")));
    }

    #[test]
    fn logical_operators_short_circuit() {
        // The right side would fail if evaluated.
        let missing = Box::new(BoundExpr::Field {
            bag: "item".to_string(),
            field: "Missing".to_string(),
        });
        let or = binary(BinaryOp::Or, c(true), missing.clone());
        assert_eq!(eval(&or), Ok(Value::Bool(true)));
        let and = binary(BinaryOp::And, c(false), missing.clone());
        assert_eq!(eval(&and), Ok(Value::Bool(false)));
        let and = binary(BinaryOp::And, c(true), missing);
        assert_eq!(
            eval(&and),
            Err(RuntimeError::property_not_found("item", "Missing"))
        );
    }

    #[test]
    fn fields_come_from_bags() {
        let bags = Bags::new().with_field("item", "Id", "1");
        let expr = binary(
            BinaryOp::Eq,
            Box::new(BoundExpr::Field {
                bag: "item".to_string(),
                field: "Id".to_string(),
            }),
            c(1i64),
        );
        assert_eq!(eval_with(&bags, &expr), Ok(Value::Bool(true)));
    }

    #[test]
    fn indexing() {
        let list = Box::new(BoundExpr::Array(vec![
            BoundExpr::Constant(Value::Int(10)),
            BoundExpr::Constant(Value::Int(20)),
        ]));
        let ok = BoundExpr::Index { target: list.clone(), index: c(1i64) };
        assert_eq!(eval(&ok), Ok(Value::Int(20)));
        let out = BoundExpr::Index { target: list, index: c(2i64) };
        assert_eq!(eval(&out), Err(RuntimeError::IndexOutOfRange { index: 2, len: 2 }));

        let s = BoundExpr::Index { target: c("héllo"), index: c(1i64) };
        assert_eq!(eval(&s), Ok(Value::Char('é')));

        let json = Value::Json(Arc::new(serde_json::json!({ "a": 1 })));
        let key = BoundExpr::Index { target: c(json), index: c("a") };
        assert_eq!(eval(&key), Ok(Value::from(serde_json::json!(1))));
    }

    #[test]
    fn quantifiers() {
        let seq = Box::new(BoundExpr::Array(vec![
            BoundExpr::Constant(Value::Int(1)),
            BoundExpr::Constant(Value::Int(2)),
        ]));
        let positive = Box::new(binary(BinaryOp::Gt, Box::new(BoundExpr::Local(0)), c(0i64)));
        let big = Box::new(binary(BinaryOp::Gt, Box::new(BoundExpr::Local(0)), c(1i64)));

        let all = BoundExpr::Quantifier {
            kind: QuantifierKind::All,
            receiver: seq.clone(),
            slot: 0,
            body: positive,
        };
        assert_eq!(eval(&all), Ok(Value::Bool(true)));

        let all_big = BoundExpr::Quantifier {
            kind: QuantifierKind::All,
            receiver: seq.clone(),
            slot: 0,
            body: big.clone(),
        };
        assert_eq!(eval(&all_big), Ok(Value::Bool(false)));

        let any_big = BoundExpr::Quantifier {
            kind: QuantifierKind::Any,
            receiver: seq,
            slot: 0,
            body: big.clone(),
        };
        assert_eq!(eval(&any_big), Ok(Value::Bool(true)));

        let empty_all = BoundExpr::Quantifier {
            kind: QuantifierKind::All,
            receiver: Box::new(BoundExpr::Array(vec![])),
            slot: 0,
            body: big,
        };
        assert_eq!(eval(&empty_all), Ok(Value::Bool(true)));
    }

    #[test]
    fn member_dispatch_by_runtime_type() {
        let registry = Registry::standard();
        let candidates: Vec<_> = registry
            .members("Length")
            .iter()
            .map(|m| BoundMember {
                receiver: m.receiver,
                qualified_name: m.qualified_name(),
                overload: m.find(0).unwrap().clone(),
            })
            .collect();
        let length = |receiver: Box<BoundExpr>| BoundExpr::Member {
            name: "Length".to_string(),
            receiver,
            candidates: candidates.clone(),
            args: vec![],
        };

        assert_eq!(eval(&length(c("John Doe"))), Ok(Value::Int(8)));
        let list = Box::new(BoundExpr::Array(vec![BoundExpr::Constant(Value::Null)]));
        assert_eq!(eval(&length(list)), Ok(Value::Int(1)));
        assert!(matches!(
            eval(&length(c(5i64))),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }
}
