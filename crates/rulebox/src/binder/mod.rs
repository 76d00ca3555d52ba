//! Name resolution and static typing.
//!
//! The binder turns a policy-checked tree into a [`BoundExpr`]:
//!
//! - lambda parameters shadow everything, then bag names, then modules
//! - `bag.Field` becomes a field read, checked against the bag's declared
//!   fields only in strict mode
//! - `Module.Name` becomes a constant, `Module.F(...)` a static call
//! - `seq.All(x => ...)` and `seq.Any(x => ...)` become quantifiers
//! - any other member is an instance member, matched by name and arity and
//!   dispatched on the receiver's runtime type
//!
//! Static types are tracked so that a predicate which can never produce a
//! bool is rejected before it runs.

mod bound;

use std::str::FromStr;

use rulebox_parser::{BinaryOp, Expr, Literal, SpannedExpr, UnaryOp};
use rust_decimal::Decimal;

use crate::error::CompileError;
use crate::eval::Value;
use crate::ext::linq_ext::LINQ_MODULE;
use crate::functions::{Module, Overload};
use crate::policy::Policy;
use crate::schema::BagSchema;
use crate::types::ValueType;

pub use bound::{BoundExpr, BoundMember, QuantifierKind};

type Bind = Result<(BoundExpr, ValueType), CompileError>;

/// Binds expressions against a bag schema and a policy's registry.
pub struct Binder<'a> {
    schema: &'a BagSchema,
    policy: &'a Policy,
    strict_fields: bool,
    /// Lambda parameters in scope with their slots, innermost last.
    scopes: Vec<(String, usize)>,
    next_slot: usize,
}

impl<'a> Binder<'a> {
    pub fn new(schema: &'a BagSchema, policy: &'a Policy) -> Self {
        Self {
            schema,
            policy,
            strict_fields: false,
            scopes: Vec::new(),
            next_slot: 0,
        }
    }

    /// Reject fields a bag does not declare.
    pub fn with_strict_fields(mut self, strict: bool) -> Self {
        self.strict_fields = strict;
        self
    }

    /// Bind a whole predicate. The result must be `bool`, or `dynamic` and
    /// checked when evaluated.
    pub fn bind(mut self, expr: &SpannedExpr) -> Bind {
        let (bound, ty) = self.bind_expr(expr)?;
        match ty {
            ValueType::Bool | ValueType::Dynamic => Ok((bound, ty)),
            other => Err(CompileError::NonBooleanResult(other)),
        }
    }

    fn bind_expr(&mut self, expr: &SpannedExpr) -> Bind {
        match &expr.node {
            Expr::Literal(lit) => bind_literal(lit),
            Expr::Ident(name) => self.bind_ident(name),
            Expr::Member { target, name } => self.bind_member(target, name),
            Expr::Call { callee, args } => self.bind_call(callee, args),
            Expr::Index { target, index } => self.bind_index(target, index),
            Expr::Unary { op, operand } => self.bind_unary(*op, operand),
            Expr::Binary { op, left, right } => self.bind_binary(*op, left, right),
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => self.bind_conditional(cond, then_expr, else_expr),
            Expr::Array(elements) => {
                let elements = elements
                    .iter()
                    .map(|e| self.bind_expr(e).map(|(b, _)| b))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((BoundExpr::Array(elements), ValueType::List))
            }
            Expr::Lambda { .. } => Err(CompileError::bind(
                "a lambda is only allowed as the argument of All or Any",
            )),
            Expr::TypeOf(_) => Err(CompileError::bind("typeof is not supported")),
        }
    }

    fn local(&self, name: &str) -> Option<usize> {
        self.scopes
            .iter()
            .rev()
            .find(|(param, _)| param == name)
            .map(|(_, slot)| *slot)
    }

    fn bind_ident(&mut self, name: &str) -> Bind {
        if let Some(slot) = self.local(name) {
            return Ok((BoundExpr::Local(slot), ValueType::Dynamic));
        }
        if self.schema.is_bag(name) {
            return Err(CompileError::bind(format!(
                "bag '{}' cannot be used as a value; read one of its fields",
                name
            )));
        }
        let registry = self.policy.registry();
        if let Some((module, value)) = registry.imported_constant(name) {
            self.require_module(module)?;
            return Ok((BoundExpr::Constant(value.clone()), value.value_type()));
        }
        if registry.module(name).is_some() {
            return Err(CompileError::bind(format!("'{}' is a type, not a value", name)));
        }
        Err(CompileError::bind(format!("unknown identifier '{}'", name)))
    }

    /// The module a member chain's target names, unless the chain is rooted
    /// at data.
    fn module_for(&self, target: &SpannedExpr) -> Option<&'a Module> {
        let path = target.node.dotted_path()?;
        let root = path.first()?;
        if self.local(root).is_some() || self.schema.is_bag(root) {
            return None;
        }
        self.policy.registry().module(&path.join("."))
    }

    fn require_module(&self, module: &Module) -> Result<(), CompileError> {
        if self.policy.is_namespace_allowed(module.tag()) {
            Ok(())
        } else {
            Err(CompileError::bind(format!(
                "namespace '{}' is not allowed",
                module.tag()
            )))
        }
    }

    fn bind_member(&mut self, target: &SpannedExpr, name: &str) -> Bind {
        if let Expr::Ident(root) = &target.node {
            if self.local(root).is_none() {
                if let Some(bag) = self.schema.get(root) {
                    if self.strict_fields && !bag.declares(name) {
                        return Err(CompileError::bind(format!(
                            "'{}' has no field '{}'",
                            bag.name, name
                        )));
                    }
                    let field = BoundExpr::Field {
                        bag: bag.name.clone(),
                        field: name.to_string(),
                    };
                    return Ok((field, ValueType::Dynamic));
                }
            }
        }

        if let Some(module) = self.module_for(target) {
            self.require_module(module)?;
            let value = module.constant(name).ok_or_else(|| {
                CompileError::bind(format!(
                    "'{}' has no member '{}'",
                    module.display_name(),
                    name
                ))
            })?;
            return Ok((BoundExpr::Constant(value.clone()), value.value_type()));
        }

        let receiver = self.bind_expr(target)?;
        self.bind_instance(receiver, name, &[], true)
    }

    fn bind_call(&mut self, callee: &SpannedExpr, args: &[SpannedExpr]) -> Bind {
        match &callee.node {
            Expr::Ident(name) => {
                if self.local(name).is_some() {
                    return Err(CompileError::bind(format!("'{}' is not callable", name)));
                }
                let registry = self.policy.registry();
                let (module, function) = registry.imported_function(name).ok_or_else(|| {
                    CompileError::bind(format!("unknown function '{}'", name))
                })?;
                self.require_module(module)?;
                let qualified = format!("{}.{}", module.display_name(), name);
                self.bind_static(qualified, &function.overloads, args)
            }
            Expr::Member { target, name } => {
                if let Some(module) = self.module_for(target) {
                    self.require_module(module)?;
                    let qualified = format!("{}.{}", module.display_name(), name);
                    let function = module.function(name).ok_or_else(|| {
                        CompileError::bind(format!("unknown function '{}'", qualified))
                    })?;
                    return self.bind_static(qualified, &function.overloads, args);
                }

                if let (Some(kind), [arg]) = (QuantifierKind::from_name(name), args) {
                    if let Expr::Lambda { param, body } = &arg.node {
                        return self.bind_quantifier(kind, target, param, body);
                    }
                }

                let receiver = self.bind_expr(target)?;
                let args = args
                    .iter()
                    .map(|a| self.bind_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.bind_instance(receiver, name, &args, false)
            }
            _ => Err(CompileError::bind("expression is not callable")),
        }
    }

    fn bind_static(&mut self, name: String, overloads: &[Overload], args: &[SpannedExpr]) -> Bind {
        let (args, types): (Vec<_>, Vec<_>) = args
            .iter()
            .map(|a| self.bind_expr(a))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();

        let overload = overloads
            .iter()
            .find(|o| o.arity == args.len())
            .ok_or_else(|| {
                CompileError::bind(format!(
                    "no overload of '{}' takes {} argument(s)",
                    name,
                    args.len()
                ))
            })?;
        let ty = overload.result_type(&types).ok_or_else(|| {
            CompileError::bind(format!(
                "'{}' cannot be applied to ({})",
                name,
                type_list(&types)
            ))
        })?;

        let call = BoundExpr::Call {
            name,
            overload: overload.clone(),
            args,
        };
        Ok((call, ty))
    }

    fn bind_instance(
        &mut self,
        (receiver, receiver_type): (BoundExpr, ValueType),
        name: &str,
        args: &[(BoundExpr, ValueType)],
        property: bool,
    ) -> Bind {
        let types: Vec<_> = args.iter().map(|(_, t)| *t).collect();
        let members = self.policy.registry().members(name);

        let mut candidates = Vec::new();
        let mut result: Option<ValueType> = None;
        let mut blocked = None;
        for member in members {
            if member.property != property || !member.receiver.accepts_type(receiver_type) {
                continue;
            }
            let Some(overload) = member.find(args.len()) else {
                continue;
            };
            let Some(ty) = overload.result_type(&types) else {
                continue;
            };
            if !self.policy.is_namespace_allowed(&member.module) {
                blocked = Some(member.module.as_str());
                continue;
            }
            result = Some(match result {
                Some(prev) if prev != ty => ValueType::Dynamic,
                _ => ty,
            });
            candidates.push(BoundMember {
                receiver: member.receiver,
                qualified_name: member.qualified_name(),
                overload: overload.clone(),
            });
        }

        let Some(ty) = result else {
            let kind = if property { "property" } else { "method" };
            return Err(CompileError::bind(match blocked {
                Some(module) => format!(
                    "'{}' belongs to namespace '{}', which is not allowed",
                    name, module
                ),
                None if property => {
                    format!("'{}' has no {} '{}'", receiver_type, kind, name)
                }
                None => format!(
                    "'{}' has no {} '{}' taking {} argument(s)",
                    receiver_type,
                    kind,
                    name,
                    args.len()
                ),
            }));
        };

        let member = BoundExpr::Member {
            name: name.to_string(),
            receiver: Box::new(receiver),
            candidates,
            args: args.iter().map(|(b, _)| b.clone()).collect(),
        };
        Ok((member, ty))
    }

    fn bind_quantifier(
        &mut self,
        kind: QuantifierKind,
        target: &SpannedExpr,
        param: &str,
        body: &SpannedExpr,
    ) -> Bind {
        if !self.policy.is_namespace_allowed(LINQ_MODULE) {
            return Err(CompileError::bind(format!(
                "'{}' belongs to namespace '{}', which is not allowed",
                kind.name(),
                LINQ_MODULE
            )));
        }

        let (receiver, receiver_type) = self.bind_expr(target)?;
        if !matches!(
            receiver_type,
            ValueType::List | ValueType::String | ValueType::Json | ValueType::Dynamic
        ) {
            return Err(CompileError::bind(format!(
                "'{}' is not a sequence and has no method '{}'",
                receiver_type,
                kind.name()
            )));
        }

        let slot = self.next_slot;
        self.next_slot += 1;
        self.scopes.push((param.to_string(), slot));
        let body = self.bind_expr(body);
        self.scopes.pop();
        let (body, body_type) = body?;

        if !matches!(body_type, ValueType::Bool | ValueType::Dynamic) {
            return Err(CompileError::bind(format!(
                "the lambda passed to {} must return bool, not {}",
                kind.name(),
                body_type
            )));
        }

        let quantifier = BoundExpr::Quantifier {
            kind,
            receiver: Box::new(receiver),
            slot,
            body: Box::new(body),
        };
        Ok((quantifier, ValueType::Bool))
    }

    fn bind_index(&mut self, target: &SpannedExpr, index: &SpannedExpr) -> Bind {
        let (target, target_type) = self.bind_expr(target)?;
        let (index, index_type) = self.bind_expr(index)?;

        let ty = match (target_type, index_type) {
            (ValueType::List | ValueType::Dynamic, t) if is_index_type(t) => ValueType::Dynamic,
            (ValueType::String, t) if is_index_type(t) => ValueType::Char,
            (ValueType::Json, t) if is_index_type(t) || t == ValueType::String => ValueType::Json,
            (ValueType::Dynamic, ValueType::String) => ValueType::Dynamic,
            (t, i) => {
                return Err(CompileError::bind(format!(
                    "cannot index '{}' with '{}'",
                    t, i
                )))
            }
        };

        let bound = BoundExpr::Index {
            target: Box::new(target),
            index: Box::new(index),
        };
        Ok((bound, ty))
    }

    fn bind_unary(&mut self, op: UnaryOp, operand: &SpannedExpr) -> Bind {
        let (operand, ty) = self.bind_expr(operand)?;
        let result = match (op, ty) {
            (UnaryOp::Not, ValueType::Bool | ValueType::Dynamic) => ValueType::Bool,
            (UnaryOp::Neg, ValueType::UInt) => ValueType::Int,
            (UnaryOp::Neg, t) if t.is_numeric() || t.is_dynamic() => t,
            (op, t) => {
                let symbol = if op == UnaryOp::Not { "!" } else { "-" };
                return Err(CompileError::bind(format!(
                    "operator '{}' cannot be applied to '{}'",
                    symbol, t
                )));
            }
        };
        let bound = BoundExpr::Unary {
            op,
            operand: Box::new(operand),
        };
        Ok((bound, result))
    }

    fn bind_binary(&mut self, op: BinaryOp, left: &SpannedExpr, right: &SpannedExpr) -> Bind {
        let (left, lt) = self.bind_expr(left)?;
        let (right, rt) = self.bind_expr(right)?;

        let mismatch = || {
            CompileError::bind(format!(
                "operator '{}' cannot be applied to '{}' and '{}'",
                op.symbol(),
                lt,
                rt
            ))
        };

        let ty = match op {
            BinaryOp::And | BinaryOp::Or => {
                if is_boolish(lt) && is_boolish(rt) {
                    ValueType::Bool
                } else {
                    return Err(mismatch());
                }
            }
            BinaryOp::Eq | BinaryOp::Ne => ValueType::Bool,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if is_orderable(lt, rt) {
                    ValueType::Bool
                } else {
                    return Err(mismatch());
                }
            }
            BinaryOp::Add if lt == ValueType::String || rt == ValueType::String => ValueType::String,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if lt.is_dynamic() && rt.is_dynamic() {
                    ValueType::Dynamic
                } else if op == BinaryOp::Add && (lt.is_dynamic() || rt.is_dynamic()) {
                    // `field + x` may be a concatenation.
                    ValueType::Dynamic
                } else {
                    lt.promote(rt).ok_or_else(mismatch)?
                }
            }
        };

        let bound = BoundExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        Ok((bound, ty))
    }

    fn bind_conditional(
        &mut self,
        cond: &SpannedExpr,
        then_expr: &SpannedExpr,
        else_expr: &SpannedExpr,
    ) -> Bind {
        let (cond, ct) = self.bind_expr(cond)?;
        if !is_boolish(ct) {
            return Err(CompileError::bind(format!(
                "condition must be bool, not '{}'",
                ct
            )));
        }
        let (then_expr, tt) = self.bind_expr(then_expr)?;
        let (else_expr, et) = self.bind_expr(else_expr)?;

        let ty = match (tt, et) {
            (a, b) if a == b => a,
            (ValueType::Null, t) | (t, ValueType::Null) => t,
            (ValueType::Dynamic, _) | (_, ValueType::Dynamic) => ValueType::Dynamic,
            (a, b) => a.promote(b).ok_or_else(|| {
                CompileError::bind(format!(
                    "conditional branches have incompatible types '{}' and '{}'",
                    a, b
                ))
            })?,
        };

        let bound = BoundExpr::Conditional {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        };
        Ok((bound, ty))
    }
}

fn bind_literal(lit: &Literal) -> Bind {
    let value = match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::UInt(u) => Value::UInt(*u),
        Literal::Float(f) => Value::Float(*f),
        Literal::Decimal(text) => Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map(Value::Decimal)
            .map_err(|_| CompileError::bind(format!("'{}m' is not a valid decimal", text)))?,
        Literal::Char(c) => Value::Char(*c),
        Literal::String(s) => Value::string(s.as_str()),
    };
    let ty = value.value_type();
    Ok((BoundExpr::Constant(value), ty))
}

fn is_boolish(t: ValueType) -> bool {
    matches!(t, ValueType::Bool | ValueType::Dynamic)
}

fn is_index_type(t: ValueType) -> bool {
    matches!(t, ValueType::Int | ValueType::UInt | ValueType::Dynamic)
}

fn is_orderable(a: ValueType, b: ValueType) -> bool {
    use ValueType::*;
    match (a, b) {
        (Dynamic, _) | (_, Dynamic) => true,
        (a, b) if a.is_numeric() && b.is_numeric() => true,
        (String, String) | (Char, Char) | (DateTime, DateTime) => true,
        _ => false,
    }
}

fn type_list(types: &[ValueType]) -> String {
    types
        .iter()
        .map(|t| t.display_name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BagDecl;

    fn bind_with(source: &str, schema: &BagSchema, strict: bool) -> Bind {
        let ast = rulebox_parser::parse(source).into_result().expect("parses");
        let policy = Policy::new();
        Binder::new(schema, &policy)
            .with_strict_fields(strict)
            .bind(&ast)
    }

    fn bind(source: &str) -> Bind {
        bind_with(source, &BagSchema::default(), false)
    }

    fn bind_err(source: &str) -> String {
        match bind(source) {
            Err(CompileError::BindError(msg)) => msg,
            other => panic!("expected bind error for {}, got {:?}", source, other),
        }
    }

    #[test]
    fn fields_are_dynamic() {
        let (bound, ty) = bind("@item.Id == 1").unwrap();
        assert_eq!(ty, ValueType::Bool);
        match bound {
            BoundExpr::Binary { left, .. } => assert!(matches!(
                *left,
                BoundExpr::Field { ref bag, ref field } if bag == "item" && field == "Id"
            )),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bag_name_is_case_insensitive_and_canonical() {
        let (bound, _) = bind("ITEM.Admin").unwrap();
        assert!(matches!(bound, BoundExpr::Field { ref bag, .. } if bag == "item"));
    }

    #[test]
    fn dynamic_top_level_is_accepted() {
        let (_, ty) = bind("@claims.Read").unwrap();
        assert_eq!(ty, ValueType::Dynamic);
    }

    #[test]
    fn non_boolean_result() {
        assert_eq!(
            bind("1 + 2").unwrap_err(),
            CompileError::NonBooleanResult(ValueType::Int)
        );
        assert_eq!(
            bind("\"a\"").unwrap_err(),
            CompileError::NonBooleanResult(ValueType::String)
        );
        assert_eq!(
            bind("Math.Max(1, 2.5)").unwrap_err(),
            CompileError::NonBooleanResult(ValueType::Float)
        );
    }

    #[test]
    fn static_calls_and_constants() {
        assert!(bind("Math.Min(1, 2) == 1").is_ok());
        assert!(bind("Min(1, 2) == 1").is_ok());
        assert!(bind("Math.PI > 3").is_ok());
        assert!(bind("RegexOptions.IgnoreCase == 1").is_ok());
        assert!(bind_err("Math.Nope(1) == 1").contains("unknown function"));
        assert!(bind_err("Math.Abs(1, 2) == 1").contains("no overload"));
        assert!(bind_err("Math.Abs(\"x\") == 1").contains("cannot be applied"));
    }

    #[test]
    fn instance_members() {
        assert!(bind("\"abc\".Length == 3").is_ok());
        assert!(bind("@item.Name.Contains(\"J\")").is_ok());
        assert!(bind_err("\"abc\".Year == 3").contains("has no property"));
        assert!(bind_err("\"abc\".Contains() == true").contains("taking 0 argument"));
    }

    #[test]
    fn quantifiers_scope_their_parameter() {
        assert!(bind("new[] { 1, 2 }.All(x => x > 0)").is_ok());
        assert!(bind("new[] { 1 }.Any(x => new[] { 2 }.Any(y => x < y))").is_ok());
        assert!(bind_err("new[] { 1 }.All(x => x > 0) && x > 0").contains("unknown identifier 'x'"));
        assert!(bind_err("new[] { 1 }.All(x => 1)").contains("must return bool"));
        assert!(bind_err("Math.Abs(x => x) == 1").contains("lambda"));
    }

    #[test]
    fn lambda_parameter_shadows_bag() {
        let (bound, _) = bind("new[] { 1 }.Any(item => item == 1)").unwrap();
        match bound {
            BoundExpr::Quantifier { body, .. } => match *body {
                BoundExpr::Binary { left, .. } => assert!(matches!(*left, BoundExpr::Local(0))),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bag_wins_over_module() {
        let schema = BagSchema::default().with_bag(BagDecl::new("Math"));
        let (bound, ty) = bind_with("Math.Abs", &schema, false).unwrap();
        assert_eq!(ty, ValueType::Dynamic);
        assert!(matches!(bound, BoundExpr::Field { ref field, .. } if field == "Abs"));
    }

    #[test]
    fn bare_bag_is_an_error() {
        assert!(bind_err("item == null").contains("cannot be used as a value"));
    }

    #[test]
    fn strict_fields() {
        let schema = BagSchema::empty().with_bag(BagDecl::with_fields("item", ["Id"]));
        assert!(bind_with("item.Id == 1", &schema, true).is_ok());
        assert!(bind_with("item.Nope == 1", &schema, false).is_ok());
        assert!(matches!(
            bind_with("item.Nope == 1", &schema, true),
            Err(CompileError::BindError(msg)) if msg.contains("has no field 'Nope'")
        ));
    }

    #[test]
    fn operator_typing() {
        assert!(bind_err("1 < \"a\"").contains("operator '<'"));
        assert!(bind_err("!1").contains("operator '!'"));
        assert!(bind_err("1 && true").contains("operator '&&'"));
        assert!(bind("\"a\" + 1 == \"a1\"").is_ok());
        assert!(bind("(@item.Admin ? 1 : 2.5) > 1").is_ok());
        assert!(bind("19.99m > 10").is_ok());
    }

    #[test]
    fn unknown_names() {
        assert!(bind_err("Foo.Bar == 1").contains("unknown identifier 'Foo'"));
        assert!(bind_err("Frobnicate(1)").contains("unknown function"));
        assert!(bind_err("Math == 1").contains("is a type"));
    }
}
