//! Static policy check over a parsed expression.
//!
//! The checker walks the whole tree and collects every violation instead of
//! stopping at the first one:
//!
//! - **Namespaces**: a member chain `A.B.C` whose root is not a bag, a lambda
//!   parameter or a static-imported value is a reference to namespace `A.B`
//!   (with a module alias in `A` expanded). The reference must be allowed by
//!   the policy.
//! - **Deny-list**: every identifier token is looked up, qualified or not.
//! - **Reflection**: introspection names and `typeof` are rejected by shape.
//! - **Iteration**: the grammar has no loop node; see [`PolicyChecker::visit`].

use std::collections::HashSet;

use rulebox_parser::{Expr, SpannedExpr};

use super::deny::is_reflection_name;
use super::Policy;
use crate::error::PolicyViolation;
use crate::schema::BagSchema;

/// Check an expression, returning every violation in source order.
pub fn check(ast: &SpannedExpr, policy: &Policy, schema: &BagSchema) -> Result<(), Vec<PolicyViolation>> {
    let mut checker = PolicyChecker::new(policy, schema);
    checker.visit(ast);
    checker.finish()
}

struct PolicyChecker<'a> {
    policy: &'a Policy,
    schema: &'a BagSchema,
    /// Lambda parameters in scope, innermost last.
    params: Vec<&'a str>,
    violations: Vec<(usize, PolicyViolation)>,
}

impl<'a> PolicyChecker<'a> {
    fn new(policy: &'a Policy, schema: &'a BagSchema) -> Self {
        Self {
            policy,
            schema,
            params: Vec::new(),
            violations: Vec::new(),
        }
    }

    fn report(&mut self, at: usize, violation: PolicyViolation) {
        self.violations.push((at, violation));
    }

    fn finish(mut self) -> Result<(), Vec<PolicyViolation>> {
        if self.violations.is_empty() {
            return Ok(());
        }
        self.violations.sort_by_key(|(at, _)| *at);
        let mut seen = HashSet::new();
        let violations: Vec<_> = self
            .violations
            .into_iter()
            .map(|(_, v)| v)
            .filter(|v| seen.insert(v.clone()))
            .collect();
        Err(violations)
    }

    fn visit(&mut self, expr: &'a SpannedExpr) {
        let at = expr.span.start;

        // Expr has no loop or statement node, so iteration is ruled out by
        // the grammar. Any new variant must be classified here before this
        // match compiles again.
        match &expr.node {
            Expr::Literal(_) => {}
            Expr::Ident(name) => self.check_name(name, at),
            Expr::Member { target, name } => match expr.node.dotted_path() {
                Some(path) => self.check_chain(&path, at),
                None => {
                    self.visit(target);
                    self.check_name(name, at);
                }
            },
            Expr::Call { callee, args } => {
                self.visit(callee);
                for arg in args {
                    self.visit(arg);
                }
            }
            Expr::Index { target, index } => {
                self.visit(target);
                self.visit(index);
            }
            Expr::Unary { operand, .. } => self.visit(operand),
            Expr::Binary { left, right, .. } => {
                self.visit(left);
                self.visit(right);
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.visit(cond);
                self.visit(then_expr);
                self.visit(else_expr);
            }
            Expr::Array(elements) => {
                for element in elements {
                    self.visit(element);
                }
            }
            Expr::Lambda { param, body } => {
                self.check_name(param, at);
                self.params.push(param);
                self.visit(body);
                self.params.pop();
            }
            Expr::TypeOf(name) => {
                if !self.policy.reflection_allowed() {
                    self.report(at, PolicyViolation::ReflectionUsed);
                }
                for segment in name.split('.') {
                    self.check_deny(segment, at);
                }
            }
        }
    }

    /// Deny-list and reflection checks for one identifier token.
    fn check_name(&mut self, name: &str, at: usize) {
        if is_reflection_name(name) && !self.policy.reflection_allowed() {
            self.report(at, PolicyViolation::ReflectionUsed);
        }
        self.check_deny(name, at);
    }

    fn check_deny(&mut self, name: &str, at: usize) {
        if self.policy.is_denied(name) {
            self.report(at, PolicyViolation::EnvironmentalTypeUsed(name.to_string()));
        }
    }

    /// A chain of identifiers `a.b.c`.
    fn check_chain(&mut self, path: &[&str], at: usize) {
        for segment in path {
            self.check_name(segment, at);
        }

        let Some((root, _)) = path.split_first() else {
            return;
        };
        if self.is_value_root(root) {
            return;
        }

        let qualifier = path[..path.len() - 1].join(".");
        let namespace = self.policy.registry().expand_alias(&qualifier);
        if !self.policy.is_namespace_allowed(&namespace) {
            self.report(at, PolicyViolation::DisallowedNamespace(namespace));
        }
    }

    /// Roots that name data rather than a namespace. Bags win over any module
    /// of the same name.
    fn is_value_root(&self, root: &str) -> bool {
        self.params.iter().any(|p| *p == root)
            || self.schema.is_bag(root)
            || self.policy.registry().imported_constant(root).is_some()
    }
}
