//! Compiled predicates.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use rulebox_parser::SpannedExpr;
use tracing::debug;
use uuid::Uuid;

use crate::binder::BoundExpr;
use crate::error::RuntimeError;
use crate::eval::{BagActivation, Bags, Evaluator, Value};
use crate::policy::Policy;
use crate::schema::BagSchema;
use crate::types::ValueType;

/// A policy-checked, bound predicate.
///
/// Immutable once built. Cloning is cheap and every clone shares the same
/// tree, so a predicate can be handed to any number of threads and evaluated
/// without locking.
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    id: Uuid,
    source: Arc<str>,
    ast: Arc<SpannedExpr>,
    bound: Arc<BoundExpr>,
    result_type: ValueType,
    schema: Arc<BagSchema>,
    policy: Arc<Policy>,
}

impl CompiledPredicate {
    pub(crate) fn new(
        source: &str,
        ast: SpannedExpr,
        bound: BoundExpr,
        result_type: ValueType,
        schema: Arc<BagSchema>,
        policy: Arc<Policy>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            ast: Arc::new(ast),
            bound: Arc::new(bound),
            result_type,
            schema,
            policy,
        }
    }

    /// Identifies this compilation; two compiles of one snippet get
    /// different ids.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The checked syntax tree.
    pub fn ast(&self) -> &SpannedExpr {
        &self.ast
    }

    /// Statically known result type: `Bool`, or `Dynamic` when the result
    /// depends on bag contents.
    pub fn result_type(&self) -> ValueType {
        self.result_type
    }

    pub fn schema(&self) -> &BagSchema {
        &self.schema
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Evaluate against a set of bags.
    ///
    /// A builtin that panics is reported as [`RuntimeError::Unexpected`]
    /// with a fixed message; its payload is never passed on.
    pub fn evaluate(&self, bags: &Bags) -> Result<bool, RuntimeError> {
        let activation = BagActivation::new(bags);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            Evaluator::new(&activation).eval(&self.bound)
        }))
        .unwrap_or_else(|_| Err(RuntimeError::Unexpected("a builtin function panicked".to_string())))
        .and_then(|value| match value {
            Value::Bool(b) => Ok(b),
            other => Err(RuntimeError::expected("predicate", "bool", other.type_name())),
        });

        if let Err(e) = &result {
            debug!(event = "predicate.evaluation_failed", id = %self.id, error = %e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::error::RuntimeError;
    use crate::functions::{Function, Module};
    use crate::policy::Policy;
    use crate::types::ValueType;
    use crate::{Bags, Sandbox};

    #[test]
    fn evaluates_repeatedly() {
        let predicate = Sandbox::new().compile("@item.Id > 1").unwrap();
        let low = Bags::new().with_field("item", "Id", "1");
        let high = Bags::new().with_field("item", "Id", "2");
        assert_eq!(predicate.evaluate(&low), Ok(false));
        assert_eq!(predicate.evaluate(&high), Ok(true));
        assert_eq!(predicate.evaluate(&low), Ok(false));
    }

    #[test]
    fn dynamic_result_must_be_bool() {
        let predicate = Sandbox::new().compile("@item.Name").unwrap();
        assert_eq!(predicate.result_type(), ValueType::Dynamic);
        let bags = Bags::new().with_field("item", "Name", "John Doe");
        assert!(matches!(
            predicate.evaluate(&bags),
            Err(RuntimeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn panicking_builtin_is_contained() {
        let module = Module::new("Acme.Faulty")
            .with_alias("Faulty")
            .with_function(Function::new("Boom").with_overload(0, ValueType::Bool, |_| {
                panic!("internal detail")
            }));
        let policy = Policy::new().with_module(module);
        let predicate = Sandbox::new().with_policy(policy).compile("Faulty.Boom()").unwrap();
        assert_eq!(
            predicate.evaluate(&Bags::new()),
            Err(RuntimeError::Unexpected("a builtin function panicked".to_string()))
        );
    }

    #[test]
    fn clones_share_identity() {
        let predicate = Sandbox::new().compile("true").unwrap();
        let copy = predicate.clone();
        assert_eq!(predicate.id(), copy.id());
        assert_eq!(copy.source(), "true");
        assert_ne!(predicate.id(), Sandbox::new().compile("true").unwrap().id());
        assert_eq!(copy.evaluate(&Bags::new()), Ok(true));
    }
}
