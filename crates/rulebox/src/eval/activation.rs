//! Variable bindings for predicate evaluation.
//!
//! Bag fields come from the caller's [`Bags`]; lambda parameters are bound to
//! numbered slots by the binder and pushed as nested activations while a
//! quantifier runs.

use super::{Bags, Value};
use crate::error::RuntimeError;

/// Resolves bag fields and lambda slots during evaluation.
pub trait Activation: Send + Sync {
    /// Look up a field of a bag.
    fn field(&self, bag: &str, field: &str) -> Result<Value, RuntimeError>;

    /// Look up a lambda parameter slot.
    fn local(&self, slot: usize) -> Option<&Value>;
}

/// The root activation, backed by the caller's bags.
#[derive(Debug, Clone, Copy)]
pub struct BagActivation<'a> {
    bags: &'a Bags,
}

impl<'a> BagActivation<'a> {
    pub fn new(bags: &'a Bags) -> Self {
        Self { bags }
    }
}

impl Activation for BagActivation<'_> {
    fn field(&self, bag: &str, field: &str) -> Result<Value, RuntimeError> {
        // A bag that was not supplied behaves as an empty one.
        self.bags
            .get(bag)
            .and_then(|b| b.get(field))
            .cloned()
            .ok_or_else(|| RuntimeError::property_not_found(bag, field))
    }

    fn local(&self, _slot: usize) -> Option<&Value> {
        None
    }
}

/// A single lambda binding layered over a parent activation.
pub struct HierarchicalActivation<'a> {
    parent: &'a dyn Activation,
    slot: usize,
    value: Value,
}

impl<'a> HierarchicalActivation<'a> {
    pub fn new(parent: &'a dyn Activation, slot: usize, value: Value) -> Self {
        Self {
            parent,
            slot,
            value,
        }
    }
}

impl Activation for HierarchicalActivation<'_> {
    fn field(&self, bag: &str, field: &str) -> Result<Value, RuntimeError> {
        self.parent.field(bag, field)
    }

    fn local(&self, slot: usize) -> Option<&Value> {
        if slot == self.slot {
            Some(&self.value)
        } else {
            self.parent.local(slot)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_bag_reports_property_not_found() {
        let bags = Bags::new();
        let activation = BagActivation::new(&bags);
        assert_eq!(
            activation.field("claims", "Read"),
            Err(RuntimeError::property_not_found("claims", "Read"))
        );
    }

    #[test]
    fn nested_slots_shadow_by_index() {
        let bags = Bags::new().with_field("item", "Id", 1i64);
        let root = BagActivation::new(&bags);
        let outer = HierarchicalActivation::new(&root, 0, Value::Int(10));
        let inner = HierarchicalActivation::new(&outer, 1, Value::Int(20));

        assert_eq!(inner.local(0), Some(&Value::Int(10)));
        assert_eq!(inner.local(1), Some(&Value::Int(20)));
        assert_eq!(inner.local(2), None);
        assert_eq!(inner.field("item", "Id"), Ok(Value::Int(1)));
    }
}
