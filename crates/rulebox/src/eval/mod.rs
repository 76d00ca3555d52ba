//! Runtime values, parameter bags and the evaluator.

mod activation;
mod bags;
pub mod coerce;
mod evaluator;
pub(crate) mod numeric;
mod value;

pub use activation::{Activation, BagActivation, HierarchicalActivation};
pub use bags::{Bag, Bags};
pub use coerce::{coerce, CoercionOptions, RawValue};
pub use evaluator::Evaluator;
pub use value::Value;
