//! Rulebox: a policy-gated sandbox for boolean predicates
//!
//! Rulebox compiles short, C#-flavoured boolean expressions written by
//! semi-trusted authors and evaluates them against caller-supplied data.
//! A snippet may only reach the namespaces its [`Policy`] allows, may never
//! mention a deny-listed capability, and cannot loop, so evaluation always
//! terminates and never touches the file system, network or process.
//!
//! # Quick Start
//!
//! ```
//! use rulebox::{Bags, Policy, Verdict};
//!
//! let bags = Bags::new()
//!     .with_field("item", "Id", "1")
//!     .with_field("item", "Name", "John Doe");
//!
//! let verdict = rulebox::run("@item.Id == 1 && @item.Name.Contains(\"J\")", Policy::new(), &bags);
//! assert_eq!(verdict, Verdict::Ok(true));
//!
//! let verdict = rulebox::run("Environment.UserName == \"admin\"", Policy::new(), &bags);
//! assert!(matches!(verdict, Verdict::Compile(_)));
//! ```
//!
//! # Pipeline
//!
//! - **Parser** (`rulebox-parser`): snippet text to AST
//! - **Policy checker**: namespaces, deny-list and reflection, all violations
//!   reported at once
//! - **Binder**: resolves bag fields, builtins and lambdas; rejects
//!   predicates that cannot produce a bool
//! - **Evaluator**: runs the bound tree against coerced [`Bags`]
//!
//! [`Sandbox`] holds a policy, bag schema and options and runs the first
//! three steps; [`PredicateCache`] stores compiled predicates by name.
//!
//! # Modules
//!
//! - `policy`: allow-list, deny-list and the checker
//! - `functions`, `ext`: the builtin registry and its modules
//! - `eval`: values, coercion, bags and the evaluator

mod cache;
mod predicate;
mod sandbox;

pub mod binder;
pub mod error;
pub mod eval;
pub mod ext;
pub mod functions;
pub mod policy;
pub mod schema;
pub mod types;

use std::sync::Arc;

pub use cache::PredicateCache;
pub use error::{CacheError, CompileError, ConfigError, Error, PolicyViolation, RuntimeError};
pub use eval::{Bag, Bags, CoercionOptions, RawValue, Value};
pub use functions::{Function, Member, Module, Receiver, Registry};
pub use policy::{Policy, PolicyConfig};
pub use predicate::CompiledPredicate;
pub use sandbox::{Sandbox, SandboxOptions, DEFAULT_MAX_SNIPPET_LEN};
pub use schema::{BagDecl, BagSchema};
pub use types::ValueType;

pub use rulebox_parser::{parse, ParseError};

/// Outcome of a one-shot compile and evaluate.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Ok(bool),
    Compile(CompileError),
    Runtime(RuntimeError),
}

impl Verdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, Verdict::Ok(_))
    }

    /// The boolean result, if evaluation succeeded.
    pub fn value(&self) -> Option<bool> {
        match self {
            Verdict::Ok(b) => Some(*b),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<bool, Error> {
        match self {
            Verdict::Ok(b) => Ok(b),
            Verdict::Compile(e) => Err(e.into()),
            Verdict::Runtime(e) => Err(e.into()),
        }
    }
}

impl From<Result<bool, RuntimeError>> for Verdict {
    fn from(result: Result<bool, RuntimeError>) -> Self {
        match result {
            Ok(b) => Verdict::Ok(b),
            Err(e) => Verdict::Runtime(e),
        }
    }
}

impl From<CompileError> for Verdict {
    fn from(e: CompileError) -> Self {
        Verdict::Compile(e)
    }
}

/// Compile a snippet against a policy and the default `item`/`claims` bags.
pub fn compile(
    snippet: &str,
    policy: impl Into<Arc<Policy>>,
) -> Result<CompiledPredicate, CompileError> {
    Sandbox::new().with_policy(policy).compile(snippet)
}

/// Evaluate a compiled predicate.
pub fn evaluate(predicate: &CompiledPredicate, bags: &Bags) -> Result<bool, RuntimeError> {
    predicate.evaluate(bags)
}

/// Compile and evaluate in one step.
pub fn run(snippet: &str, policy: impl Into<Arc<Policy>>, bags: &Bags) -> Verdict {
    Sandbox::new().with_policy(policy).run(snippet, bags)
}
