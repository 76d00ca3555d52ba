//! Error types for compiling and evaluating predicates.

use thiserror::Error;

use crate::types::ValueType;

/// A single reason the policy checker rejected a snippet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum PolicyViolation {
    /// A qualified name resolved to a namespace outside the allow-list.
    #[error("namespace '{0}' is not allowed")]
    DisallowedNamespace(String),

    /// A deny-listed identifier appeared anywhere in the expression.
    #[error("'{0}' is not allowed in a predicate")]
    EnvironmentalTypeUsed(String),

    /// A type-introspection call or `typeof` expression.
    #[error("reflection is not allowed in a predicate")]
    ReflectionUsed,
}

fn join_violations(violations: &[PolicyViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors detected while turning snippet text into a compiled predicate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("snippet is empty")]
    EmptySnippet,

    #[error("syntax error: {0}")]
    SyntaxError(String),

    #[error("policy violation: {}", join_violations(.0))]
    PolicyViolation(Vec<PolicyViolation>),

    #[error("predicate must produce a bool, but produces {0}")]
    NonBooleanResult(ValueType),

    #[error("bind error: {0}")]
    BindError(String),
}

impl CompileError {
    /// The policy violations, if this is a policy rejection.
    pub fn violations(&self) -> &[PolicyViolation] {
        match self {
            CompileError::PolicyViolation(v) => v,
            _ => &[],
        }
    }

    pub(crate) fn bind(message: impl Into<String>) -> Self {
        CompileError::BindError(message.into())
    }
}

/// Errors raised while evaluating a compiled predicate.
///
/// Every message is built from a fixed template; no text from an underlying
/// library error is passed through.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("the property '{field}' does not exist on '{bag}'")]
    PropertyNotFound { bag: String, field: String },

    #[error("{name} failed: {detail}")]
    FunctionFailed { name: String, detail: String },

    #[error("cannot evaluate {operation}: {detail}")]
    TypeMismatch { operation: String, detail: String },

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("unexpected evaluation failure: {0}")]
    Unexpected(String),
}

impl RuntimeError {
    pub fn property_not_found(bag: impl Into<String>, field: impl Into<String>) -> Self {
        RuntimeError::PropertyNotFound {
            bag: bag.into(),
            field: field.into(),
        }
    }

    pub fn function_failed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        RuntimeError::FunctionFailed {
            name: name.into(),
            detail: detail.into(),
        }
    }

    pub fn type_mismatch(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        RuntimeError::TypeMismatch {
            operation: operation.into(),
            detail: detail.into(),
        }
    }

    /// Type mismatch for an argument of the wrong kind.
    pub fn expected(operation: impl Into<String>, expected: &str, actual: &str) -> Self {
        Self::type_mismatch(operation, format!("expected {}, got {}", expected, actual))
    }

    pub fn arithmetic(detail: impl Into<String>) -> Self {
        RuntimeError::Arithmetic(detail.into())
    }

    pub fn overflow() -> Self {
        Self::arithmetic("value was either too large or too small")
    }

    pub fn division_by_zero() -> Self {
        Self::arithmetic("attempted to divide by zero")
    }
}

/// Errors returned by the named-predicate cache.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    #[error("predicate '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Errors loading a policy or sandbox configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid namespace '{0}'")]
    InvalidNamespace(String),

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("invalid bag name '{0}'")]
    InvalidBag(String),
}

/// Either half of the compile-then-evaluate pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
