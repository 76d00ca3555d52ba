//! Capability policy.
//!
//! A [`Policy`] decides which namespaces a predicate may reach and which
//! identifiers it may never mention. It also owns the builtin [`Registry`],
//! so every function a predicate can call is tagged with a namespace the
//! policy has an opinion on.
//!
//! Policies only grow: hosts can allow more namespaces and deny more
//! identifiers, but the default deny-list always applies.

mod checker;
mod config;
pub mod deny;

use std::collections::BTreeSet;

use rulebox_parser::SpannedExpr;

use crate::error::{ConfigError, PolicyViolation};
use crate::ext::INTRINSIC_MODULES;
use crate::functions::{Member, Module, Registry};
use crate::schema::BagSchema;

pub use checker::check;
pub use config::PolicyConfig;

/// Namespaces allowed by every policy.
pub const DEFAULT_ALLOWED_NAMESPACES: &[&str] = &[
    "System.Math",
    "System.String",
    "System.Char",
    "System.Text",
    "System.Linq",
    "System.Convert",
];

/// An immutable capability policy.
#[derive(Debug, Clone)]
pub struct Policy {
    allowed: BTreeSet<String>,
    denied: BTreeSet<String>,
    registry: Registry,
    reflection_allowed: bool,
    iteration_allowed: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allowed: DEFAULT_ALLOWED_NAMESPACES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            denied: deny::DEFAULT_DENIED.iter().map(|s| s.to_string()).collect(),
            registry: Registry::standard(),
            reflection_allowed: false,
            iteration_allowed: false,
        }
    }
}

impl Policy {
    /// The default policy: core namespaces, the full deny-list and the
    /// standard builtin catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a namespace and everything below it.
    pub fn allow_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.allowed.insert(namespace.into());
        self
    }

    /// Add an identifier to the deny-list.
    pub fn deny_identifier(mut self, name: impl Into<String>) -> Self {
        self.denied.insert(name.into());
        self
    }

    /// Register a host module and allow its namespace.
    pub fn with_module(mut self, module: Module) -> Self {
        self.allowed.insert(module.tag().to_string());
        self.registry.add_module(module);
        self
    }

    /// Register a host instance member and allow its namespace.
    pub fn with_member(mut self, member: Member) -> Self {
        self.allowed.insert(member.module.clone());
        self.registry.add_member(member);
        self
    }

    /// Build a policy from configuration, on top of the defaults.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = config
            .allowed_namespaces
            .iter()
            .fold(Self::default(), |p, ns| p.allow_namespace(ns.as_str()));
        Ok(config
            .denied_identifiers
            .iter()
            .fold(policy, |p, name| p.deny_identifier(name.as_str())))
    }

    pub fn allowed_namespaces(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    pub fn denied_identifiers(&self) -> impl Iterator<Item = &str> {
        self.denied.iter().map(String::as_str)
    }

    /// Whether a namespace reference is allowed: equal to an allowed entry
    /// or a dotted sub-path of one. `System.Mathematics` does not match
    /// `System.Math`.
    pub fn is_namespace_allowed(&self, path: &str) -> bool {
        self.allowed
            .iter()
            .map(String::as_str)
            .chain(INTRINSIC_MODULES.iter().copied())
            .any(|entry| {
                path == entry
                    || path
                        .strip_prefix(entry)
                        .is_some_and(|rest| rest.starts_with('.'))
            })
    }

    pub fn is_denied(&self, name: &str) -> bool {
        self.denied.contains(name)
    }

    pub fn reflection_allowed(&self) -> bool {
        self.reflection_allowed
    }

    pub fn iteration_allowed(&self) -> bool {
        self.iteration_allowed
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Check a parsed expression against this policy.
    pub fn check(&self, ast: &SpannedExpr, schema: &BagSchema) -> Result<(), Vec<PolicyViolation>> {
        check(ast, self, schema)
    }
}
