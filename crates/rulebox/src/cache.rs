//! Named predicate cache.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::error::{CacheError, CompileError};
use crate::eval::Bags;
use crate::policy::Policy;
use crate::predicate::CompiledPredicate;
use crate::sandbox::Sandbox;

/// Thread-safe name to predicate registry.
///
/// Registering under an existing name swaps the stored `Arc`; an evaluation
/// already holding the old predicate finishes with it. There is no eviction.
#[derive(Debug, Default)]
pub struct PredicateCache {
    sandbox: Sandbox,
    entries: DashMap<String, Arc<CompiledPredicate>>,
}

impl PredicateCache {
    /// A cache compiling with the default sandbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache compiling with the given sandbox.
    pub fn with_sandbox(sandbox: Sandbox) -> Self {
        Self {
            sandbox,
            entries: DashMap::new(),
        }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Compile a snippet and store it under `name`.
    ///
    /// On a compile error the previous entry, if any, is left in place.
    pub fn register(&self, name: impl Into<String>, snippet: &str) -> Result<(), CompileError> {
        let predicate = self.sandbox.compile(snippet)?;
        self.insert(name.into(), predicate);
        Ok(())
    }

    /// Compile a snippet under a different policy and store it under `name`.
    pub fn register_with_policy(
        &self,
        name: impl Into<String>,
        snippet: &str,
        policy: impl Into<Arc<Policy>>,
    ) -> Result<(), CompileError> {
        let predicate = self.sandbox.clone().with_policy(policy).compile(snippet)?;
        self.insert(name.into(), predicate);
        Ok(())
    }

    /// Store an already compiled predicate.
    pub fn insert(&self, name: String, predicate: CompiledPredicate) {
        let id = predicate.id();
        let replaced = self
            .entries
            .insert(name.clone(), Arc::new(predicate))
            .is_some();
        info!(event = "predicate.registered", name = %name, id = %id, replaced);
    }

    /// Evaluate the predicate registered under `name`.
    pub fn evaluate(&self, name: &str, bags: &Bags) -> Result<bool, CacheError> {
        // The shard lock is released before evaluating.
        let predicate = self
            .get(name)
            .ok_or_else(|| CacheError::NotFound(name.to_string()))?;
        Ok(predicate.evaluate(bags)?)
    }

    pub fn get(&self, name: &str) -> Option<Arc<CompiledPredicate>> {
        self.entries.get(name).map(|r| Arc::clone(&r))
    }

    pub fn remove(&self, name: &str) -> Option<Arc<CompiledPredicate>> {
        self.entries.remove(name).map(|(_, predicate)| predicate)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;

    #[test]
    fn register_and_evaluate() {
        let cache = PredicateCache::new();
        cache.register("is-admin", "@item.Admin == true").unwrap();
        let bags = Bags::new().with_field("item", "Admin", "true");
        assert_eq!(cache.evaluate("is-admin", &bags), Ok(true));
        assert!(cache.contains("is-admin"));
        assert_eq!(cache.names(), vec!["is-admin".to_string()]);
    }

    #[test]
    fn unknown_name() {
        let cache = PredicateCache::new();
        assert_eq!(
            cache.evaluate("missing", &Bags::new()),
            Err(CacheError::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn runtime_errors_pass_through() {
        let cache = PredicateCache::new();
        cache.register("r", "@item.Nope == 1").unwrap();
        assert_eq!(
            cache.evaluate("r", &Bags::new()),
            Err(CacheError::Runtime(RuntimeError::property_not_found("item", "Nope")))
        );
    }

    #[test]
    fn failed_register_keeps_previous_entry() {
        let cache = PredicateCache::new();
        cache.register("rule", "true").unwrap();
        let before = cache.get("rule").unwrap().id();
        assert!(cache.register("rule", "Environment.UserName == \"x\"").is_err());
        assert_eq!(cache.get("rule").unwrap().id(), before);
    }

    #[test]
    fn overwrite_and_remove() {
        let cache = PredicateCache::new();
        cache.register("rule", "true").unwrap();
        let old = cache.get("rule").unwrap();
        cache.register("rule", "false").unwrap();
        assert_eq!(cache.len(), 1);
        // The old predicate stays usable by whoever holds it.
        assert_eq!(old.evaluate(&Bags::new()), Ok(true));
        assert_eq!(cache.evaluate("rule", &Bags::new()), Ok(false));
        assert!(cache.remove("rule").is_some());
        assert!(cache.is_empty());
    }

    #[test]
    fn register_with_host_policy() {
        let cache = PredicateCache::new();
        let policy = Policy::new().deny_identifier("Secret");
        assert!(cache.register_with_policy("s", "@item.Secret == 1", policy).is_err());
        assert!(cache.register("s", "@item.Secret == 1").is_ok());
    }
}
