//! Policy configuration loaded by hosts.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sandbox::SandboxOptions;
use crate::schema::BagSchema;

/// Host configuration for a sandbox.
///
/// Everything here is added to the built-in defaults; nothing can remove a
/// default allowed namespace or denied identifier.
///
/// ```json
/// {
///   "allowed_namespaces": ["Acme.Rules"],
///   "denied_identifiers": ["Secret"],
///   "bags": [{ "name": "order", "fields": ["Total"] }],
///   "options": { "strict_fields": true }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub allowed_namespaces: Vec<String>,
    pub denied_identifiers: Vec<String>,
    /// Replaces the default `item`/`claims` bags when present.
    pub bags: Option<BagSchema>,
    pub options: SandboxOptions,
}

impl PolicyConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every name is well formed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ns) = self
            .allowed_namespaces
            .iter()
            .find(|ns| !ns.split('.').all(is_identifier))
        {
            return Err(ConfigError::InvalidNamespace(ns.clone()));
        }
        if let Some(name) = self.denied_identifiers.iter().find(|n| !is_identifier(n)) {
            return Err(ConfigError::InvalidIdentifier(name.clone()));
        }
        if let Some(bag) = self
            .bags
            .iter()
            .flat_map(|schema| schema.bags())
            .find(|b| !is_identifier(&b.name))
        {
            return Err(ConfigError::InvalidBag(bag.name.clone()));
        }
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
