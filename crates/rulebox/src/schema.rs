//! Parameter bag declarations.
//!
//! A [`BagSchema`] names the bags a predicate may read. Member chains rooted
//! at one of these names are data access and skip the namespace check; every
//! other chain is treated as a namespace reference.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The bags used by default.
pub const DEFAULT_BAGS: &[&str] = &["item", "claims"];

/// One declared bag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BagDecl {
    pub name: String,
    /// Declared field names. `None` accepts any field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeSet<String>>,
}

impl BagDecl {
    /// A bag that accepts any field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: None,
        }
    }

    /// A bag with a fixed set of fields.
    pub fn with_fields<I, S>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            fields: Some(fields.into_iter().map(Into::into).collect()),
        }
    }

    /// Whether `field` is declared. Bags without a field list declare
    /// everything.
    pub fn declares(&self, field: &str) -> bool {
        self.fields.as_ref().map_or(true, |f| f.contains(field))
    }
}

/// The set of bags a predicate is compiled against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BagSchema {
    bags: Vec<BagDecl>,
}

impl Default for BagSchema {
    fn default() -> Self {
        DEFAULT_BAGS
            .iter()
            .fold(Self::empty(), |schema, name| schema.with_bag(BagDecl::new(*name)))
    }
}

impl BagSchema {
    /// A schema with no bags.
    pub fn empty() -> Self {
        Self { bags: Vec::new() }
    }

    /// Add a bag, replacing one with the same name.
    pub fn with_bag(mut self, bag: BagDecl) -> Self {
        self.bags.retain(|b| !b.name.eq_ignore_ascii_case(&bag.name));
        self.bags.push(bag);
        self
    }

    /// Look up a bag by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&BagDecl> {
        self.bags.iter().find(|b| b.name.eq_ignore_ascii_case(name))
    }

    pub fn is_bag(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn bags(&self) -> &[BagDecl] {
        &self.bags
    }
}
