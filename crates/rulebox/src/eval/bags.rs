//! Named parameter bags supplied to an evaluation.

use std::collections::HashMap;

use super::coerce::{coerce, CoercionOptions, RawValue};
use super::Value;

/// One named bag of coerced field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bag {
    fields: HashMap<String, Value>,
}

impl Bag {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field value. Field names are case-sensitive.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over field names and values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

/// The ordered set of bags an evaluation sees.
///
/// Values are coerced when they are inserted, never again afterwards. Bag
/// names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct Bags {
    bags: Vec<(String, Bag)>,
    options: CoercionOptions,
}

impl Bags {
    /// Create an empty set with default coercion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set with the given coercion options.
    pub fn with_options(options: CoercionOptions) -> Self {
        Self {
            bags: Vec::new(),
            options,
        }
    }

    /// Add (or extend) a bag from an iterator of raw fields.
    pub fn with_bag<I, K, V>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RawValue>,
    {
        self.insert_bag(name, fields);
        self
    }

    /// Add a single raw field to a bag, creating the bag if needed.
    pub fn with_field(
        mut self,
        bag: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<RawValue>,
    ) -> Self {
        self.insert_field(bag, field, value);
        self
    }

    /// Add (or extend) a bag from an iterator of raw fields.
    pub fn insert_bag<I, K, V>(&mut self, name: impl Into<String>, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RawValue>,
    {
        let options = self.options.clone();
        let bag = self.bag_mut(name.into());
        for (field, value) in fields {
            bag.fields
                .insert(field.into(), coerce(value.into(), &options));
        }
    }

    /// Add a single raw field to a bag, creating the bag if needed.
    pub fn insert_field(
        &mut self,
        bag: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<RawValue>,
    ) {
        let value = coerce(value.into(), &self.options);
        self.bag_mut(bag.into()).fields.insert(field.into(), value);
    }

    fn bag_mut(&mut self, name: String) -> &mut Bag {
        let index = match self
            .bags
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(index) => index,
            None => {
                self.bags.push((name, Bag::new()));
                self.bags.len() - 1
            }
        };
        &mut self.bags[index].1
    }

    /// Look up a bag by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&Bag> {
        self.bags
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, bag)| bag)
    }

    /// Names of the bags, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bags.iter().map(|(name, _)| name.as_str())
    }

    pub fn options(&self) -> &CoercionOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.bags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_coerced_on_insert() {
        let bags = Bags::new().with_bag("item", [("Id", "1"), ("Name", "John Doe")]);
        let item = bags.get("item").unwrap();
        assert_eq!(item.get("Id"), Some(&Value::Int(1)));
        assert_eq!(item.get("Name"), Some(&Value::string("John Doe")));
    }

    #[test]
    fn bag_names_ignore_case_fields_do_not() {
        let bags = Bags::new()
            .with_field("Item", "Admin", true)
            .with_field("ITEM", "Id", 7i64);
        assert_eq!(bags.len(), 1);
        let item = bags.get("item").unwrap();
        assert_eq!(item.get("Admin"), Some(&Value::Bool(true)));
        assert_eq!(item.get("admin"), None);
        assert_eq!(bags.names().collect::<Vec<_>>(), vec!["Item"]);
    }

    #[test]
    fn options_apply_to_every_insert() {
        let bags = Bags::with_options(CoercionOptions {
            single_char_as_char: false,
        })
        .with_field("item", "Initial", "J");
        assert_eq!(
            bags.get("item").unwrap().get("Initial"),
            Some(&Value::string("J"))
        );
    }
}
