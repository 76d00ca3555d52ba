//! Builtin function registry.
//!
//! Every callable an expression can reach lives here, tagged with the module
//! it belongs to so the policy can allow or refuse it. Static functions and
//! constants hang off a [`Module`] (`Math.Abs`, `RegexOptions.IgnoreCase`);
//! instance members are dispatched on the receiver's runtime type
//! (`name.Contains("J")`, `created.Year`).
//!
//! The registry is assembled when a policy is built and never changes while
//! predicates compiled against it are alive.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RuntimeError;
use crate::eval::Value;
use crate::types::ValueType;

/// A function implementation.
///
/// For instance members the receiver is passed as the first argument.
/// Implementations must be pure: no I/O, no shared mutable state, running
/// time bounded by the size of the arguments.
pub type FunctionImpl = Arc<dyn Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync>;

/// How an overload's static result type is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    /// Always this type.
    Fixed(ValueType),
    /// The numeric promotion of the argument types (`Math.Max(1, 2.5)` is a
    /// double).
    Promoted,
}

/// A function overload with its implementation.
#[derive(Clone)]
pub struct Overload {
    /// The number of arguments, not counting a member's receiver.
    pub arity: usize,
    pub result: ResultType,
    pub implementation: FunctionImpl,
}

impl Overload {
    /// Create a new overload.
    pub fn new<F>(arity: usize, result: ResultType, implementation: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Self {
            arity,
            result,
            implementation: Arc::new(implementation),
        }
    }

    /// Call this overload with the given arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.implementation)(args)
    }

    /// Static result type for the given argument types.
    ///
    /// Returns `None` when the argument types statically rule the overload
    /// out (a string passed to a numeric function).
    pub fn result_type(&self, args: &[ValueType]) -> Option<ValueType> {
        match self.result {
            ResultType::Fixed(t) => Some(t),
            ResultType::Promoted => {
                let (first, rest) = args.split_first()?;
                if !(first.is_numeric() || first.is_dynamic()) {
                    return None;
                }
                rest.iter().try_fold(*first, |acc, t| acc.promote(*t))
            }
        }
    }
}

impl std::fmt::Debug for Overload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overload")
            .field("arity", &self.arity)
            .field("result", &self.result)
            .finish()
    }
}

/// A static function with all its overloads.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub overloads: Vec<Overload>,
}

impl Function {
    /// Create a new function with no overloads.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
        }
    }

    /// Add an overload with a fixed result type.
    pub fn with_overload<F>(mut self, arity: usize, result: ValueType, implementation: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.overloads
            .push(Overload::new(arity, ResultType::Fixed(result), implementation));
        self
    }

    /// Add an overload whose result is the promoted numeric argument type.
    pub fn with_promoted_overload<F>(mut self, arity: usize, implementation: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.overloads
            .push(Overload::new(arity, ResultType::Promoted, implementation));
        self
    }

    /// Find the overload taking `arity` arguments.
    pub fn find(&self, arity: usize) -> Option<&Overload> {
        self.overloads.iter().find(|o| o.arity == arity)
    }

    /// The arities this function accepts, for diagnostics.
    pub fn arities(&self) -> Vec<usize> {
        let mut arities: Vec<_> = self.overloads.iter().map(|o| o.arity).collect();
        arities.sort_unstable();
        arities.dedup();
        arities
    }
}

/// A namespace of static functions and constants.
#[derive(Debug, Clone)]
pub struct Module {
    tag: String,
    aliases: Vec<String>,
    static_import: bool,
    functions: HashMap<String, Function>,
    constants: HashMap<String, Value>,
}

impl Module {
    /// Create a module with its fully qualified tag (`System.Math`).
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            aliases: Vec::new(),
            static_import: false,
            functions: HashMap::new(),
            constants: HashMap::new(),
        }
    }

    /// Add a short name the module can be referenced by (`Math`).
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Make the module's functions and constants callable unqualified.
    pub fn with_static_import(mut self) -> Self {
        self.static_import = true;
        self
    }

    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.insert(function.name.clone(), function);
        self
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn is_static_import(&self) -> bool {
        self.static_import
    }

    /// The short name used in diagnostics: the first alias, or the tag.
    pub fn display_name(&self) -> &str {
        self.aliases
            .first()
            .map(String::as_str)
            .unwrap_or(self.tag.as_str())
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.constants.get(name)
    }

    /// Whether `name` refers to this module by tag or alias.
    pub fn is_named(&self, name: &str) -> bool {
        self.tag == name || self.aliases.iter().any(|a| a == name)
    }

    fn merge(&mut self, other: Module) {
        for alias in other.aliases {
            if !self.aliases.contains(&alias) {
                self.aliases.push(alias);
            }
        }
        self.static_import |= other.static_import;
        self.functions.extend(other.functions);
        self.constants.extend(other.constants);
    }
}

/// The kinds of value an instance member can be called on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    String,
    DateTime,
    Json,
    /// Lists, strings (as characters) and JSON arrays.
    Sequence,
    /// Any value, including null.
    Any,
}

impl Receiver {
    /// Owner name used in diagnostics.
    pub fn display_name(&self) -> &'static str {
        match self {
            Receiver::String => "String",
            Receiver::DateTime => "DateTime",
            Receiver::Json => "JsonElement",
            Receiver::Sequence => "Enumerable",
            Receiver::Any => "Object",
        }
    }

    /// Whether a runtime value can receive this member.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Receiver::String => matches!(value, Value::String(_)),
            Receiver::DateTime => matches!(value, Value::DateTime(_)),
            Receiver::Json => matches!(value, Value::Json(_)),
            Receiver::Sequence => match value {
                Value::List(_) | Value::String(_) => true,
                Value::Json(json) => json.is_array(),
                _ => false,
            },
            Receiver::Any => true,
        }
    }

    /// Whether a value of static type `t` might receive this member.
    pub fn accepts_type(&self, t: ValueType) -> bool {
        if t.is_dynamic() {
            return true;
        }
        match self {
            Receiver::String => t == ValueType::String,
            Receiver::DateTime => t == ValueType::DateTime,
            Receiver::Json => t == ValueType::Json,
            Receiver::Sequence => matches!(t, ValueType::List | ValueType::String | ValueType::Json),
            Receiver::Any => true,
        }
    }
}

/// An instance method or property.
#[derive(Debug, Clone)]
pub struct Member {
    pub name: String,
    /// Tag of the module the member belongs to, checked against the policy.
    pub module: String,
    pub receiver: Receiver,
    /// Properties are accessed without parentheses (`s.Length`).
    pub property: bool,
    pub overloads: Vec<Overload>,
}

impl Member {
    /// Create a method.
    pub fn method(name: impl Into<String>, module: impl Into<String>, receiver: Receiver) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            receiver,
            property: false,
            overloads: Vec::new(),
        }
    }

    /// Create a property with its getter.
    pub fn property<F>(
        name: impl Into<String>,
        module: impl Into<String>,
        receiver: Receiver,
        result: ValueType,
        getter: F,
    ) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            module: module.into(),
            receiver,
            property: true,
            overloads: vec![Overload::new(0, ResultType::Fixed(result), getter)],
        }
    }

    /// Add a method overload taking `arity` arguments after the receiver.
    pub fn with_overload<F>(mut self, arity: usize, result: ValueType, implementation: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    {
        self.overloads
            .push(Overload::new(arity, ResultType::Fixed(result), implementation));
        self
    }

    pub fn find(&self, arity: usize) -> Option<&Overload> {
        self.overloads.iter().find(|o| o.arity == arity)
    }

    /// Qualified name for diagnostics (`String.Contains`).
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.receiver.display_name(), self.name)
    }
}

/// Registry of all modules and instance members.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    modules: Vec<Module>,
    members: HashMap<String, Vec<Member>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard catalog: math, string, char, convert, regex, JSON, LINQ,
    /// date-time and object members.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for module in crate::ext::standard_modules() {
            registry.add_module(module);
        }
        for member in crate::ext::standard_members() {
            registry.add_member(member);
        }
        registry
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.add_module(module);
        self
    }

    /// Register a module. A module with the same tag is merged into.
    pub fn add_module(&mut self, module: Module) {
        match self.modules.iter_mut().find(|m| m.tag == module.tag) {
            Some(existing) => existing.merge(module),
            None => self.modules.push(module),
        }
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.add_member(member);
        self
    }

    /// Register an instance member. Earlier registrations win when several
    /// receivers accept the same value.
    pub fn add_member(&mut self, member: Member) {
        self.members
            .entry(member.name.clone())
            .or_default()
            .push(member);
    }

    /// Find a module by tag or alias.
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.is_named(name))
    }

    /// Iterate over all modules.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    /// Expand a module alias in the first segment of a dotted path.
    ///
    /// `Math.Abs` becomes `System.Math.Abs`; paths that do not start with an
    /// alias are returned unchanged.
    pub fn expand_alias(&self, path: &str) -> String {
        let (first, rest) = match path.split_once('.') {
            Some((first, rest)) => (first, Some(rest)),
            None => (path, None),
        };

        match self
            .modules
            .iter()
            .find(|m| m.aliases.iter().any(|a| a == first))
        {
            Some(module) => match rest {
                Some(rest) => format!("{}.{}", module.tag, rest),
                None => module.tag.clone(),
            },
            None => path.to_string(),
        }
    }

    /// Find an unqualified function among the static-imported modules.
    pub fn imported_function(&self, name: &str) -> Option<(&Module, &Function)> {
        self.modules
            .iter()
            .filter(|m| m.static_import)
            .find_map(|m| m.function(name).map(|f| (m, f)))
    }

    /// Find an unqualified constant among the static-imported modules.
    pub fn imported_constant(&self, name: &str) -> Option<(&Module, &Value)> {
        self.modules
            .iter()
            .filter(|m| m.static_import)
            .find_map(|m| m.constant(name).map(|c| (m, c)))
    }

    /// All instance members with the given name.
    pub fn members(&self, name: &str) -> &[Member] {
        self.members.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}
