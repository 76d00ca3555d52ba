//! The compile pipeline: parse, policy check, bind.
//!
//! A [`Sandbox`] pairs a [`Policy`] with a [`BagSchema`] and compiles
//! snippets against them. It plays the part an environment plays in a
//! compiler: configured once, then used for any number of compiles.

use std::sync::Arc;

use rulebox_parser::{ParseOptions, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::binder::Binder;
use crate::error::{CompileError, ConfigError};
use crate::eval::{Bags, CoercionOptions, RawValue};
use crate::policy::{Policy, PolicyConfig};
use crate::predicate::CompiledPredicate;
use crate::schema::BagSchema;
use crate::Verdict;

/// Default limit on snippet length, in bytes.
pub const DEFAULT_MAX_SNIPPET_LEN: usize = 4096;

/// Limits and switches for compilation and bag construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxOptions {
    /// Longest accepted snippet, in bytes.
    pub max_snippet_len: usize,
    /// Deepest accepted expression nesting.
    pub max_depth: usize,
    /// Reject fields a bag schema does not declare at compile time.
    pub strict_fields: bool,
    pub coercion: CoercionOptions,
}

impl Default for SandboxOptions {
    fn default() -> Self {
        Self {
            max_snippet_len: DEFAULT_MAX_SNIPPET_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
            strict_fields: false,
            coercion: CoercionOptions::default(),
        }
    }
}

/// Compiles snippets against a fixed policy and bag schema.
///
/// # Example
///
/// ```
/// use rulebox::Sandbox;
///
/// let sandbox = Sandbox::new();
/// let predicate = sandbox.compile("@item.Id == Math.Min(1, 2)").unwrap();
///
/// let bags = sandbox.bags().with_field("item", "Id", "1");
/// assert_eq!(predicate.evaluate(&bags), Ok(true));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Sandbox {
    policy: Arc<Policy>,
    schema: Arc<BagSchema>,
    options: SandboxOptions,
}

impl Sandbox {
    /// A sandbox with the default policy, the `item`/`claims` bags and
    /// default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: impl Into<Arc<Policy>>) -> Self {
        self.policy = policy.into();
        self
    }

    pub fn with_schema(mut self, schema: impl Into<Arc<BagSchema>>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn with_options(mut self, options: SandboxOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a sandbox from host configuration.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        let sandbox = Self::new()
            .with_policy(Policy::from_config(config)?)
            .with_options(config.options.clone());
        Ok(match &config.bags {
            Some(schema) => sandbox.with_schema(schema.clone()),
            None => sandbox,
        })
    }

    pub fn policy(&self) -> &Arc<Policy> {
        &self.policy
    }

    pub fn schema(&self) -> &Arc<BagSchema> {
        &self.schema
    }

    pub fn options(&self) -> &SandboxOptions {
        &self.options
    }

    /// An empty set of bags using this sandbox's coercion options.
    pub fn bags(&self) -> Bags {
        Bags::with_options(self.options.coercion.clone())
    }

    /// Compile a snippet into a reusable predicate.
    ///
    /// Nothing is bound unless the snippet parses and passes the policy
    /// check; every violation is reported at once.
    pub fn compile(&self, snippet: &str) -> Result<CompiledPredicate, CompileError> {
        let source = snippet.trim();
        if source.is_empty() {
            return Err(CompileError::EmptySnippet);
        }
        if source.len() > self.options.max_snippet_len {
            return Err(CompileError::SyntaxError(format!(
                "snippet is longer than {} bytes",
                self.options.max_snippet_len
            )));
        }

        let parse_options = ParseOptions::default().with_max_depth(self.options.max_depth);
        let ast = rulebox_parser::parse_with_options(source, &parse_options)
            .into_result()
            .map_err(|errors| {
                let detail = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                debug!(event = "predicate.syntax_error", detail = %detail);
                CompileError::SyntaxError(detail)
            })?;

        if let Err(violations) = self.policy.check(&ast, &self.schema) {
            warn!(
                event = "predicate.policy_rejected",
                count = violations.len(),
                violations = ?violations,
                "snippet rejected by policy"
            );
            return Err(CompileError::PolicyViolation(violations));
        }

        let (bound, result_type) = Binder::new(&self.schema, &self.policy)
            .with_strict_fields(self.options.strict_fields)
            .bind(&ast)?;

        let predicate = CompiledPredicate::new(
            source,
            ast,
            bound,
            result_type,
            Arc::clone(&self.schema),
            Arc::clone(&self.policy),
        );
        debug!(
            event = "predicate.compiled",
            id = %predicate.id(),
            result_type = %result_type,
        );
        Ok(predicate)
    }

    /// Compile and evaluate in one step.
    pub fn run(&self, snippet: &str, bags: &Bags) -> Verdict {
        match self.compile(snippet) {
            Ok(predicate) => predicate.evaluate(bags).into(),
            Err(e) => e.into(),
        }
    }

    /// Compile, then evaluate against bags built from raw fields.
    pub fn evaluate_raw<'b, I, F>(&self, snippet: &str, bags: I) -> Verdict
    where
        I: IntoIterator<Item = (&'b str, F)>,
        F: IntoIterator<Item = (&'b str, RawValue)>,
    {
        let mut built = self.bags();
        for (name, fields) in bags {
            built.insert_bag(name, fields);
        }
        self.run(snippet, &built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PolicyViolation, RuntimeError};
    use crate::schema::BagDecl;
    use crate::types::ValueType;

    #[test]
    fn empty_and_whitespace_snippets() {
        let sandbox = Sandbox::new();
        assert_eq!(sandbox.compile("").unwrap_err(), CompileError::EmptySnippet);
        assert_eq!(sandbox.compile("  \n\t").unwrap_err(), CompileError::EmptySnippet);
    }

    #[test]
    fn length_and_depth_limits() {
        let sandbox = Sandbox::new().with_options(SandboxOptions {
            max_snippet_len: 10,
            ..SandboxOptions::default()
        });
        assert!(matches!(
            sandbox.compile("@item.Id == 12345"),
            Err(CompileError::SyntaxError(_))
        ));

        let deep = format!("{}true{}", "(".repeat(100), ")".repeat(100));
        assert!(matches!(
            Sandbox::new().compile(&deep),
            Err(CompileError::SyntaxError(_))
        ));
    }

    #[test]
    fn syntax_errors_carry_location() {
        let err = Sandbox::new().compile("@item.Id == ").unwrap_err();
        match err {
            CompileError::SyntaxError(detail) => assert!(detail.contains(" at "), "{}", detail),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn policy_runs_before_binding() {
        // Unknown to the registry, but the namespace check fails first.
        let err = Sandbox::new().compile("System.IO.File.ReadAllText(\"x\") == \"\"").unwrap_err();
        assert!(err
            .violations()
            .contains(&PolicyViolation::EnvironmentalTypeUsed("File".to_string())));
    }

    #[test]
    fn non_boolean_result() {
        assert_eq!(
            Sandbox::new().compile("1 + 2").unwrap_err(),
            CompileError::NonBooleanResult(ValueType::Int)
        );
        assert!(Sandbox::new().compile("@item.Admin").is_ok());
    }

    #[test]
    fn strict_fields_follow_the_schema() {
        let sandbox = Sandbox::new()
            .with_schema(BagSchema::empty().with_bag(BagDecl::with_fields("order", ["Total"])))
            .with_options(SandboxOptions {
                strict_fields: true,
                ..SandboxOptions::default()
            });
        assert!(sandbox.compile("order.Total > 10").is_ok());
        assert!(matches!(
            sandbox.compile("order.Discount > 10"),
            Err(CompileError::BindError(_))
        ));
    }

    #[test]
    fn run_reports_each_stage() {
        let sandbox = Sandbox::new();
        let bags = sandbox.bags().with_field("item", "Id", "1");
        assert_eq!(sandbox.run("@item.Id == 1", &bags), Verdict::Ok(true));
        assert!(matches!(sandbox.run("", &bags), Verdict::Compile(_)));
        assert!(matches!(
            sandbox.run("@item.Missing == 1", &bags),
            Verdict::Runtime(RuntimeError::PropertyNotFound { .. })
        ));
    }

    #[test]
    fn evaluate_raw_builds_bags() {
        let verdict = Sandbox::new().evaluate_raw(
            "@item.Name.Length > 5 && @claims.Read",
            [
                ("item", vec![("Name", RawValue::from("John Doe"))]),
                ("claims", vec![("Read", RawValue::from(true))]),
            ],
        );
        assert_eq!(verdict, Verdict::Ok(true));
    }

    #[test]
    fn config_builds_sandbox() {
        let config = PolicyConfig::from_json(
            r#"{
                "bags": [{ "name": "order", "fields": ["Total"] }],
                "options": { "strict_fields": true, "coercion": { "single_char_as_char": false } }
            }"#,
        )
        .unwrap();
        let sandbox = Sandbox::from_config(&config).unwrap();
        assert!(sandbox.options().strict_fields);
        assert!(sandbox.schema().is_bag("ORDER"));
        assert!(!sandbox.schema().is_bag("item"));

        let predicate = sandbox.compile("order.Total == \"J\"").unwrap();
        let bags = sandbox.bags().with_field("order", "Total", "J");
        assert_eq!(predicate.evaluate(&bags), Ok(true));
    }
}
