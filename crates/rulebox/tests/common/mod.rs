//! Common test utilities for rulebox integration tests.

use chrono::NaiveDate;
use rulebox::{Bags, CompileError, Policy, PolicyViolation, RawValue, Verdict};

/// The sample record and claims used throughout the tests.
#[allow(dead_code)]
pub fn sample_bags() -> Bags {
    let created = NaiveDate::from_ymd_opt(2000, 1, 2).expect("valid date");
    Bags::new()
        .with_bag(
            "item",
            [
                ("Id", RawValue::from("1")),
                ("Name", RawValue::from("John Doe")),
                ("Created", RawValue::from(created)),
                ("Admin", RawValue::from(true)),
                ("Info", RawValue::from(r#"{ "option": true }"#)),
            ],
        )
        .with_bag(
            "claims",
            [
                ("Create", true),
                ("Read", true),
                ("Update", true),
                ("Delete", true),
            ],
        )
}

/// Run a snippet under the default policy against the sample bags.
#[allow(dead_code)]
pub fn run(snippet: &str) -> Verdict {
    rulebox::run(snippet, Policy::new(), &sample_bags())
}

/// Run a snippet and assert it evaluates to `expected`.
#[allow(dead_code)]
pub fn assert_verdict(snippet: &str, expected: bool) {
    match run(snippet) {
        Verdict::Ok(actual) => assert_eq!(actual, expected, "{}", snippet),
        other => panic!("'{}' did not evaluate: {:?}", snippet, other),
    }
}

/// Compile a snippet under the default policy and return its violations.
#[allow(dead_code)]
pub fn violations(snippet: &str) -> Vec<PolicyViolation> {
    match rulebox::compile(snippet, Policy::new()) {
        Err(CompileError::PolicyViolation(v)) => v,
        other => panic!("expected a policy violation for '{}', got {:?}", snippet, other),
    }
}
