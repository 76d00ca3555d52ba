//! Regular-expression matching.
//!
//! # Functions
//!
//! - `Regex.IsMatch(input, pattern)`
//! - `Regex.IsMatch(input, pattern, options)` where `options` is a sum of
//!   `RegexOptions` flags (`RegexOptions.IgnoreCase + RegexOptions.Multiline`)
//!
//! Patterns use the `regex` crate syntax: no backreferences or lookaround,
//! and matching is linear in the input. Compiled programs are capped at
//! [`PATTERN_SIZE_LIMIT`] bytes.

use regex::RegexBuilder;

use super::str_arg;
use crate::error::RuntimeError;
use crate::eval::Value;
use crate::functions::{Function, Module};
use crate::types::ValueType;

pub const REGEX_MODULE: &str = "System.Text.RegularExpressions.Regex";
pub const REGEX_OPTIONS_MODULE: &str = "System.Text.RegularExpressions.RegexOptions";

pub const PATTERN_SIZE_LIMIT: usize = 1 << 20;

const IGNORE_CASE: i64 = 1;
const MULTILINE: i64 = 2;
const SINGLELINE: i64 = 16;
const IGNORE_PATTERN_WHITESPACE: i64 = 32;
const SUPPORTED: i64 = IGNORE_CASE | MULTILINE | SINGLELINE | IGNORE_PATTERN_WHITESPACE;

/// Returns the `Regex` module.
pub fn regex_module() -> Module {
    Module::new(REGEX_MODULE).with_alias("Regex").with_function(
        Function::new("IsMatch")
            .with_overload(2, ValueType::Bool, |args| is_match(&args[0], &args[1], 0))
            .with_overload(3, ValueType::Bool, |args| {
                let flags = args[2].as_int().ok_or_else(|| {
                    RuntimeError::expected("Regex.IsMatch", "RegexOptions", args[2].type_name())
                })?;
                is_match(&args[0], &args[1], flags)
            }),
    )
}

/// Returns the `RegexOptions` flag constants.
pub fn regex_options_module() -> Module {
    Module::new(REGEX_OPTIONS_MODULE)
        .with_alias("RegexOptions")
        .with_constant("None", 0i64)
        .with_constant("IgnoreCase", IGNORE_CASE)
        .with_constant("Multiline", MULTILINE)
        .with_constant("Singleline", SINGLELINE)
        .with_constant("IgnorePatternWhitespace", IGNORE_PATTERN_WHITESPACE)
}

fn is_match(input: &Value, pattern: &Value, flags: i64) -> Result<Value, RuntimeError> {
    const NAME: &str = "Regex.IsMatch";
    let input = str_arg(NAME, input)?;
    let pattern = str_arg(NAME, pattern)?;

    if flags & !SUPPORTED != 0 || flags < 0 {
        return Err(RuntimeError::function_failed(NAME, "unsupported regex options"));
    }

    let regex = RegexBuilder::new(pattern)
        .case_insensitive(flags & IGNORE_CASE != 0)
        .multi_line(flags & MULTILINE != 0)
        .dot_matches_new_line(flags & SINGLELINE != 0)
        .ignore_whitespace(flags & IGNORE_PATTERN_WHITESPACE != 0)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|_| {
            RuntimeError::function_failed(NAME, "pattern is not a valid regular expression")
        })?;

    Ok(Value::Bool(regex.is_match(input)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(args: &[Value]) -> Result<Value, RuntimeError> {
        regex_module()
            .function("IsMatch")
            .and_then(|f| f.find(args.len()))
            .expect("overload exists")
            .call(args)
    }

    #[test]
    fn basic_match() {
        let args = [Value::string("John Doe"), Value::string("^J.*e$")];
        assert_eq!(matches(&args), Ok(Value::Bool(true)));
    }

    #[test]
    fn options_change_matching() {
        let input = Value::string("JOHN");
        let pattern = Value::string("^john$");
        assert_eq!(matches(&[input.clone(), pattern.clone()]), Ok(Value::Bool(false)));
        assert_eq!(
            matches(&[input, pattern, Value::Int(IGNORE_CASE)]),
            Ok(Value::Bool(true))
        );

        let two_lines = Value::string("a\nb");
        assert_eq!(
            matches(&[two_lines.clone(), Value::string("^b$"), Value::Int(MULTILINE)]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            matches(&[two_lines, Value::string("a.b"), Value::Int(SINGLELINE)]),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn invalid_pattern_is_templated() {
        let err = matches(&[Value::string("x"), Value::string("(")]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::function_failed("Regex.IsMatch", "pattern is not a valid regular expression")
        );
    }

    #[test]
    fn unknown_flags_rejected() {
        let err = matches(&[Value::string("x"), Value::string("x"), Value::Int(4)]).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::function_failed("Regex.IsMatch", "unsupported regex options")
        );
    }

    #[test]
    fn null_input_fails() {
        assert!(matches(&[Value::Null, Value::string("x")]).is_err());
    }
}
