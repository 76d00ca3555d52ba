//! String and character functions.
//!
//! # Static functions
//!
//! - `String.IsNullOrEmpty(s)`, `String.IsNullOrWhiteSpace(s)`
//! - `String.Concat(a, b[, c[, d]])`
//! - `String.Equals(a, b)`
//! - `Char.IsDigit(c)`, `Char.IsLetter(c)`, `Char.IsUpper(c)`,
//!   `Char.IsLower(c)`, `Char.IsWhiteSpace(c)`
//!
//! # Members on strings
//!
//! - `Length`, `IsEmpty`
//! - `Contains(s)`, `StartsWith(s)`, `EndsWith(s)`, `IndexOf(s)`
//! - `ToUpper()`, `ToLower()`, `Trim()`
//! - `Substring(start[, length])`
//!
//! Indices count characters, not bytes.

use crate::error::RuntimeError;
use crate::eval::Value;
use crate::functions::{Function, Member, Module, Receiver};
use crate::types::ValueType;

pub const STRING_MODULE: &str = "System.String";
pub const CHAR_MODULE: &str = "System.Char";

/// Returns the `System.String` module.
pub fn string_module() -> Module {
    Module::new(STRING_MODULE)
        .with_alias("String")
        .with_alias("string")
        .with_function(Function::new("IsNullOrEmpty").with_overload(1, ValueType::Bool, |args| {
            match &args[0] {
                Value::Null => Ok(Value::Bool(true)),
                Value::String(s) => Ok(Value::Bool(s.is_empty())),
                other => Err(RuntimeError::expected("String.IsNullOrEmpty", "string", other.type_name())),
            }
        }))
        .with_function(
            Function::new("IsNullOrWhiteSpace").with_overload(1, ValueType::Bool, |args| match &args[0] {
                Value::Null => Ok(Value::Bool(true)),
                Value::String(s) => Ok(Value::Bool(s.trim().is_empty())),
                other => Err(RuntimeError::expected(
                    "String.IsNullOrWhiteSpace",
                    "string",
                    other.type_name(),
                )),
            }),
        )
        .with_function(
            Function::new("Concat")
                .with_overload(2, ValueType::String, concat)
                .with_overload(3, ValueType::String, concat)
                .with_overload(4, ValueType::String, concat),
        )
        .with_function(Function::new("Equals").with_overload(2, ValueType::Bool, |args| {
            match (&args[0], &args[1]) {
                (Value::Null, Value::Null) => Ok(Value::Bool(true)),
                (Value::String(a), Value::String(b)) => Ok(Value::Bool(a == b)),
                (Value::Null, Value::String(_)) | (Value::String(_), Value::Null) => Ok(Value::Bool(false)),
                (a, b) => Err(RuntimeError::type_mismatch(
                    "String.Equals",
                    format!("expected two strings, got {} and {}", a.type_name(), b.type_name()),
                )),
            }
        }))
}

/// Returns the `System.Char` module.
pub fn char_module() -> Module {
    Module::new(CHAR_MODULE)
        .with_alias("Char")
        .with_alias("char")
        .with_function(char_predicate("IsDigit", |c| c.is_ascii_digit()))
        .with_function(char_predicate("IsLetter", char::is_alphabetic))
        .with_function(char_predicate("IsUpper", char::is_uppercase))
        .with_function(char_predicate("IsLower", char::is_lowercase))
        .with_function(char_predicate("IsWhiteSpace", char::is_whitespace))
}

/// Returns the instance members available on strings.
pub fn string_members() -> Vec<Member> {
    vec![
        Member::property("Length", STRING_MODULE, Receiver::String, ValueType::Int, |args| {
            Ok(Value::Int(receiver(&args[0])?.chars().count() as i64))
        }),
        Member::property("IsEmpty", STRING_MODULE, Receiver::String, ValueType::Bool, |args| {
            Ok(Value::Bool(receiver(&args[0])?.is_empty()))
        }),
        Member::method("Contains", STRING_MODULE, Receiver::String).with_overload(
            1,
            ValueType::Bool,
            |args| {
                let s = receiver(&args[0])?;
                Ok(Value::Bool(s.contains(needle("String.Contains", &args[1])?.as_str())))
            },
        ),
        Member::method("StartsWith", STRING_MODULE, Receiver::String).with_overload(
            1,
            ValueType::Bool,
            |args| {
                let s = receiver(&args[0])?;
                Ok(Value::Bool(s.starts_with(needle("String.StartsWith", &args[1])?.as_str())))
            },
        ),
        Member::method("EndsWith", STRING_MODULE, Receiver::String).with_overload(
            1,
            ValueType::Bool,
            |args| {
                let s = receiver(&args[0])?;
                Ok(Value::Bool(s.ends_with(needle("String.EndsWith", &args[1])?.as_str())))
            },
        ),
        Member::method("IndexOf", STRING_MODULE, Receiver::String).with_overload(
            1,
            ValueType::Int,
            |args| {
                let s = receiver(&args[0])?;
                let n = needle("String.IndexOf", &args[1])?;
                let index = s
                    .find(n.as_str())
                    .map(|byte| s[..byte].chars().count() as i64)
                    .unwrap_or(-1);
                Ok(Value::Int(index))
            },
        ),
        Member::method("ToUpper", STRING_MODULE, Receiver::String).with_overload(
            0,
            ValueType::String,
            |args| Ok(Value::string(receiver(&args[0])?.to_uppercase())),
        ),
        Member::method("ToLower", STRING_MODULE, Receiver::String).with_overload(
            0,
            ValueType::String,
            |args| Ok(Value::string(receiver(&args[0])?.to_lowercase())),
        ),
        Member::method("Trim", STRING_MODULE, Receiver::String).with_overload(
            0,
            ValueType::String,
            |args| Ok(Value::string(receiver(&args[0])?.trim())),
        ),
        Member::method("Substring", STRING_MODULE, Receiver::String)
            .with_overload(1, ValueType::String, |args| substring(&args[0], &args[1], None))
            .with_overload(2, ValueType::String, |args| {
                substring(&args[0], &args[1], Some(&args[2]))
            }),
    ]
}

fn receiver(v: &Value) -> Result<&str, RuntimeError> {
    v.as_str()
        .ok_or_else(|| RuntimeError::expected("string member", "string", v.type_name()))
}

/// A search argument: a string or a single character.
fn needle(name: &str, v: &Value) -> Result<String, RuntimeError> {
    match v {
        Value::String(s) => Ok(s.to_string()),
        Value::Char(c) => Ok(c.to_string()),
        Value::Null => Err(RuntimeError::function_failed(name, "value cannot be null")),
        other => Err(RuntimeError::expected(name, "string", other.type_name())),
    }
}

fn index_arg(name: &str, v: &Value) -> Result<i64, RuntimeError> {
    v.as_int()
        .ok_or_else(|| RuntimeError::expected(name, "long", v.type_name()))
}

fn substring(s: &Value, start: &Value, length: Option<&Value>) -> Result<Value, RuntimeError> {
    const NAME: &str = "String.Substring";
    let out_of_range = || {
        RuntimeError::function_failed(
            NAME,
            "index and length must refer to a location within the string",
        )
    };
    let chars: Vec<char> = receiver(s)?.chars().collect();
    let start = usize::try_from(index_arg(NAME, start)?)
        .ok()
        .filter(|&start| start <= chars.len())
        .ok_or_else(out_of_range)?;
    let length = match length {
        Some(l) => usize::try_from(index_arg(NAME, l)?)
            .ok()
            .filter(|&length| length <= chars.len() - start)
            .ok_or_else(out_of_range)?,
        None => chars.len() - start,
    };

    Ok(Value::string(
        chars[start..start + length].iter().collect::<String>(),
    ))
}

fn concat(args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::string(
        args.iter().map(|a| a.to_string()).collect::<String>(),
    ))
}

fn char_arg(name: &str, v: &Value) -> Result<char, RuntimeError> {
    match v {
        Value::Char(c) => Ok(*c),
        Value::String(s) => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(RuntimeError::function_failed(
                    name,
                    "string must be exactly one character long",
                )),
            }
        }
        other => Err(RuntimeError::expected(name, "char", other.type_name())),
    }
}

fn char_predicate(name: &'static str, test: fn(char) -> bool) -> Function {
    Function::new(name).with_overload(1, ValueType::Bool, move |args| {
        let qualified = format!("Char.{}", name);
        let c = char_arg(&qualified, &args[0])?;
        Ok(Value::Bool(test(c)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        string_members()
            .into_iter()
            .find(|m| m.name == name)
            .expect("member exists")
            .find(args.len() - 1)
            .expect("overload exists")
            .call(args)
    }

    fn s(v: &str) -> Value {
        Value::string(v)
    }

    #[test]
    fn contains_accepts_strings_and_chars() {
        assert_eq!(member("Contains", &[s("John Doe"), s("J")]), Ok(Value::Bool(true)));
        assert_eq!(member("Contains", &[s("John Doe"), Value::Char('x')]), Ok(Value::Bool(false)));
        assert!(matches!(
            member("Contains", &[s("John Doe"), Value::Null]),
            Err(RuntimeError::FunctionFailed { .. })
        ));
    }

    #[test]
    fn length_counts_characters() {
        assert_eq!(member("Length", &[s("John Doe")]), Ok(Value::Int(8)));
        assert_eq!(member("Length", &[s("héllo")]), Ok(Value::Int(5)));
    }

    #[test]
    fn index_of_and_substring() {
        assert_eq!(member("IndexOf", &[s("héllo"), s("l")]), Ok(Value::Int(2)));
        assert_eq!(member("IndexOf", &[s("abc"), s("z")]), Ok(Value::Int(-1)));
        assert_eq!(member("Substring", &[s("John Doe"), Value::Int(5)]), Ok(s("Doe")));
        assert_eq!(
            member("Substring", &[s("John Doe"), Value::Int(0), Value::Int(4)]),
            Ok(s("John"))
        );
        assert!(matches!(
            member("Substring", &[s("abc"), Value::Int(2), Value::Int(5)]),
            Err(RuntimeError::FunctionFailed { .. })
        ));
    }

    #[test]
    fn case_and_trim() {
        assert_eq!(member("ToUpper", &[s("ab")]), Ok(s("AB")));
        assert_eq!(member("ToLower", &[s("AB")]), Ok(s("ab")));
        assert_eq!(member("Trim", &[s("  x ")]), Ok(s("x")));
    }

    #[test]
    fn statics() {
        let module = string_module();
        let call = |name: &str, args: &[Value]| {
            module
                .function(name)
                .and_then(|f| f.find(args.len()))
                .expect("function exists")
                .call(args)
        };
        assert_eq!(call("IsNullOrEmpty", &[Value::Null]), Ok(Value::Bool(true)));
        assert_eq!(call("IsNullOrWhiteSpace", &[s("  ")]), Ok(Value::Bool(true)));
        assert_eq!(call("Concat", &[s("a"), Value::Int(1), Value::Bool(true)]), Ok(s("a1True")));
        assert_eq!(call("Equals", &[s("a"), s("a")]), Ok(Value::Bool(true)));
    }

    #[test]
    fn char_predicates() {
        let module = char_module();
        let call = |name: &str, v: Value| module.function(name).unwrap().find(1).unwrap().call(&[v]);
        assert_eq!(call("IsDigit", Value::Char('7')), Ok(Value::Bool(true)));
        assert_eq!(call("IsUpper", Value::Char('J')), Ok(Value::Bool(true)));
        assert_eq!(call("IsLetter", s("x")), Ok(Value::Bool(true)));
        assert!(call("IsLetter", s("xy")).is_err());
    }

    #[test]
    fn char_classification() {
        let module = char_module();
        let call = |name: &str, c: char| module.function(name).unwrap().find(1).unwrap().call(&[Value::Char(c)]);
        assert_eq!(call("IsLetter", 'é'), Ok(Value::Bool(true)));
        assert_eq!(call("IsLetter", '1'), Ok(Value::Bool(false)));
        assert_eq!(call("IsUpper", 'j'), Ok(Value::Bool(false)));
        assert_eq!(call("IsLower", 'j'), Ok(Value::Bool(true)));
        assert_eq!(call("IsLower", 'J'), Ok(Value::Bool(false)));
        assert_eq!(call("IsWhiteSpace", ' '), Ok(Value::Bool(true)));
        assert_eq!(call("IsWhiteSpace", '\t'), Ok(Value::Bool(true)));
        assert_eq!(call("IsWhiteSpace", 'x'), Ok(Value::Bool(false)));
    }

    #[test]
    fn substring_extreme_arguments() {
        for args in [
            vec![s("abc"), Value::Int(i64::MAX), Value::Int(1)],
            vec![s("abc"), Value::Int(1), Value::Int(i64::MAX)],
            vec![s("abc"), Value::Int(i64::MIN)],
            vec![s("abc"), Value::Int(i64::MIN), Value::Int(1)],
            vec![s("abc"), Value::Int(4)],
        ] {
            assert!(
                matches!(member("Substring", &args), Err(RuntimeError::FunctionFailed { .. })),
                "{:?}",
                args
            );
        }
        assert_eq!(member("Substring", &[s("abc"), Value::Int(3)]), Ok(s("")));
    }
}
