//! Builtin extension modules.
//!
//! Each `*_ext` module contributes static functions (on a [`Module`]) and
//! instance members (as [`Member`]s) to the standard [`Registry`].
//!
//! [`Registry`]: crate::functions::Registry

pub mod convert_ext;
pub mod datetime_ext;
pub mod json_ext;
pub mod linq_ext;
pub mod math_ext;
pub mod regex_ext;
pub mod string_ext;

use crate::error::RuntimeError;
use crate::eval::Value;
use crate::functions::{Member, Module, Receiver};
use crate::types::ValueType;

/// Tag of the members every value supports.
pub const OBJECT_MODULE: &str = "System.Object";

/// Modules that back value types rather than APIs. They are reachable under
/// any policy.
pub const INTRINSIC_MODULES: &[&str] = &[
    OBJECT_MODULE,
    datetime_ext::DATETIME_MODULE,
    datetime_ext::DAY_OF_WEEK_MODULE,
];

/// All modules of the standard catalog.
pub fn standard_modules() -> Vec<Module> {
    vec![
        math_ext::math_module(),
        string_ext::string_module(),
        string_ext::char_module(),
        convert_ext::convert_module(),
        regex_ext::regex_module(),
        regex_ext::regex_options_module(),
        json_ext::json_document_module(),
        datetime_ext::datetime_module(),
        datetime_ext::day_of_week_module(),
    ]
}

/// All instance members of the standard catalog.
///
/// Order matters: more specific receivers come before [`Receiver::Any`].
pub fn standard_members() -> Vec<Member> {
    let mut members = Vec::new();
    members.extend(string_ext::string_members());
    members.extend(datetime_ext::datetime_members());
    members.extend(json_ext::json_members());
    members.extend(linq_ext::linq_members());
    members.extend(object_members());
    members
}

fn object_members() -> Vec<Member> {
    vec![
        Member::method("ToString", OBJECT_MODULE, Receiver::Any)
            .with_overload(0, ValueType::String, |args| Ok(Value::string(args[0].to_string()))),
        Member::method("Equals", OBJECT_MODULE, Receiver::Any)
            .with_overload(1, ValueType::Bool, |args| Ok(Value::Bool(args[0].equals(&args[1])))),
    ]
}

/// Reject a null argument with the templated message.
pub(crate) fn non_null<'a>(name: &str, v: &'a Value) -> Result<&'a Value, RuntimeError> {
    if v.is_null() {
        Err(RuntimeError::function_failed(name, "value cannot be null"))
    } else {
        Ok(v)
    }
}

/// A string argument; null is rejected.
pub(crate) fn str_arg<'a>(name: &str, v: &'a Value) -> Result<&'a str, RuntimeError> {
    non_null(name, v)?
        .as_str()
        .ok_or_else(|| RuntimeError::expected(name, "string", v.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_members_accept_anything() {
        let members = object_members();
        let to_string = members[0].find(0).unwrap();
        assert_eq!(to_string.call(&[Value::Int(5)]), Ok(Value::string("5")));
        assert_eq!(to_string.call(&[Value::Null]), Ok(Value::string("")));

        let equals = members[1].find(1).unwrap();
        assert_eq!(
            equals.call(&[Value::Int(1), Value::Float(1.0)]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            equals.call(&[Value::Char('J'), Value::string("J")]),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn null_arguments_are_rejected() {
        assert!(matches!(
            str_arg("Regex.IsMatch", &Value::Null),
            Err(RuntimeError::FunctionFailed { .. })
        ));
        assert_eq!(str_arg("x", &Value::string("a")), Ok("a"));
    }
}
