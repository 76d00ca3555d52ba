//! Structured-text (JSON) parsing and query.
//!
//! # Functions
//!
//! - `JsonDocument.Parse(text)` - parse a JSON document
//!
//! # Members on JSON values
//!
//! - `RootElement`, `ValueKind` (properties)
//! - `GetProperty(name)`
//! - `GetBoolean()`, `GetString()`, `GetInt32()`, `GetInt64()`,
//!   `GetDouble()`, `GetDecimal()`
//! - `GetArrayLength()`
//!
//! The getters fail when the element has the wrong kind rather than
//! converting it.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value as Json;

use super::str_arg;
use crate::error::RuntimeError;
use crate::eval::Value;
use crate::functions::{Function, Member, Module, Receiver};
use crate::types::ValueType;

pub const JSON_MODULE: &str = "System.Text.Json";
pub const JSON_DOCUMENT_MODULE: &str = "System.Text.Json.JsonDocument";

/// Returns the `JsonDocument` module.
pub fn json_document_module() -> Module {
    Module::new(JSON_DOCUMENT_MODULE)
        .with_alias("JsonDocument")
        .with_function(Function::new("Parse").with_overload(1, ValueType::Json, parse))
}

/// Returns the members available on JSON values.
pub fn json_members() -> Vec<Member> {
    vec![
        Member::property("RootElement", JSON_MODULE, Receiver::Json, ValueType::Json, |args| {
            Ok(args[0].clone())
        }),
        Member::property("ValueKind", JSON_MODULE, Receiver::Json, ValueType::String, |args| {
            Ok(Value::string(value_kind(element(&args[0])?)))
        }),
        Member::method("GetProperty", JSON_MODULE, Receiver::Json).with_overload(
            1,
            ValueType::Json,
            get_property,
        ),
        getter("GetBoolean", ValueType::Bool, |json| json.as_bool().map(Value::Bool)),
        getter("GetString", ValueType::String, |json| match json {
            Json::String(s) => Some(Value::string(s.as_str())),
            Json::Null => Some(Value::Null),
            _ => None,
        }),
        getter("GetInt32", ValueType::Int, |json| {
            json.as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(|i| Value::Int(i as i64))
        }),
        getter("GetInt64", ValueType::Int, |json| json.as_i64().map(Value::Int)),
        getter("GetDouble", ValueType::Float, |json| json.as_f64().map(Value::Float)),
        getter("GetDecimal", ValueType::Decimal, |json| match json {
            Json::Number(n) => Decimal::from_str(&n.to_string())
                .or_else(|_| Decimal::from_scientific(&n.to_string()))
                .ok()
                .map(Value::Decimal),
            _ => None,
        }),
        getter("GetArrayLength", ValueType::Int, |json| {
            json.as_array().map(|a| Value::Int(a.len() as i64))
        }),
    ]
}

fn parse(args: &[Value]) -> Result<Value, RuntimeError> {
    const NAME: &str = "JsonDocument.Parse";
    let text = str_arg(NAME, &args[0])?;
    serde_json::from_str::<Json>(text)
        .map(|json| Value::Json(Arc::new(json)))
        .map_err(|_| RuntimeError::function_failed(NAME, "input is not valid JSON"))
}

fn element(v: &Value) -> Result<&Json, RuntimeError> {
    match v {
        Value::Json(json) => Ok(json.as_ref()),
        other => Err(RuntimeError::expected("JSON member", "JsonElement", other.type_name())),
    }
}

fn value_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "Null",
        Json::Bool(true) => "True",
        Json::Bool(false) => "False",
        Json::Number(_) => "Number",
        Json::String(_) => "String",
        Json::Array(_) => "Array",
        Json::Object(_) => "Object",
    }
}

fn get_property(args: &[Value]) -> Result<Value, RuntimeError> {
    const NAME: &str = "JsonElement.GetProperty";
    let json = element(&args[0])?;
    let key = str_arg(NAME, &args[1])?;

    let object = json.as_object().ok_or_else(|| {
        RuntimeError::function_failed(
            NAME,
            format!("the element is {}, not Object", value_kind(json)),
        )
    })?;

    object
        .get(key)
        .map(|v| Value::Json(Arc::new(v.clone())))
        .ok_or_else(|| RuntimeError::function_failed(NAME, "the requested key was not present"))
}

/// A typed getter that fails when the element has another kind.
fn getter(name: &'static str, result: ValueType, read: fn(&Json) -> Option<Value>) -> Member {
    Member::method(name, JSON_MODULE, Receiver::Json).with_overload(0, result, move |args| {
        let json = element(&args[0])?;
        read(json).ok_or_else(|| {
            RuntimeError::function_failed(
                format!("JsonElement.{}", name),
                format!("the element is {} and cannot be read that way", value_kind(json)),
            )
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        json_members()
            .into_iter()
            .find(|m| m.name == name)
            .expect("member exists")
            .find(args.len() - 1)
            .expect("overload exists")
            .call(args)
    }

    fn doc(text: &str) -> Value {
        parse(&[Value::string(text)]).expect("valid json")
    }

    #[test]
    fn parse_and_query() {
        let root = member("RootElement", &[doc(r#"{ "option": true, "n": 7 }"#)]).unwrap();
        let option = member("GetProperty", &[root.clone(), Value::string("option")]).unwrap();
        assert_eq!(member("GetBoolean", &[option]), Ok(Value::Bool(true)));

        let n = member("GetProperty", &[root, Value::string("n")]).unwrap();
        assert_eq!(member("GetInt32", &[n.clone()]), Ok(Value::Int(7)));
        assert_eq!(member("GetDouble", &[n.clone()]), Ok(Value::Float(7.0)));
        assert_eq!(member("GetDecimal", &[n]), Ok(Value::Decimal(Decimal::from(7))));
    }

    #[test]
    fn invalid_json_is_templated() {
        assert_eq!(
            parse(&[Value::string("{ nope")]),
            Err(RuntimeError::function_failed(
                "JsonDocument.Parse",
                "input is not valid JSON"
            ))
        );
    }

    #[test]
    fn missing_key_and_wrong_kind() {
        let root = doc(r#"{ "a": "x" }"#);
        assert!(matches!(
            member("GetProperty", &[root.clone(), Value::string("b")]),
            Err(RuntimeError::FunctionFailed { .. })
        ));
        let a = member("GetProperty", &[root, Value::string("a")]).unwrap();
        assert!(matches!(
            member("GetBoolean", &[a.clone()]),
            Err(RuntimeError::FunctionFailed { .. })
        ));
        assert_eq!(member("GetString", &[a]), Ok(Value::string("x")));
    }

    #[test]
    fn value_kind_and_length() {
        let array = doc("[1, 2, 3]");
        assert_eq!(member("ValueKind", &[array.clone()]), Ok(Value::string("Array")));
        assert_eq!(member("GetArrayLength", &[array]), Ok(Value::Int(3)));
    }
}
