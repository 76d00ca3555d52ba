//! Error handling tests for rulebox-parser.

mod common;

use rulebox_parser::{parse, parse_with_options, ParseOptions};

#[test]
fn error_on_unclosed_parenthesis() {
    assert!(parse("(1 + 2").is_err());
}

#[test]
fn error_on_unclosed_call() {
    let errors = common::assert_parse_error("Math.Max(");
    assert!(errors[0].message.contains("end of input"));
}

#[test]
fn error_on_missing_operand() {
    let errors = common::assert_parse_error("@item.Id ==");
    assert!(errors[0].message.contains("unexpected end of input"));
}

#[test]
fn error_on_missing_operator() {
    let errors = common::assert_parse_error("1 2");
    assert!(errors[0].message.contains("after expression"));
}

#[test]
fn error_on_empty_input() {
    assert!(parse("").is_err());
    assert!(parse("   ").is_err());
}

#[test]
fn error_on_unclosed_string() {
    let errors = common::assert_parse_error("\"hello");
    assert!(errors[0].message.contains("string literal"));
}

#[test]
fn error_on_incomplete_conditional() {
    assert!(parse("a ? b").is_err());
}

#[test]
fn error_on_object_creation() {
    let errors = common::assert_parse_error("new NonExistentType();");
    assert!(errors[0].message.contains("object creation"));
}

#[test]
fn error_on_statement_sequence() {
    let errors = common::assert_parse_error("x; y");
    assert!(errors[0].message.contains("statements are not allowed"));
}

#[test]
fn error_on_reserved_words() {
    for input in ["for", "while (true) true", "var x", "return true", "if (a) b"] {
        let errors = common::assert_parse_error(input);
        assert!(
            errors[0].message.contains("reserved word"),
            "unexpected message for '{}': {}",
            input,
            errors[0].message
        );
    }
}

#[test]
fn error_on_assignment() {
    assert!(parse("item.Id = 2").is_err());
}

#[test]
fn error_on_lambda_without_body() {
    assert!(parse("xs.All(x =>)").is_err());
}

#[test]
fn error_on_unexpected_character() {
    let errors = common::assert_parse_error("a # b");
    assert_eq!(errors[0].span, 2..3);
}

#[test]
fn error_display_includes_span() {
    let errors = common::assert_parse_error("1 +");
    let rendered = errors[0].to_string();
    assert!(rendered.contains(" at "), "got: {}", rendered);
}

#[test]
fn custom_depth_limit() {
    let options = ParseOptions::default().with_max_depth(4);
    assert!(parse_with_options("((1))", &options).is_ok());
    assert!(parse_with_options("((((((1))))))", &options).is_err());
}
