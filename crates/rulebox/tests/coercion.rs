//! Coercion of raw bag inputs as seen by predicates.

mod common;

use std::str::FromStr;

use chrono::NaiveDate;
use rulebox::{Bags, CoercionOptions, Policy, RawValue, Value, ValueType, Verdict};
use rust_decimal::Decimal;
use uuid::Uuid;

fn coerced(text: &str) -> Value {
    Bags::new()
        .with_field("item", "X", text)
        .get("item")
        .and_then(|bag| bag.get("X"))
        .cloned()
        .expect("field was inserted")
}

#[test]
fn cascade_picks_the_most_specific_type() {
    assert_eq!(coerced("true"), Value::Bool(true));
    assert_eq!(coerced(" FALSE "), Value::Bool(false));
    assert_eq!(coerced("123"), Value::Int(123));
    assert_eq!(coerced("-5000000000"), Value::Int(-5_000_000_000));
    assert_eq!(coerced("18446744073709551615"), Value::UInt(u64::MAX));
    assert_eq!(coerced("0.5"), Value::Float(0.5));
    assert_eq!(
        coerced("19.99"),
        Value::Decimal(Decimal::from_str("19.99").unwrap())
    );
    assert_eq!(coerced("John Doe"), Value::string("John Doe"));

    let guid = "6f9619ff-8b86-d011-b42d-00c04fc964ff";
    assert_eq!(coerced(guid), Value::Guid(Uuid::parse_str(guid).unwrap()));
    assert_eq!(coerced("2000-01-02").value_type(), ValueType::DateTime);
}

#[test]
fn single_characters_become_chars() {
    assert_eq!(coerced("J"), Value::Char('J'));

    let bags = Bags::new().with_field("item", "Initial", "J");
    let run = |snippet| rulebox::run(snippet, Policy::new(), &bags);
    assert_eq!(run("@item.Initial == 'J'"), Verdict::Ok(true));
    assert_eq!(run("@item.Initial == \"J\""), Verdict::Ok(false));
}

#[test]
fn char_stage_can_be_disabled() {
    let options = CoercionOptions {
        single_char_as_char: false,
    };
    let bags = Bags::with_options(options).with_field("item", "Initial", "J");
    assert_eq!(
        rulebox::run("@item.Initial == \"J\"", Policy::new(), &bags),
        Verdict::Ok(true)
    );
}

#[test]
fn native_values_pass_through() {
    let bags = Bags::new()
        .with_field("item", "Count", 7i64)
        .with_field("item", "Label", Value::string("123"))
        .with_field("item", "Tags", vec!["a", "b"]);
    let item = bags.get("item").unwrap();
    assert_eq!(item.get("Count"), Some(&Value::Int(7)));
    // Already a value, so never re-parsed.
    assert_eq!(item.get("Label"), Some(&Value::string("123")));
    assert_eq!(
        item.get("Tags"),
        Some(&Value::list(vec![Value::Char('a'), Value::Char('b')]))
    );
}

#[test]
fn dates_coerce_to_midnight() {
    let date = NaiveDate::from_ymd_opt(2000, 1, 2).unwrap();
    let bags = Bags::new().with_field("item", "Created", RawValue::from(date));
    let run = |snippet| rulebox::run(snippet, Policy::new(), &bags);
    assert_eq!(run("@item.Created.Hour == 0"), Verdict::Ok(true));
    assert_eq!(run("@item.Created.Date == @item.Created"), Verdict::Ok(true));
    assert_eq!(run("@item.Created.DayOfYear == 2"), Verdict::Ok(true));
}

#[test]
fn numbers_compare_across_representations() {
    let bags = Bags::new()
        .with_field("item", "Price", "19.99")
        .with_field("item", "Half", "0.5")
        .with_field("item", "Big", "18446744073709551615");
    let run = |snippet| rulebox::run(snippet, Policy::new(), &bags);
    assert_eq!(run("@item.Price == 19.99m"), Verdict::Ok(true));
    assert_eq!(run("@item.Price > 19"), Verdict::Ok(true));
    assert_eq!(run("@item.Half * 2 == 1"), Verdict::Ok(true));
    assert_eq!(run("@item.Big > 0"), Verdict::Ok(true));
}
