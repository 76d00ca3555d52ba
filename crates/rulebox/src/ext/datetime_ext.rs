//! Date-time members and constants.
//!
//! # Functions
//!
//! - `DateTime.Parse(text)` - accepts the same forms as bag coercion
//! - `DayOfWeek.Sunday` .. `DayOfWeek.Saturday` (0..6)
//!
//! # Members on date-times
//!
//! - `Year`, `Month`, `Day`, `Hour`, `Minute`, `Second`, `DayOfYear`
//! - `DayOfWeek` (Sunday is 0)
//! - `Date` (midnight of the same day)
//!
//! Date-times are a value type, so these modules are reachable under every
//! policy.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};

use super::str_arg;
use crate::error::RuntimeError;
use crate::eval::coerce::parse_datetime;
use crate::eval::Value;
use crate::functions::{Function, Member, Module, Receiver};
use crate::types::ValueType;

pub const DATETIME_MODULE: &str = "System.DateTime";
pub const DAY_OF_WEEK_MODULE: &str = "System.DayOfWeek";

const DAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Returns the `DateTime` module.
pub fn datetime_module() -> Module {
    Module::new(DATETIME_MODULE)
        .with_alias("DateTime")
        .with_function(Function::new("Parse").with_overload(1, ValueType::DateTime, |args| {
            const NAME: &str = "DateTime.Parse";
            let text = str_arg(NAME, &args[0])?;
            parse_datetime(text).map(Value::DateTime).ok_or_else(|| {
                RuntimeError::function_failed(NAME, "string was not recognized as a valid DateTime")
            })
        }))
}

/// Returns the `DayOfWeek` constants.
pub fn day_of_week_module() -> Module {
    DAYS.iter()
        .enumerate()
        .fold(Module::new(DAY_OF_WEEK_MODULE).with_alias("DayOfWeek"), |m, (i, day)| {
            m.with_constant(*day, i as i64)
        })
}

/// Returns the members available on date-times.
pub fn datetime_members() -> Vec<Member> {
    vec![
        component("Year", |dt| dt.year() as i64),
        component("Month", |dt| dt.month() as i64),
        component("Day", |dt| dt.day() as i64),
        component("Hour", |dt| dt.hour() as i64),
        component("Minute", |dt| dt.minute() as i64),
        component("Second", |dt| dt.second() as i64),
        component("DayOfYear", |dt| dt.ordinal() as i64),
        component("DayOfWeek", |dt| dt.weekday().num_days_from_sunday() as i64),
        Member::property("Date", DATETIME_MODULE, Receiver::DateTime, ValueType::DateTime, |args| {
            let dt = datetime(&args[0])?;
            Ok(Value::DateTime(dt.date().and_time(NaiveTime::MIN)))
        }),
    ]
}

fn datetime(v: &Value) -> Result<NaiveDateTime, RuntimeError> {
    match v {
        Value::DateTime(dt) => Ok(*dt),
        other => Err(RuntimeError::expected("DateTime member", "DateTime", other.type_name())),
    }
}

fn component(name: &'static str, read: fn(&NaiveDateTime) -> i64) -> Member {
    Member::property(name, DATETIME_MODULE, Receiver::DateTime, ValueType::Int, move |args| {
        Ok(Value::Int(read(&datetime(&args[0])?)))
    })
}
