//! Clean-up pass over raw extraction output.
//!
//! Model output is loosely typed: money comes back as `"$1,250.00"`,
//! booleans as `"true"`, and appointment windows in whatever date format the
//! source document used. [`normalize_extraction`] rewrites those fields in
//! place so the mapper sees numbers, booleans and `MM/DD/YY HH:MM` windows.
//! Falsy values (null, empty string, zero, empty containers) are left as they
//! are.

use chrono::NaiveDateTime;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::timestamp::EXTRACTION_FORMAT;

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})").expect("valid date pattern"));

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}:\d{2})").expect("valid time pattern"));

const MONEY_FIELDS: &[&str] = &["total_rate", "freight_rate", "additional_rate"];
const TEMPERATURE_FIELDS: &[&str] = &["temperature_low", "temperature_high"];
const BOOLEAN_FIELDS: &[&str] = &["temperature_present", "is_flat_rate"];
const SHIPPER_DATE_FIELDS: &[&str] = &["pickup_appointment_start_datetime", "pickup_appointment_end_datetime"];
const RECEIVER_DATE_FIELDS: &[&str] = &[
    "receiver_appointment_start_datetime",
    "receiver_appointment_end_datetime",
];

/// Date-time layouts tried, in order, after the date part is normalized to
/// slashes and a time part appended
const DATE_FORMATS: &[&str] = &["%m/%d/%y %H:%M", "%m/%d/%Y %H:%M"];

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Numeric value of a loosely-typed amount, or null.
///
/// Strings keep only digits and `.` (plus `-` when `signed`).
fn clean_number(value: &Value, signed: bool) -> Value {
    let number = match value {
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || (signed && *c == '-'))
                .collect();
            cleaned.parse::<f64>().ok()
        }
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    number.map(Value::from).unwrap_or(Value::Null)
}

fn clean_fields(map: &mut Map<String, Value>, fields: &[&str], signed: bool) {
    for field in fields {
        if let Some(value) = map.get_mut(*field) {
            if is_truthy(value) {
                *value = clean_number(value, signed);
            }
        }
    }
}

/// Reformat a date string to `MM/DD/YY HH:MM`.
///
/// The date is located by pattern (`M/D/YY`, `M-D-YYYY`, ...) and the time
/// defaults to midnight. Strings that cannot be understood come back
/// unchanged.
///
/// # Example
///
/// ```
/// use tmsmap::normalize::format_date;
///
/// assert_eq!(format_date("Pickup 3-7-2025 at 14:30"), "03/07/25 14:30");
/// assert_eq!(format_date("12/1/24"), "12/01/24 00:00");
/// assert_eq!(format_date("ASAP"), "ASAP");
/// ```
pub fn format_date(raw: &str) -> String {
    let Some(date) = DATE_RE.captures(raw).and_then(|c| c.get(1)) else {
        return raw.to_string();
    };
    let time = TIME_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or("00:00", |m| m.as_str());

    let candidate = format!("{} {}", date.as_str().replace('-', "/"), time);

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&candidate, fmt).ok())
        .map(|dt| dt.format(EXTRACTION_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn format_stop_dates(map: &mut Map<String, Value>, section: &str, fields: &[&str]) {
    let Some(Value::Array(stops)) = map.get_mut(section) else {
        return;
    };

    for stop in stops.iter_mut().filter_map(Value::as_object_mut) {
        for field in fields {
            if let Some(Value::String(s)) = stop.get_mut(*field) {
                if !s.is_empty() {
                    *s = format_date(s);
                }
            }
        }
    }
}

/// Normalize a raw extraction record.
///
/// Non-object input is returned unchanged; the typed parse rejects it later.
pub fn normalize_extraction(mut record: Value) -> Value {
    let Some(map) = record.as_object_mut() else {
        return record;
    };

    clean_fields(map, MONEY_FIELDS, false);
    clean_fields(map, TEMPERATURE_FIELDS, true);

    if let Some(Value::Array(rates)) = map.get_mut("additional_rates") {
        for rate in rates.iter_mut().filter_map(Value::as_object_mut) {
            clean_fields(rate, &["amount"], false);
        }
    }

    format_stop_dates(map, "shipper_section", SHIPPER_DATE_FIELDS);
    format_stop_dates(map, "receiver_section", RECEIVER_DATE_FIELDS);

    for field in BOOLEAN_FIELDS {
        if let Some(Value::String(s)) = map.get(*field) {
            let flag = s.to_lowercase() == "true";
            map.insert(field.to_string(), Value::Bool(flag));
        }
    }

    record
}
