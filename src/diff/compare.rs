//! Scalar and structural comparison of ground-truth values against candidates.
//!
//! Every comparison yields a [`FieldMatch`]: `exact` for a strict match and
//! `close` for a tolerant one (numeric tolerance or string similarity chosen
//! by the field name). Structures are compared member by member and the
//! per-member results are folded through a [`MatchPolicy`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::similarity::similar;

/// Outcome of comparing one ground-truth value against a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldMatch {
    pub exact: bool,
    pub close: bool,
}

impl FieldMatch {
    pub const NONE: FieldMatch = FieldMatch { exact: false, close: false };
    pub const BOTH: FieldMatch = FieldMatch { exact: true, close: true };

    pub fn new(exact: bool, close: bool) -> Self {
        Self { exact, close }
    }

    /// Exact or close
    pub fn relaxed(&self) -> bool {
        self.exact || self.close
    }
}

/// How per-member results of a structure fold into one result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// A structure matches when any member matched
    #[default]
    AnyField,
    /// A structure matches only when every member matched
    AllFields,
}

impl MatchPolicy {
    fn fold(&self, results: &[FieldMatch]) -> FieldMatch {
        if results.is_empty() {
            return FieldMatch::NONE;
        }
        match self {
            MatchPolicy::AnyField => FieldMatch::new(
                results.iter().any(|r| r.exact),
                results.iter().any(|r| r.close),
            ),
            MatchPolicy::AllFields => FieldMatch::new(
                results.iter().all(|r| r.exact),
                results.iter().all(|r| r.close),
            ),
        }
    }
}

impl std::str::FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any_field" | "any" => Ok(MatchPolicy::AnyField),
            "all_fields" | "all" => Ok(MatchPolicy::AllFields),
            other => Err(format!("unknown match policy '{}' (expected any_field or all_fields)", other)),
        }
    }
}

/// Render a value as text: strings unquoted, everything else as JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric view of a scalar. Booleans count as 1/0; strings lose `$` and `,`.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.replace([',', '$'], "").trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Number(_) | Value::Bool(_))
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Compare two scalars, choosing the tolerance from `field`.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tmsmap::diff::compare_values;
///
/// let result = compare_values(&json!(100.0), &json!(105.0), "freight_rate");
/// assert!(!result.exact);
/// assert!(result.close);
/// ```
pub fn compare_values(ground_truth: &Value, extracted: &Value, field: &str) -> FieldMatch {
    match (ground_truth.is_null(), extracted.is_null()) {
        (true, true) => return FieldMatch::BOTH,
        (true, false) | (false, true) => return FieldMatch::NONE,
        _ => {}
    }

    if is_numeric(ground_truth) || is_numeric(extracted) {
        if let (Some(gt), Some(ex)) = (as_number(ground_truth), as_number(extracted)) {
            let delta = (gt - ex).abs();
            return FieldMatch::new(delta < 0.01, delta < f64::max(1.0, (gt * 0.1).abs()));
        }
    }

    let gt = render(ground_truth).to_lowercase().trim().to_string();
    let ex = render(extracted).to_lowercase().trim().to_string();
    let exact = gt == ex;

    let close = if field.contains("address") {
        similar(&gt, &ex) > 0.7 || gt.contains(&ex) || ex.contains(&gt)
    } else if field.contains("name") || field.contains("company") {
        similar(&gt, &ex) > 0.8
    } else if field.contains("date") || field.contains("time") {
        let gt_clean: String = gt.chars().filter(|c| c.is_alphanumeric()).collect();
        let ex_clean: String = ex.chars().filter(|c| c.is_alphanumeric()).collect();
        similar(&gt_clean, &ex_clean) > 0.8
    } else {
        similar(&gt, &ex) > 0.85
    };

    FieldMatch::new(exact, close)
}

/// Deep equality with numbers compared by value (`1` equals `1.0`).
fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|(k, x)| ys.get(k).is_some_and(|y| deep_equal(x, y)))
        }
        _ => a == b,
    }
}

fn child_name(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

/// Structural comparator carrying a [`MatchPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Differ {
    policy: MatchPolicy,
}

impl Differ {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Compare two values that may be containers.
    ///
    /// Objects are compared over the union of their keys, a key missing on
    /// either side counting as a mismatch. Lists of objects credit each
    /// ground-truth item if any candidate item matches it. Other lists match
    /// exactly on deep equality and closely on the similarity of their
    /// concatenated renderings. Anything else falls back to
    /// [`compare_values`].
    pub fn compare(&self, ground_truth: &Value, extracted: &Value, field: &str) -> FieldMatch {
        match (ground_truth, extracted) {
            (Value::Object(gt), Value::Object(ex)) => {
                let keys = gt.keys().chain(ex.keys().filter(|k| !gt.contains_key(*k)));

                let results: Vec<FieldMatch> = keys
                    .map(|key| match (gt.get(key), ex.get(key)) {
                        (Some(g), Some(e)) if is_container(g) && is_container(e) => {
                            self.compare(g, e, &child_name(field, key))
                        }
                        (Some(g), Some(e)) => compare_values(g, e, &child_name(field, key)),
                        _ => FieldMatch::NONE,
                    })
                    .collect();

                self.policy.fold(&results)
            }
            (Value::Array(gt), Value::Array(ex)) => {
                match (gt.is_empty(), ex.is_empty()) {
                    (true, true) => return FieldMatch::BOTH,
                    (true, false) | (false, true) => return FieldMatch::NONE,
                    _ => {}
                }

                if gt.iter().all(Value::is_object) && ex.iter().all(Value::is_object) {
                    let results: Vec<FieldMatch> = gt
                        .iter()
                        .enumerate()
                        .map(|(i, gt_item)| {
                            let name = format!("{}[{}]", field, i);
                            ex.iter().fold(FieldMatch::NONE, |best, ex_item| {
                                let result = self.compare(gt_item, ex_item, &name);
                                FieldMatch::new(best.exact || result.exact, best.close || result.close)
                            })
                        })
                        .collect();

                    return self.policy.fold(&results);
                }

                let gt_text: String = gt.iter().map(render).collect();
                let ex_text: String = ex.iter().map(render).collect();
                FieldMatch::new(
                    deep_equal(ground_truth, extracted),
                    similar(&gt_text, &ex_text) > 0.7,
                )
            }
            _ => compare_values(ground_truth, extracted, field),
        }
    }
}

/// [`Differ::compare`] under the default [`MatchPolicy::AnyField`].
pub fn compare_nested_structures(ground_truth: &Value, extracted: &Value, field: &str) -> FieldMatch {
    Differ::default().compare(ground_truth, extracted, field)
}
