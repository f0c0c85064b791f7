//! TMS-to-TMS comparison.
//!
//! A converted TMS record is scored against a ground-truth TMS record over a
//! fixed list of order fields and a fixed list of stop fields. Stops are
//! paired by exact `(stop_type, order_sequence)`; converted stops without a
//! partner are ignored.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::diff::render;
use crate::error::ConversionError;
use crate::fs_utils::{discover_files, read_json, TMS_SUFFIX};
use crate::similarity::similar;

/// Order-level fields that are scored
pub const CRITICAL_FIELDS: &[&str] = &[
    "blnum",
    "customer_id",
    "equipment_type_id",
    "freight_charge",
    "total_charge",
    "otherchargetotal",
    "temperature_min",
    "temperature_max",
];

/// Stop-level fields that are scored
pub const STOP_FIELDS: &[&str] = &[
    "address",
    "city_name",
    "state",
    "zip_code",
    "location_name",
    "stop_type",
    "sched_arrive_early",
    "sched_arrive_late",
];

/// Fields compared by string similarity
pub const FUZZY_FIELDS: &[&str] = &["location_name", "address"];

/// Fields compared with a numeric tolerance
pub const NUMERIC_FIELDS: &[&str] = &[
    "freight_charge",
    "total_charge",
    "otherchargetotal",
    "temperature_min",
    "temperature_max",
];

pub const FUZZY_THRESHOLD: f64 = 0.8;
pub const RELATIVE_TOLERANCE: f64 = 0.05;
pub const ABSOLUTE_TOLERANCE: f64 = 1.0;

/// Numeric view for tolerance comparison. No currency stripping here.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Whether two values of `field` agree.
///
/// Fuzzy fields need similarity of at least 0.8. Numeric fields match when
/// the difference is under $1 or within 5% of the larger magnitude, whichever
/// is looser; values that are not numbers fall back to text equality.
/// Everything else compares as text.
pub fn is_field_match(field: &str, converted: &Value, ground_truth: &Value) -> bool {
    match (converted.is_null(), ground_truth.is_null()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        _ => {}
    }

    if FUZZY_FIELDS.contains(&field) {
        return similar(&render(converted), &render(ground_truth)) >= FUZZY_THRESHOLD;
    }

    if NUMERIC_FIELDS.contains(&field) {
        if let (Some(a), Some(b)) = (as_number(converted), as_number(ground_truth)) {
            let delta = (a - b).abs();
            if delta < ABSOLUTE_TOLERANCE {
                return true;
            }
            let scale = a.abs().max(b.abs());
            return scale > 0.0 && delta / scale <= RELATIVE_TOLERANCE;
        }
    }

    render(converted) == render(ground_truth)
}

/// A converted value next to its ground-truth value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePair {
    pub converted: Value,
    pub ground_truth: Value,
}

/// Field results for one aligned stop pair
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StopComparison {
    pub stop_type: String,
    pub sequence: i64,
    pub field_matches: IndexMap<String, ValuePair>,
    pub field_mismatches: IndexMap<String, ValuePair>,
}

/// Result of comparing one converted TMS record with its ground truth
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TmsComparison {
    pub file_name: String,
    pub reference_number: String,
    pub field_matches: IndexMap<String, ValuePair>,
    pub field_mismatches: IndexMap<String, ValuePair>,
    /// Critical fields in the ground truth but not in the converted record
    pub missing_fields: Vec<String>,
    /// Critical fields in the converted record but not in the ground truth
    pub extra_fields: Vec<String>,
    pub stop_comparison: Vec<StopComparison>,
    pub matched_fields: usize,
    pub total_fields: usize,
    pub overall_accuracy: f64,
}

/// Numbers compare by value, anything else (absent included) by identity
fn same_key_value(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a.and_then(Value::as_f64), b.and_then(Value::as_f64)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Stops pair up on `(stop_type, order_sequence)`
fn same_stop(a: &Value, b: &Value) -> bool {
    same_key_value(a.get("stop_type"), b.get("stop_type"))
        && same_key_value(a.get("order_sequence"), b.get("order_sequence"))
}

fn stops_of(record: &Value) -> &[Value] {
    record
        .get("stops")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Score `fields` of `converted` against `ground_truth`, recording each result.
///
/// Returns `(matched, total)`. Only fields present in the ground truth count
/// toward the total; ground-truth fields absent from the converted record are
/// passed to `on_missing`.
fn score_fields(
    fields: &[&str],
    converted: &Map<String, Value>,
    ground_truth: &Map<String, Value>,
    matches: &mut IndexMap<String, ValuePair>,
    mismatches: &mut IndexMap<String, ValuePair>,
    mut on_missing: impl FnMut(&str),
) -> (usize, usize) {
    let mut matched = 0;
    let mut total = 0;

    for &field in fields {
        let Some(gt_value) = ground_truth.get(field) else {
            continue;
        };
        total += 1;

        let Some(c_value) = converted.get(field) else {
            on_missing(field);
            continue;
        };

        let pair = ValuePair {
            converted: c_value.clone(),
            ground_truth: gt_value.clone(),
        };
        if is_field_match(field, c_value, gt_value) {
            matches.insert(field.to_string(), pair);
            matched += 1;
        } else {
            mismatches.insert(field.to_string(), pair);
        }
    }

    (matched, total)
}

/// Compare two parsed TMS records.
pub fn compare_tms_values(file_name: &str, converted: &Value, ground_truth: &Value) -> TmsComparison {
    let empty = Map::new();
    let c_obj = converted.as_object().unwrap_or(&empty);
    let gt_obj = ground_truth.as_object().unwrap_or(&empty);

    let mut result = TmsComparison {
        file_name: file_name.to_string(),
        reference_number: c_obj.get("blnum").map(render).unwrap_or_default(),
        ..Default::default()
    };

    let mut missing = Vec::new();
    let (mut matched, mut total) = score_fields(
        CRITICAL_FIELDS,
        c_obj,
        gt_obj,
        &mut result.field_matches,
        &mut result.field_mismatches,
        |field| missing.push(field.to_string()),
    );
    result.missing_fields = missing;
    result.extra_fields = CRITICAL_FIELDS
        .iter()
        .filter(|f| !gt_obj.contains_key(**f) && c_obj.contains_key(**f))
        .map(|f| f.to_string())
        .collect();

    let gt_stops = stops_of(ground_truth);

    for c_stop in stops_of(converted) {
        let Some(gt_stop) = gt_stops.iter().find(|gt| same_stop(c_stop, gt)) else {
            continue;
        };

        let mut comparison = StopComparison {
            stop_type: c_stop.get("stop_type").map(render).unwrap_or_default(),
            sequence: c_stop.get("order_sequence").and_then(Value::as_f64).unwrap_or(0.0) as i64,
            ..Default::default()
        };

        let (stop_matched, stop_total) = score_fields(
            STOP_FIELDS,
            c_stop.as_object().unwrap_or(&empty),
            gt_stop.as_object().unwrap_or(&empty),
            &mut comparison.field_matches,
            &mut comparison.field_mismatches,
            |_| {},
        );
        matched += stop_matched;
        total += stop_total;
        result.stop_comparison.push(comparison);
    }

    result.matched_fields = matched;
    result.total_fields = total;
    result.overall_accuracy = if total > 0 { matched as f64 / total as f64 } else { 0.0 };
    result
}

/// Load and compare a converted TMS file with its ground-truth file.
pub fn compare_tms_files(converted_file: &Path, ground_truth_file: &Path) -> Result<TmsComparison, ConversionError> {
    let converted = read_json(converted_file)?;
    let ground_truth = read_json(ground_truth_file)?;

    let file_name = converted_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(compare_tms_values(&file_name, &converted, &ground_truth))
}

/// Per-field match counts across a corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldTally {
    pub matches: usize,
    pub total: usize,
}

/// Corpus summary of a TMS evaluation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TmsSummary {
    pub total_files: usize,
    pub average_accuracy: f64,
    /// Match rate per scored field; missing fields do not count
    pub field_accuracy: IndexMap<String, f64>,
}

impl TmsSummary {
    pub fn from_results(results: &[TmsComparison]) -> Self {
        let mut tallies: IndexMap<String, FieldTally> = CRITICAL_FIELDS
            .iter()
            .chain(STOP_FIELDS.iter())
            .map(|f| (f.to_string(), FieldTally::default()))
            .collect();

        let mut record = |field: &str, matched: bool| {
            if let Some(tally) = tallies.get_mut(field) {
                tally.total += 1;
                tally.matches += usize::from(matched);
            }
        };

        for result in results {
            result.field_matches.keys().for_each(|f| record(f, true));
            result.field_mismatches.keys().for_each(|f| record(f, false));
            for stop in &result.stop_comparison {
                stop.field_matches.keys().for_each(|f| record(f, true));
                stop.field_mismatches.keys().for_each(|f| record(f, false));
            }
        }

        let average_accuracy = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.overall_accuracy).sum::<f64>() / results.len() as f64
        };

        Self {
            total_files: results.len(),
            average_accuracy,
            field_accuracy: tallies
                .into_iter()
                .map(|(field, t)| {
                    let rate = if t.total > 0 { t.matches as f64 / t.total as f64 } else { 0.0 };
                    (field, rate)
                })
                .collect(),
        }
    }
}

/// Per-file comparisons plus their summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TmsEvaluation {
    pub results: Vec<TmsComparison>,
    pub summary: TmsSummary,
}

/// Compare every `*_tms.json` in `converted_dir` with the file of the same
/// name in `ground_truth_dir`. Missing or unreadable counterparts are skipped
/// with a warning.
pub fn evaluate_conversion(converted_dir: &Path, ground_truth_dir: &Path) -> Result<TmsEvaluation, ConversionError> {
    let files = discover_files(converted_dir, TMS_SUFFIX, false, None)?;
    tracing::info!("Evaluating {} converted TMS files", files.len());

    let mut results = Vec::new();

    for path in files {
        let Some(name) = path.file_name() else {
            continue;
        };
        let gt_path = ground_truth_dir.join(name);

        if !gt_path.exists() {
            tracing::warn!("Ground truth file not found for {}", name.to_string_lossy());
            continue;
        }

        match compare_tms_files(&path, &gt_path) {
            Ok(comparison) => results.push(comparison),
            Err(e) => tracing::warn!("Skipping {}: {}", name.to_string_lossy(), e),
        }
    }

    let summary = TmsSummary::from_results(&results);
    Ok(TmsEvaluation { results, summary })
}
