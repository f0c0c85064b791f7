//! Extraction accuracy against ground truth.
//!
//! Every path of a ground-truth record is looked up in the candidate record
//! and scored for presence, strict correctness and close match. Per-file
//! ratios are averaged over a corpus, and per-field counts are accumulated
//! into a performance table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::diff::{compare_values, get_all_fields, get_field_value, Differ, FieldMatch, FieldPath};
use crate::error::ConversionError;
use crate::fs_utils::{discover_files, file_id, read_json, EXTRACTION_SUFFIX};

/// Field paths containing any of these names are critical
pub const CRITICAL_FIELDS: &[&str] = &[
    "reference_number",
    "booking_confirmation_number",
    "shipper_section",
    "receiver_section",
    "customer_name",
    "equipment_type",
    "total_rate",
    "freight_rate",
];

/// Top-level members compared as whole structures
pub const NESTED_STRUCTURES: &[&str] = &["shipper_section", "receiver_section", "additional_rates"];

/// Score of one ground-truth path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldMetric {
    pub present: bool,
    pub correct: bool,
    pub close_match: bool,
    pub critical: bool,
}

/// Per-path scores of one file, in ground-truth document order
pub type FieldMetrics = IndexMap<String, FieldMetric>;

pub fn is_critical(path: &str) -> bool {
    CRITICAL_FIELDS.iter().any(|name| path.contains(name))
}

fn is_nested_structure(path: &str) -> bool {
    FieldPath::parse(path).is_top_level() && NESTED_STRUCTURES.iter().any(|name| path.contains(name))
}

/// Score every ground-truth path against the candidate record.
pub fn calculate_field_metrics_with(differ: &Differ, extracted: &Value, ground_truth: &Value) -> FieldMetrics {
    get_all_fields(ground_truth)
        .into_iter()
        .map(|path| {
            let gt_value = get_field_value(ground_truth, &path);
            let ex_value = get_field_value(extracted, &path);

            let result = match (gt_value, ex_value) {
                (_, None) => FieldMatch::NONE,
                (gt, Some(ex)) => {
                    let gt = gt.unwrap_or(&Value::Null);
                    if is_nested_structure(&path) {
                        differ.compare(gt, ex, &path)
                    } else {
                        compare_values(gt, ex, &path)
                    }
                }
            };

            let metric = FieldMetric {
                present: ex_value.is_some(),
                correct: result.exact,
                close_match: result.close,
                critical: is_critical(&path),
            };
            (path, metric)
        })
        .collect()
}

/// [`calculate_field_metrics_with`] under the default match policy.
pub fn calculate_field_metrics(extracted: &Value, ground_truth: &Value) -> FieldMetrics {
    calculate_field_metrics_with(&Differ::default(), extracted, ground_truth)
}

/// Accuracy ratios of one file
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FileAccuracy {
    pub field_presence: f64,
    pub field_accuracy: f64,
    pub relaxed_accuracy: f64,
    pub critical_accuracy: f64,
    pub critical_relaxed: f64,
    pub overall_accuracy: f64,
}

impl FileAccuracy {
    /// Fold per-path scores into ratios.
    ///
    /// `overall = 0.3·presence + 0.3·relaxed + 0.4·critical_relaxed`. No
    /// paths at all gives zeros; no critical paths gives zero critical ratios.
    pub fn from_metrics(metrics: &FieldMetrics) -> Self {
        let total = metrics.len();
        if total == 0 {
            return Self::default();
        }

        fn count(metrics: &FieldMetrics, pred: impl Fn(&FieldMetric) -> bool) -> usize {
            metrics.values().filter(|&m| pred(m)).count()
        }
        let ratio = |n: usize, d: usize| if d == 0 { 0.0 } else { n as f64 / d as f64 };

        let present = count(metrics, |m| m.present);
        let correct = count(metrics, |m| m.correct);
        let relaxed = count(metrics, |m| m.correct || m.close_match);

        let critical_total = count(metrics, |m| m.critical);
        let critical_correct = count(metrics, |m| m.critical && m.correct);
        let critical_close = count(metrics, |m| m.critical && (m.correct || m.close_match));

        let field_presence = ratio(present, total);
        let relaxed_accuracy = ratio(relaxed, total);
        let critical_relaxed = ratio(critical_close, critical_total);

        Self {
            field_presence,
            field_accuracy: ratio(correct, total),
            relaxed_accuracy,
            critical_accuracy: ratio(critical_correct, critical_total),
            critical_relaxed,
            overall_accuracy: 0.3 * field_presence + 0.3 * relaxed_accuracy + 0.4 * critical_relaxed,
        }
    }
}

/// Score one file: ratios plus the per-path scores they came from.
pub fn calculate_file_accuracy_with(
    differ: &Differ,
    extracted: &Value,
    ground_truth: &Value,
) -> (FileAccuracy, FieldMetrics) {
    let metrics = calculate_field_metrics_with(differ, extracted, ground_truth);
    (FileAccuracy::from_metrics(&metrics), metrics)
}

pub fn calculate_file_accuracy(extracted: &Value, ground_truth: &Value) -> (FileAccuracy, FieldMetrics) {
    calculate_file_accuracy_with(&Differ::default(), extracted, ground_truth)
}

/// Corpus-wide counts for one field path
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldPerformance {
    pub present_count: usize,
    pub correct_count: usize,
    pub close_match_count: usize,
    pub total_count: usize,
    pub is_critical: bool,
    pub presence_rate: f64,
    pub accuracy_rate: f64,
    pub close_match_rate: f64,
}

/// Accumulate per-file path scores into per-field counts and rates.
///
/// `close_match_count` includes strictly correct fields.
pub fn analyze_field_performance(
    all_metrics: &IndexMap<String, FieldMetrics>,
) -> IndexMap<String, FieldPerformance> {
    let mut performance: IndexMap<String, FieldPerformance> = IndexMap::new();

    for metrics in all_metrics.values() {
        for (field, metric) in metrics {
            let entry = performance.entry(field.clone()).or_default();
            entry.total_count += 1;
            entry.is_critical = metric.critical;
            entry.present_count += usize::from(metric.present);
            entry.correct_count += usize::from(metric.correct);
            entry.close_match_count += usize::from(metric.correct || metric.close_match);
        }
    }

    for counts in performance.values_mut() {
        if counts.total_count > 0 {
            let total = counts.total_count as f64;
            counts.presence_rate = counts.present_count as f64 / total;
            counts.accuracy_rate = counts.correct_count as f64 / total;
            counts.close_match_rate = counts.close_match_count as f64 / total;
        }
    }

    performance
}

/// Mean ratios over a corpus
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub total_files: usize,
    pub field_presence: f64,
    pub field_accuracy: f64,
    pub relaxed_accuracy: f64,
    pub critical_accuracy: f64,
    pub critical_relaxed: f64,
    pub overall_accuracy: f64,
    /// Files with overall accuracy above 0.9
    pub files_above_90: usize,
    /// Files with overall accuracy below 0.5
    pub files_below_50: usize,
}

impl CorpusSummary {
    pub fn from_results(results: &IndexMap<String, FileAccuracy>) -> Self {
        let n = results.len();
        if n == 0 {
            return Self::default();
        }

        let mean = |f: fn(&FileAccuracy) -> f64| results.values().map(f).sum::<f64>() / n as f64;

        Self {
            total_files: n,
            field_presence: mean(|a| a.field_presence),
            field_accuracy: mean(|a| a.field_accuracy),
            relaxed_accuracy: mean(|a| a.relaxed_accuracy),
            critical_accuracy: mean(|a| a.critical_accuracy),
            critical_relaxed: mean(|a| a.critical_relaxed),
            overall_accuracy: mean(|a| a.overall_accuracy),
            files_above_90: results.values().filter(|a| a.overall_accuracy > 0.9).count(),
            files_below_50: results.values().filter(|a| a.overall_accuracy < 0.5).count(),
        }
    }
}

/// Everything produced by evaluating an extraction directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionEvaluation {
    /// Ratios per file id
    pub files: IndexMap<String, FileAccuracy>,
    /// Path scores per file id
    pub field_metrics: IndexMap<String, FieldMetrics>,
    pub field_performance: IndexMap<String, FieldPerformance>,
    pub summary: CorpusSummary,
}

/// Null, `{}` and `[]` carry nothing to score
fn is_empty_record(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Evaluate every `<id>_extraction.json` in `extraction_dir` against the file
/// of the same id in `ground_truth_dir`.
///
/// Files without ground truth, files that cannot be read or parsed on either
/// side, and files that are empty on either side are skipped with a warning.
/// Only a missing extraction directory is an error.
pub fn evaluate_extraction_dir(
    differ: &Differ,
    extraction_dir: &Path,
    ground_truth_dir: &Path,
) -> Result<ExtractionEvaluation, ConversionError> {
    let files = discover_files(extraction_dir, EXTRACTION_SUFFIX, false, None)?;
    tracing::info!("Evaluating {} extraction files", files.len());

    let mut evaluation = ExtractionEvaluation::default();

    for path in files {
        let id = file_id(&path);
        let gt_path = ground_truth_dir.join(format!("{}{}", id, EXTRACTION_SUFFIX));

        if !gt_path.exists() {
            tracing::warn!("Ground truth file not found for {}", id);
            continue;
        }

        let (extracted, ground_truth) = match (read_json(&path), read_json(&gt_path)) {
            (Ok(ex), Ok(gt)) => (ex, gt),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Skipping {}: {}", id, e);
                continue;
            }
        };

        if is_empty_record(&extracted) || is_empty_record(&ground_truth) {
            tracing::warn!("Skipping {}: empty record", id);
            continue;
        }

        let (accuracy, metrics) = calculate_file_accuracy_with(differ, &extracted, &ground_truth);
        tracing::debug!("{}: overall accuracy {:.3}", id, accuracy.overall_accuracy);

        evaluation.files.insert(id.clone(), accuracy);
        evaluation.field_metrics.insert(id, metrics);
    }

    evaluation.field_performance = analyze_field_performance(&evaluation.field_metrics);
    evaluation.summary = CorpusSummary::from_results(&evaluation.files);
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::MatchPolicy;
    use crate::fs_utils::write_file;
    use serde_json::json;
    use tempfile::TempDir;

    fn ground_truth() -> Value {
        json!({
            "reference_number": "LD-100",
            "customer_name": "Acme Corp",
            "freight_rate": 1000,
            "notes": "fragile",
            "shipper_section": [
                {"ship_from_company": "Alpha Foods", "pickup_number": "P1"}
            ]
        })
    }

    #[test]
    fn test_identical_records_score_perfectly() {
        let gt = ground_truth();
        let (accuracy, metrics) = calculate_file_accuracy(&gt, &gt);

        assert!(metrics.values().all(|m| m.present && m.correct && m.close_match));
        assert_eq!(accuracy.field_presence, 1.0);
        assert_eq!(accuracy.field_accuracy, 1.0);
        assert_eq!(accuracy.critical_relaxed, 1.0);
        assert!((accuracy.overall_accuracy - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_field_metrics_flags() {
        let extracted = json!({
            "reference_number": "LD-100",
            "customer_name": "ACME Corp.",
            "freight_rate": "$1,050",
            "shipper_section": [
                {"ship_from_company": "Beta Foods", "pickup_number": "P1"}
            ]
        });

        let metrics = calculate_field_metrics(&extracted, &ground_truth());

        assert!(metrics["reference_number"].correct);
        assert!(metrics["reference_number"].critical);

        let customer = metrics["customer_name"];
        assert!(!customer.correct);
        assert!(customer.close_match);

        let rate = metrics["freight_rate"];
        assert!(!rate.correct);
        assert!(rate.close_match);

        let notes = metrics["notes"];
        assert!(!notes.present);
        assert!(!notes.critical);

        // One matching member is enough under the default policy
        assert!(metrics["shipper_section"].correct);
        assert!(!metrics["shipper_section[0].ship_from_company"].correct);
        assert!(metrics["shipper_section[0].pickup_number"].critical);
    }

    #[test]
    fn test_policy_changes_structure_result() {
        let extracted = json!({
            "shipper_section": [{"ship_from_company": "Zeta", "pickup_number": "P1"}]
        });
        let gt = json!({
            "shipper_section": [{"ship_from_company": "Alpha", "pickup_number": "P1"}]
        });

        let any = calculate_field_metrics_with(&Differ::new(MatchPolicy::AnyField), &extracted, &gt);
        let all = calculate_field_metrics_with(&Differ::new(MatchPolicy::AllFields), &extracted, &gt);

        assert!(any["shipper_section"].correct);
        assert!(!all["shipper_section"].correct);
    }

    #[test]
    fn test_empty_ground_truth() {
        let (accuracy, metrics) = calculate_file_accuracy(&json!({"a": 1}), &json!({}));
        assert!(metrics.is_empty());
        assert_eq!(accuracy, FileAccuracy::default());
    }

    #[test]
    fn test_no_critical_fields() {
        let gt = json!({"notes": "x"});
        let (accuracy, _) = calculate_file_accuracy(&gt, &gt);

        assert_eq!(accuracy.critical_accuracy, 0.0);
        assert_eq!(accuracy.critical_relaxed, 0.0);
        assert!((accuracy.overall_accuracy - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_analyze_field_performance() {
        let mut all = IndexMap::new();
        all.insert(
            "a".to_string(),
            calculate_field_metrics(&json!({"customer_name": "X"}), &json!({"customer_name": "X"})),
        );
        all.insert(
            "b".to_string(),
            calculate_field_metrics(&json!({}), &json!({"customer_name": "Y"})),
        );

        let performance = analyze_field_performance(&all);
        let customer = &performance["customer_name"];

        assert_eq!(customer.total_count, 2);
        assert_eq!(customer.present_count, 1);
        assert_eq!(customer.correct_count, 1);
        assert_eq!(customer.close_match_count, 1);
        assert!(customer.is_critical);
        assert_eq!(customer.presence_rate, 0.5);
    }

    #[test]
    fn test_corpus_summary() {
        let mut results = IndexMap::new();
        results.insert(
            "a".to_string(),
            FileAccuracy {
                overall_accuracy: 1.0,
                field_presence: 1.0,
                ..Default::default()
            },
        );
        results.insert(
            "b".to_string(),
            FileAccuracy {
                overall_accuracy: 0.2,
                ..Default::default()
            },
        );

        let summary = CorpusSummary::from_results(&results);

        assert_eq!(summary.total_files, 2);
        assert!((summary.overall_accuracy - 0.6).abs() < 1e-9);
        assert_eq!(summary.field_presence, 0.5);
        assert_eq!(summary.files_above_90, 1);
        assert_eq!(summary.files_below_50, 1);
    }

    #[test]
    fn test_evaluate_extraction_dir_skips_missing_ground_truth() {
        let extraction = TempDir::new().unwrap();
        let truth = TempDir::new().unwrap();

        let record = json!({"reference_number": "1", "customer_name": "Acme"}).to_string();
        write_file(extraction.path().join("A1_extraction.json"), &record).unwrap();
        write_file(extraction.path().join("B2_extraction.json"), &record).unwrap();
        write_file(extraction.path().join("C3_extraction.json"), "{broken").unwrap();
        write_file(truth.path().join("A1_extraction.json"), &record).unwrap();
        write_file(truth.path().join("C3_extraction.json"), &record).unwrap();

        let evaluation = evaluate_extraction_dir(&Differ::default(), extraction.path(), truth.path()).unwrap();

        assert_eq!(evaluation.summary.total_files, 1);
        assert!(evaluation.files.contains_key("A1"));
        assert_eq!(evaluation.files["A1"].field_accuracy, 1.0);
        assert_eq!(evaluation.field_performance["customer_name"].total_count, 1);
    }

    #[test]
    fn test_evaluate_extraction_dir_skips_empty_records() {
        let extraction = TempDir::new().unwrap();
        let truth = TempDir::new().unwrap();

        let record = json!({"reference_number": "1", "customer_name": "Acme"}).to_string();
        write_file(extraction.path().join("A1_extraction.json"), &record).unwrap();
        write_file(extraction.path().join("B2_extraction.json"), "{}").unwrap();
        write_file(extraction.path().join("C3_extraction.json"), &record).unwrap();
        write_file(truth.path().join("A1_extraction.json"), &record).unwrap();
        write_file(truth.path().join("B2_extraction.json"), &record).unwrap();
        write_file(truth.path().join("C3_extraction.json"), "null").unwrap();

        let evaluation = evaluate_extraction_dir(&Differ::default(), extraction.path(), truth.path()).unwrap();

        assert_eq!(evaluation.summary.total_files, 1);
        assert!(!evaluation.files.contains_key("B2"));
        assert!(!evaluation.files.contains_key("C3"));
        assert!((evaluation.summary.overall_accuracy - 1.0).abs() < 1e-9);
    }
}
