//! Accuracy evaluation: extraction records against ground truth, and converted
//! TMS records against ground-truth TMS records.

pub mod extraction;
pub mod tms;

pub use extraction::{
    analyze_field_performance, calculate_field_metrics, calculate_file_accuracy, evaluate_extraction_dir,
    CorpusSummary, ExtractionEvaluation, FieldMetric, FieldMetrics, FieldPerformance, FileAccuracy,
};
pub use tms::{compare_tms_files, compare_tms_values, evaluate_conversion, is_field_match, TmsComparison, TmsEvaluation, TmsSummary};
