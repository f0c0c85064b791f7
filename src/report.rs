//! Report writers for evaluation results.
//!
//! Results stream out as JSON arrays or NDJSON through the writers below, and
//! the markdown summaries are rendered into any `io::Write`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::diff::render;
use crate::error::ConversionError;
use crate::eval::extraction::{ExtractionEvaluation, FieldPerformance, FileAccuracy};
use crate::eval::tms::{TmsEvaluation, ValuePair};
use crate::fs_utils::{create_file, write_json_pretty};

/// Rows shown in each top/bottom field table
pub const TOP_FIELDS: usize = 10;

/// NDJSON (Newline Delimited JSON) writer
///
/// Writes records as NDJSON, one JSON object per line.
pub struct NdjsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a single record as an NDJSON line
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<(), ConversionError> {
        let json = serde_json::to_string(record)?;
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    pub fn write_all<T: Serialize>(&mut self, records: &[T]) -> Result<(), ConversionError> {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ConversionError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// JSON array writer
///
/// Writes records as one JSON array, opening bracket on construction.
pub struct JsonArrayWriter<W: Write> {
    writer: W,
    first: bool,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn new(mut writer: W) -> Result<Self, ConversionError> {
        write!(writer, "[")?;
        Ok(Self { writer, first: true })
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<(), ConversionError> {
        if !self.first {
            write!(self.writer, ",")?;
        }
        self.first = false;

        let json = serde_json::to_string(record)?;
        write!(self.writer, "{}", json)?;
        Ok(())
    }

    /// Close the bracket and flush
    pub fn finish(mut self) -> Result<(), ConversionError> {
        write!(self.writer, "]")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// One row of `detailed_accuracy.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRow {
    pub file_id: String,
    #[serde(flatten)]
    pub accuracy: FileAccuracy,
}

/// One row of `field_performance.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRow {
    pub field: String,
    pub presence_rate: f64,
    pub accuracy_rate: f64,
    pub close_match_rate: f64,
    pub is_critical: bool,
    pub total_count: usize,
}

fn by_accuracy(a: &FieldRow, b: &FieldRow) -> Ordering {
    a.accuracy_rate.partial_cmp(&b.accuracy_rate).unwrap_or(Ordering::Equal)
}

/// Field table rows sorted by strict accuracy, worst first.
///
/// Fields with equal accuracy keep their first-seen order.
pub fn field_rows(performance: &IndexMap<String, FieldPerformance>) -> Vec<FieldRow> {
    let mut rows: Vec<FieldRow> = performance
        .iter()
        .map(|(field, p)| FieldRow {
            field: field.clone(),
            presence_rate: p.presence_rate,
            accuracy_rate: p.accuracy_rate,
            close_match_rate: p.close_match_rate,
            is_critical: p.is_critical,
            total_count: p.total_count,
        })
        .collect();

    rows.sort_by(by_accuracy);
    rows
}

/// Format a ratio as a percentage with two decimals.
pub fn percent(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

fn write_field_table<'a, W: Write>(w: &mut W, rows: impl Iterator<Item = &'a FieldRow>) -> io::Result<()> {
    writeln!(w, "| Field | Presence Rate | Strict Accuracy | Relaxed Accuracy |")?;
    write!(w, "|-------|--------------|----------------|------------------|")?;
    for row in rows {
        write!(
            w,
            "\n| {} | {} | {} | {} |",
            row.field,
            percent(row.presence_rate),
            percent(row.accuracy_rate),
            percent(row.close_match_rate)
        )?;
    }
    Ok(())
}

/// Render `evaluation_summary.md`.
pub fn write_extraction_summary<W: Write>(w: &mut W, evaluation: &ExtractionEvaluation) -> io::Result<()> {
    let summary = &evaluation.summary;
    let rows = field_rows(&evaluation.field_performance);

    writeln!(w, "# Extraction Evaluation Summary\n")?;

    writeln!(w, "## Overall Metrics\n")?;
    writeln!(w, "- **Average Field Presence**: {}", percent(summary.field_presence))?;
    writeln!(w, "- **Average Field Accuracy (Strict)**: {}", percent(summary.field_accuracy))?;
    writeln!(w, "- **Average Field Accuracy (Relaxed)**: {}", percent(summary.relaxed_accuracy))?;
    writeln!(w, "- **Critical Fields Accuracy (Strict)**: {}", percent(summary.critical_accuracy))?;
    writeln!(w, "- **Critical Fields Accuracy (Relaxed)**: {}", percent(summary.critical_relaxed))?;
    writeln!(w, "- **Average Overall Accuracy**: {}\n", percent(summary.overall_accuracy))?;

    writeln!(w, "## Files Processed\n")?;
    writeln!(w, "- **Total Files**: {}", summary.total_files)?;
    writeln!(w, "- **Files with >90% Accuracy**: {}", summary.files_above_90)?;
    writeln!(w, "- **Files with <50% Accuracy**: {}\n", summary.files_below_50)?;

    writeln!(w, "## Field Analysis\n")?;

    writeln!(w, "### Critical Fields Performance\n")?;
    write_field_table(w, rows.iter().filter(|r| r.is_critical))?;

    write!(w, "\n\n### Top {} Most Problematic Fields\n\n", TOP_FIELDS)?;
    write_field_table(w, rows.iter().take(TOP_FIELDS))?;

    let mut reliable: Vec<&FieldRow> = rows.iter().collect();
    reliable.sort_by(|a, b| by_accuracy(b, a));

    write!(w, "\n\n### Top {} Most Reliable Fields\n\n", TOP_FIELDS)?;
    write_field_table(w, reliable.into_iter().take(TOP_FIELDS))?;
    writeln!(w)?;

    Ok(())
}

/// Write `detailed_accuracy.json`, `field_performance.json` and
/// `evaluation_summary.md` into `output_dir`.
pub fn write_extraction_reports(evaluation: &ExtractionEvaluation, output_dir: &Path) -> Result<(), ConversionError> {
    let detailed = output_dir.join("detailed_accuracy.json");
    let file = create_file(&detailed).map_err(|e| ConversionError::from(e).in_file(&detailed))?;
    let mut writer = JsonArrayWriter::new(io::BufWriter::new(file))?;
    for (file_id, accuracy) in &evaluation.files {
        writer.write(&AccuracyRow {
            file_id: file_id.clone(),
            accuracy: *accuracy,
        })?;
    }
    writer.finish()?;

    let performance = output_dir.join("field_performance.json");
    write_json_pretty(&performance, &field_rows(&evaluation.field_performance))?;

    let summary_path = output_dir.join("evaluation_summary.md");
    let file = create_file(&summary_path).map_err(|e| ConversionError::from(e).in_file(&summary_path))?;
    let mut out = io::BufWriter::new(file);
    write_extraction_summary(&mut out, evaluation)?;
    out.flush()?;

    tracing::info!("Detailed results saved to {}", output_dir.display());
    Ok(())
}

fn write_mismatch_table<W: Write>(w: &mut W, mismatches: &IndexMap<String, ValuePair>) -> io::Result<()> {
    writeln!(w, "| Field | Converted Value | Ground Truth Value |")?;
    writeln!(w, "|-------|----------------|--------------------|")?;
    for (field, pair) in mismatches {
        writeln!(w, "| {} | {} | {} |", field, render(&pair.converted), render(&pair.ground_truth))?;
    }
    writeln!(w)
}

/// Render `tms_evaluation_report.md`.
///
/// Fields are listed best first; files worst first.
pub fn write_tms_report<W: Write>(w: &mut W, evaluation: &TmsEvaluation) -> io::Result<()> {
    let summary = &evaluation.summary;

    writeln!(w, "# TMS Conversion Evaluation Report\n")?;

    writeln!(w, "## Summary\n")?;
    writeln!(w, "- Total files evaluated: {}", summary.total_files)?;
    writeln!(w, "- Average accuracy: {}\n", percent(summary.average_accuracy))?;

    writeln!(w, "## Field Accuracy\n")?;
    writeln!(w, "| Field | Accuracy |")?;
    writeln!(w, "|-------|----------|")?;

    let mut fields: Vec<(&String, &f64)> = summary.field_accuracy.iter().collect();
    fields.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(Ordering::Equal));
    for (field, accuracy) in fields {
        writeln!(w, "| {} | {} |", field, percent(*accuracy))?;
    }
    writeln!(w)?;

    writeln!(w, "## Detailed Results\n")?;

    let mut results: Vec<_> = evaluation.results.iter().collect();
    results.sort_by(|a, b| {
        a.overall_accuracy
            .partial_cmp(&b.overall_accuracy)
            .unwrap_or(Ordering::Equal)
    });

    for result in results {
        writeln!(
            w,
            "### {} (Accuracy: {})\n",
            result.file_name,
            percent(result.overall_accuracy)
        )?;

        if !result.field_mismatches.is_empty() {
            writeln!(w, "#### Field Mismatches\n")?;
            write_mismatch_table(w, &result.field_mismatches)?;
        }

        for (i, stop) in result.stop_comparison.iter().enumerate() {
            if stop.field_mismatches.is_empty() {
                continue;
            }
            writeln!(
                w,
                "#### Stop {} ({}, Sequence {}) Mismatches\n",
                i + 1,
                stop.stop_type,
                stop.sequence
            )?;
            write_mismatch_table(w, &stop.field_mismatches)?;
        }

        writeln!(w)?;
    }

    Ok(())
}

/// JSON companion of a markdown report: same path, `.json` extension.
pub fn json_companion(report_path: &Path) -> PathBuf {
    report_path.with_extension("json")
}

/// Write the markdown report to `report_path`, the full evaluation as JSON
/// beside it, and per-file comparisons as NDJSON.
pub fn write_tms_reports(evaluation: &TmsEvaluation, report_path: &Path) -> Result<(), ConversionError> {
    let file = create_file(report_path).map_err(|e| ConversionError::from(e).in_file(report_path))?;
    let mut out = io::BufWriter::new(file);
    write_tms_report(&mut out, evaluation)?;
    out.flush()?;

    write_json_pretty(json_companion(report_path), evaluation)?;

    let ndjson = report_path.with_extension("ndjson");
    let file = create_file(&ndjson).map_err(|e| ConversionError::from(e).in_file(&ndjson))?;
    let mut writer = NdjsonWriter::new(io::BufWriter::new(file));
    writer.write_all(&evaluation.results)?;
    writer.flush()?;

    tracing::info!("TMS evaluation report written to {}", report_path.display());
    Ok(())
}
