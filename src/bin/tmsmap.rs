//! tmsmap CLI - convert extraction records to TMS records, recover TMS records
//! from model replies, and score accuracy
//!
//! Settings are read from `tmsmap.yaml` (or `--config`), then `TMSMAP_*`
//! environment variables, then the flags below.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use tmsmap::batch::{normalize_files, process_files, process_files_parallel, BatchOutcome};
use tmsmap::config::PipelineConfig;
use tmsmap::converter::DeterministicConverter;
use tmsmap::diff::{Differ, MatchPolicy};
use tmsmap::error::ConversionError;
use tmsmap::eval::{evaluate_conversion, evaluate_extraction_dir};
use tmsmap::llm_output::repair_reply_file;
use tmsmap::report::{percent, write_extraction_reports, write_tms_reports};

const DEFAULT_CONFIG: &str = "tmsmap.yaml";

#[derive(Parser)]
#[command(name = "tmsmap")]
#[command(version, about = "Extraction-to-TMS conversion and accuracy evaluation", long_about = None)]
struct Cli {
    /// Path to configuration file (default: tmsmap.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert extraction records into TMS records
    Convert {
        /// Directory containing *_extraction.json files
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for *_tms.json files
        #[arg(short, long, default_value = "converted_tms")]
        output: PathBuf,

        /// JSON file mapping customer names to customer codes
        #[arg(long)]
        customer_mapping: Option<PathBuf>,

        /// Company identifier stamped on every record
        #[arg(long)]
        company_id: Option<String>,

        /// Number of concurrent conversions
        #[arg(short, long)]
        workers: Option<usize>,

        /// Convert one file at a time
        #[arg(long)]
        sequential: bool,

        /// Search the input directory recursively
        #[arg(short, long)]
        recursive: bool,

        /// Only convert the first N files
        #[arg(long)]
        sample: Option<usize>,
    },

    /// Clean up money, temperature, boolean and date fields of extraction records
    Normalize {
        /// Directory containing *_extraction.json files
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for normalized files
        #[arg(short, long)]
        output: PathBuf,

        /// Search the input directory recursively
        #[arg(short, long)]
        recursive: bool,
    },

    /// Recover a TMS record from a saved model reply
    Repair {
        /// Text file holding the model reply
        #[arg(long)]
        reply: PathBuf,

        /// Extraction record the reply was produced from
        #[arg(long)]
        extraction: PathBuf,

        /// Path of the repaired TMS record
        #[arg(short, long)]
        output: PathBuf,

        /// Company identifier stamped on backfilled records
        #[arg(long)]
        company_id: Option<String>,
    },

    /// Score extraction records against ground truth
    EvaluateExtraction {
        /// Directory containing extracted *_extraction.json files
        #[arg(short, long)]
        extraction_dir: PathBuf,

        /// Directory containing ground-truth *_extraction.json files
        #[arg(short, long)]
        ground_truth_dir: PathBuf,

        /// Output directory for reports
        #[arg(short, long, default_value = "evaluation_results")]
        output_dir: PathBuf,

        /// How whole-structure comparisons fold (any_field, all_fields)
        #[arg(long)]
        match_policy: Option<MatchPolicy>,
    },

    /// Score converted TMS records against ground-truth TMS records
    EvaluateTms {
        /// Directory containing converted *_tms.json files
        #[arg(long, default_value = "converted_tms")]
        converted: PathBuf,

        /// Directory containing ground-truth *_tms.json files
        #[arg(long)]
        ground_truth: PathBuf,

        /// Path to the markdown report
        #[arg(long, default_value = "tms_evaluation_report.md")]
        output_report: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Convert {
            input,
            output,
            customer_mapping,
            company_id,
            workers,
            sequential,
            recursive,
            sample,
        } => {
            let mut config = config;
            if customer_mapping.is_some() {
                config.customer_mapping = customer_mapping;
            }
            if let Some(company_id) = company_id {
                config.company_id = company_id;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            config.recursive |= recursive;
            config.sample = sample.or(config.sample);
            config.validate()?;

            convert(&config, &input, &output, sequential)
        }
        Commands::Normalize { input, output, recursive } => {
            let outcome = normalize_files(&input, &output, recursive || config.recursive, config.sample)?;
            report_outcome(&outcome);
            Ok(())
        }
        Commands::Repair {
            reply,
            extraction,
            output,
            company_id,
        } => {
            let company_id = company_id.unwrap_or(config.company_id);
            repair_reply_file(&reply, &extraction, &output, &company_id)?;
            println!("✓ Repaired TMS record written to {}", output.display());
            Ok(())
        }
        Commands::EvaluateExtraction {
            extraction_dir,
            ground_truth_dir,
            output_dir,
            match_policy,
        } => {
            let differ = Differ::new(match_policy.unwrap_or(config.match_policy));
            evaluate_extraction(&differ, &extraction_dir, &ground_truth_dir, &output_dir)
        }
        Commands::EvaluateTms {
            converted,
            ground_truth,
            output_report,
        } => evaluate_tms(&converted, &ground_truth, &output_report),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Explicit config path, else `tmsmap.yaml` when it exists, else defaults.
fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConversionError> {
    let default_path = Path::new(DEFAULT_CONFIG);
    match path {
        Some(path) => PipelineConfig::load(Some(path)),
        None if default_path.exists() => PipelineConfig::load(Some(default_path)),
        None => PipelineConfig::load(None),
    }
}

fn report_outcome(outcome: &BatchOutcome) {
    println!("✓ Processed {} files", outcome.processed_count);
    if !outcome.errors.is_empty() {
        println!("✗ {} files failed:", outcome.errors.len());
        for error in &outcome.errors {
            println!("  - {}", error);
        }
    }
}

fn convert(config: &PipelineConfig, input: &Path, output: &Path, sequential: bool) -> Result<(), ConversionError> {
    let converter = DeterministicConverter::new(config.customer_resolver()?, config.mapper_config());

    let outcome = if sequential {
        process_files(&converter, input, output, config.recursive, config.sample)?
    } else {
        process_files_parallel(
            Arc::new(converter),
            input,
            output,
            config.workers,
            config.recursive,
            config.sample,
        )?
    };

    report_outcome(&outcome);
    println!("  Output: {}", output.display());
    Ok(())
}

fn evaluate_extraction(
    differ: &Differ,
    extraction_dir: &Path,
    ground_truth_dir: &Path,
    output_dir: &Path,
) -> Result<(), ConversionError> {
    println!(
        "🔍 Evaluating {} against {}...",
        extraction_dir.display(),
        ground_truth_dir.display()
    );

    let evaluation = evaluate_extraction_dir(differ, extraction_dir, ground_truth_dir)?;
    write_extraction_reports(&evaluation, output_dir)?;

    let summary = &evaluation.summary;
    println!("\nEvaluation Summary:");
    println!("Average Field Presence: {}", percent(summary.field_presence));
    println!("Average Field Accuracy (Strict): {}", percent(summary.field_accuracy));
    println!("Average Field Accuracy (Relaxed): {}", percent(summary.relaxed_accuracy));
    println!("Critical Fields Accuracy (Strict): {}", percent(summary.critical_accuracy));
    println!("Critical Fields Accuracy (Relaxed): {}", percent(summary.critical_relaxed));
    println!("Average Overall Accuracy: {}", percent(summary.overall_accuracy));
    println!("Detailed results saved to {}", output_dir.display());
    Ok(())
}

fn evaluate_tms(converted: &Path, ground_truth: &Path, output_report: &Path) -> Result<(), ConversionError> {
    println!(
        "🔍 Evaluating TMS conversion: {} vs {}",
        converted.display(),
        ground_truth.display()
    );

    let evaluation = evaluate_conversion(converted, ground_truth)?;
    write_tms_reports(&evaluation, output_report)?;

    println!(
        "✓ Evaluation complete. Average accuracy: {}",
        percent(evaluation.summary.average_accuracy)
    );
    println!("  Report: {}", output_report.display());
    Ok(())
}
