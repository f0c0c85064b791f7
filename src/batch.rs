//! Batch pipeline over a directory of extraction records.
//!
//! Each `<id>_extraction.json` is converted independently and written to
//! `<output_dir>/<id>_tms.json`. A file that fails to read, parse or convert
//! is recorded as a [`FileError`] and the batch moves on; only a missing
//! input directory fails the whole run.
//!
//! The parallel path fans files out over a tokio runtime: a semaphore holds
//! the number of in-flight conversions to `workers`, and each conversion runs
//! on the blocking pool.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::converter::Converter;
use crate::error::ConversionError;
use crate::fs_utils::{discover_files, file_id, read_json, write_json_pretty, EXTRACTION_SUFFIX, TMS_SUFFIX};
use crate::normalize::normalize_extraction;

/// A file the batch could not process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileError {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Result of a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Files converted and written successfully
    pub processed_count: usize,
    pub errors: Vec<FileError>,
}

impl BatchOutcome {
    fn record(&mut self, path: &Path, result: Result<PathBuf, ConversionError>) {
        match result {
            Ok(written) => {
                tracing::debug!("Wrote {}", written.display());
                self.processed_count += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to process {}: {}", path.display(), e);
                self.errors.push(FileError {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
    }

    fn log_summary(&self) {
        tracing::info!(
            "Processed {} files, {} errors",
            self.processed_count,
            self.errors.len()
        );
    }
}

/// Convert one extraction file and write `<id>_tms.json` into `output_dir`.
pub fn convert_file(converter: &dyn Converter, input: &Path, output_dir: &Path) -> Result<PathBuf, ConversionError> {
    let extraction = read_json(input)?;
    let tms = converter.convert(&extraction).map_err(|e| e.in_file(input))?;

    let output = output_dir.join(format!("{}{}", file_id(input), TMS_SUFFIX));
    write_json_pretty(&output, &tms)?;
    Ok(output)
}

/// Normalize one extraction file into `output_dir`, keeping its file name.
pub fn normalize_file(input: &Path, output_dir: &Path) -> Result<PathBuf, ConversionError> {
    let extraction = read_json(input)?;
    let normalized = normalize_extraction(extraction);

    let output = output_dir.join(format!("{}{}", file_id(input), EXTRACTION_SUFFIX));
    write_json_pretty(&output, &normalized)?;
    Ok(output)
}

/// Convert every extraction file in `input_dir`, one at a time.
pub fn process_files(
    converter: &dyn Converter,
    input_dir: &Path,
    output_dir: &Path,
    recursive: bool,
    sample: Option<usize>,
) -> Result<BatchOutcome, ConversionError> {
    let files = discover_files(input_dir, EXTRACTION_SUFFIX, recursive, sample)?;
    tracing::info!("Converting {} files from {}", files.len(), input_dir.display());

    let mut outcome = BatchOutcome::default();
    for path in &files {
        outcome.record(path, convert_file(converter, path, output_dir));
    }

    outcome.log_summary();
    Ok(outcome)
}

/// Normalize every extraction file in `input_dir` into `output_dir`.
pub fn normalize_files(
    input_dir: &Path,
    output_dir: &Path,
    recursive: bool,
    sample: Option<usize>,
) -> Result<BatchOutcome, ConversionError> {
    let files = discover_files(input_dir, EXTRACTION_SUFFIX, recursive, sample)?;
    tracing::info!("Normalizing {} files from {}", files.len(), input_dir.display());

    let mut outcome = BatchOutcome::default();
    for path in &files {
        outcome.record(path, normalize_file(path, output_dir));
    }

    outcome.log_summary();
    Ok(outcome)
}

fn task_failure(error: tokio::task::JoinError) -> ConversionError {
    ConversionError::from(std::io::Error::other(error.to_string()))
}

/// Convert `files` with at most `workers` conversions in flight.
///
/// Completion order is not preserved; errors are collected per file,
/// including conversions that panic.
pub async fn convert_concurrently(
    converter: Arc<dyn Converter>,
    files: Vec<PathBuf>,
    output_dir: PathBuf,
    workers: usize,
) -> BatchOutcome {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let output_dir = Arc::new(output_dir);

    tracing::info!("Converting {} files with {} workers", files.len(), workers);

    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let semaphore = semaphore.clone();
        let converter = converter.clone();
        let output_dir = output_dir.clone();
        let task_path = path.clone();

        let handle = tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return Err(ConversionError::Config(format!("worker pool closed: {}", e))),
            };
            match tokio::task::spawn_blocking(move || convert_file(converter.as_ref(), &task_path, &output_dir)).await {
                Ok(result) => result,
                Err(e) => Err(task_failure(e)),
            }
        });
        handles.push((path, handle));
    }

    let mut outcome = BatchOutcome::default();
    for (path, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(task_failure(e)),
        };
        outcome.record(&path, result);
    }

    outcome.log_summary();
    outcome
}

/// Convert every extraction file in `input_dir` on a worker pool of size
/// `workers`.
pub fn process_files_parallel(
    converter: Arc<dyn Converter>,
    input_dir: &Path,
    output_dir: &Path,
    workers: usize,
    recursive: bool,
    sample: Option<usize>,
) -> Result<BatchOutcome, ConversionError> {
    let files = discover_files(input_dir, EXTRACTION_SUFFIX, recursive, sample)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    Ok(runtime.block_on(convert_concurrently(
        converter,
        files,
        output_dir.to_path_buf(),
        workers,
    )))
}
