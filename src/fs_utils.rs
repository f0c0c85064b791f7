//! Filesystem utilities shared by the batch pipeline, evaluators and report
//! writers.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::ConversionError;

/// File name suffix of extraction records
pub const EXTRACTION_SUFFIX: &str = "_extraction.json";

/// File name suffix of converted TMS records
pub const TMS_SUFFIX: &str = "_tms.json";

/// Write content to a file, creating parent directories if needed
pub fn write_file<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> io::Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, contents)
}

/// Create a file for writing, creating parent directories if needed
pub fn create_file<P: AsRef<Path>>(path: P) -> io::Result<fs::File> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::File::create(path)
}

/// Read and parse a JSON document. Errors carry the path.
pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Value, ConversionError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| ConversionError::from(e).in_file(path))?;
    serde_json::from_str(&contents).map_err(|e| ConversionError::from(e).in_file(path))
}

/// Serialize `value` as pretty-printed JSON to `path`.
pub fn write_json_pretty<P: AsRef<Path>, T: Serialize + ?Sized>(
    path: P,
    value: &T,
) -> Result<(), ConversionError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value).map_err(|e| ConversionError::from(e).in_file(path))?;
    write_file(path, json).map_err(|e| ConversionError::from(e).in_file(path))
}

/// Identifier of a record file: its name up to the first `_`.
///
/// `"ABC123_extraction.json"` → `"ABC123"`.
pub fn file_id(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match name.split_once('_') {
        Some((id, _)) => id.to_string(),
        None => name,
    }
}

/// Files in `dir` whose names end with `suffix`, sorted by path.
///
/// Only the top level is searched unless `recursive` is set. `sample` keeps
/// the first N files after sorting.
pub fn discover_files(
    dir: &Path,
    suffix: &str,
    recursive: bool,
    sample: Option<usize>,
) -> Result<Vec<PathBuf>, ConversionError> {
    if !dir.is_dir() {
        return Err(ConversionError::Config(format!(
            "input directory does not exist: {}",
            dir.display()
        )));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry.map_err(|e| ConversionError::from(io::Error::from(e)).in_file(dir))?;
        if entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(suffix) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    if let Some(limit) = sample {
        files.truncate(limit);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_id() {
        assert_eq!(file_id(Path::new("/in/ABC123_extraction.json")), "ABC123");
        assert_eq!(file_id(Path::new("A_B_tms.json")), "A");
        assert_eq!(file_id(Path::new("plain.json")), "plain.json");
    }

    #[test]
    fn test_discover_files() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path().join("b_extraction.json"), "{}").unwrap();
        write_file(dir.path().join("a_extraction.json"), "{}").unwrap();
        write_file(dir.path().join("notes.txt"), "x").unwrap();
        write_file(dir.path().join("nested/c_extraction.json"), "{}").unwrap();

        let top = discover_files(dir.path(), EXTRACTION_SUFFIX, false, None).unwrap();
        let names: Vec<String> = top.iter().map(|p| file_id(p)).collect();
        assert_eq!(names, vec!["a", "b"]);

        let all = discover_files(dir.path(), EXTRACTION_SUFFIX, true, None).unwrap();
        assert_eq!(all.len(), 3);

        let sampled = discover_files(dir.path(), EXTRACTION_SUFFIX, true, Some(1)).unwrap();
        assert_eq!(sampled.len(), 1);
    }

    #[test]
    fn test_discover_missing_dir() {
        let result = discover_files(Path::new("/nonexistent/input"), EXTRACTION_SUFFIX, false, None);
        assert!(matches!(result, Err(ConversionError::Config(_))));
    }

    #[test]
    fn test_json_round_trip_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/x_tms.json");

        write_json_pretty(&path, &serde_json::json!({"blnum": "1"})).unwrap();
        let value = read_json(&path).unwrap();
        assert_eq!(value["blnum"], "1");
    }

    #[test]
    fn test_read_invalid_json_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad_extraction.json");
        write_file(&path, "{not json").unwrap();

        let err = read_json(&path).unwrap_err();
        assert!(err.to_string().contains("bad_extraction.json"));
    }
}
