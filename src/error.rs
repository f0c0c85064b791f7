//! Error type shared by the batch pipeline, converters and report writers.
//!
//! The mapping and comparison cores are total and never produce errors; this
//! type only appears at I/O and parsing boundaries.

use std::fmt;
use std::path::PathBuf;

/// Error type for conversion and evaluation boundaries
#[derive(Debug)]
pub enum ConversionError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Yaml(serde_yaml::Error),
    /// A converter returned text that could not be recovered as a JSON object
    MalformedOutput(String),
    Config(String),
    /// A file-level failure, carrying the path it happened on
    File {
        path: PathBuf,
        source: Box<ConversionError>,
    },
}

impl ConversionError {
    /// Attach a file path to an error raised while handling that file.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        ConversionError::File {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

impl From<std::io::Error> for ConversionError {
    fn from(err: std::io::Error) -> Self {
        ConversionError::Io(err)
    }
}

impl From<serde_json::Error> for ConversionError {
    fn from(err: serde_json::Error) -> Self {
        ConversionError::Json(err)
    }
}

impl From<serde_yaml::Error> for ConversionError {
    fn from(err: serde_yaml::Error) -> Self {
        ConversionError::Yaml(err)
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::Io(e) => write!(f, "IO error: {}", e),
            ConversionError::Json(e) => write!(f, "JSON error: {}", e),
            ConversionError::Yaml(e) => write!(f, "YAML error: {}", e),
            ConversionError::MalformedOutput(msg) => write!(f, "Malformed converter output: {}", msg),
            ConversionError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ConversionError::File { path, source } => {
                write!(f, "Error processing {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConversionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConversionError::Io(e) => Some(e),
            ConversionError::Json(e) => Some(e),
            ConversionError::Yaml(e) => Some(e),
            ConversionError::File { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_names_path() {
        let inner: ConversionError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        let err = inner.in_file("/data/bad_extraction.json");

        let msg = err.to_string();
        assert!(msg.starts_with("Error processing /data/bad_extraction.json"));
        assert!(msg.contains("JSON error"));
    }
}
