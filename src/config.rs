//! Pipeline configuration.
//!
//! Settings come from an optional YAML file (`tmsmap.yaml`), then from
//! `TMSMAP_*` environment variables (a `.env` file is honoured), then from
//! command-line flags applied by the binary.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::customer::{CustomerResolver, CustomerTable, InitialsResolver};
use crate::diff::MatchPolicy;
use crate::error::ConversionError;
use crate::mapper::MapperConfig;

/// Default number of concurrent conversions
pub const DEFAULT_WORKERS: usize = 5;

/// Pipeline configuration from `tmsmap.yaml`
///
/// # Example
///
/// ```yaml
/// company_id: TMS
/// customer_mapping: customer_id_mapping.json
/// workers: 8
/// match_policy: any_field
/// recursive: false
/// sample: 20
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Company identifier stamped on every TMS record
    pub company_id: String,
    /// JSON file of customer name to customer code
    pub customer_mapping: Option<PathBuf>,
    /// Concurrent conversions in parallel mode
    pub workers: usize,
    pub match_policy: MatchPolicy,
    /// Search input directories recursively
    pub recursive: bool,
    /// Only process the first N files
    pub sample: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            company_id: MapperConfig::default().company_id,
            customer_mapping: None,
            workers: DEFAULT_WORKERS,
            match_policy: MatchPolicy::default(),
            recursive: false,
            sample: None,
        }
    }
}

impl PipelineConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConversionError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConversionError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConversionError::from(e).in_file(path))?;
        Self::from_yaml_str(&contents).map_err(|e| e.in_file(path))
    }

    /// File settings (or defaults), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConversionError> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `TMSMAP_WORKERS`, `TMSMAP_COMPANY_ID` and
    /// `TMSMAP_CUSTOMER_MAPPING` through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConversionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(workers) = lookup("TMSMAP_WORKERS") {
            self.workers = workers.trim().parse().map_err(|_| {
                ConversionError::Config(format!("TMSMAP_WORKERS must be a positive integer, got '{}'", workers))
            })?;
        }
        if let Some(company_id) = lookup("TMSMAP_COMPANY_ID") {
            self.company_id = company_id;
        }
        if let Some(mapping) = lookup("TMSMAP_CUSTOMER_MAPPING") {
            self.customer_mapping = Some(PathBuf::from(mapping));
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConversionError> {
        if self.workers == 0 {
            return Err(ConversionError::Config("workers must be at least 1".to_string()));
        }
        if self.company_id.trim().is_empty() {
            return Err(ConversionError::Config("company_id must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn mapper_config(&self) -> MapperConfig {
        MapperConfig {
            company_id: self.company_id.clone(),
            ..MapperConfig::default()
        }
    }

    /// Table-backed resolver when a mapping file is configured, initials otherwise.
    pub fn customer_resolver(&self) -> Result<Arc<dyn CustomerResolver>, ConversionError> {
        match &self.customer_mapping {
            Some(path) => Ok(Arc::new(CustomerTable::from_json_file(path)?)),
            None => {
                tracing::warn!("No customer mapping configured; customer codes fall back to initials");
                Ok(Arc::new(InitialsResolver))
            }
        }
    }
}
