//! The conversion seam used by the batch pipeline.
//!
//! A [`Converter`] turns one raw extraction document into one TMS document.
//! [`DeterministicConverter`] is the rule-based implementation; a
//! model-backed converter would implement the same trait and recover its
//! reply with [`crate::llm_output`].

use serde_json::Value;
use std::sync::Arc;

use crate::customer::CustomerResolver;
use crate::error::ConversionError;
use crate::mapper::{convert_to_tms, MapperConfig};
use crate::normalize::normalize_extraction;
use crate::record::{ExtractionRecord, TmsEntity};

/// Converts an extraction document into a TMS document
pub trait Converter: Send + Sync {
    fn convert(&self, extraction: &Value) -> Result<Value, ConversionError>;
}

/// Normalize, parse into a typed record, map, serialize.
#[derive(Clone)]
pub struct DeterministicConverter {
    customers: Arc<dyn CustomerResolver>,
    config: MapperConfig,
}

impl DeterministicConverter {
    pub fn new(customers: Arc<dyn CustomerResolver>, config: MapperConfig) -> Self {
        Self { customers, config }
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }
}

impl Converter for DeterministicConverter {
    fn convert(&self, extraction: &Value) -> Result<Value, ConversionError> {
        let normalized = normalize_extraction(extraction.clone());
        let record = ExtractionRecord::from_value(&normalized)?;
        let order = convert_to_tms(&record, self.customers.as_ref(), &self.config);
        Ok(order.to_value()?)
    }
}
