//! Typed view of an extraction record.
//!
//! Every field is optional. Parsing goes through the tolerant deserializers in
//! [`super::lenient`], so any JSON object produces a record; only non-object
//! input is rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient;

/// Shipment data extracted from a source document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRecord {
    #[serde(deserialize_with = "lenient::string")]
    pub reference_number: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub booking_confirmation_number: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub customer_name: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub equipment_type: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub freight_rate: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub total_rate: Option<f64>,
    #[serde(deserialize_with = "lenient::boolean")]
    pub temperature_present: Option<bool>,
    #[serde(deserialize_with = "lenient::number")]
    pub temperature_low: Option<f64>,
    #[serde(deserialize_with = "lenient::number")]
    pub temperature_high: Option<f64>,
    #[serde(deserialize_with = "lenient::boolean")]
    pub is_flat_rate: Option<bool>,
    #[serde(deserialize_with = "lenient::list")]
    pub shipper_section: Vec<ShipperStop>,
    #[serde(deserialize_with = "lenient::list")]
    pub receiver_section: Vec<ReceiverStop>,
    #[serde(deserialize_with = "lenient::list")]
    pub additional_rates: Vec<AdditionalRate>,
}

/// A pickup location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipperStop {
    #[serde(deserialize_with = "lenient::string")]
    pub ship_from_company: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub ship_from_address: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub pickup_number: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub pickup_instructions: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub pickup_appointment_start_datetime: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub pickup_appointment_end_datetime: Option<String>,
}

/// A delivery location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverStop {
    #[serde(deserialize_with = "lenient::string")]
    pub receiver_company: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub receiver_address: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub receiver_delivery_number: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub receiver_instructions: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub receiver_appointment_start_datetime: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub receiver_appointment_end_datetime: Option<String>,
}

/// An accessorial charge line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditionalRate {
    #[serde(deserialize_with = "lenient::string")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub amount: Option<f64>,
}

impl ExtractionRecord {
    /// Build a record from parsed JSON.
    ///
    /// Fails only when the value is not a JSON object.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        if !value.is_object() {
            return Err(serde::de::Error::custom(format!(
                "extraction record must be a JSON object, got {}",
                json_kind(value)
            )));
        }
        serde_json::from_value(value.clone())
    }

    /// Sum of all additional rate amounts, missing amounts counting as zero.
    pub fn additional_total(&self) -> f64 {
        self.additional_rates.iter().filter_map(|r| r.amount).sum()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
