//! TMS record graph: order, stops, movement, notes, reference numbers and
//! other charges.
//!
//! Every node serializes with a `__type` discriminator naming its record kind,
//! and field names follow the TMS import schema verbatim. Optional groups are
//! omitted from the JSON output rather than written as null.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Record kind written into the `__type` discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    #[serde(rename = "orders")]
    Order,
    #[serde(rename = "stop")]
    Stop,
    #[serde(rename = "stop_note")]
    StopNote,
    #[serde(rename = "reference_number")]
    ReferenceNumber,
    #[serde(rename = "movement")]
    Movement,
    #[serde(rename = "other_charge")]
    OtherCharge,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::Order => "orders",
            RecordKind::Stop => "stop",
            RecordKind::StopNote => "stop_note",
            RecordKind::ReferenceNumber => "reference_number",
            RecordKind::Movement => "movement",
            RecordKind::OtherCharge => "other_charge",
        };
        write!(f, "{}", name)
    }
}

/// Core trait for nodes of the TMS record graph.
pub trait TmsEntity: Serialize + Sized {
    /// Discriminator written as `__type`
    const KIND: RecordKind;

    /// Convert to an untyped JSON tree (used by the evaluators)
    fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Convert to an NDJSON line (newline-delimited JSON)
    fn to_ndjson_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Pickup (`PU`) or delivery (`SO`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopType {
    #[serde(rename = "PU")]
    Pickup,
    #[serde(rename = "SO")]
    Delivery,
}

/// Qualifier distinguishing pickup references from order/delivery references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceQualifier {
    /// Pickup number
    #[serde(rename = "POL")]
    Pickup,
    /// Order / delivery number
    #[serde(rename = "ON")]
    Order,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmsOrder {
    #[serde(rename = "__type")]
    pub kind: RecordKind,
    pub company_id: String,
    pub allow_relay: bool,
    pub collection_method: String,
    pub commodity: String,
    pub commodity_id: String,
    pub status: String,
    pub operational_status: String,
    pub order_mode: String,
    pub ordered_method: String,
    pub bill_distance_um: String,
    pub freight_charge_c: String,
    pub total_charge_c: String,
    pub otherchargetotal_c: String,
    pub totalcharge_and_excisetax_c: String,

    pub blnum: String,
    pub customer_id: String,
    pub equipment_type_id: String,

    pub freight_charge: f64,
    pub freight_charge_n: f64,
    pub freight_charge_r: u32,
    pub rate: f64,
    pub rate_type: String,
    pub rate_units: u32,
    pub otherchargetotal: f64,
    pub otherchargetotal_n: f64,
    pub otherchargetotal_r: u32,
    pub total_charge: f64,
    pub total_charge_n: f64,
    pub total_charge_r: u32,
    pub totalcharge_and_excisetax: f64,
    pub totalcharge_and_excisetax_n: f64,
    pub totalcharge_and_excisetax_r: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setpoint_temp: Option<f64>,

    pub ordered_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipper_stop_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consignee_stop_id: Option<String>,

    pub stops: Vec<TmsStop>,
    pub bill_distance: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement: Option<Vec<Movement>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curr_movement_id: Option<String>,

    #[serde(rename = "otherCharges", default, skip_serializing_if = "Option::is_none")]
    pub other_charges: Option<Vec<OtherCharge>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmsStop {
    #[serde(rename = "__type")]
    pub kind: RecordKind,
    pub company_id: String,
    pub id: String,
    pub address: String,
    pub city_name: String,
    pub state: String,
    pub zip_code: String,
    pub location_name: String,
    pub stop_type: StopType,
    pub driver_load_unload: String,
    pub status: String,
    pub order_id: String,
    pub order_sequence: u32,
    pub movement_sequence: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sched_arrive_early: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sched_arrive_late: Option<String>,

    #[serde(rename = "stopNotes", default, skip_serializing_if = "Option::is_none")]
    pub stop_notes: Option<Vec<StopNote>>,
    #[serde(rename = "__loadingInstructions", default, skip_serializing_if = "Option::is_none")]
    pub loading_instructions: Option<String>,
    #[serde(rename = "__unloadingInstructions", default, skip_serializing_if = "Option::is_none")]
    pub unloading_instructions: Option<String>,

    #[serde(rename = "referenceNumbers", default, skip_serializing_if = "Option::is_none")]
    pub reference_numbers: Option<Vec<ReferenceNumber>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopNote {
    #[serde(rename = "__type")]
    pub kind: RecordKind,
    pub company_id: String,
    /// `DC` = dispatch comment
    pub comment_type: String,
    pub comments: String,
    pub sequence: u32,
    pub stop_id: String,
    pub system_added: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceNumber {
    #[serde(rename = "__type")]
    pub kind: RecordKind,
    pub company_id: String,
    pub reference_number: String,
    pub reference_qual: ReferenceQualifier,
    pub send_to_driver: bool,
    pub stop_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    #[serde(rename = "__type")]
    pub kind: RecordKind,
    pub company_id: String,
    pub id: String,
    pub origin_stop_id: String,
    pub dest_stop_id: String,
    pub loaded: String,
    pub movement_type: String,
    pub status: String,
    pub move_distance: i64,
    pub move_distance_um: String,
    pub authorized: bool,
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherCharge {
    #[serde(rename = "__type")]
    pub kind: RecordKind,
    pub company_id: String,
    pub charge_code: String,
    pub charge_description: String,
    pub charge_amount: f64,
    pub charge_amount_c: String,
    pub charge_amount_n: f64,
    pub charge_amount_r: u32,
    pub sequence: u32,
}

impl TmsEntity for TmsOrder {
    const KIND: RecordKind = RecordKind::Order;
}

impl TmsEntity for TmsStop {
    const KIND: RecordKind = RecordKind::Stop;
}

impl TmsEntity for StopNote {
    const KIND: RecordKind = RecordKind::StopNote;
}

impl TmsEntity for ReferenceNumber {
    const KIND: RecordKind = RecordKind::ReferenceNumber;
}

impl TmsEntity for Movement {
    const KIND: RecordKind = RecordKind::Movement;
}

impl TmsEntity for OtherCharge {
    const KIND: RecordKind = RecordKind::OtherCharge;
}

impl TmsOrder {
    /// Stops of one type, in sequence order.
    pub fn stops_of_type(&self, stop_type: StopType) -> impl Iterator<Item = &TmsStop> {
        self.stops.iter().filter(move |s| s.stop_type == stop_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_note() -> StopNote {
        StopNote {
            kind: RecordKind::StopNote,
            company_id: "TMS".to_string(),
            comment_type: "DC".to_string(),
            comments: "Call ahead".to_string(),
            sequence: 1,
            stop_id: "zz0123456789abcdefAPP2".to_string(),
            system_added: false,
        }
    }

    #[test]
    fn test_discriminator_serialization() {
        let value = sample_note().to_value().unwrap();

        assert_eq!(value["__type"], "stop_note");
        assert_eq!(value["comment_type"], "DC");
        assert_eq!(StopNote::KIND.to_string(), "stop_note");
    }

    #[test]
    fn test_enum_codes() {
        assert_eq!(serde_json::to_value(StopType::Pickup).unwrap(), "PU");
        assert_eq!(serde_json::to_value(StopType::Delivery).unwrap(), "SO");
        assert_eq!(serde_json::to_value(ReferenceQualifier::Pickup).unwrap(), "POL");
        assert_eq!(serde_json::to_value(ReferenceQualifier::Order).unwrap(), "ON");
        assert_eq!(serde_json::to_value(RecordKind::Order).unwrap(), "orders");
    }

    #[test]
    fn test_ndjson_line() {
        let line = sample_note().to_ndjson_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }
}
