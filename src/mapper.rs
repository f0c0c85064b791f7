//! Deterministic extraction-to-TMS mapping.
//!
//! [`convert_to_tms`] is a total, pure function apart from random stop IDs and
//! the `ordered_date` stamp: it never fails, and any field it cannot derive is
//! defaulted. Field groups that only make sense with source data (temperature
//! block, stop notes, reference numbers, movement, other charges) are omitted
//! when that data is missing.

use crate::address::parse_address;
use crate::customer::CustomerResolver;
use crate::ids::{generate_id, movement_id, DEFAULT_PREFIX};
use crate::record::{
    ExtractionRecord, Movement, OtherCharge, ReceiverStop, ReferenceNumber, ReferenceQualifier,
    ShipperStop, StopNote, StopType, TmsEntity, TmsOrder, TmsStop,
};
use crate::timestamp::{format_timestamp, now_timestamp};

/// Currency code written next to every monetary amount
pub const CURRENCY: &str = "USD";

/// Denominator paired with every monetary amount
pub const RATE_DENOMINATOR: u32 = 1;

/// Placeholder miles added per leg between consecutive stops
pub const MILES_PER_LEG: i64 = 100;

/// Equipment code used for unrecognized equipment descriptions
pub const DEFAULT_EQUIPMENT: &str = "V";

const EQUIPMENT_CODES: &[(&str, &str)] = &[
    ("Van", "V"),
    ("Reefer", "R"),
    ("Flatbed", "F"),
    ("Dry Van", "V"),
    ("Refrigerated", "R"),
    ("Tanker", "T"),
    ("Container", "C"),
    ("Specialized", "S"),
];

/// Tunables for the mapper
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// Company identifier stamped on every record
    pub company_id: String,
    /// Prefix for generated stop identifiers
    pub id_prefix: String,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            company_id: "TMS".to_string(),
            id_prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

/// Map an equipment description to its single-letter TMS code.
///
/// Matching is exact; anything unrecognized maps to Van.
pub fn map_equipment_type(equipment_type: Option<&str>) -> &'static str {
    equipment_type
        .and_then(|name| EQUIPMENT_CODES.iter().find(|(k, _)| *k == name))
        .map(|(_, code)| *code)
        .unwrap_or(DEFAULT_EQUIPMENT)
}

/// Source fields shared by pickups and deliveries.
struct StopSource<'a> {
    company: Option<&'a str>,
    address: Option<&'a str>,
    number: Option<&'a str>,
    instructions: Option<&'a str>,
    window_start: Option<&'a str>,
    window_end: Option<&'a str>,
    stop_type: StopType,
}

impl<'a> From<&'a ShipperStop> for StopSource<'a> {
    fn from(s: &'a ShipperStop) -> Self {
        Self {
            company: s.ship_from_company.as_deref(),
            address: s.ship_from_address.as_deref(),
            number: s.pickup_number.as_deref(),
            instructions: s.pickup_instructions.as_deref(),
            window_start: s.pickup_appointment_start_datetime.as_deref(),
            window_end: s.pickup_appointment_end_datetime.as_deref(),
            stop_type: StopType::Pickup,
        }
    }
}

impl<'a> From<&'a ReceiverStop> for StopSource<'a> {
    fn from(r: &'a ReceiverStop) -> Self {
        Self {
            company: r.receiver_company.as_deref(),
            address: r.receiver_address.as_deref(),
            number: r.receiver_delivery_number.as_deref(),
            instructions: r.receiver_instructions.as_deref(),
            window_start: r.receiver_appointment_start_datetime.as_deref(),
            window_end: r.receiver_appointment_end_datetime.as_deref(),
            stop_type: StopType::Delivery,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn build_stop(
    source: StopSource<'_>,
    id: String,
    sequence: u32,
    order_id: &str,
    config: &MapperConfig,
) -> TmsStop {
    let address = parse_address(source.address.unwrap_or_default());
    let instructions = non_empty(source.instructions).map(str::to_string);

    let stop_notes = instructions.as_ref().map(|text| {
        vec![StopNote {
            kind: StopNote::KIND,
            company_id: config.company_id.clone(),
            comment_type: "DC".to_string(),
            comments: text.clone(),
            sequence: 1,
            stop_id: id.clone(),
            system_added: false,
        }]
    });

    let reference_numbers = non_empty(source.number).map(|number| {
        let qualifier = match source.stop_type {
            StopType::Pickup => ReferenceQualifier::Pickup,
            StopType::Delivery => ReferenceQualifier::Order,
        };
        vec![ReferenceNumber {
            kind: ReferenceNumber::KIND,
            company_id: config.company_id.clone(),
            reference_number: number.to_string(),
            reference_qual: qualifier,
            send_to_driver: true,
            stop_id: id.clone(),
        }]
    });

    let (loading_instructions, unloading_instructions) = match source.stop_type {
        StopType::Pickup => (instructions, None),
        StopType::Delivery => (None, instructions),
    };

    TmsStop {
        kind: TmsStop::KIND,
        company_id: config.company_id.clone(),
        id,
        address: address.street,
        city_name: address.city,
        state: address.state,
        zip_code: address.zip_code,
        location_name: source.company.unwrap_or_default().to_string(),
        stop_type: source.stop_type,
        driver_load_unload: "N".to_string(),
        status: "A".to_string(),
        order_id: order_id.to_string(),
        order_sequence: sequence,
        movement_sequence: sequence,
        sched_arrive_early: non_empty(source.window_start).map(|s| format_timestamp(Some(s))),
        sched_arrive_late: non_empty(source.window_end).map(|s| format_timestamp(Some(s))),
        stop_notes,
        loading_instructions,
        unloading_instructions,
        reference_numbers,
    }
}

/// Convert an extraction record into a TMS order graph.
///
/// # Example
///
/// ```
/// use tmsmap::customer::InitialsResolver;
/// use tmsmap::mapper::{convert_to_tms, MapperConfig};
/// use tmsmap::record::ExtractionRecord;
///
/// let record = ExtractionRecord {
///     reference_number: Some("12345".to_string()),
///     equipment_type: Some("Reefer".to_string()),
///     ..Default::default()
/// };
///
/// let order = convert_to_tms(&record, &InitialsResolver, &MapperConfig::default());
/// assert_eq!(order.equipment_type_id, "R");
/// assert!(order.movement.is_none());
/// ```
pub fn convert_to_tms(
    record: &ExtractionRecord,
    customers: &dyn CustomerResolver,
    config: &MapperConfig,
) -> TmsOrder {
    let blnum = record.reference_number.clone().unwrap_or_default();
    let customer_id = customers.resolve(record.customer_name.as_deref().unwrap_or_default());

    let freight = record.freight_rate.unwrap_or(0.0);
    let total = record.total_rate.unwrap_or(0.0);
    let other_total = record.additional_total();
    let rate_type = if record.is_flat_rate.unwrap_or(true) { "F" } else { "M" };

    let (temperature_min, temperature_max, setpoint_temp) = if record.temperature_present == Some(true) {
        let low = record.temperature_low;
        let high = record.temperature_high;
        let setpoint = low.zip(high).map(|(l, h)| (l + h) / 2.0);
        (low, high, setpoint)
    } else {
        (None, None, None)
    };

    let shipper_ids: Vec<String> = record
        .shipper_section
        .iter()
        .map(|_| generate_id(&config.id_prefix))
        .collect();
    let receiver_ids: Vec<String> = record
        .receiver_section
        .iter()
        .map(|_| generate_id(&config.id_prefix))
        .collect();

    let shipper_stop_id = shipper_ids.first().cloned();
    let consignee_stop_id = receiver_ids.last().cloned();

    let shipper_sources = record.shipper_section.iter().map(StopSource::from);
    let receiver_sources = record.receiver_section.iter().map(StopSource::from);

    let stops: Vec<TmsStop> = shipper_sources
        .chain(receiver_sources)
        .zip(shipper_ids.iter().chain(receiver_ids.iter()))
        .enumerate()
        .map(|(i, (source, id))| build_stop(source, id.clone(), i as u32 + 1, &blnum, config))
        .collect();

    let bill_distance = (stops.len() as i64 - 1) * MILES_PER_LEG;

    let movement = match (&shipper_stop_id, &consignee_stop_id) {
        (Some(origin), Some(dest)) => Some(Movement {
            kind: Movement::KIND,
            company_id: config.company_id.clone(),
            id: movement_id(&blnum),
            origin_stop_id: origin.clone(),
            dest_stop_id: dest.clone(),
            loaded: "L".to_string(),
            movement_type: "TKLD".to_string(),
            status: "A".to_string(),
            move_distance: bill_distance,
            move_distance_um: "MI".to_string(),
            authorized: true,
            order_id: blnum.clone(),
        }),
        _ => None,
    };
    let curr_movement_id = movement.as_ref().map(|m| m.id.clone());

    let other_charges = if record.additional_rates.is_empty() {
        None
    } else {
        Some(
            record
                .additional_rates
                .iter()
                .enumerate()
                .map(|(i, rate)| {
                    let amount = rate.amount.unwrap_or(0.0);
                    OtherCharge {
                        kind: OtherCharge::KIND,
                        company_id: config.company_id.clone(),
                        charge_code: rate.code.clone().unwrap_or_else(|| "MISC".to_string()),
                        charge_description: rate
                            .description
                            .clone()
                            .unwrap_or_else(|| "Miscellaneous Charge".to_string()),
                        charge_amount: amount,
                        charge_amount_c: CURRENCY.to_string(),
                        charge_amount_n: amount,
                        charge_amount_r: RATE_DENOMINATOR,
                        sequence: i as u32 + 1,
                    }
                })
                .collect(),
        )
    };

    TmsOrder {
        kind: TmsOrder::KIND,
        company_id: config.company_id.clone(),
        allow_relay: true,
        collection_method: "P".to_string(),
        commodity: "DRY".to_string(),
        commodity_id: "DRY".to_string(),
        status: "A".to_string(),
        operational_status: "CLIN".to_string(),
        order_mode: "T".to_string(),
        ordered_method: "M".to_string(),
        bill_distance_um: "MI".to_string(),
        freight_charge_c: CURRENCY.to_string(),
        total_charge_c: CURRENCY.to_string(),
        otherchargetotal_c: CURRENCY.to_string(),
        totalcharge_and_excisetax_c: CURRENCY.to_string(),
        blnum,
        customer_id,
        equipment_type_id: map_equipment_type(record.equipment_type.as_deref()).to_string(),
        freight_charge: freight,
        freight_charge_n: freight,
        freight_charge_r: RATE_DENOMINATOR,
        rate: freight,
        rate_type: rate_type.to_string(),
        rate_units: 1,
        otherchargetotal: other_total,
        otherchargetotal_n: other_total,
        otherchargetotal_r: RATE_DENOMINATOR,
        total_charge: total,
        total_charge_n: total,
        total_charge_r: RATE_DENOMINATOR,
        totalcharge_and_excisetax: total,
        totalcharge_and_excisetax_n: total,
        totalcharge_and_excisetax_r: RATE_DENOMINATOR,
        temperature_min,
        temperature_max,
        setpoint_temp,
        ordered_date: now_timestamp(),
        shipper_stop_id,
        consignee_stop_id,
        stops,
        bill_distance,
        movement: movement.map(|m| vec![m]),
        curr_movement_id,
        other_charges,
    }
}
