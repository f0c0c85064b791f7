//! Integration tests for the extraction-to-TMS mapper

use serde_json::{json, Value};
use tmsmap::converter::{Converter, DeterministicConverter};
use tmsmap::customer::{CustomerTable, InitialsResolver};
use tmsmap::mapper::{convert_to_tms, MapperConfig};
use tmsmap::record::{ExtractionRecord, StopType, TmsEntity};
use std::sync::Arc;

fn record(value: Value) -> ExtractionRecord {
    ExtractionRecord::from_value(&value).unwrap()
}

fn shipper(company: &str) -> Value {
    json!({"ship_from_company": company, "ship_from_address": "1 Main St, Springfield IL 62701"})
}

fn receiver(company: &str) -> Value {
    json!({"receiver_company": company, "receiver_address": "2 Oak Ave, Chicago IL 60601"})
}

/// Blank out generated identifiers and the conversion timestamp
fn strip_generated(value: &mut Value) {
    const GENERATED: &[&str] = &[
        "id",
        "stop_id",
        "origin_stop_id",
        "dest_stop_id",
        "shipper_stop_id",
        "consignee_stop_id",
        "ordered_date",
    ];

    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if GENERATED.contains(&key.as_str()) {
                    *child = Value::Null;
                } else {
                    strip_generated(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(strip_generated),
        _ => {}
    }
}

#[test]
fn test_reefer_two_stop_scenario() {
    let extraction = record(json!({
        "reference_number": "12345",
        "customer_name": "Acme Co",
        "equipment_type": "Reefer",
        "shipper_section": [{"ship_from_company": "A", "ship_from_address": "1 Main St, Springfield IL 62701"}],
        "receiver_section": [{"receiver_company": "B", "receiver_address": "2 Oak Ave, Chicago IL 60601"}],
        "freight_rate": 500,
        "total_rate": 500
    }));

    let order = convert_to_tms(&extraction, &InitialsResolver, &MapperConfig::default());

    assert_eq!(order.equipment_type_id, "R");
    assert_eq!(order.stops.len(), 2);

    let pickup = &order.stops[0];
    assert_eq!(pickup.stop_type, StopType::Pickup);
    assert_eq!(pickup.order_sequence, 1);
    assert_eq!(pickup.city_name, "Springfield");
    assert_eq!(pickup.state, "IL");
    assert_eq!(pickup.zip_code, "62701");

    let delivery = &order.stops[1];
    assert_eq!(delivery.stop_type, StopType::Delivery);
    assert_eq!(delivery.order_sequence, 2);
    assert_eq!(delivery.city_name, "Chicago");
    assert_eq!(delivery.state, "IL");
    assert_eq!(delivery.zip_code, "60601");

    assert_eq!(order.bill_distance, 100);

    let movements = order.movement.as_ref().unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].origin_stop_id, pickup.id);
    assert_eq!(movements[0].dest_stop_id, delivery.id);
    assert_eq!(order.curr_movement_id.as_deref(), Some(movements[0].id.as_str()));

    assert_eq!(order.freight_charge, 500.0);
    assert_eq!(order.total_charge, 500.0);
    assert_eq!(order.customer_id, "AC");
}

#[test]
fn test_stop_count_and_sequencing() {
    for (n, m) in [(0, 0), (1, 0), (0, 2), (2, 3), (3, 1)] {
        let shippers: Vec<Value> = (0..n).map(|i| shipper(&format!("S{}", i))).collect();
        let receivers: Vec<Value> = (0..m).map(|i| receiver(&format!("R{}", i))).collect();
        let extraction = record(json!({
            "reference_number": "SEQ-1",
            "shipper_section": shippers,
            "receiver_section": receivers
        }));

        let order = convert_to_tms(&extraction, &InitialsResolver, &MapperConfig::default());

        assert_eq!(order.stops.len(), n + m, "stops for {}+{}", n, m);
        for (i, stop) in order.stops.iter().enumerate() {
            assert_eq!(stop.order_sequence as usize, i + 1);
            let expected = if i < n { StopType::Pickup } else { StopType::Delivery };
            assert_eq!(stop.stop_type, expected);
        }

        match order.movement.as_deref() {
            Some([movement]) => {
                assert!(n >= 1 && m >= 1);
                assert_eq!(movement.origin_stop_id, order.stops[0].id);
                assert_eq!(movement.dest_stop_id, order.stops[n + m - 1].id);
            }
            Some(other) => panic!("expected one movement, got {}", other.len()),
            None => assert!(n == 0 || m == 0),
        }
    }
}

#[test]
fn test_setpoint_requires_both_bounds() {
    let both = record(json!({
        "temperature_present": true,
        "temperature_low": 34,
        "temperature_high": 38
    }));
    let order = convert_to_tms(&both, &InitialsResolver, &MapperConfig::default());
    assert_eq!(order.setpoint_temp, Some(36.0));

    let low_only = record(json!({"temperature_present": true, "temperature_low": 34}));
    let order = convert_to_tms(&low_only, &InitialsResolver, &MapperConfig::default());
    assert_eq!(order.temperature_min, Some(34.0));
    assert_eq!(order.setpoint_temp, None);
}

#[test]
fn test_other_charge_total() {
    let extraction = record(json!({
        "additional_rates": [
            {"code": "FSC", "description": "Fuel", "amount": 120.5},
            {"code": "LUM", "description": "Lumper"},
            {"code": "DET", "description": "Detention", "amount": "75"}
        ]
    }));

    let order = convert_to_tms(&extraction, &InitialsResolver, &MapperConfig::default());

    assert_eq!(order.otherchargetotal, 195.5);
    assert_eq!(order.other_charges.as_ref().map(Vec::len), Some(3));
}

#[test]
fn test_mapping_is_repeatable_except_generated_values() {
    let extraction = record(json!({
        "reference_number": "LD-300",
        "customer_name": "Northwind Traders",
        "equipment_type": "Flatbed",
        "freight_rate": 1800,
        "shipper_section": [shipper("Alpha"), shipper("Beta")],
        "receiver_section": [{
            "receiver_company": "Gamma",
            "receiver_address": "2 Oak Ave, Chicago IL 60601",
            "receiver_delivery_number": "D-9",
            "receiver_instructions": "Call ahead"
        }],
        "additional_rates": [{"code": "FSC", "amount": 40}]
    }));

    let mut first = convert_to_tms(&extraction, &InitialsResolver, &MapperConfig::default())
        .to_value()
        .unwrap();
    let mut second = convert_to_tms(&extraction, &InitialsResolver, &MapperConfig::default())
        .to_value()
        .unwrap();

    assert_ne!(first["stops"][0]["id"], second["stops"][0]["id"]);

    strip_generated(&mut first);
    strip_generated(&mut second);
    assert_eq!(first, second);
}

#[test]
fn test_injected_customer_table() {
    let table = CustomerTable::new([
        ("Acme Corporation".to_string(), "ACME01".to_string()),
        ("Globex".to_string(), "GLBX".to_string()),
    ]);
    let converter = DeterministicConverter::new(Arc::new(table), MapperConfig::default());

    let exact = converter.convert(&json!({"customer_name": "Globex"})).unwrap();
    assert_eq!(exact["customer_id"], "GLBX");

    let fuzzy = converter.convert(&json!({"customer_name": "Acme Corporation."})).unwrap();
    assert_eq!(fuzzy["customer_id"], "ACME01");

    let fallback = converter.convert(&json!({"customer_name": "Initech Systems"})).unwrap();
    assert_eq!(fallback["customer_id"], "IS");

    let missing = converter.convert(&json!({})).unwrap();
    assert_eq!(missing["customer_id"], "UNKNOWN");
}
