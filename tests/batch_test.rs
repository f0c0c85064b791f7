//! Integration tests for the batch pipeline

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tmsmap::batch::{process_files, process_files_parallel};
use tmsmap::config::PipelineConfig;
use tmsmap::converter::DeterministicConverter;
use tmsmap::fs_utils::{read_json, write_file, write_json_pretty};
use tmsmap::llm_output::{extract_json_payload, repair_tms_output};

fn converter(config: &PipelineConfig) -> DeterministicConverter {
    DeterministicConverter::new(config.customer_resolver().unwrap(), config.mapper_config())
}

fn seed_good_and_malformed(dir: &std::path::Path) {
    write_json_pretty(
        dir.join("GOOD1_extraction.json"),
        &json!({
            "reference_number": "GOOD-1",
            "customer_name": "Acme Co",
            "equipment_type": "Reefer",
            "shipper_section": [{"ship_from_company": "A", "ship_from_address": "1 Main St, Springfield IL 62701"}],
            "receiver_section": [{"receiver_company": "B", "receiver_address": "2 Oak Ave, Chicago IL 60601"}],
            "freight_rate": 500,
            "total_rate": 500
        }),
    )
    .unwrap();
    write_file(dir.join("BAD1_extraction.json"), "{\"reference_number\": ").unwrap();
}

#[test]
fn test_one_good_one_malformed() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_good_and_malformed(input.path());

    let config = PipelineConfig::default();
    let outcome = process_files(&converter(&config), input.path(), output.path(), false, None).unwrap();

    assert_eq!(outcome.processed_count, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].path, input.path().join("BAD1_extraction.json"));
    assert!(outcome.errors[0].message.contains("BAD1_extraction.json"));

    let tms = read_json(output.path().join("GOOD1_tms.json")).unwrap();
    assert_eq!(tms["equipment_type_id"], "R");
    assert_eq!(tms["bill_distance"], 100);
    assert!(!output.path().join("BAD1_tms.json").exists());
}

#[test]
fn test_parallel_matches_sequential_counts() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_good_and_malformed(input.path());
    for i in 0..6 {
        write_json_pretty(
            input.path().join(format!("EXTRA{}_extraction.json", i)),
            &json!({"reference_number": format!("EX-{}", i)}),
        )
        .unwrap();
    }

    let config = PipelineConfig::from_yaml_str("workers: 3\ncompany_id: ACME\n").unwrap();
    let outcome = process_files_parallel(
        Arc::new(converter(&config)),
        input.path(),
        output.path(),
        config.workers,
        config.recursive,
        config.sample,
    )
    .unwrap();

    assert_eq!(outcome.processed_count, 7);
    assert_eq!(outcome.errors.len(), 1);

    let tms = read_json(output.path().join("EXTRA3_tms.json")).unwrap();
    assert_eq!(tms["blnum"], "EX-3");
    assert_eq!(tms["company_id"], "ACME");
}

#[test]
fn test_customer_mapping_from_config() {
    let dir = TempDir::new().unwrap();
    let mapping = dir.path().join("customer_id_mapping.json");
    write_json_pretty(&mapping, &json!({"Acme Co": "ACME01"})).unwrap();

    let yaml = format!("customer_mapping: {}\n", mapping.display());
    let config = PipelineConfig::from_yaml_str(&yaml).unwrap();

    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    seed_good_and_malformed(input.path());

    process_files(&converter(&config), input.path(), output.path(), false, None).unwrap();

    let tms = read_json(output.path().join("GOOD1_tms.json")).unwrap();
    assert_eq!(tms["customer_id"], "ACME01");
}

#[test]
fn test_model_reply_recovery() {
    let extraction = json!({
        "reference_number": "LD-42",
        "shipper_section": [{"ship_from_company": "Alpha"}],
        "receiver_section": [{"receiver_company": "Beta"}]
    });
    let reply = "Here is the TMS record:\n```json\n{'__type': 'orders', 'blnum': 'LD-42', 'bill_distance': 100,}\n```";

    let mut tms = extract_json_payload(reply).unwrap();
    repair_tms_output(&mut tms, &extraction, "TMS");

    let stops = tms["stops"].as_array().unwrap();
    assert_eq!(stops.len(), 2);
    assert_eq!(stops[1]["location_name"], "Beta");
    assert_eq!(tms["movement"][0]["id"], "1000042");
    assert_eq!(tms["movement"][0]["dest_stop_id"], stops[1]["id"]);
}
