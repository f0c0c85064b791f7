//! Recovery of TMS records from free-text model replies.
//!
//! A model asked for JSON may wrap it in a fenced code block, surround it with
//! prose, use single quotes, or leave trailing commas. It may also skip parts
//! of the record graph. [`extract_json_payload`] pulls out and repairs the
//! JSON; [`repair_tms_output`] fills in stops, stop IDs and the movement from
//! the extraction record.
//!
//! The model call itself happens outside this crate; replies saved to disk
//! are turned into TMS records with [`repair_reply_file`] (the `repair`
//! subcommand of the CLI).

use regex::Regex;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::ConversionError;
use crate::fs_utils::{read_json, write_json_pretty};
use crate::ids::{generate_id, movement_id, DEFAULT_PREFIX};

static FENCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\n(.*?)\n```").expect("valid fenced block pattern"));

static OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\{.*\})").expect("valid object pattern"));

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\}").expect("valid trailing comma pattern"));

/// Distance used for a backfilled movement when the record has none
pub const DEFAULT_MOVE_DISTANCE: i64 = 500;

/// Extract the JSON object from a model reply.
///
/// # Example
///
/// ```
/// use tmsmap::llm_output::extract_json_payload;
///
/// let reply = "Here you go:\n```json\n{'blnum': '42',}\n```";
/// let value = extract_json_payload(reply).unwrap();
/// assert_eq!(value["blnum"], "42");
/// ```
pub fn extract_json_payload(reply: &str) -> Result<Value, ConversionError> {
    let payload = FENCED_RE
        .captures(reply)
        .or_else(|| OBJECT_RE.captures(reply))
        .and_then(|c| c.get(1))
        .map_or(reply, |m| m.as_str());

    if let Ok(value) = serde_json::from_str(payload) {
        return Ok(value);
    }

    let repaired = payload.replace('\'', "\"");
    let repaired = TRAILING_COMMA_RE.replace_all(&repaired, "}");

    serde_json::from_str(&repaired).map_err(|e| {
        tracing::debug!("Unrecoverable model output: {}", repaired);
        ConversionError::MalformedOutput(e.to_string())
    })
}

fn text<'a>(record: &'a Value, key: &str) -> &'a str {
    record.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn section<'a>(record: &'a Value, key: &str) -> &'a [Value] {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Backfill minimal stops from the extraction record when `stops` is absent.
pub fn ensure_stops(tms: &mut Map<String, Value>, extraction: &Value, company_id: &str) {
    let shippers = section(extraction, "shipper_section");
    let receivers = section(extraction, "receiver_section");

    if tms.contains_key("stops") || (shippers.is_empty() && receivers.is_empty()) {
        return;
    }

    let order_id = text(extraction, "reference_number");
    let sources = shippers
        .iter()
        .map(|s| ("PU", text(s, "ship_from_company")))
        .chain(receivers.iter().map(|r| ("SO", text(r, "receiver_company"))));

    let stops: Vec<Value> = sources
        .enumerate()
        .map(|(i, (stop_type, location))| {
            json!({
                "__type": "stop",
                "company_id": company_id,
                "id": generate_id(DEFAULT_PREFIX),
                "location_name": location,
                "stop_type": stop_type,
                "driver_load_unload": "N",
                "status": "A",
                "order_id": order_id,
                "order_sequence": i + 1
            })
        })
        .collect();

    tracing::debug!("Backfilled {} stops", stops.len());
    tms.insert("stops".to_string(), Value::Array(stops));
}

/// Give every stop an ID and point the order at its first pickup and last
/// delivery.
pub fn ensure_stop_ids(tms: &mut Map<String, Value>) {
    let Some(Value::Array(stops)) = tms.get_mut("stops") else {
        return;
    };

    let last = stops.len().saturating_sub(1);
    let mut shipper_stop_id = None;
    let mut consignee_stop_id = None;

    for (i, stop) in stops.iter_mut().enumerate() {
        let Some(stop) = stop.as_object_mut() else {
            continue;
        };
        let id = stop
            .entry("id")
            .or_insert_with(|| Value::from(generate_id(DEFAULT_PREFIX)))
            .clone();

        match stop.get("stop_type").and_then(Value::as_str) {
            Some("PU") if i == 0 => shipper_stop_id = Some(id),
            Some("SO") if i == last => consignee_stop_id = Some(id),
            _ => {}
        }
    }

    if let Some(id) = shipper_stop_id {
        tms.insert("shipper_stop_id".to_string(), id);
    }
    if let Some(id) = consignee_stop_id {
        tms.insert("consignee_stop_id".to_string(), id);
    }
}

/// Add a first-to-last-stop movement when the record has none.
pub fn ensure_movement(tms: &mut Map<String, Value>, company_id: &str) {
    if tms.contains_key("movement") {
        return;
    }

    let (origin, dest) = match tms.get("stops").and_then(Value::as_array) {
        Some(stops) if stops.len() >= 2 => (
            stops[0].get("id").cloned().unwrap_or(Value::Null),
            stops[stops.len() - 1].get("id").cloned().unwrap_or(Value::Null),
        ),
        _ => return,
    };

    let blnum = tms.get("blnum").and_then(Value::as_str).unwrap_or_default().to_string();
    let id = movement_id(&blnum);
    let distance = tms
        .get("bill_distance")
        .cloned()
        .unwrap_or_else(|| Value::from(DEFAULT_MOVE_DISTANCE));

    let movement = json!({
        "__type": "movement",
        "company_id": company_id,
        "id": id.clone(),
        "origin_stop_id": origin,
        "dest_stop_id": dest,
        "loaded": "L",
        "movement_type": "TKLD",
        "status": "A",
        "move_distance": distance,
        "move_distance_um": "MI",
        "authorized": true,
        "order_id": blnum
    });

    tms.insert("movement".to_string(), Value::Array(vec![movement]));
    tms.insert("curr_movement_id".to_string(), Value::from(id));
}

/// Patch a model-produced TMS record: stops, stop IDs, then movement.
///
/// Non-object records are left untouched.
pub fn repair_tms_output(tms: &mut Value, extraction: &Value, company_id: &str) {
    let Some(map) = tms.as_object_mut() else {
        return;
    };

    ensure_stops(map, extraction, company_id);
    ensure_stop_ids(map);
    ensure_movement(map, company_id);
}

/// Recover the TMS record from a saved model reply, patch it against its
/// extraction record and write it to `output` as pretty JSON.
pub fn repair_reply_file(
    reply: &Path,
    extraction: &Path,
    output: &Path,
    company_id: &str,
) -> Result<Value, ConversionError> {
    let text = fs::read_to_string(reply).map_err(|e| ConversionError::from(e).in_file(reply))?;
    let mut tms = extract_json_payload(&text).map_err(|e| e.in_file(reply))?;
    let extraction = read_json(extraction)?;

    repair_tms_output(&mut tms, &extraction, company_id);
    write_json_pretty(output, &tms)?;
    tracing::info!("Repaired {} into {}", reply.display(), output.display());
    Ok(tms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block() {
        let reply = "Sure.\n```json\n{\"blnum\": \"1\"}\n```\nAnything else?";
        assert_eq!(extract_json_payload(reply).unwrap(), json!({"blnum": "1"}));
    }

    #[test]
    fn test_bare_object_with_prose() {
        let reply = "The record is {\"a\": {\"b\": 2}} as requested.";
        assert_eq!(extract_json_payload(reply).unwrap(), json!({"a": {"b": 2}}));
    }

    #[test]
    fn test_repairs_quotes_and_trailing_commas() {
        let reply = "{'blnum': '7', 'stops': [{'id': 'x',}],}";
        let value = extract_json_payload(reply).unwrap();
        assert_eq!(value["blnum"], "7");
        assert_eq!(value["stops"][0]["id"], "x");
    }

    #[test]
    fn test_unrecoverable_output() {
        let result = extract_json_payload("I could not convert this document.");
        assert!(matches!(result, Err(ConversionError::MalformedOutput(_))));
    }

    #[test]
    fn test_repair_backfills_graph() {
        let extraction = json!({
            "reference_number": "LD-55",
            "shipper_section": [{"ship_from_company": "Alpha"}],
            "receiver_section": [{"receiver_company": "Beta"}, {"receiver_company": "Gamma"}]
        });
        let mut tms = json!({"blnum": "LD-55", "bill_distance": 200});

        repair_tms_output(&mut tms, &extraction, "TMS");

        let stops = tms["stops"].as_array().unwrap();
        assert_eq!(stops.len(), 3);
        assert_eq!(stops[0]["stop_type"], "PU");
        assert_eq!(stops[2]["location_name"], "Gamma");
        assert_eq!(stops[2]["order_sequence"], 3);
        assert_eq!(tms["shipper_stop_id"], stops[0]["id"]);
        assert_eq!(tms["consignee_stop_id"], stops[2]["id"]);

        let movement = &tms["movement"][0];
        assert_eq!(movement["id"], "1000055");
        assert_eq!(movement["move_distance"], 200);
        assert_eq!(movement["origin_stop_id"], stops[0]["id"]);
        assert_eq!(tms["curr_movement_id"], "1000055");
    }

    #[test]
    fn test_repair_keeps_existing_parts() {
        let extraction = json!({"shipper_section": [{"ship_from_company": "Alpha"}]});
        let mut tms = json!({
            "stops": [{"stop_type": "PU", "id": "keep"}],
            "movement": []
        });

        repair_tms_output(&mut tms, &extraction, "TMS");

        assert_eq!(tms["stops"].as_array().unwrap().len(), 1);
        assert_eq!(tms["shipper_stop_id"], "keep");
        assert_eq!(tms["movement"], json!([]));
    }

    #[test]
    fn test_missing_stop_ids_generated() {
        let mut tms = json!({"stops": [{"stop_type": "PU"}, {"stop_type": "SO"}]});

        repair_tms_output(&mut tms, &json!({}), "TMS");

        let id = tms["stops"][1]["id"].as_str().unwrap();
        assert!(id.starts_with("zz") && id.ends_with("APP2"));
        assert_eq!(tms["consignee_stop_id"], id);
        assert_eq!(tms["movement"][0]["move_distance"], DEFAULT_MOVE_DISTANCE);
    }

    #[test]
    fn test_repair_reply_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let reply = dir.path().join("LD7_reply.txt");
        let extraction = dir.path().join("LD7_extraction.json");
        let output = dir.path().join("out").join("LD7_tms.json");

        crate::fs_utils::write_file(&reply, "Record:\n```json\n{'blnum': 'LD-7',}\n```").unwrap();
        write_json_pretty(
            &extraction,
            &json!({
                "reference_number": "LD-7",
                "shipper_section": [{"ship_from_company": "Alpha"}],
                "receiver_section": [{"receiver_company": "Beta"}]
            }),
        )
        .unwrap();

        let tms = repair_reply_file(&reply, &extraction, &output, "TMS").unwrap();

        assert_eq!(tms["stops"].as_array().map(Vec::len), Some(2));
        assert_eq!(read_json(&output).unwrap(), tms);
    }

    #[test]
    fn test_repair_reply_file_unparseable() {
        let dir = tempfile::TempDir::new().unwrap();
        let reply = dir.path().join("X_reply.txt");
        crate::fs_utils::write_file(&reply, "no record here").unwrap();

        let err = repair_reply_file(&reply, &dir.path().join("missing.json"), &dir.path().join("o.json"), "TMS")
            .unwrap_err();
        assert!(err.to_string().contains("X_reply.txt"));
    }
}
