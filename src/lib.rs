//! # tmsmap: Freight Extraction to TMS Mapping
//!
//! tmsmap turns loosely-typed freight shipment extractions (rate
//! confirmations, load tenders) into Transportation Management System order
//! graphs, and scores extraction and conversion accuracy against ground truth.
//!
//! ## Features
//!
//! - **Deterministic mapper**: order, stops, movement, notes, reference numbers and
//!   other charges from one extraction record ([`mapper::convert_to_tms`])
//! - **Injected customer lookup**: exact, fuzzy and initials fallback ([`customer`])
//! - **Field-tree differ**: path enumeration and fuzzy value comparison ([`diff`])
//! - **Accuracy evaluation**: per-file ratios, per-field performance, TMS-to-TMS
//!   comparison with numeric tolerance ([`eval`])
//! - **Batch pipeline**: bounded-concurrency conversion with per-file error
//!   capture ([`batch`])
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use tmsmap::customer::InitialsResolver;
//! use tmsmap::mapper::{convert_to_tms, MapperConfig};
//! use tmsmap::record::ExtractionRecord;
//!
//! let record = ExtractionRecord::from_value(&json!({
//!     "reference_number": "LD-1",
//!     "customer_name": "Acme Co",
//!     "equipment_type": "Reefer",
//!     "shipper_section": [{"ship_from_address": "100 Main St, Springfield IL 62701"}],
//!     "receiver_section": [{"receiver_address": "200 Lake St, Chicago IL 60601"}]
//! }))
//! .unwrap();
//!
//! let order = convert_to_tms(&record, &InitialsResolver, &MapperConfig::default());
//! assert_eq!(order.equipment_type_id, "R");
//! assert_eq!(order.stops.len(), 2);
//! assert_eq!(order.stops[1].city_name, "Chicago");
//! assert_eq!(order.bill_distance, 100);
//! ```

pub mod address;
pub mod batch;
pub mod config;
pub mod converter;
pub mod customer;
pub mod diff;
pub mod error;
pub mod eval;
pub mod fs_utils;
pub mod ids;
pub mod llm_output;
pub mod mapper;
pub mod normalize;
pub mod record;
pub mod report;
pub mod similarity;
pub mod timestamp;

// Re-export key types
pub use batch::{BatchOutcome, FileError};
pub use config::PipelineConfig;
pub use converter::{Converter, DeterministicConverter};
pub use customer::{CustomerResolver, CustomerTable, InitialsResolver};
pub use diff::{Differ, FieldMatch, MatchPolicy};
pub use error::ConversionError;
pub use mapper::{convert_to_tms, MapperConfig};
pub use record::{ExtractionRecord, TmsEntity, TmsOrder};
