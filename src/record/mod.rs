//! Typed extraction and TMS records.
//!
//! Untyped JSON is validated into these structures at the boundary; the mapper
//! works on typed values only.

pub mod extraction;
pub mod lenient;
pub mod tms;

pub use extraction::{AdditionalRate, ExtractionRecord, ReceiverStop, ShipperStop};
pub use tms::{
    Movement, OtherCharge, RecordKind, ReferenceNumber, ReferenceQualifier, StopNote, StopType,
    TmsEntity, TmsOrder, TmsStop,
};
