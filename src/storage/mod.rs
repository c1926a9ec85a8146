//! Storage layer for benchmark records.
//!
//! Records are appended to a JSONL log as they complete and can be exported
//! to CSV with a fixed column order.

pub mod csv;
pub mod jsonl;

pub use csv::{CSV_HEADERS, CsvExporter};
pub use jsonl::JsonlWriter;
