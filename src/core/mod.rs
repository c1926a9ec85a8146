//! Core types and schemas for parcels-bench.
//!
//! This module contains the canonical `BenchRecord` schema (v1), the closed
//! sweep parameter enums, and the machine-info collector.

pub mod machine;
pub mod params;
pub mod schema;

// Re-export key types for convenience
pub use machine::{MachineInfo, MachineProbe, Probe};
pub use params::{GridType, Interpolator, Kernel, Metric};
pub use schema::{BenchRecord, PointParams, RegressionOutcome, SCHEMA_VERSION, WorkloadInfo};
