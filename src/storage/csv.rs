//! Flat CSV export of sweep records.

use std::io::Write;
use std::path::Path;

use crate::{BenchError, BenchResult};
use crate::core::schema::BenchRecord;

/// CSV column headers in deterministic order.
pub const CSV_HEADERS: &[&str] = &[
    "schema_version",
    "record_id",
    "timestamp",
    "benchmark",
    "dataset",
    "grid",
    "interpolator",
    "kernel",
    "npart",
    "chunk",
    "surface",
    "runtime_s",
    "dt_s",
    "metric",
    "elapsed_s",
    "peak_memory_mb",
    "regression_baseline",
    "regression_max_abs_error",
    "regression_passed",
    "workload",
    "workload_version",
    "hostname",
];

/// Writes one row per sweep point under [`CSV_HEADERS`].
#[derive(Debug, Clone, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        CsvExporter
    }

    /// Write `records` to `output`, replacing any previous export.
    pub fn export(&self, records: &[BenchRecord], output: &Path) -> BenchResult<()> {
        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| BenchError::io(format!("failed to create {}", dir.display()), e))?;
        }
        let file = std::fs::File::create(output)
            .map_err(|e| BenchError::io(format!("failed to create {}", output.display()), e))?;
        self.export_to_writer(records, file)
    }

    pub fn export_to_writer<W: Write>(&self, records: &[BenchRecord], writer: W) -> BenchResult<()> {
        let csv_err = |e: csv::Error| BenchError::Message(format!("CSV export failed: {e}"));
        let mut w = csv::Writer::from_writer(writer);
        w.write_record(CSV_HEADERS).map_err(csv_err)?;
        for record in records {
            w.write_record(record_to_row(record)).map_err(csv_err)?;
        }
        w.flush().map_err(|e| BenchError::io("failed to flush CSV export", e))
    }
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn record_to_row(record: &BenchRecord) -> Vec<String> {
    let p = &record.params;
    let regression = record.regression.as_ref();
    vec![
        record.schema_version.to_string(),
        record.record_id.clone(),
        record.timestamp.clone(),
        record.benchmark.clone(),
        record.dataset.clone().unwrap_or_default(),
        p.grid.to_string(),
        opt(p.interpolator),
        p.kernel.to_string(),
        p.npart.to_string(),
        opt(p.chunk),
        p.surface.to_string(),
        p.runtime_s.to_string(),
        p.dt_s.to_string(),
        p.metric.to_string(),
        record
            .elapsed_s
            .map(|s| format!("{s:.6}"))
            .unwrap_or_default(),
        record
            .peak_memory_bytes
            .map(|b| format!("{:.2}", b as f64 / 1e6))
            .unwrap_or_default(),
        opt(regression.map(|r| r.baseline.clone())),
        opt(regression.map(|r| format!("{:e}", r.max_abs_error))),
        opt(regression.map(|r| r.passed)),
        record.workload.name.clone(),
        record.workload.version.clone().unwrap_or_default(),
        record
            .machine
            .as_ref()
            .and_then(|m| m.hostname.clone())
            .unwrap_or_default(),
    ]
}
