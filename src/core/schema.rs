//! BenchRecord schema v1 - one record per executed sweep point.

use serde::{Deserialize, Serialize};

use super::machine::MachineInfo;
use super::params::{GridType, Interpolator, Kernel, Metric};

/// Schema version for forward compatibility
pub const SCHEMA_VERSION: u32 = 1;

/// Workload identification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Result of comparing final particle positions to a baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionOutcome {
    pub baseline: String,
    pub max_abs_error: f64,
    pub tolerance: f64,
    pub passed: bool,
}

/// Parameters of a single sweep point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointParams {
    pub npart: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<u32>,
    pub grid: GridType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpolator: Option<Interpolator>,
    pub kernel: Kernel,
    #[serde(default)]
    pub surface: bool,
    pub runtime_s: f64,
    pub dt_s: f64,
    pub metric: Metric,
}

/// Canonical benchmark record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchRecord {
    /// Schema version for forward compatibility
    pub schema_version: u32,

    /// Unique identifier for this record
    pub record_id: String,

    /// ISO 8601 timestamp
    pub timestamp: String,

    /// Benchmark name (preset or config entry)
    pub benchmark: String,

    /// Manifest dataset the run read from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,

    #[serde(flatten)]
    pub params: PointParams,

    /// Wall-clock seconds (time metric only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_s: Option<f64>,

    /// Peak memory in bytes (memory metric only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_memory_bytes: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression: Option<RegressionOutcome>,

    pub workload: WorkloadInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<MachineInfo>,

    /// Command line arguments used
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cli_args: Vec<String>,
}

impl BenchRecord {
    /// Create a new BenchRecord with required fields
    pub fn new(benchmark: String, params: PointParams, workload: WorkloadInfo) -> Self {
        let timestamp = crate::now_string();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let record_id = format!("{:x}-{}", nanos, params.npart);

        BenchRecord {
            schema_version: SCHEMA_VERSION,
            record_id,
            timestamp,
            benchmark,
            dataset: None,
            params,
            elapsed_s: None,
            peak_memory_bytes: None,
            regression: None,
            workload,
            machine: None,
            cli_args: Vec::new(),
        }
    }

    /// The measured value in the record's own metric, for display.
    pub fn metric_summary(&self) -> String {
        match self.params.metric {
            Metric::Time => match self.elapsed_s {
                Some(s) => format!("Execution time: {s:.3} seconds"),
                None => "Execution time: unavailable".to_string(),
            },
            Metric::Memory => match self.peak_memory_bytes {
                Some(b) => format!("Memory usage: peak={:.0} MB", b as f64 / 1e6),
                None => "Memory usage: unavailable".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(metric: Metric) -> PointParams {
        PointParams {
            npart: 10,
            chunk: Some(256),
            grid: GridType::Curvilinear,
            interpolator: Some(Interpolator::XLinear),
            kernel: Kernel::AdvectionEE,
            surface: false,
            runtime_s: 3600.0,
            dt_s: 60.0,
            metric,
        }
    }

    fn workload() -> WorkloadInfo {
        WorkloadInfo {
            name: "test".into(),
            version: None,
        }
    }

    #[test]
    fn test_record_flattens_params() {
        let record = BenchRecord::new("moi".into(), params(Metric::Time), workload());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["npart"], 10);
        assert_eq!(json["chunk"], 256);
        assert_eq!(json["grid"], "curvilinear");
        assert_eq!(json["interpolator"], "XLinear");
        assert!(json.get("elapsed_s").is_none());
        assert!(json.get("machine").is_none());
    }

    #[test]
    fn test_record_roundtrip_keeps_params() {
        let mut record = BenchRecord::new("moi".into(), params(Metric::Memory), workload());
        record.peak_memory_bytes = Some(42_000_000);
        let text = serde_json::to_string(&record).unwrap();
        let back: BenchRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.params.metric, Metric::Memory);
        assert_eq!(back.peak_memory_bytes, Some(42_000_000));
        assert_eq!(back.record_id, record.record_id);
    }

    #[test]
    fn test_metric_summary() {
        let mut record = BenchRecord::new("k".into(), params(Metric::Time), workload());
        record.elapsed_s = Some(1.5);
        assert_eq!(record.metric_summary(), "Execution time: 1.500 seconds");

        let mut record = BenchRecord::new("k".into(), params(Metric::Memory), workload());
        record.peak_memory_bytes = Some(12_000_000);
        assert_eq!(record.metric_summary(), "Memory usage: peak=12 MB");
    }
}
