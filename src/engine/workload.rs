//! Workload trait and the types that cross it.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::BenchResult;
use crate::core::PointParams;

/// Initial particle release: `npart` points evenly spaced from start to end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleLayout {
    pub lon_start: f64,
    pub lon_end: f64,
    pub lat_start: f64,
    pub lat_end: f64,
}

impl ParticleLayout {
    pub const fn new(lon: (f64, f64), lat: (f64, f64)) -> Self {
        ParticleLayout {
            lon_start: lon.0,
            lon_end: lon.1,
            lat_start: lat.0,
            lat_end: lat.1,
        }
    }

    /// Release positions for `npart` particles.
    pub fn positions(&self, npart: usize) -> (Vec<f64>, Vec<f64>) {
        (
            linspace(self.lon_start, self.lon_end, npart),
            linspace(self.lat_start, self.lat_end, npart),
        )
    }
}

/// `n` evenly spaced values over `[start, end]`, endpoint included.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Everything a workload needs to execute one sweep point.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub params: PointParams,
    pub layout: ParticleLayout,
    /// Dataset root or local data directory, when the benchmark reads one.
    pub data: Option<PathBuf>,
}

/// Final particle state reported by a workload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleState {
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    /// Simulated seconds elapsed for the particles, when reported.
    #[serde(default)]
    pub age_s: Option<f64>,
}

/// Measurements of a single run.
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub elapsed_s: Option<f64>,
    pub peak_memory_bytes: Option<u64>,
    pub particles: Option<ParticleState>,
}

/// Something that can execute a benchmark point.
pub trait Workload {
    /// Returns the workload name (e.g., "command", "mock").
    fn name(&self) -> &str;

    /// Returns the version string if known.
    fn version(&self) -> Option<String> {
        None
    }

    fn run(&self, request: &RunRequest) -> BenchResult<RunOutput>;
}

/// Report a workload may print as its last non-empty stdout line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkloadReport {
    #[serde(default)]
    pub lon: Option<Vec<f64>>,
    #[serde(default)]
    pub lat: Option<Vec<f64>>,
    #[serde(default)]
    pub age_s: Option<f64>,
    #[serde(default)]
    pub elapsed_s: Option<f64>,
    #[serde(default)]
    pub peak_memory_bytes: Option<u64>,
}

impl WorkloadReport {
    /// Parse the last non-empty line of `stdout` if it is a JSON object.
    pub fn from_stdout(stdout: &str) -> Option<Self> {
        let last = stdout.lines().rev().map(str::trim).find(|l| !l.is_empty())?;
        if !last.starts_with('{') {
            return None;
        }
        serde_json::from_str(last).ok()
    }

    /// Particle state, when both coordinate arrays were reported.
    pub fn particles(&self) -> Option<ParticleState> {
        match (&self.lon, &self.lat) {
            (Some(lon), Some(lat)) => Some(ParticleState {
                lon: lon.clone(),
                lat: lat.clone(),
                age_s: self.age_s,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_matches_endpoints() {
        assert_eq!(linspace(-10.0, 10.0, 3), vec![-10.0, 0.0, 10.0]);
        assert_eq!(linspace(32.0, 50.0, 1), vec![32.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_layout_positions() {
        let layout = ParticleLayout::new((2.0, 15.0), (32.0, 19.0));
        let (lon, lat) = layout.positions(2);
        assert_eq!(lon, vec![2.0, 15.0]);
        assert_eq!(lat, vec![32.0, 19.0]);
    }

    #[test]
    fn test_report_from_last_line() {
        let stdout = "Running 2 particles\n{\"lon\": [1.0, 2.0], \"lat\": [3.0, 4.0], \"elapsed_s\": 0.5}\n\n";
        let report = WorkloadReport::from_stdout(stdout).unwrap();
        assert_eq!(report.elapsed_s, Some(0.5));
        let particles = report.particles().unwrap();
        assert_eq!(particles.lat, vec![3.0, 4.0]);
        assert_eq!(particles.age_s, None);
    }

    #[test]
    fn test_report_absent_when_last_line_is_text() {
        assert!(WorkloadReport::from_stdout("{\"lon\": []}\ndone\n").is_none());
        assert!(WorkloadReport::from_stdout("").is_none());
    }
}
