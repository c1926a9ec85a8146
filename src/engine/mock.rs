//! Mock workload for testing.

use std::cell::RefCell;

use crate::{BenchError, BenchResult};

use super::workload::{ParticleState, RunOutput, RunRequest, Workload};

/// How the mock moves particles.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum MockMotion {
    /// Report the release positions unchanged (zero velocity field).
    #[default]
    Stationary,
    /// Shift every particle by a fixed offset.
    Drift { dlon: f64, dlat: f64 },
    /// Report no positions at all.
    Silent,
}

/// Configuration for mock workload responses.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,
    pub version: Option<String>,
    pub elapsed_s: f64,
    pub peak_memory_bytes: u64,
    pub motion: MockMotion,
    /// Runs before this zero-based index stay stationary.
    pub motion_from: usize,
    /// Fail on the run with this zero-based index.
    pub fail_on_run: Option<usize>,
}

impl MockConfig {
    pub fn new(name: impl Into<String>) -> Self {
        MockConfig {
            name: name.into(),
            version: Some("mock-1.0.0".to_string()),
            elapsed_s: 0.25,
            peak_memory_bytes: 100_000_000,
            motion: MockMotion::default(),
            motion_from: 0,
            fail_on_run: None,
        }
    }

    pub fn with_motion(mut self, motion: MockMotion) -> Self {
        self.motion = motion;
        self
    }

    /// Apply `motion` only from run `run` onwards.
    pub fn with_motion_from(mut self, run: usize, motion: MockMotion) -> Self {
        self.motion = motion;
        self.motion_from = run;
        self
    }

    pub fn with_elapsed(mut self, elapsed_s: f64) -> Self {
        self.elapsed_s = elapsed_s;
        self
    }

    pub fn failing_on(mut self, run: usize) -> Self {
        self.fail_on_run = Some(run);
        self
    }
}

/// Mock workload that returns configured measurements and records every
/// request it receives.
pub struct MockWorkload {
    config: MockConfig,
    requests: RefCell<Vec<RunRequest>>,
}

impl MockWorkload {
    pub fn new(config: MockConfig) -> Self {
        MockWorkload {
            config,
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.borrow().clone()
    }
}

impl Workload for MockWorkload {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn version(&self) -> Option<String> {
        self.config.version.clone()
    }

    fn run(&self, request: &RunRequest) -> BenchResult<RunOutput> {
        let index = {
            let mut requests = self.requests.borrow_mut();
            requests.push(request.clone());
            requests.len() - 1
        };
        if self.config.fail_on_run == Some(index) {
            return Err(BenchError::Workload(format!(
                "mock workload failure on run {index}"
            )));
        }

        let (lon, lat) = request.layout.positions(request.params.npart);
        let motion = if index < self.config.motion_from {
            MockMotion::Stationary
        } else {
            self.config.motion
        };
        let particles = match motion {
            MockMotion::Stationary => Some(ParticleState {
                lon,
                lat,
                age_s: Some(request.params.runtime_s),
            }),
            MockMotion::Drift { dlon, dlat } => Some(ParticleState {
                lon: lon.iter().map(|x| x + dlon).collect(),
                lat: lat.iter().map(|y| y + dlat).collect(),
                age_s: Some(request.params.runtime_s),
            }),
            MockMotion::Silent => None,
        };

        Ok(RunOutput {
            elapsed_s: Some(self.config.elapsed_s),
            peak_memory_bytes: Some(self.config.peak_memory_bytes),
            particles,
        })
    }
}
