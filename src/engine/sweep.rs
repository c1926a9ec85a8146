//! Sweep planning and execution.

use std::path::PathBuf;

use tracing::{info, info_span};

use crate::core::{
    BenchRecord, GridType, Interpolator, Kernel, MachineInfo, Metric, PointParams, WorkloadInfo,
};
use crate::{BenchError, BenchResult};

use super::baseline::Baseline;
use super::workload::{ParticleLayout, RunRequest, Workload};

/// A fully resolved benchmark: fixed parameters plus the swept axes.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub benchmark: String,
    pub grid: GridType,
    pub interpolator: Option<Interpolator>,
    pub kernel: Kernel,
    pub npart: Vec<usize>,
    /// Empty means a single unchunked run per particle count.
    pub chunk: Vec<u32>,
    pub surface: bool,
    pub runtime_s: f64,
    pub dt_s: f64,
    pub metric: Metric,
    pub layout: ParticleLayout,
    pub dataset: Option<String>,
    pub data: Option<PathBuf>,
    pub baseline: Baseline,
    pub tolerance: f64,
}

impl SweepPlan {
    pub fn validate(&self) -> BenchResult<()> {
        if self.npart.is_empty() {
            return Err(BenchError::Config(format!(
                "{}: particle count list is empty",
                self.benchmark
            )));
        }
        if self.npart.contains(&0) {
            return Err(BenchError::Config(format!(
                "{}: particle counts must be positive",
                self.benchmark
            )));
        }
        if self.chunk.contains(&0) {
            return Err(BenchError::Config(format!(
                "{}: chunk sizes must be positive",
                self.benchmark
            )));
        }
        if self.runtime_s.is_nan() || self.dt_s.is_nan() || self.runtime_s <= 0.0 || self.dt_s <= 0.0 {
            return Err(BenchError::Config(format!(
                "{}: runtime and dt must be positive (got runtime={}s dt={}s)",
                self.benchmark, self.runtime_s, self.dt_s
            )));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(BenchError::Config(format!(
                "{}: tolerance must be non-negative",
                self.benchmark
            )));
        }
        if let Some(interp) = self.interpolator {
            interp.check_grid(self.grid)?;
        }
        Ok(())
    }

    /// Sweep points in execution order: particle count outer, chunk inner.
    pub fn points(&self) -> Vec<PointParams> {
        let chunks: Vec<Option<u32>> = if self.chunk.is_empty() {
            vec![None]
        } else {
            self.chunk.iter().copied().map(Some).collect()
        };
        self.npart
            .iter()
            .flat_map(|&npart| {
                chunks.iter().map(move |&chunk| PointParams {
                    npart,
                    chunk,
                    grid: self.grid,
                    interpolator: self.interpolator,
                    kernel: self.kernel,
                    surface: self.surface,
                    runtime_s: self.runtime_s,
                    dt_s: self.dt_s,
                    metric: self.metric,
                })
            })
            .collect()
    }
}

/// Record annotations shared by every point of a sweep.
#[derive(Debug, Clone, Default)]
pub struct RecordContext {
    pub machine: Option<MachineInfo>,
    pub cli_args: Vec<String>,
}

/// Progress notifications from [`run_sweep`].
#[derive(Debug)]
pub enum SweepEvent<'a> {
    Started(&'a PointParams),
    Finished(&'a BenchRecord),
}

/// Run every point of `plan` in order.
///
/// The first failure aborts the sweep. Records of completed points have
/// already been passed to `on_event` by then.
pub fn run_sweep(
    plan: &SweepPlan,
    workload: &dyn Workload,
    ctx: &RecordContext,
    on_event: &mut dyn FnMut(SweepEvent<'_>) -> BenchResult<()>,
) -> BenchResult<Vec<BenchRecord>> {
    plan.validate()?;
    let workload_info = WorkloadInfo {
        name: workload.name().to_string(),
        version: workload.version(),
    };

    let points = plan.points();
    info!(benchmark = %plan.benchmark, points = points.len(), metric = %plan.metric, "starting sweep");
    let mut records = Vec::with_capacity(points.len());
    for params in points {
        let _span = info_span!("point", npart = params.npart, chunk = ?params.chunk).entered();
        on_event(SweepEvent::Started(&params))?;

        let request = RunRequest {
            params: params.clone(),
            layout: plan.layout,
            data: plan.data.clone(),
        };
        let output = workload.run(&request)?;

        let mut record = BenchRecord::new(plan.benchmark.clone(), params, workload_info.clone());
        record.dataset = plan.dataset.clone();
        record.machine = ctx.machine.clone();
        record.cli_args = ctx.cli_args.clone();
        match plan.metric {
            Metric::Time => {
                record.elapsed_s = Some(output.elapsed_s.ok_or_else(|| {
                    BenchError::Workload("workload did not report an elapsed time".into())
                })?);
            }
            Metric::Memory => {
                record.peak_memory_bytes = Some(output.peak_memory_bytes.ok_or_else(|| {
                    BenchError::Workload("workload did not report peak memory".into())
                })?);
            }
        }

        let (lon0, lat0) = plan.layout.positions(record.params.npart);
        record.regression = plan.baseline.check(
            (&lon0, &lat0),
            output.particles.as_ref(),
            plan.runtime_s,
            plan.tolerance,
        )?;

        on_event(SweepEvent::Finished(&record))?;
        records.push(record);
    }
    Ok(records)
}
