//! Built-in benchmarks and their default sweeps.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::{GridType, Interpolator, Kernel, Metric};
use crate::engine::{Baseline, ParticleLayout, SweepPlan};
use crate::{BenchError, BenchResult};

const HOUR: f64 = 3600.0;
const DAY: f64 = 86_400.0;

const OPEN_OCEAN: ParticleLayout = ParticleLayout::new((-10.0, 10.0), (-30.0, -20.0));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Kernel loop overhead with a no-op kernel on a zero-velocity field.
    KernelLoop,
    /// Vectorised advection kernels on a radial-rotation field.
    VectorizedKernels,
    /// Copernicus Marine SMOC fields read from a local directory.
    CopernicusMarine,
    /// MOi GLO12 curvilinear fields from the dataset cache.
    MoiCurvilinear,
    /// FESOM baroclinic gyre on an unstructured mesh.
    FesomBaroclinicGyre,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::KernelLoop,
        Preset::VectorizedKernels,
        Preset::CopernicusMarine,
        Preset::MoiCurvilinear,
        Preset::FesomBaroclinicGyre,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::KernelLoop => "kernel-loop",
            Preset::VectorizedKernels => "vectorized-kernels",
            Preset::CopernicusMarine => "copernicus-marine",
            Preset::MoiCurvilinear => "moi-curvilinear",
            Preset::FesomBaroclinicGyre => "fesom-baroclinic-gyre",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Preset::KernelLoop => "no-op kernel loop on a zero-velocity field",
            Preset::VectorizedKernels => "advection kernels on a radial-rotation field",
            Preset::CopernicusMarine => "SMOC surface currents from a local data path",
            Preset::MoiCurvilinear => "MOi GLO12 curvilinear grid",
            Preset::FesomBaroclinicGyre => "FESOM baroclinic gyre unstructured mesh",
        }
    }

    /// Manifest dataset the preset reads, if any.
    pub fn dataset(&self) -> Option<&'static str> {
        match self {
            Preset::MoiCurvilinear => Some("MOi-curvilinear"),
            Preset::FesomBaroclinicGyre => Some("FESOM-baroclinic-gyre"),
            _ => None,
        }
    }

    /// Whether the preset reads fields from a local directory outside the cache.
    pub fn needs_data_path(&self) -> bool {
        matches!(self, Preset::CopernicusMarine)
    }

    /// Interpolators the preset accepts; `None` means any that suits the grid.
    pub fn allowed_interpolators(&self) -> Option<&'static [Interpolator]> {
        match self {
            Preset::CopernicusMarine => Some(&[
                Interpolator::BiRectiLinear,
                Interpolator::PureXarrayInterp,
                Interpolator::NoFieldAccess,
            ]),
            _ => None,
        }
    }

    pub fn allowed_kernels(&self) -> Option<&'static [Kernel]> {
        match self {
            Preset::VectorizedKernels => Some(&[
                Kernel::AdvectionEE,
                Kernel::AdvectionRK4,
                Kernel::AdvectionRK4Thin,
            ]),
            _ => None,
        }
    }

    /// The default sweep of this preset.
    pub fn plan(&self) -> SweepPlan {
        let base = SweepPlan {
            benchmark: self.as_str().to_string(),
            grid: GridType::Rectilinear,
            interpolator: None,
            kernel: Kernel::AdvectionEE,
            npart: Vec::new(),
            chunk: Vec::new(),
            surface: false,
            runtime_s: 2.0 * DAY,
            dt_s: 15.0 * 60.0,
            metric: Metric::Time,
            layout: OPEN_OCEAN,
            dataset: self.dataset().map(str::to_string),
            data: None,
            baseline: Baseline::None,
            tolerance: 0.0,
        };
        match self {
            Preset::KernelLoop => SweepPlan {
                kernel: Kernel::DoNothing,
                npart: vec![1, 10, 50, 100, 250, 500],
                runtime_s: 10.0 * DAY,
                dt_s: 30.0 * 60.0,
                baseline: Baseline::Stationary,
                tolerance: 1e-6,
                ..base
            },
            Preset::VectorizedKernels => SweepPlan {
                interpolator: Some(Interpolator::XLinear),
                npart: vec![1, 10_000, 100_000, 500_000, 1_000_000, 2_000_000],
                runtime_s: 3.0 * HOUR,
                dt_s: 30.0,
                layout: ParticleLayout::new((32.0, 50.0), (30.0, 30.0)),
                baseline: Baseline::RadialRotation,
                tolerance: 5e-2,
                ..base
            },
            Preset::CopernicusMarine => SweepPlan {
                interpolator: Some(Interpolator::BiRectiLinear),
                npart: vec![1, 10, 100, 1000, 5000, 10_000],
                baseline: Baseline::FirstParticle {
                    lon: -9.820091,
                    lat: -30.106716,
                },
                tolerance: 1e-5,
                ..base
            },
            Preset::MoiCurvilinear => SweepPlan {
                grid: GridType::Curvilinear,
                interpolator: Some(Interpolator::XLinear),
                npart: vec![10_000],
                chunk: vec![256],
                ..base
            },
            Preset::FesomBaroclinicGyre => SweepPlan {
                grid: GridType::Unstructured,
                interpolator: Some(Interpolator::UxPiecewiseConstantFace),
                npart: vec![10_000],
                runtime_s: DAY,
                dt_s: 2400.0,
                layout: ParticleLayout::new((2.0, 15.0), (32.0, 19.0)),
                ..base
            },
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace('_', "-");
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Preset::ALL.iter().map(|p| p.as_str()).collect();
                BenchError::Config(format!(
                    "unknown benchmark preset '{s}' (expected one of: {})",
                    names.join(", ")
                ))
            })
    }
}

/// Per-run changes to a preset's default sweep, from a config file or flags.
#[derive(Debug, Clone, Default)]
pub struct SweepOverrides {
    pub name: Option<String>,
    pub npart: Option<Vec<usize>>,
    pub chunk: Option<Vec<u32>>,
    pub interpolator: Option<Interpolator>,
    pub kernel: Option<Kernel>,
    pub metric: Option<Metric>,
    pub surface: Option<bool>,
    pub dataset: Option<String>,
    pub data_path: Option<PathBuf>,
    pub runtime_s: Option<f64>,
    pub dt_s: Option<f64>,
    pub tolerance: Option<f64>,
}

impl SweepOverrides {
    /// Layer `other` on top of `self`; values set in `other` win.
    pub fn merge(self, other: SweepOverrides) -> SweepOverrides {
        SweepOverrides {
            name: other.name.or(self.name),
            npart: other.npart.or(self.npart),
            chunk: other.chunk.or(self.chunk),
            interpolator: other.interpolator.or(self.interpolator),
            kernel: other.kernel.or(self.kernel),
            metric: other.metric.or(self.metric),
            surface: other.surface.or(self.surface),
            dataset: other.dataset.or(self.dataset),
            data_path: other.data_path.or(self.data_path),
            runtime_s: other.runtime_s.or(self.runtime_s),
            dt_s: other.dt_s.or(self.dt_s),
            tolerance: other.tolerance.or(self.tolerance),
        }
    }
}

/// Build the sweep for `preset` with `overrides` applied and checked.
///
/// The dataset root is not resolved here; `plan.dataset` names what the
/// caller has to fetch before running.
pub fn build_plan(preset: Preset, overrides: SweepOverrides) -> BenchResult<SweepPlan> {
    let mut plan = preset.plan();
    if let Some(name) = overrides.name {
        plan.benchmark = name;
    }
    if let Some(npart) = overrides.npart {
        plan.npart = npart;
    }
    if let Some(chunk) = overrides.chunk {
        plan.chunk = chunk;
    }
    if let Some(interp) = overrides.interpolator {
        if let Some(allowed) = preset.allowed_interpolators() {
            if !allowed.contains(&interp) {
                return Err(BenchError::Config(format!(
                    "{preset} does not support interpolator {interp} (choices: {})",
                    join(allowed)
                )));
            }
        }
        plan.interpolator = Some(interp);
    }
    if let Some(kernel) = overrides.kernel {
        if let Some(allowed) = preset.allowed_kernels() {
            if !allowed.contains(&kernel) {
                return Err(BenchError::Config(format!(
                    "{preset} does not support kernel {kernel} (choices: {})",
                    join(allowed)
                )));
            }
        }
        plan.kernel = kernel;
    }
    if let Some(metric) = overrides.metric {
        plan.metric = metric;
    }
    if let Some(surface) = overrides.surface {
        plan.surface = surface;
    }
    if let Some(dataset) = overrides.dataset {
        plan.dataset = Some(dataset);
    }
    if let Some(runtime_s) = overrides.runtime_s {
        plan.runtime_s = runtime_s;
    }
    if let Some(dt_s) = overrides.dt_s {
        plan.dt_s = dt_s;
    }
    if let Some(tolerance) = overrides.tolerance {
        plan.tolerance = tolerance;
    }
    plan.data = overrides.data_path;

    // without field access particles never move
    if preset == Preset::CopernicusMarine && plan.interpolator == Some(Interpolator::NoFieldAccess) {
        plan.baseline = Baseline::Stationary;
    }
    if preset.needs_data_path() && plan.data.is_none() {
        return Err(BenchError::Config(format!(
            "{preset} reads fields from a local directory; pass --data-path"
        )));
    }

    plan.validate()?;
    Ok(plan)
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
