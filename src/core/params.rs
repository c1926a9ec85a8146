//! Closed parameter enums for benchmark sweeps.
//!
//! Names are resolved once, when a sweep is configured; nothing downstream
//! dispatches on strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::BenchError;

/// Grid family of the fieldset under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridType {
    Rectilinear,
    Curvilinear,
    Unstructured,
}

impl GridType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridType::Rectilinear => "rectilinear",
            GridType::Curvilinear => "curvilinear",
            GridType::Unstructured => "unstructured",
        }
    }

    pub fn is_structured(&self) -> bool {
        !matches!(self, GridType::Unstructured)
    }
}

impl fmt::Display for GridType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GridType {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rectilinear" => Ok(GridType::Rectilinear),
            "curvilinear" => Ok(GridType::Curvilinear),
            "unstructured" => Ok(GridType::Unstructured),
            other => Err(BenchError::Config(format!(
                "unknown grid type '{other}' (expected rectilinear, curvilinear or unstructured)"
            ))),
        }
    }
}

/// Field interpolation method passed to the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolator {
    XLinear,
    BiRectiLinear,
    PureXarrayInterp,
    NoFieldAccess,
    #[serde(rename = "UXPiecewiseConstantFace")]
    UxPiecewiseConstantFace,
    #[serde(rename = "UXPiecewiseLinearNode")]
    UxPiecewiseLinearNode,
}

impl Interpolator {
    pub const ALL: [Interpolator; 6] = [
        Interpolator::XLinear,
        Interpolator::BiRectiLinear,
        Interpolator::PureXarrayInterp,
        Interpolator::NoFieldAccess,
        Interpolator::UxPiecewiseConstantFace,
        Interpolator::UxPiecewiseLinearNode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interpolator::XLinear => "XLinear",
            Interpolator::BiRectiLinear => "BiRectiLinear",
            Interpolator::PureXarrayInterp => "PureXarrayInterp",
            Interpolator::NoFieldAccess => "NoFieldAccess",
            Interpolator::UxPiecewiseConstantFace => "UXPiecewiseConstantFace",
            Interpolator::UxPiecewiseLinearNode => "UXPiecewiseLinearNode",
        }
    }

    /// Whether this interpolator operates on unstructured (face/node) grids.
    pub fn is_unstructured(&self) -> bool {
        matches!(
            self,
            Interpolator::UxPiecewiseConstantFace | Interpolator::UxPiecewiseLinearNode
        )
    }

    /// Reject interpolators that cannot run on `grid`.
    pub fn check_grid(&self, grid: GridType) -> Result<(), BenchError> {
        if self.is_unstructured() == grid.is_structured() {
            return Err(BenchError::Config(format!(
                "interpolator {} cannot be used on a {} grid",
                self, grid
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interpolator {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interpolator::ALL
            .iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| {
                let names: Vec<&str> = Interpolator::ALL.iter().map(|i| i.as_str()).collect();
                BenchError::Config(format!(
                    "unknown interpolator '{s}' (expected one of: {})",
                    names.join(", ")
                ))
            })
    }
}

/// Particle kernel executed by the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kernel {
    DoNothing,
    AdvectionEE,
    AdvectionRK4,
    #[serde(rename = "AdvectionRK4_thin")]
    AdvectionRK4Thin,
}

impl Kernel {
    pub const ALL: [Kernel; 4] = [
        Kernel::DoNothing,
        Kernel::AdvectionEE,
        Kernel::AdvectionRK4,
        Kernel::AdvectionRK4Thin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kernel::DoNothing => "DoNothing",
            Kernel::AdvectionEE => "AdvectionEE",
            Kernel::AdvectionRK4 => "AdvectionRK4",
            Kernel::AdvectionRK4Thin => "AdvectionRK4_thin",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kernel {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kernel::ALL
            .iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| {
                let names: Vec<&str> = Kernel::ALL.iter().map(|k| k.as_str()).collect();
                BenchError::Config(format!(
                    "unknown kernel '{s}' (expected one of: {})",
                    names.join(", ")
                ))
            })
    }
}

/// What a run measures. Exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Time,
    Memory,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Time => "time",
            Metric::Memory => "memory",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "time" => Ok(Metric::Time),
            "memory" | "mem" => Ok(Metric::Memory),
            other => Err(BenchError::Config(format!(
                "unknown metric '{other}' (expected time or memory)"
            ))),
        }
    }
}
