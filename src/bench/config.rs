//! TOML sweep configuration.
//!
//! ```toml
//! [[benchmark]]
//! name = "moi-chunks"
//! preset = "moi-curvilinear"
//! npart = [1000, 10000]
//! chunk = [128, 256, 512]
//! metric = "memory"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{BenchError, BenchResult};

use super::presets::{Preset, SweepOverrides};

#[derive(Debug, Clone)]
pub struct BenchmarkSpec {
    pub name: String,
    pub preset: Preset,
    pub command: Option<String>,
    pub overrides: SweepOverrides,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBenchmark {
    name: String,
    preset: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    npart: Option<Vec<usize>>,
    #[serde(default)]
    chunk: Option<Vec<u32>>,
    #[serde(default)]
    interpolator: Option<String>,
    #[serde(default)]
    kernel: Option<String>,
    #[serde(default)]
    metric: Option<String>,
    #[serde(default)]
    surface: Option<bool>,
    #[serde(default)]
    dataset: Option<String>,
    #[serde(default)]
    data_path: Option<PathBuf>,
    #[serde(default)]
    runtime_s: Option<f64>,
    #[serde(default)]
    dt_s: Option<f64>,
    #[serde(default)]
    tolerance: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BenchConfig {
    #[serde(rename = "benchmark", default)]
    benchmarks: Vec<RawBenchmark>,
}

pub fn load_bench_config(path: &Path) -> BenchResult<Vec<BenchmarkSpec>> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| BenchError::io(format!("failed to read {}", path.display()), e))?;
    parse_bench_config(&s)
}

pub fn parse_bench_config(text: &str) -> BenchResult<Vec<BenchmarkSpec>> {
    let cfg: BenchConfig = toml::from_str(text)
        .map_err(|e| BenchError::Config(format!("invalid sweep config: {e}")))?;
    let mut specs: Vec<BenchmarkSpec> = Vec::with_capacity(cfg.benchmarks.len());
    for b in cfg.benchmarks {
        if specs.iter().any(|s| s.name == b.name) {
            return Err(BenchError::Config(format!(
                "duplicate benchmark name in config: {}",
                b.name
            )));
        }
        let overrides = SweepOverrides {
            name: Some(b.name.clone()),
            npart: b.npart,
            chunk: b.chunk,
            interpolator: b.interpolator.as_deref().map(str::parse).transpose()?,
            kernel: b.kernel.as_deref().map(str::parse).transpose()?,
            metric: b.metric.as_deref().map(str::parse).transpose()?,
            surface: b.surface,
            dataset: b.dataset,
            data_path: b.data_path,
            runtime_s: b.runtime_s,
            dt_s: b.dt_s,
            tolerance: b.tolerance,
        };
        specs.push(BenchmarkSpec {
            name: b.name,
            preset: b.preset.parse()?,
            command: b.command,
            overrides,
        });
    }
    Ok(specs)
}

pub fn find_benchmark<'a>(specs: &'a [BenchmarkSpec], name: &str) -> Option<&'a BenchmarkSpec> {
    specs.iter().find(|s| s.name == name)
}
