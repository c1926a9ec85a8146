//! Benchmark presets and TOML sweep configuration.

pub mod config;
pub mod presets;

pub use config::{BenchmarkSpec, find_benchmark, load_bench_config};
pub use presets::{Preset, SweepOverrides, build_plan};
