//! Engine module: runs benchmark sweeps against a workload.
//!
//! # Architecture
//!
//! - **Workload**: executes one sweep point and reports measurements plus,
//!   optionally, final particle positions. `CommandWorkload` shells out to an
//!   external program; `MockWorkload` is used in tests.
//!
//! - **Baseline**: expected final positions checked after each point.
//!
//! The `sweep` submodule expands a `SweepPlan` into points, runs them in
//! order and produces one `BenchRecord` per point.

pub mod baseline;
pub mod command;
pub mod mock;
pub mod sweep;
pub mod timev;
pub mod workload;

pub use baseline::Baseline;
pub use command::{COMMAND_ENV, CommandConfig, CommandWorkload, Profiler};
pub use mock::{MockConfig, MockMotion, MockWorkload};
pub use sweep::{RecordContext, SweepEvent, SweepPlan, run_sweep};
pub use workload::{ParticleLayout, ParticleState, RunOutput, RunRequest, Workload};
