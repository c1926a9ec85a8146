//! `bench` subcommands: list presets and run sweeps.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::bench::{BenchmarkSpec, Preset, SweepOverrides, build_plan, find_benchmark, load_bench_config};
use crate::core::{BenchRecord, MachineInfo};
use crate::datasets::{CacheRoot, DatasetResolver, Fetcher, Manifest};
use crate::engine::{
    COMMAND_ENV, CommandConfig, CommandWorkload, Profiler, RecordContext, SweepEvent, SweepPlan,
    Workload, run_sweep,
};
use crate::storage::{CsvExporter, JsonlWriter};
use crate::{BenchError, BenchResult};

/// Options of `bench run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Preset name, or a benchmark name from the config file.
    pub target: String,
    pub config: Option<PathBuf>,
    pub command: Option<String>,
    pub overrides: SweepOverrides,
    pub profiler: Profiler,
    /// Seconds; zero disables the timeout.
    pub timeout_s: u64,
    pub machine_info: bool,
    pub jsonl: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub manifest: PathBuf,
    pub data_home: Option<PathBuf>,
    pub cli_args: Vec<String>,
}

fn emit(out: &mut dyn Write, line: impl std::fmt::Display) -> BenchResult<()> {
    writeln!(out, "{line}").map_err(|e| BenchError::io("failed to write output", e))
}

/// Print built-in presets, then config entries when a config is given.
pub fn list(config: Option<&Path>, out: &mut dyn Write) -> BenchResult<()> {
    for preset in Preset::ALL {
        let plan = preset.plan();
        let npart: Vec<String> = plan.npart.iter().map(|n| n.to_string()).collect();
        emit(
            out,
            format!(
                "{:<24} {:<13} {:<14} npart=[{}] baseline={}  {}",
                preset.as_str(),
                plan.grid,
                plan.kernel,
                npart.join(","),
                plan.baseline,
                preset.description()
            ),
        )?;
    }
    if let Some(path) = config {
        for spec in load_bench_config(path)? {
            emit(out, format!("{:<24} preset={}", spec.name, spec.preset))?;
        }
    }
    Ok(())
}

/// Resolve the target to a preset plus the config entry it came from, if any.
fn lookup(opts: &RunOptions) -> BenchResult<(Preset, Option<BenchmarkSpec>)> {
    if let Some(path) = &opts.config {
        let specs = load_bench_config(path)?;
        if let Some(spec) = find_benchmark(&specs, &opts.target) {
            return Ok((spec.preset, Some(spec.clone())));
        }
        if opts.target.parse::<Preset>().is_err() {
            let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
            return Err(BenchError::Config(format!(
                "'{}' is neither a preset nor a benchmark in {} (benchmarks: {})",
                opts.target,
                path.display(),
                names.join(", ")
            )));
        }
    }
    Ok((opts.target.parse()?, None))
}

/// Build the sweep and the workload command template for `opts`.
///
/// Datasets named by the plan are fetched into the cache so that
/// `plan.data` points at their local root.
pub fn prepare(opts: &RunOptions, fetcher: &dyn Fetcher) -> BenchResult<(SweepPlan, String)> {
    let (preset, spec) = lookup(opts)?;
    let (file_overrides, file_command) = match spec {
        Some(spec) => (spec.overrides, spec.command),
        None => (SweepOverrides::default(), None),
    };
    let mut plan = build_plan(preset, file_overrides.merge(opts.overrides.clone()))?;

    let template = opts.command.clone().or(file_command).ok_or_else(|| {
        BenchError::Config(format!(
            "no workload command for {}; pass --command or set {COMMAND_ENV}",
            plan.benchmark
        ))
    })?;
    // reject a bad template before a potentially large download
    CommandWorkload::new(CommandConfig::new(template.as_str()))?;

    if plan.data.is_none() {
        if let Some(dataset) = plan.dataset.clone() {
            let manifest = Manifest::load(&opts.manifest)?;
            let cache = CacheRoot::resolve(opts.data_home.clone())?;
            plan.data = Some(DatasetResolver::new(&manifest, cache, fetcher).resolve(&dataset)?);
        }
    }
    Ok((plan, template))
}

/// Run `plan` on `workload`, printing progress and storing records.
pub fn execute(
    plan: &SweepPlan,
    workload: &dyn Workload,
    opts: &RunOptions,
    out: &mut dyn Write,
) -> BenchResult<Vec<BenchRecord>> {
    let ctx = RecordContext {
        machine: opts.machine_info.then(MachineInfo::collect),
        cli_args: opts.cli_args.clone(),
    };
    let jsonl = opts.jsonl.as_ref().map(JsonlWriter::new);

    let result = run_sweep(plan, workload, &ctx, &mut |event| match event {
        SweepEvent::Started(p) => {
            let with_interp = p
                .interpolator
                .map(|i| format!(" and {i}"))
                .unwrap_or_default();
            let chunk = p.chunk.map(|c| format!(" (chunk {c})")).unwrap_or_default();
            emit(
                out,
                format!("Running {} particles with {}{with_interp}{chunk}", p.npart, p.kernel),
            )
        }
        SweepEvent::Finished(record) => {
            emit(out, record.metric_summary())?;
            if let Some(w) = &jsonl {
                w.append(record)?;
            }
            Ok(())
        }
    });

    let records = match result {
        Ok(records) => records,
        Err(e) => {
            if let Some(w) = &jsonl {
                warn!(path = %w.path().display(), "sweep aborted; completed points were recorded");
            }
            return Err(e);
        }
    };

    if let Some(path) = &opts.csv {
        CsvExporter::new().export(&records, path)?;
        info!(path = %path.display(), rows = records.len(), "wrote CSV");
    }
    Ok(records)
}

/// `bench run`: prepare the sweep and run it with a command workload.
pub fn run(opts: RunOptions, fetcher: &dyn Fetcher, out: &mut dyn Write) -> BenchResult<()> {
    let (plan, template) = prepare(&opts, fetcher)?;
    let workload = CommandWorkload::new(
        CommandConfig::new(template)
            .with_profiler(opts.profiler)
            .with_timeout(Duration::from_secs(opts.timeout_s)),
    )?;
    let records = execute(&plan, &workload, &opts, out)?;
    info!(benchmark = %plan.benchmark, points = records.len(), "sweep complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Metric;
    use crate::datasets::mock::{MockFetcher, zip_bytes};
    use crate::engine::{MockConfig, MockMotion, MockWorkload};

    fn opts(target: &str) -> RunOptions {
        RunOptions {
            target: target.to_string(),
            command: Some("true".into()),
            manifest: PathBuf::from("benchmarks.json"),
            ..Default::default()
        }
    }

    #[test]
    fn test_list_mentions_every_preset() {
        let mut out = Vec::new();
        list(None, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        for preset in Preset::ALL {
            assert!(text.contains(preset.as_str()));
        }
        assert_eq!(text.lines().count(), Preset::ALL.len());
    }

    #[test]
    fn test_prepare_requires_command() {
        let mut o = opts("kernel-loop");
        o.command = None;
        let err = prepare(&o, &MockFetcher::new()).unwrap_err();
        assert!(err.to_string().contains(COMMAND_ENV));
    }

    #[test]
    fn test_prepare_resolves_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("benchmarks.json");
        std::fs::write(
            &manifest,
            r#"{"data_url": "https://d.example/", "datasets": [{"name": "MOi-curvilinear", "file": "moi.zip"}]}"#,
        )
        .unwrap();
        let fetcher = MockFetcher::new()
            .with_body("https://d.example/moi.zip", zip_bytes(&[("MOi/U.nc", b"u")]).unwrap());
        let o = RunOptions {
            manifest,
            data_home: Some(dir.path().join("cache")),
            ..opts("moi-curvilinear")
        };
        let (plan, template) = prepare(&o, &fetcher).unwrap();
        assert_eq!(template, "true");
        assert_eq!(
            plan.data.unwrap(),
            dir.path().join("cache").join("moi.zip.unzip").join("MOi")
        );
    }

    #[test]
    fn test_config_target_and_flag_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("bench-config.toml");
        std::fs::write(
            &config,
            "[[benchmark]]\nname = \"tiny-loop\"\npreset = \"kernel-loop\"\nnpart = [3]\ncommand = \"from-file\"\n",
        )
        .unwrap();
        let mut o = opts("tiny-loop");
        o.config = Some(config.clone());
        o.overrides.metric = Some(Metric::Memory);
        let (plan, template) = prepare(&o, &MockFetcher::new()).unwrap();
        assert_eq!(plan.benchmark, "tiny-loop");
        assert_eq!(plan.npart, vec![3]);
        assert_eq!(plan.metric, Metric::Memory);
        assert_eq!(template, "true");

        let mut o = opts("no-such");
        o.config = Some(config);
        assert!(matches!(
            prepare(&o, &MockFetcher::new()).unwrap_err(),
            BenchError::Config(_)
        ));
    }

    #[test]
    fn test_execute_prints_and_stores() {
        let dir = tempfile::tempdir().unwrap();
        let mut o = opts("kernel-loop");
        o.overrides.npart = Some(vec![2]);
        o.jsonl = Some(dir.path().join("bench.jsonl"));
        o.csv = Some(dir.path().join("bench.csv"));
        let (plan, _) = prepare(&o, &MockFetcher::new()).unwrap();
        let workload = MockWorkload::new(MockConfig::new("mock").with_elapsed(1.5));

        let mut out = Vec::new();
        let records = execute(&plan, &workload, &o, &mut out).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Running 2 particles with DoNothing\nExecution time: 1.500 seconds\n"
        );
        assert_eq!(JsonlWriter::new(dir.path().join("bench.jsonl")).count().unwrap(), 1);
        assert!(dir.path().join("bench.csv").is_file());
    }

    #[test]
    fn test_execute_regression_keeps_completed_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut o = opts("kernel-loop");
        o.overrides.npart = Some(vec![1, 2]);
        o.jsonl = Some(dir.path().join("bench.jsonl"));
        o.csv = Some(dir.path().join("bench.csv"));
        let (plan, _) = prepare(&o, &MockFetcher::new()).unwrap();
        let workload = MockWorkload::new(
            MockConfig::new("mock").with_motion_from(1, MockMotion::Drift { dlon: 0.5, dlat: 0.0 }),
        );
        let mut out = Vec::new();
        let err = execute(&plan, &workload, &o, &mut out).unwrap_err();
        assert_eq!(err.exit_code(), 4);

        let stored = JsonlWriter::new(dir.path().join("bench.jsonl")).read_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].params.npart, 1);
        assert!(stored[0].regression.as_ref().unwrap().passed);
        // an aborted sweep writes no CSV
        assert!(!dir.path().join("bench.csv").exists());
    }

    #[test]
    fn test_silent_workload_fails_position_baseline() {
        let mut o = opts("kernel-loop");
        o.overrides.npart = Some(vec![1]);
        let (plan, _) = prepare(&o, &MockFetcher::new()).unwrap();
        let workload = MockWorkload::new(MockConfig::new("mock").with_motion(MockMotion::Silent));
        let err = execute(&plan, &workload, &o, &mut Vec::new()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_missing_command_checked_before_dataset_download() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("benchmarks.json");
        std::fs::write(
            &manifest,
            r#"{"data_url": "https://data.example/", "datasets": [{"name": "MOi-curvilinear", "file": "moi.zip", "known_hash": null}]}"#,
        )
        .unwrap();
        let fetcher = MockFetcher::new().with_body(
            "https://data.example/moi.zip",
            zip_bytes(&[("MOi/U.nc", b"u")]).unwrap(),
        );
        let o = RunOptions {
            target: "moi-curvilinear".into(),
            manifest,
            data_home: Some(dir.path().join("cache")),
            ..Default::default()
        };

        let err = prepare(&o, &fetcher).unwrap_err();
        assert!(err.to_string().contains(COMMAND_ENV), "{err}");
        assert_eq!(fetcher.call_count(), 0);
    }
}
