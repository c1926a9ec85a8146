#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use parcels_bench::bench::SweepOverrides;
use parcels_bench::bench_cmd::{self, RunOptions};
use parcels_bench::core::{Interpolator, Kernel, Metric};
use parcels_bench::datasets::{DATADIR_ENV, DEFAULT_MANIFEST, UrlFetcher};
use parcels_bench::datasets_cmd::{self, DatasetsContext};
use parcels_bench::engine::{COMMAND_ENV, Profiler};
use parcels_bench::{BenchResult, machine_cmd};

const LOG_ENV: &str = "PARCELS_BENCH_LOG";

#[derive(Parser, Debug)]
#[command(name = "parcels-bench")]
#[command(about = "Benchmark harness for Parcels particle-tracking runs", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set PARCELS_BENCH_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage benchmark datasets
    Datasets {
        #[command(subcommand)]
        command: DatasetsCommand,
    },

    /// List and run benchmark sweeps
    Bench {
        #[command(subcommand)]
        command: BenchCommand,
    },

    /// Print a JSON snapshot of this machine
    MachineInfo {
        /// Hardware inventory command (default: "sudo -n lshw")
        #[arg(long)]
        inventory_command: Option<String>,
        /// Also write the snapshot to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct ManifestArgs {
    /// Dataset manifest
    #[arg(long, default_value = DEFAULT_MANIFEST)]
    manifest: PathBuf,
    /// Cache directory for downloaded datasets
    #[arg(long, env = DATADIR_ENV)]
    data_home: Option<PathBuf>,
}

impl ManifestArgs {
    fn context(self) -> DatasetsContext {
        DatasetsContext {
            manifest: self.manifest,
            data_home: self.data_home,
        }
    }
}

#[derive(Subcommand, Debug)]
enum DatasetsCommand {
    /// List dataset names from the manifest
    List {
        /// Dataset manifest
        #[arg(long, default_value = DEFAULT_MANIFEST)]
        manifest: PathBuf,
        /// Also show archive file and known hash
        #[arg(long)]
        long: bool,
    },
    /// Download and unpack a dataset (or all of them)
    Download {
        /// Dataset name
        name: Option<String>,
        /// Download every dataset in the manifest
        #[arg(long)]
        all: bool,
        #[command(flatten)]
        manifest: ManifestArgs,
    },
    /// Print the local root of a dataset, downloading it if needed
    Path {
        name: String,
        #[command(flatten)]
        manifest: ManifestArgs,
    },
    /// Download and unpack an archive by URL
    RetrieveArchive {
        url: String,
        /// Known hash ("sha256:<hex>" or bare hex)
        #[arg(long)]
        hash: Option<String>,
        /// Cache directory for downloaded datasets
        #[arg(long, env = DATADIR_ENV)]
        data_home: Option<PathBuf>,
    },
    /// Download a new archive, record its hash and add it to the manifest
    AddDataset {
        #[arg(long)]
        name: String,
        /// Archive file name under the manifest's data_url
        #[arg(long)]
        file: String,
        #[command(flatten)]
        manifest: ManifestArgs,
    },
}

#[derive(Subcommand, Debug)]
enum BenchCommand {
    /// List built-in presets (and config entries with --config)
    List {
        /// TOML sweep config
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run a preset or a config entry
    Run {
        /// Preset or benchmark name
        target: String,
        /// TOML sweep config
        #[arg(long)]
        config: Option<PathBuf>,
        /// Workload command template (placeholders like {npart}, {data})
        #[arg(long, env = COMMAND_ENV)]
        command: Option<String>,
        /// Particle counts to sweep
        #[arg(long, value_delimiter = ',')]
        npart: Option<Vec<usize>>,
        /// Chunk sizes to sweep
        #[arg(long, value_delimiter = ',')]
        chunk: Option<Vec<u32>>,
        #[arg(long)]
        interpolator: Option<Interpolator>,
        #[arg(long)]
        kernel: Option<Kernel>,
        /// Measure peak memory instead of execution time
        #[arg(long)]
        memory: bool,
        /// Restrict the run to surface fields
        #[arg(long)]
        surface: bool,
        /// Local field directory (overrides the dataset cache)
        #[arg(long)]
        data_path: Option<PathBuf>,
        /// Manifest dataset to run against
        #[arg(long)]
        dataset: Option<String>,
        /// Simulated runtime in seconds
        #[arg(long)]
        runtime: Option<f64>,
        /// Timestep in seconds
        #[arg(long)]
        dt: Option<f64>,
        /// Regression tolerance
        #[arg(long)]
        tolerance: Option<f64>,
        /// Measurement method: poll or gnu-time
        #[arg(long, default_value = "poll")]
        profiler: Profiler,
        /// Timeout seconds per point (0 = none)
        #[arg(long, default_value_t = 0)]
        timeout: u64,
        /// Attach a machine snapshot to every record
        #[arg(long)]
        machine_info: bool,
        /// Append records to this JSONL file
        #[arg(long)]
        jsonl: Option<PathBuf>,
        /// Write records to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        #[command(flatten)]
        manifest: ManifestArgs,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var(LOG_ENV).unwrap_or_else(|_| {
        if verbose { "parcels_bench=debug".to_string() } else { "parcels_bench=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn dispatch(command: Commands) -> BenchResult<()> {
    let fetcher = UrlFetcher::new();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Datasets { command } => match command {
            DatasetsCommand::List { manifest, long } => datasets_cmd::list(&manifest, long, &mut out),
            DatasetsCommand::Download { name, all, manifest } => {
                datasets_cmd::download(&manifest.context(), name, all, &fetcher, &mut out)
            }
            DatasetsCommand::Path { name, manifest } => {
                datasets_cmd::path(&manifest.context(), &name, &fetcher, &mut out)
            }
            DatasetsCommand::RetrieveArchive { url, hash, data_home } => {
                datasets_cmd::retrieve_archive(data_home, &url, hash.as_deref(), &fetcher, &mut out)
            }
            DatasetsCommand::AddDataset { name, file, manifest } => {
                datasets_cmd::add_dataset(&manifest.context(), &name, &file, &fetcher, &mut out)
            }
        },
        Commands::Bench { command } => match command {
            BenchCommand::List { config } => bench_cmd::list(config.as_deref(), &mut out),
            BenchCommand::Run {
                target,
                config,
                command,
                npart,
                chunk,
                interpolator,
                kernel,
                memory,
                surface,
                data_path,
                dataset,
                runtime,
                dt,
                tolerance,
                profiler,
                timeout,
                machine_info,
                jsonl,
                csv,
                manifest,
            } => {
                let overrides = SweepOverrides {
                    name: None,
                    npart,
                    chunk,
                    interpolator,
                    kernel,
                    metric: memory.then_some(Metric::Memory),
                    surface: surface.then_some(true),
                    dataset,
                    data_path,
                    runtime_s: runtime,
                    dt_s: dt,
                    tolerance,
                };
                let opts = RunOptions {
                    target,
                    config,
                    command,
                    overrides,
                    profiler,
                    timeout_s: timeout,
                    machine_info,
                    jsonl,
                    csv,
                    manifest: manifest.manifest,
                    data_home: manifest.data_home,
                    cli_args: std::env::args().skip(1).collect(),
                };
                bench_cmd::run(opts, &fetcher, &mut out)
            }
        },
        Commands::MachineInfo { inventory_command, json } => {
            machine_cmd::run(inventory_command, json, &mut out)
        }
    }
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dispatch(cli.command) {
        eprintln!("{:#}", e);
        std::process::exit(e.exit_code());
    }
}
