//! Workload that runs an external command per sweep point.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::str::FromStr;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::core::Metric;
use crate::{BenchError, BenchResult};

use super::timev;
use super::workload::{RunOutput, RunRequest, Workload, WorkloadReport};

/// Environment variable holding the default command template.
pub const COMMAND_ENV: &str = "PARCELS_BENCH_COMMAND";

/// GNU time binary used by [`Profiler::GnuTime`].
pub const GNU_TIME_BIN: &str = "/usr/bin/time";

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const STDERR_TAIL_LINES: usize = 10;

/// How a command run is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profiler {
    /// Wall clock around the child, or RSS polling for the memory metric.
    ///
    /// RSS is summed over the child and all of its descendants, so wrapper
    /// scripts that start the interpreter without `exec` are still measured.
    #[default]
    Poll,
    /// Wrap the command in `/usr/bin/time -v`.
    GnuTime,
}

impl Profiler {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profiler::Poll => "poll",
            Profiler::GnuTime => "gnu-time",
        }
    }
}

impl fmt::Display for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profiler {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "poll" => Ok(Profiler::Poll),
            "gnu-time" | "time" => Ok(Profiler::GnuTime),
            other => Err(BenchError::Config(format!(
                "unknown profiler '{other}' (expected poll or gnu-time)"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandConfig {
    /// Command template, see [`expand_template`].
    pub template: String,
    pub profiler: Profiler,
    /// Zero disables the timeout.
    pub timeout: Duration,
    pub time_bin: PathBuf,
}

impl CommandConfig {
    pub fn new(template: impl Into<String>) -> Self {
        CommandConfig {
            template: template.into(),
            profiler: Profiler::default(),
            timeout: Duration::ZERO,
            time_bin: PathBuf::from(GNU_TIME_BIN),
        }
    }

    pub fn with_profiler(mut self, profiler: Profiler) -> Self {
        self.profiler = profiler;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_time_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.time_bin = path.into();
        self
    }
}

pub struct CommandWorkload {
    config: CommandConfig,
}

struct ChildRun {
    status: ExitStatus,
    elapsed_s: f64,
    peak_rss: Option<u64>,
    stdout: String,
    stderr: String,
}

impl CommandWorkload {
    pub fn new(config: CommandConfig) -> BenchResult<Self> {
        // validate quoting and placeholders once, up front
        tokenize(&config.template)?;
        Ok(CommandWorkload { config })
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    fn build_command(&self, argv: &[String]) -> BenchResult<Command> {
        let mut full: Vec<String> = Vec::with_capacity(argv.len() + 2);
        if self.config.profiler == Profiler::GnuTime {
            if !self.config.time_bin.is_file() {
                return Err(BenchError::Config(format!(
                    "{} not found. Please install GNU time (often the 'time' package)",
                    self.config.time_bin.display()
                )));
            }
            full.push(self.config.time_bin.display().to_string());
            full.push("-v".to_string());
        }
        full.extend(argv.iter().cloned());

        let (program, args) = full
            .split_first()
            .ok_or_else(|| BenchError::Config("command template is empty".into()))?;
        let mut cmd = Command::new(program);
        cmd.args(args);
        Ok(cmd)
    }

    fn run_with_timeout(&self, mut cmd: Command, track_memory: bool) -> BenchResult<ChildRun> {
        #[cfg(feature = "mem")]
        use sysinfo::{ProcessRefreshKind, RefreshKind, System};

        let mut stdout_file =
            tempfile::tempfile().map_err(|e| BenchError::io("failed to create stdout capture", e))?;
        let mut stderr_file =
            tempfile::tempfile().map_err(|e| BenchError::io("failed to create stderr capture", e))?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(
                stdout_file
                    .try_clone()
                    .map_err(|e| BenchError::io("failed to clone stdout capture", e))?,
            ))
            .stderr(Stdio::from(
                stderr_file
                    .try_clone()
                    .map_err(|e| BenchError::io("failed to clone stderr capture", e))?,
            ));

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| BenchError::Workload(format!("failed to spawn workload: {e}")))?;

        #[cfg(feature = "mem")]
        let mut sys = System::new_with_specifics(
            RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
        );
        #[cfg(feature = "mem")]
        let pid = sysinfo::Pid::from_u32(child.id());
        let mut peak_rss: Option<u64> = None;

        let status = loop {
            if let Some(status) = child
                .try_wait()
                .map_err(|e| BenchError::Workload(e.to_string()))?
            {
                break status;
            }

            if !self.config.timeout.is_zero() && start.elapsed() >= self.config.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(BenchError::Workload(format!(
                    "workload timed out after {}s",
                    self.config.timeout.as_secs()
                )));
            }

            #[cfg(feature = "mem")]
            {
                if track_memory {
                    sys.refresh_processes();
                    let rss = tree_rss(&sys, pid);
                    if rss > 0 {
                        peak_rss = Some(peak_rss.unwrap_or(0).max(rss));
                    }
                }
            }
            #[cfg(not(feature = "mem"))]
            let _ = track_memory;

            std::thread::sleep(POLL_INTERVAL);
        };
        let elapsed_s = start.elapsed().as_secs_f64();

        Ok(ChildRun {
            status,
            elapsed_s,
            peak_rss,
            stdout: read_capture(&mut stdout_file)?,
            stderr: read_capture(&mut stderr_file)?,
        })
    }
}

impl Workload for CommandWorkload {
    fn name(&self) -> &str {
        "command"
    }

    fn run(&self, request: &RunRequest) -> BenchResult<RunOutput> {
        let metric = request.params.metric;
        if metric == Metric::Memory
            && self.config.profiler == Profiler::Poll
            && !cfg!(feature = "mem")
        {
            return Err(BenchError::Config(
                "memory metric with the poll profiler needs the `mem` feature; use --profiler gnu-time".into(),
            ));
        }

        let argv = expand_template(&self.config.template, request)?;
        debug!(command = %shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_default(), "spawning workload");
        let cmd = self.build_command(&argv)?;
        let track_memory = metric == Metric::Memory && self.config.profiler == Profiler::Poll;
        let run = self.run_with_timeout(cmd, track_memory)?;

        let (elapsed_s, peak_rss, failure) = match self.config.profiler {
            Profiler::Poll => (Some(run.elapsed_s), run.peak_rss, exit_failure(run.status)),
            Profiler::GnuTime => {
                let summary = timev::parse(&run.stderr);
                // time exits 128+N for a signalled child but reports "Exit status: 0"
                let failure = match summary.terminated_by_signal {
                    Some(sig) => Some(format!("killed by signal {sig}")),
                    None if !summary.succeeded() => summary
                        .exit_status
                        .map(|c| format!("exited with status {c}")),
                    None => exit_failure(run.status),
                };
                (
                    summary.elapsed_s.or(Some(run.elapsed_s)),
                    summary.max_rss_bytes,
                    failure,
                )
            }
        };

        if let Some(failure) = failure {
            return Err(BenchError::Workload(format!(
                "workload {failure}\n{}",
                tail(&run.stderr, STDERR_TAIL_LINES)
            )));
        }

        let report = WorkloadReport::from_stdout(&run.stdout).unwrap_or_default();
        let output = RunOutput {
            elapsed_s: report.elapsed_s.or(elapsed_s),
            peak_memory_bytes: report.peak_memory_bytes.or(peak_rss),
            particles: report.particles(),
        };
        info!(
            npart = request.params.npart,
            elapsed_s = output.elapsed_s,
            peak_memory_bytes = output.peak_memory_bytes,
            "workload finished"
        );
        Ok(output)
    }
}

/// Resident memory of `root` and every live descendant.
#[cfg(feature = "mem")]
fn tree_rss(sys: &sysinfo::System, root: sysinfo::Pid) -> u64 {
    sys.processes()
        .values()
        .filter(|p| descends_from(sys, p.pid(), root))
        .map(|p| p.memory())
        .sum()
}

#[cfg(feature = "mem")]
fn descends_from(sys: &sysinfo::System, mut pid: sysinfo::Pid, root: sysinfo::Pid) -> bool {
    // bounded walk; pid reuse can in principle form a cycle
    for _ in 0..64 {
        if pid == root {
            return true;
        }
        match sys.process(pid).and_then(|p| p.parent()) {
            Some(parent) => pid = parent,
            None => return false,
        }
    }
    false
}

/// `None` for a zero exit, otherwise how the process ended.
fn exit_failure(status: ExitStatus) -> Option<String> {
    if status.success() {
        return None;
    }
    Some(match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                if let Some(sig) = status.signal() {
                    return Some(format!("killed by signal {sig}"));
                }
            }
            "terminated abnormally".to_string()
        }
    })
}

/// Workloads may print arbitrary bytes; decode lossily.
fn read_capture(file: &mut File) -> BenchResult<String> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut bytes))
        .map_err(|e| BenchError::io("failed to read workload output", e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

fn tokenize(template: &str) -> BenchResult<Vec<String>> {
    let tokens = shlex::split(template)
        .ok_or_else(|| BenchError::Config(format!("cannot parse command template: {template}")))?;
    if tokens.is_empty() {
        return Err(BenchError::Config("command template is empty".into()));
    }
    for token in &tokens {
        substitute(token, &HashMap::new(), true)?;
    }
    Ok(tokens)
}

/// Placeholder names accepted in command templates.
pub const PLACEHOLDERS: [&str; 14] = [
    "npart",
    "chunk",
    "interpolator",
    "kernel",
    "grid",
    "runtime_s",
    "dt_s",
    "data",
    "surface",
    "metric",
    "lon_start",
    "lon_end",
    "lat_start",
    "lat_end",
];

/// Split `template` into argv and fill in `{placeholder}`s from `request`.
///
/// Substitution happens per token, so values containing spaces stay one
/// argument. Absent optional values expand to `none` (chunk, interpolator)
/// or an empty string (data).
pub fn expand_template(template: &str, request: &RunRequest) -> BenchResult<Vec<String>> {
    let p = &request.params;
    let l = &request.layout;
    let values: HashMap<&str, String> = HashMap::from([
        ("npart", p.npart.to_string()),
        ("chunk", p.chunk.map_or_else(|| "none".into(), |c| c.to_string())),
        (
            "interpolator",
            p.interpolator.map_or_else(|| "none".into(), |i| i.to_string()),
        ),
        ("kernel", p.kernel.to_string()),
        ("grid", p.grid.to_string()),
        ("runtime_s", p.runtime_s.to_string()),
        ("dt_s", p.dt_s.to_string()),
        (
            "data",
            request
                .data
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
        ),
        ("surface", p.surface.to_string()),
        ("metric", p.metric.to_string()),
        ("lon_start", l.lon_start.to_string()),
        ("lon_end", l.lon_end.to_string()),
        ("lat_start", l.lat_start.to_string()),
        ("lat_end", l.lat_end.to_string()),
    ]);

    tokenize(template)?
        .iter()
        .map(|token| substitute(token, &values, false))
        .collect()
}

fn substitute(token: &str, values: &HashMap<&str, String>, check_only: bool) -> BenchResult<String> {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };
        let name = &after[..close];
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            if !PLACEHOLDERS.contains(&name) {
                return Err(BenchError::Config(format!(
                    "unknown placeholder {{{name}}} in command template"
                )));
            }
            if !check_only {
                out.push_str(values.get(name).map(String::as_str).unwrap_or_default());
            }
        } else {
            out.push_str(&rest[open..open + close + 2]);
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
