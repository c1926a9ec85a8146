//! Host machine snapshot attached to benchmark records.
//!
//! Every section is gathered by an independent probe. A probe that fails
//! (missing tool, missing privileges, unreadable sysfs) yields
//! `Probe::Unavailable` and the rest of the snapshot is still produced.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Outcome of a single best-effort probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Probe<T> {
    Available(T),
    Unavailable { unavailable: String },
}

impl<T> Probe<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Probe::Unavailable {
            unavailable: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Probe::Available(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Probe::Available(v) => Some(v),
            Probe::Unavailable { .. } => None,
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for Probe<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Probe::Available(v),
            Err(e) => Probe::unavailable(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuInfo {
    pub architecture: String,
    pub model: String,
    pub count: Option<usize>,
    pub count_logical: usize,
    pub freq_max_mhz: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryBank {
    pub id: Option<String>,
    pub description: Option<String>,
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskInfo {
    pub device: Option<String>,
    pub size_bytes: Option<u64>,
    pub rotational: Option<bool>,
    pub interface: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    pub system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub cpu: Probe<CpuInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_memory_bytes: Option<u64>,
    pub memory: Probe<Vec<MemoryBank>>,
    pub disks: Probe<Vec<DiskInfo>>,
    pub collected_at: String,
}

impl MachineInfo {
    /// Collect a snapshot with the default probe configuration.
    pub fn collect() -> Self {
        MachineProbe::default().collect()
    }
}

/// Probe configuration: which inventory tool to call and where sysfs lives.
#[derive(Debug, Clone)]
pub struct MachineProbe {
    inventory_cmd: Vec<String>,
    sysfs_root: PathBuf,
}

impl Default for MachineProbe {
    fn default() -> Self {
        MachineProbe {
            // `-n` keeps sudo from prompting; without cached credentials the probe degrades.
            inventory_cmd: vec!["sudo".into(), "-n".into(), "lshw".into()],
            sysfs_root: PathBuf::from("/sys"),
        }
    }
}

impl MachineProbe {
    /// Replace the hardware inventory command (program plus leading args).
    pub fn with_inventory_command(mut self, cmd: Vec<String>) -> Self {
        self.inventory_cmd = cmd;
        self
    }

    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    pub fn collect(&self) -> MachineInfo {
        use sysinfo::System;

        let mut sys = System::new_all();
        sys.refresh_all();

        let system = System::name().unwrap_or_else(|| std::env::consts::OS.to_string());
        let release = System::kernel_version();
        let hostname = System::host_name();
        let total_memory_bytes = Some(sys.total_memory()).filter(|b| *b > 0);

        let cpu = self.probe_cpu(&sys);
        let memory: Probe<Vec<MemoryBank>> = self.probe_memory().into();
        let disks: Probe<Vec<DiskInfo>> = self.probe_disks().into();

        for (section, available) in [("memory", memory.is_available()), ("disk", disks.is_available())] {
            if !available {
                warn!(section, "hardware inventory unavailable; section left empty");
            }
        }

        MachineInfo {
            system,
            release,
            hostname,
            cpu,
            total_memory_bytes,
            memory,
            disks,
            collected_at: crate::now_string(),
        }
    }

    fn probe_cpu(&self, sys: &sysinfo::System) -> Probe<CpuInfo> {
        let Some(first) = sys.cpus().first() else {
            return Probe::unavailable("no CPUs reported by the platform");
        };
        let freq_max_mhz = self
            .read_cpufreq_max_mhz()
            .or_else(|| Some(first.frequency()).filter(|f| *f > 0));
        Probe::Available(CpuInfo {
            architecture: std::env::consts::ARCH.to_string(),
            model: first.brand().trim().to_string(),
            count: sys.physical_core_count(),
            count_logical: sys.cpus().len(),
            freq_max_mhz,
        })
    }

    fn read_cpufreq_max_mhz(&self) -> Option<u64> {
        let path = self
            .sysfs_root
            .join("devices/system/cpu/cpu0/cpufreq/cpuinfo_max_freq");
        let khz: u64 = std::fs::read_to_string(path).ok()?.trim().parse().ok()?;
        Some(khz / 1000)
    }

    fn probe_memory(&self) -> Result<Vec<MemoryBank>, String> {
        let nodes = self.run_inventory("memory")?;
        Ok(nodes
            .iter()
            .filter(|n| class_of(n) == Some("memory"))
            .map(|n| MemoryBank {
                id: str_field(n, "id"),
                description: str_field(n, "description"),
                size_bytes: n.get("size").and_then(Value::as_u64),
            })
            .collect())
    }

    fn probe_disks(&self) -> Result<Vec<DiskInfo>, String> {
        let nodes = self.run_inventory("disk")?;
        Ok(nodes
            .iter()
            .filter(|n| class_of(n) == Some("disk"))
            .map(|n| {
                let device = logical_name(n);
                let rotational = device
                    .as_deref()
                    .and_then(|d| read_rotational(&self.sysfs_root, d));
                DiskInfo {
                    device,
                    size_bytes: n.get("size").and_then(Value::as_u64),
                    rotational,
                    interface: str_field(n, "businfo")
                        .and_then(|b| b.split('@').next().map(str::to_string)),
                    model: str_field(n, "product"),
                }
            })
            .collect())
    }

    /// Run `<inventory> -C <class> -json` and flatten the node tree.
    fn run_inventory(&self, class: &str) -> Result<Vec<Value>, String> {
        let (program, args) = self
            .inventory_cmd
            .split_first()
            .ok_or_else(|| "no inventory command configured".to_string())?;
        debug!(program, class, "running hardware inventory");
        let output = Command::new(program)
            .args(args)
            .args(["-C", class, "-json"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| format!("failed to run {program}: {e}"))?;
        if !output.status.success() {
            return Err(format!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        parse_inventory(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse inventory JSON. Newer lshw prints an array, older versions print
/// concatenated objects; both are accepted. Children are flattened.
pub fn parse_inventory(text: &str) -> Result<Vec<Value>, String> {
    let mut roots = Vec::new();
    for value in serde_json::Deserializer::from_str(text).into_iter::<Value>() {
        let value = value.map_err(|e| format!("invalid inventory output: {e}"))?;
        match value {
            Value::Array(items) => roots.extend(items),
            other => roots.push(other),
        }
    }
    let mut flat = Vec::new();
    let mut stack: Vec<Value> = roots.into_iter().rev().collect();
    while let Some(mut node) = stack.pop() {
        if let Some(Value::Array(children)) = node.get_mut("children").map(Value::take) {
            stack.extend(children.into_iter().rev());
        }
        flat.push(node);
    }
    Ok(flat)
}

fn class_of(node: &Value) -> Option<&str> {
    node.get("class").and_then(Value::as_str)
}

fn str_field(node: &Value, key: &str) -> Option<String> {
    node.get(key).and_then(Value::as_str).map(str::to_string)
}

fn logical_name(node: &Value) -> Option<String> {
    match node.get("logicalname")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
        _ => None,
    }
}

fn read_rotational(sysfs_root: &Path, device: &str) -> Option<bool> {
    let name = Path::new(device).file_name()?.to_str()?;
    let flag = std::fs::read_to_string(sysfs_root.join("block").join(name).join("queue/rotational")).ok()?;
    match flag.trim() {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}
