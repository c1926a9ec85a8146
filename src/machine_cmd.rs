//! `machine-info` command: print a host snapshot as JSON.

use std::io::Write;
use std::path::PathBuf;

use crate::core::MachineProbe;
use crate::{BenchError, BenchResult};

pub fn run(
    inventory_command: Option<String>,
    json: Option<PathBuf>,
    out: &mut dyn Write,
) -> BenchResult<()> {
    let mut probe = MachineProbe::default();
    if let Some(cmd) = inventory_command {
        let argv = shlex::split(&cmd)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| BenchError::Config(format!("cannot parse inventory command: {cmd}")))?;
        probe = probe.with_inventory_command(argv);
    }
    let info = probe.collect();
    let text = serde_json::to_string_pretty(&info)
        .map_err(|e| BenchError::Message(format!("failed to serialize machine info: {e}")))?;

    if let Some(path) = json {
        std::fs::write(&path, format!("{text}\n"))
            .map_err(|e| BenchError::io(format!("failed to write {}", path.display()), e))?;
    }
    writeln!(out, "{text}").map_err(|e| BenchError::io("failed to write output", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_without_inventory_tool() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("machine.json");
        let mut out = Vec::new();
        run(
            Some("/nonexistent/lshw-for-tests".into()),
            Some(json_path.clone()),
            &mut out,
        )
        .unwrap();

        let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert!(printed["disks"]["unavailable"].is_string());
        assert!(printed["system"].is_string());
        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(saved["system"], printed["system"]);
    }

    #[test]
    fn test_bad_inventory_command() {
        let mut out = Vec::new();
        assert!(matches!(
            run(Some("'unterminated".into()), None, &mut out).unwrap_err(),
            BenchError::Config(_)
        ));
    }
}
