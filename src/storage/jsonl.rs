//! Append-only JSON Lines log of sweep points.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::core::schema::{BenchRecord, SCHEMA_VERSION};
use crate::{BenchError, BenchResult};

/// One [`BenchRecord`] per line.
///
/// Each append opens, writes and closes the file, so a sweep that aborts
/// halfway leaves every finished point on disk.
#[derive(Debug, Clone)]
pub struct JsonlWriter {
    path: PathBuf,
}

impl JsonlWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonlWriter {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record`, creating the file and its parent directories.
    pub fn append(&self, record: &BenchRecord) -> BenchResult<()> {
        if record.schema_version != SCHEMA_VERSION {
            return Err(BenchError::Message(format!(
                "refusing to log schema v{} record into a v{SCHEMA_VERSION} file",
                record.schema_version
            )));
        }
        let mut line = serde_json::to_string(record)
            .map_err(|e| BenchError::Message(format!("cannot encode record {}: {e}", record.record_id)))?;
        line.push('\n');

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| BenchError::io(format!("failed to create {}", dir.display()), e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(line.as_bytes()))
            .map_err(|e| BenchError::io(format!("failed to append to {}", self.path.display()), e))
    }

    pub fn read_all(&self) -> BenchResult<Vec<BenchRecord>> {
        self.read_filtered(None)
    }

    /// Records in file order, optionally only those of one benchmark.
    pub fn read_filtered(&self, benchmark: Option<&str>) -> BenchResult<Vec<BenchRecord>> {
        let mut records = Vec::new();
        for (lineno, text) in self.lines()? {
            let record: BenchRecord = serde_json::from_str(&text).map_err(|e| {
                BenchError::Message(format!("{} line {lineno}: {e}", self.path.display()))
            })?;
            if benchmark.is_none_or(|name| record.benchmark == name) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Number of stored records; a missing file holds none.
    pub fn count(&self) -> BenchResult<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        Ok(self.lines()?.len())
    }

    /// Non-blank lines with their 1-based line numbers.
    fn lines(&self) -> BenchResult<Vec<(usize, String)>> {
        let file = File::open(&self.path)
            .map_err(|e| BenchError::io(format!("failed to open {}", self.path.display()), e))?;
        let mut out = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                BenchError::io(format!("failed to read {} line {}", self.path.display(), idx + 1), e)
            })?;
            if !line.trim().is_empty() {
                out.push((idx + 1, line));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GridType, Kernel, Metric, PointParams, WorkloadInfo};

    fn make_test_record(name: &str) -> BenchRecord {
        BenchRecord::new(
            name.to_string(),
            PointParams {
                npart: 10,
                chunk: None,
                grid: GridType::Rectilinear,
                interpolator: None,
                kernel: Kernel::DoNothing,
                surface: false,
                runtime_s: 60.0,
                dt_s: 1.0,
                metric: Metric::Time,
            },
            WorkloadInfo {
                name: "test".to_string(),
                version: None,
            },
        )
    }

    #[test]
    fn test_schema_version_validation() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonlWriter::new(dir.path().join("test.jsonl"));

        let mut record = make_test_record("test");
        record.schema_version = 999;

        let err = writer.append(&record).unwrap_err();
        assert!(err.to_string().contains("schema v999"));
    }

    #[test]
    fn test_append_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonlWriter::new(dir.path().join("out/nested/bench.jsonl"));
        assert_eq!(writer.count().unwrap(), 0);

        writer.append(&make_test_record("kernel-loop")).unwrap();
        writer.append(&make_test_record("moi-curvilinear")).unwrap();
        writer.append(&make_test_record("kernel-loop")).unwrap();

        assert_eq!(writer.count().unwrap(), 3);
        assert_eq!(writer.read_all().unwrap().len(), 3);
        assert_eq!(writer.read_filtered(Some("kernel-loop")).unwrap().len(), 2);
    }

    #[test]
    fn test_read_missing_file() {
        let writer = JsonlWriter::new("/nonexistent/bench.jsonl");
        assert!(matches!(
            writer.read_all().unwrap_err(),
            BenchError::Io { .. }
        ));
    }
}
