//! Integration tests for JSONL storage.

use parcels_bench::core::{BenchRecord, GridType, Interpolator, Kernel, Metric, PointParams, WorkloadInfo};
use parcels_bench::storage::JsonlWriter;

fn make_test_record(name: &str, npart: usize) -> BenchRecord {
    let mut record = BenchRecord::new(
        name.to_string(),
        PointParams {
            npart,
            chunk: None,
            grid: GridType::Rectilinear,
            interpolator: Some(Interpolator::BiRectiLinear),
            kernel: Kernel::AdvectionEE,
            surface: false,
            runtime_s: 172_800.0,
            dt_s: 900.0,
            metric: Metric::Time,
        },
        WorkloadInfo {
            name: "command".to_string(),
            version: Some("1.0.0".to_string()),
        },
    );
    record.elapsed_s = Some(npart as f64 * 0.01);
    record
}

#[test]
fn test_write_and_read_multiple_records() {
    let dir = tempfile::tempdir().unwrap();
    let writer = JsonlWriter::new(dir.path().join("bench.jsonl"));

    let records: Vec<_> = [1, 10, 100]
        .into_iter()
        .map(|n| make_test_record("copernicus-marine", n))
        .collect();
    for r in &records {
        writer.append(r).expect("failed to append record");
    }

    let read = writer.read_all().expect("failed to read records");
    assert_eq!(read.len(), 3);
    for (got, want) in read.iter().zip(&records) {
        assert_eq!(got.record_id, want.record_id);
        assert_eq!(got.params.npart, want.params.npart);
        assert_eq!(got.elapsed_s, want.elapsed_s);
        assert_eq!(got.params.interpolator, Some(Interpolator::BiRectiLinear));
    }
}

#[test]
fn test_append_does_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("append_test.jsonl");

    JsonlWriter::new(&path)
        .append(&make_test_record("first", 1))
        .expect("failed to append first record");

    // a fresh writer simulates a second process run
    let writer2 = JsonlWriter::new(&path);
    writer2
        .append(&make_test_record("second", 1))
        .expect("failed to append second record");

    assert_eq!(writer2.count().unwrap(), 2);
    let names: Vec<_> = writer2
        .read_all()
        .unwrap()
        .into_iter()
        .map(|r| r.benchmark)
        .collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn test_each_line_is_flat_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.jsonl");
    JsonlWriter::new(&path)
        .append(&make_test_record("kernel-loop", 50))
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 1);
    let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
    assert_eq!(value["schema_version"], 1);
    assert_eq!(value["npart"], 50);
    assert_eq!(value["metric"], "time");
    assert!(value.get("peak_memory_bytes").is_none());
}

#[test]
fn test_corrupt_line_reports_line_number() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bench.jsonl");
    let writer = JsonlWriter::new(&path);
    writer.append(&make_test_record("a", 1)).unwrap();
    let mut text = std::fs::read_to_string(&path).unwrap();
    text.push_str("{not json}\n");
    std::fs::write(&path, text).unwrap();

    let err = writer.read_all().unwrap_err();
    assert!(err.to_string().contains("line 2"));
}
