use std::fs;
use std::path::Path;

use assert_cmd::Command;
use parcels_bench::datasets::mock::zip_bytes;
use predicates::prelude::*;
use tempfile::tempdir;

fn write_manifest(dir: &Path, data_url: &str, datasets: serde_json::Value) -> std::path::PathBuf {
    let path = dir.join("benchmarks.json");
    let manifest = serde_json::json!({"data_url": data_url, "datasets": datasets});
    fs::write(&path, serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
    path
}

fn bin() -> Command {
    let mut cmd = Command::cargo_bin("parcels-bench").unwrap();
    cmd.env_remove("PARCELS_DATADIR").env_remove("PARCELS_BENCH_COMMAND");
    cmd
}

#[test]
fn datasets_list_prints_one_name_per_line() {
    let dir = tempdir().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "https://example.invalid/data/",
        serde_json::json!([
            {"name": "MOi-curvilinear", "file": "moi.zip", "known_hash": null},
            {"name": "FESOM-baroclinic-gyre", "file": "fesom.zip", "known_hash": null},
        ]),
    );

    bin()
        .args(["datasets", "list", "--manifest"])
        .arg(&manifest)
        .assert()
        .success()
        .stdout("FESOM-baroclinic-gyre\nMOi-curvilinear\n");
}

#[test]
fn unknown_dataset_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let manifest = write_manifest(
        dir.path(),
        "https://example.invalid/data/",
        serde_json::json!([{"name": "MOi-curvilinear", "file": "moi.zip", "known_hash": null}]),
    );

    bin()
        .args(["datasets", "path", "nope", "--manifest"])
        .arg(&manifest)
        .arg("--data-home")
        .arg(dir.path().join("cache"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Available datasets are: MOi-curvilinear"));
}

#[test]
fn integrity_failure_exits_with_code_3() {
    let dir = tempdir().unwrap();
    let remote = dir.path().join("remote");
    fs::create_dir_all(&remote).unwrap();
    fs::write(remote.join("moi.zip"), zip_bytes(&[("a.nc", b"a")]).unwrap()).unwrap();
    let manifest = write_manifest(
        dir.path(),
        &format!("file://{}/", remote.display()),
        serde_json::json!([{
            "name": "MOi-curvilinear",
            "file": "moi.zip",
            "known_hash": format!("sha256:{}", "0".repeat(64)),
        }]),
    );

    bin()
        .args(["datasets", "path", "MOi-curvilinear", "--manifest"])
        .arg(&manifest)
        .env("PARCELS_DATADIR", dir.path().join("cache"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("moi.zip"));
    assert!(!dir.path().join("cache/moi.zip").exists());
}

#[test]
fn datasets_path_prints_unpacked_root() {
    let dir = tempdir().unwrap();
    let remote = dir.path().join("remote");
    fs::create_dir_all(&remote).unwrap();
    fs::write(
        remote.join("fesom.zip"),
        zip_bytes(&[("FESOM/mesh.nc", b"m"), ("FESOM/u.nc", b"u")]).unwrap(),
    )
    .unwrap();
    let manifest = write_manifest(
        dir.path(),
        &format!("file://{}/", remote.display()),
        serde_json::json!([{"name": "FESOM-baroclinic-gyre", "file": "fesom.zip", "known_hash": null}]),
    );

    bin()
        .args(["datasets", "path", "FESOM-baroclinic-gyre", "--manifest"])
        .arg(&manifest)
        .arg("--data-home")
        .arg(dir.path().join("cache"))
        .assert()
        .success()
        .stdout(predicate::str::ends_with("fesom.zip.unzip/FESOM\n"));
}

#[test]
fn bench_list_names_presets() {
    bin()
        .args(["bench", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kernel-loop"))
        .stdout(predicate::str::contains("fesom-baroclinic-gyre"));
}

#[test]
fn bench_run_without_command_is_config_error() {
    bin()
        .args(["bench", "run", "kernel-loop", "--npart", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("PARCELS_BENCH_COMMAND"));
}

#[test]
fn copernicus_requires_data_path() {
    bin()
        .args(["bench", "run", "copernicus-marine", "--command", "true"])
        .assert()
        .code(2);
}

#[test]
fn machine_info_without_inventory_tool() {
    bin()
        .args(["machine-info", "--inventory-command", "/nonexistent/lshw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"disks\""));
}
