//! Dataset resolution end to end over `file://` URLs.

use std::fs;
use std::path::Path;

use parcels_bench::datasets::mock::zip_bytes;
use parcels_bench::datasets::{CacheRoot, DatasetResolver, Manifest, UrlFetcher};
use parcels_bench::{BenchError, sha256_hex};
use tempfile::tempdir;

/// Publish `archives` under `<dir>/remote/` and return a matching manifest.
fn publish(dir: &Path, archives: &[(&str, &str, Vec<u8>, Option<String>)]) -> Manifest {
    let remote = dir.join("remote");
    fs::create_dir_all(&remote).unwrap();
    let mut datasets = Vec::new();
    for (name, file, body, hash) in archives {
        fs::write(remote.join(file), body).unwrap();
        datasets.push(serde_json::json!({"name": name, "file": file, "known_hash": hash}));
    }
    let manifest = serde_json::json!({
        "data_url": format!("file://{}/", remote.display()),
        "datasets": datasets,
    });
    Manifest::from_json(&manifest.to_string()).unwrap()
}

#[test]
fn resolve_is_idempotent() {
    let dir = tempdir().unwrap();
    let body = zip_bytes(&[
        ("GLO12/psy4v3r1-daily_U_2024-01-01.nc", b"u"),
        ("GLO12/psy4v3r1-daily_V_2024-01-01.nc", b"v"),
        ("GLO12/PSY4V3R1_mesh_hgr.nc", b"mesh"),
    ])
    .unwrap();
    let hash = format!("sha256:{}", sha256_hex(&body));
    let manifest = publish(
        dir.path(),
        &[("MOi-curvilinear", "Parcels_Benchmarks_MOi_data.zip", body, Some(hash))],
    );
    let fetcher = UrlFetcher::new();
    let resolver = DatasetResolver::new(&manifest, CacheRoot::new(dir.path().join("cache")), &fetcher);

    let first = resolver.resolve("MOi-curvilinear").unwrap();
    let archive = dir.path().join("cache/Parcels_Benchmarks_MOi_data.zip");
    let mtime = fs::metadata(&archive).unwrap().modified().unwrap();

    let second = resolver.resolve("MOi-curvilinear").unwrap();
    assert_eq!(first, second);
    assert!(first.ends_with("Parcels_Benchmarks_MOi_data.zip.unzip/GLO12"));
    assert!(first.join("PSY4V3R1_mesh_hgr.nc").is_file());
    assert_eq!(fs::metadata(&archive).unwrap().modified().unwrap(), mtime);
}

#[test]
fn corrupted_remote_archive_is_rejected() {
    let dir = tempdir().unwrap();
    let good = zip_bytes(&[("FESOM/mesh.nc", b"mesh")]).unwrap();
    let hash = sha256_hex(&good);
    let mut bad = good.clone();
    bad[0] ^= 0x01;
    let manifest = publish(
        dir.path(),
        &[("FESOM-baroclinic-gyre", "fesom.zip", bad, Some(hash))],
    );
    let fetcher = UrlFetcher::new();
    let cache = dir.path().join("cache");
    let resolver = DatasetResolver::new(&manifest, CacheRoot::new(&cache), &fetcher);

    let err = resolver.resolve("FESOM-baroclinic-gyre").unwrap_err();
    assert!(matches!(err, BenchError::Integrity { .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(!cache.join("fesom.zip").exists());
    assert!(!cache.join("fesom.zip.unzip").exists());
}

#[test]
fn download_all_stops_at_first_failure() {
    let dir = tempdir().unwrap();
    let ok = zip_bytes(&[("a.nc", b"a")]).unwrap();
    let manifest = publish(dir.path(), &[("first", "first.zip", ok, None)]);
    // second entry points at an archive that was never published
    let mut manifest = manifest;
    manifest.datasets.push(parcels_bench::datasets::DatasetEntry {
        name: "missing".into(),
        file: "missing.zip".into(),
        known_hash: None,
    });
    let fetcher = UrlFetcher::new();
    let resolver = DatasetResolver::new(&manifest, CacheRoot::new(dir.path().join("cache")), &fetcher);

    let err = resolver.download_all().unwrap_err();
    assert!(matches!(err, BenchError::Fetch { .. }));
    assert!(dir.path().join("cache/first.zip.unzip/a.nc").is_file());
}
