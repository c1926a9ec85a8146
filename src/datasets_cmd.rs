//! `datasets` subcommands: list, download, path, retrieve-archive, add-dataset.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::datasets::manifest::DEFAULT_DATA_URL;
use crate::datasets::{CacheRoot, DatasetResolver, Fetcher, Manifest};
use crate::{BenchError, BenchResult};

/// Where the manifest and the cache live for one invocation.
#[derive(Debug, Clone)]
pub struct DatasetsContext {
    pub manifest: PathBuf,
    pub data_home: Option<PathBuf>,
}

impl DatasetsContext {
    fn load(&self) -> BenchResult<(Manifest, CacheRoot)> {
        let manifest = Manifest::load(&self.manifest)?;
        let cache = CacheRoot::resolve(self.data_home.clone())?;
        Ok((manifest, cache))
    }
}

fn emit(out: &mut dyn Write, line: impl std::fmt::Display) -> BenchResult<()> {
    writeln!(out, "{line}").map_err(|e| BenchError::io("failed to write output", e))
}

/// Print dataset names, one per line, sorted.
pub fn list(manifest_path: &Path, long: bool, out: &mut dyn Write) -> BenchResult<()> {
    let manifest = Manifest::load(manifest_path)?;
    let mut entries: Vec<_> = manifest.datasets.iter().collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    for entry in entries {
        if long {
            emit(
                out,
                format!(
                    "{}\t{}\t{}",
                    entry.name,
                    entry.file,
                    entry.known_hash.as_deref().unwrap_or("-")
                ),
            )?;
        } else {
            emit(out, &entry.name)?;
        }
    }
    Ok(())
}

/// Download one dataset, or every dataset with `all`.
pub fn download(
    ctx: &DatasetsContext,
    name: Option<String>,
    all: bool,
    fetcher: &dyn Fetcher,
    out: &mut dyn Write,
) -> BenchResult<()> {
    let (manifest, cache) = ctx.load()?;
    let resolver = DatasetResolver::new(&manifest, cache, fetcher);
    match (name, all) {
        (Some(_), true) => Err(BenchError::Config(
            "pass either a dataset name or --all, not both".into(),
        )),
        (None, false) => Err(BenchError::Config(
            "pass a dataset name or --all".into(),
        )),
        (Some(name), false) => {
            let root = resolver.resolve(&name)?;
            emit(out, format!("{name}\t{}", root.display()))
        }
        (None, true) => {
            for (name, root) in resolver.download_all()? {
                emit(out, format!("{name}\t{}", root.display()))?;
            }
            Ok(())
        }
    }
}

/// Print the local root of a dataset, fetching it first when needed.
pub fn path(
    ctx: &DatasetsContext,
    name: &str,
    fetcher: &dyn Fetcher,
    out: &mut dyn Write,
) -> BenchResult<()> {
    let (manifest, cache) = ctx.load()?;
    let root = DatasetResolver::new(&manifest, cache, fetcher).resolve(name)?;
    emit(out, root.display())
}

/// Fetch an archive by URL, outside the manifest.
pub fn retrieve_archive(
    data_home: Option<PathBuf>,
    url: &str,
    known_hash: Option<&str>,
    fetcher: &dyn Fetcher,
    out: &mut dyn Write,
) -> BenchResult<()> {
    let cache = CacheRoot::resolve(data_home)?;
    let manifest = Manifest {
        data_url: DEFAULT_DATA_URL.to_string(),
        datasets: Vec::new(),
    };
    let root = DatasetResolver::new(&manifest, cache, fetcher).retrieve(url, known_hash)?;
    emit(out, root.display())
}

/// Register a new archive in the manifest file.
pub fn add_dataset(
    ctx: &DatasetsContext,
    name: &str,
    file: &str,
    fetcher: &dyn Fetcher,
    out: &mut dyn Write,
) -> BenchResult<()> {
    let (manifest, cache) = ctx.load()?;
    let updated = DatasetResolver::new(&manifest, cache, fetcher).add_dataset(
        name,
        file,
        &ctx.manifest,
    )?;
    let entry = updated.get(name)?;
    info!(manifest = %ctx.manifest.display(), "manifest updated");
    emit(
        out,
        format!(
            "added {}\t{}\t{}",
            entry.name,
            entry.file,
            entry.known_hash.as_deref().unwrap_or("-")
        ),
    )
}
