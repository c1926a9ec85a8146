//! Dataset name → verified, unpacked local directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{BenchError, BenchResult, sha256_hex};

use super::cache::{CacheRoot, common_root, list_files};
use super::fetch::{Fetcher, url_basename};
use super::hash::{KnownHash, file_sha256};
use super::manifest::{DatasetEntry, Manifest};

pub struct DatasetResolver<'a> {
    manifest: &'a Manifest,
    cache: CacheRoot,
    fetcher: &'a dyn Fetcher,
}

impl<'a> DatasetResolver<'a> {
    pub fn new(manifest: &'a Manifest, cache: CacheRoot, fetcher: &'a dyn Fetcher) -> Self {
        DatasetResolver {
            manifest,
            cache,
            fetcher,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        self.manifest
    }

    pub fn cache(&self) -> &CacheRoot {
        &self.cache
    }

    /// Local root of the named dataset, downloading and unpacking on first use.
    pub fn resolve(&self, name: &str) -> BenchResult<PathBuf> {
        let entry = self.manifest.get(name)?;
        let hash = entry.hash()?;
        let url = self.manifest.url_for(entry);
        let root = self.ensure(&url, &entry.file, hash.as_ref())?;
        info!(dataset = name, root = %root.display(), "dataset ready");
        Ok(root)
    }

    /// Resolve every dataset in manifest order, stopping at the first failure.
    pub fn download_all(&self) -> BenchResult<Vec<(String, PathBuf)>> {
        let mut resolved = Vec::with_capacity(self.manifest.datasets.len());
        for entry in &self.manifest.datasets {
            let root = self.resolve(&entry.name)?;
            resolved.push((entry.name.clone(), root));
        }
        Ok(resolved)
    }

    /// Fetch an archive that is not listed in the manifest.
    pub fn retrieve(&self, url: &str, known_hash: Option<&str>) -> BenchResult<PathBuf> {
        let hash = known_hash.map(KnownHash::parse).transpose()?;
        let file = adhoc_file_name(url);
        self.ensure(url, &file, hash.as_ref())
    }

    /// Register a new archive: download `data_url + file` unverified, record
    /// its digest, unpack it, then write the extended manifest to
    /// `manifest_path`.
    pub fn add_dataset(
        &self,
        name: &str,
        file: &str,
        manifest_path: &Path,
    ) -> BenchResult<Manifest> {
        let unhashed = DatasetEntry {
            name: name.to_string(),
            file: file.to_string(),
            known_hash: None,
        };
        // reject duplicates before spending a download on them
        self.manifest.with_entry(unhashed.clone())?;

        let url = self.manifest.url_for(&unhashed);
        let _lock = self.cache.lock(file)?;
        let archive = self.cache.download(self.fetcher, &url, file, None)?;
        let digest = KnownHash::from_digest(file_sha256(&archive)?);
        self.cache.unpack(file)?;

        let updated = self.manifest.with_entry(DatasetEntry {
            known_hash: Some(digest.to_string()),
            ..unhashed
        })?;
        updated.save(manifest_path)?;
        info!(dataset = name, hash = %digest, manifest = %manifest_path.display(), "dataset added");
        Ok(updated)
    }

    fn ensure(&self, url: &str, file: &str, hash: Option<&KnownHash>) -> BenchResult<PathBuf> {
        let _lock = self.cache.lock(file)?;
        let archive = self.cache.archive_path(file);
        let unpack_dir = self.cache.unpack_dir(file);

        let fresh = if archive.is_file() && self.cached_archive_ok(&archive, file, hash)? {
            debug!(file, "archive cache hit");
            false
        } else {
            self.cache.download(self.fetcher, url, file, hash)?;
            true
        };

        let files = if fresh || !unpack_dir.is_dir() {
            self.cache.unpack(file)?
        } else {
            list_files(&unpack_dir)?
        };
        Ok(common_root(&files).unwrap_or(unpack_dir))
    }

    /// Whether a cached archive can be reused. A stale one is removed
    /// together with its unpack directory.
    fn cached_archive_ok(
        &self,
        archive: &Path,
        file: &str,
        hash: Option<&KnownHash>,
    ) -> BenchResult<bool> {
        let Some(hash) = hash else {
            return Ok(true);
        };
        match hash.verify(archive, file) {
            Ok(()) => Ok(true),
            Err(BenchError::Integrity { actual, .. }) => {
                warn!(file, %actual, "cached archive does not match its known hash; downloading again");
                fs::remove_file(archive)
                    .map_err(|e| BenchError::io(format!("failed to remove {}", archive.display()), e))?;
                let unpack_dir = self.cache.unpack_dir(file);
                if unpack_dir.is_dir() {
                    fs::remove_dir_all(&unpack_dir).map_err(|e| {
                        BenchError::io(format!("failed to remove {}", unpack_dir.display()), e)
                    })?;
                }
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// Cache slot name for an ad-hoc URL: a short URL digest plus its basename.
pub fn adhoc_file_name(url: &str) -> String {
    let digest = sha256_hex(url.as_bytes());
    format!("{}-{}", &digest[..16], url_basename(url))
}
