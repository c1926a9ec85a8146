//! On-disk dataset cache.
//!
//! Layout under the cache root:
//!
//! - `<file>`        verified archive
//! - `<file>.unzip/` unpacked tree (only exists once an unpack completed)
//! - `<file>.lock`   advisory lock serialising work on one archive
//!
//! Archives and unpack directories are staged in temporary paths inside the
//! root and renamed into place, so readers never observe partial state.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::{BenchError, BenchResult};

use super::fetch::Fetcher;
use super::hash::KnownHash;

/// Environment variable naming the cache root.
pub const DATADIR_ENV: &str = "PARCELS_DATADIR";

/// Directory name used under the platform cache dir.
pub const CACHE_DIR_NAME: &str = "parcels-benchmarks";

#[derive(Debug, Clone)]
pub struct CacheRoot {
    dir: PathBuf,
}

impl CacheRoot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CacheRoot { dir: dir.into() }
    }

    /// Explicit override, then `PARCELS_DATADIR`, then the platform cache dir.
    pub fn resolve(data_home: Option<PathBuf>) -> BenchResult<Self> {
        Self::resolve_with_env(data_home, std::env::var_os(DATADIR_ENV))
    }

    pub fn resolve_with_env(
        data_home: Option<PathBuf>,
        env_value: Option<OsString>,
    ) -> BenchResult<Self> {
        if let Some(dir) = data_home {
            return Ok(Self::new(dir));
        }
        if let Some(dir) = env_value.filter(|v| !v.is_empty()) {
            return Ok(Self::new(dir));
        }
        let base = dirs::cache_dir().ok_or_else(|| {
            BenchError::Config(format!(
                "could not determine a cache directory; set {DATADIR_ENV} or pass --data-home"
            ))
        })?;
        Ok(Self::new(base.join(CACHE_DIR_NAME)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn archive_path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn unpack_dir(&self, file: &str) -> PathBuf {
        self.dir.join(format!("{file}.unzip"))
    }

    fn ensure(&self) -> BenchResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            BenchError::io(format!("failed to create cache dir {}", self.dir.display()), e)
        })
    }

    /// Block until this process holds the exclusive lock for `file`.
    pub fn lock(&self, file: &str) -> BenchResult<CacheLock> {
        self.ensure()?;
        let path = self.dir.join(format!("{file}.lock"));
        let handle = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| BenchError::io(format!("failed to open lock file {}", path.display()), e))?;
        handle
            .lock_exclusive()
            .map_err(|e| BenchError::io(format!("failed to lock {}", path.display()), e))?;
        debug!(lock = %path.display(), "acquired cache lock");
        Ok(CacheLock { file: handle })
    }

    /// Download `url` into the archive slot for `file`.
    ///
    /// The body is written to a temporary file in the cache root, verified
    /// against `hash` when one is given, then renamed into place. On any
    /// failure the temporary file is removed and the slot is left untouched.
    pub fn download(
        &self,
        fetcher: &dyn Fetcher,
        url: &str,
        file: &str,
        hash: Option<&KnownHash>,
    ) -> BenchResult<PathBuf> {
        self.ensure()?;
        let dest = self.archive_path(file);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BenchError::io(format!("failed to create {}", parent.display()), e))?;
        }

        info!(url, file, "downloading archive");
        let mut staged = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(&self.dir)
            .map_err(|e| BenchError::io("failed to create staging file", e))?;
        let bytes = fetcher.fetch(url, staged.as_file_mut())?;
        staged
            .as_file_mut()
            .flush()
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| BenchError::io("failed to flush staged download", e))?;

        if let Some(hash) = hash {
            hash.verify(staged.path(), file)?;
        }

        staged
            .persist(&dest)
            .map_err(|e| BenchError::io(format!("failed to place {}", dest.display()), e.error))?;
        info!(file, bytes, "archive stored");
        Ok(dest)
    }

    /// Unpack the archive for `file` into its unpack directory, replacing any
    /// previous one, and return the extracted file paths.
    pub fn unpack(&self, file: &str) -> BenchResult<Vec<PathBuf>> {
        let archive = self.archive_path(file);
        let target = self.unpack_dir(file);
        let staging = tempfile::Builder::new()
            .prefix(".unpack-")
            .tempdir_in(&self.dir)
            .map_err(|e| BenchError::io("failed to create staging dir", e))?;

        info!(file, "unpacking archive");
        unzip_into(&archive, staging.path())?;

        if target.exists() {
            fs::remove_dir_all(&target)
                .map_err(|e| BenchError::io(format!("failed to remove {}", target.display()), e))?;
        }
        fs::rename(staging.path(), &target)
            .map_err(|e| BenchError::io(format!("failed to place {}", target.display()), e))?;
        list_files(&target)
    }
}

/// Exclusive advisory lock on one cache entry, released on drop.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Extract every entry of a zip archive below `dest`.
pub fn unzip_into(archive: &Path, dest: &Path) -> BenchResult<Vec<PathBuf>> {
    let reader = File::open(archive)
        .map_err(|e| BenchError::io(format!("failed to open {}", archive.display()), e))?;
    let mut zip = ZipArchive::new(BufReader::new(reader)).map_err(|e| {
        BenchError::Message(format!("failed to open zip archive {}: {e}", archive.display()))
    })?;

    let mut extracted = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| BenchError::Message(format!("failed to read zip entry {i}: {e}")))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(BenchError::Message(format!(
                "zip entry '{}' escapes the extraction directory",
                entry.name()
            )));
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)
                .map_err(|e| BenchError::io(format!("failed to create {}", out_path.display()), e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BenchError::io(format!("failed to create {}", parent.display()), e))?;
        }
        let mut out = File::create(&out_path)
            .map_err(|e| BenchError::io(format!("failed to create {}", out_path.display()), e))?;
        std::io::copy(&mut entry, &mut out)
            .map_err(|e| BenchError::io(format!("failed to extract {}", out_path.display()), e))?;
        extracted.push(out_path);
    }
    Ok(extracted)
}

/// All regular files below `dir`, sorted.
pub fn list_files(dir: &Path) -> BenchResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = fs::read_dir(&current)
            .map_err(|e| BenchError::io(format!("failed to list {}", current.display()), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| BenchError::io("failed to read dir entry", e))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Deepest directory that contains every path in `files`.
pub fn common_root(files: &[PathBuf]) -> Option<PathBuf> {
    let mut parents = files.iter().filter_map(|f| f.parent());
    let mut root = parents.next()?.to_path_buf();
    for parent in parents {
        while !parent.starts_with(&root) {
            if !root.pop() {
                return None;
            }
        }
    }
    Some(root)
}
