//! Dataset manifest: the JSON descriptor of downloadable benchmark datasets.
//!
//! ```json
//! {
//!   "data_url": "https://example.org/share/download?files=",
//!   "datasets": [
//!     {"name": "MOi-curvilinear", "file": "Parcels_Benchmarks_MOi_data.zip", "known_hash": "sha256:..."}
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BenchError, BenchResult};

use super::hash::KnownHash;

/// Base URL used when a manifest does not name one.
pub const DEFAULT_DATA_URL: &str =
    "https://surfdrive.surf.nl/index.php/s/7xlfdOFaUGDEmpD/download?path=%2F&files=";

/// Manifest shipped at the repository root.
pub const DEFAULT_MANIFEST: &str = "benchmarks.json";

/// A single dataset entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub known_hash: Option<String>,
}

impl DatasetEntry {
    /// Parsed form of `known_hash`.
    pub fn hash(&self) -> BenchResult<Option<KnownHash>> {
        self.known_hash.as_deref().map(KnownHash::parse).transpose()
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    data_url: Option<String>,
    datasets: Option<Vec<RawEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    known_hash: Option<String>,
}

/// Validated, immutable manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub data_url: String,
    pub datasets: Vec<DatasetEntry>,
}

impl Manifest {
    /// Load and validate a manifest file.
    pub fn load(path: &Path) -> BenchResult<Self> {
        if !path.is_file() {
            return Err(BenchError::io(
                format!("manifest not found: {}", path.display()),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| BenchError::io(format!("failed to read {}", path.display()), e))?;
        Self::from_json(&text)
    }

    /// Parse and validate manifest JSON.
    pub fn from_json(text: &str) -> BenchResult<Self> {
        let raw: RawManifest = serde_json::from_str(text)
            .map_err(|e| BenchError::Config(format!("malformed manifest: {e}")))?;
        let Some(raw_datasets) = raw.datasets else {
            return Err(BenchError::Config(
                "manifest must contain a top-level 'datasets' list".into(),
            ));
        };

        let mut datasets: Vec<DatasetEntry> = Vec::with_capacity(raw_datasets.len());
        for (i, d) in raw_datasets.into_iter().enumerate() {
            let name = d.name.filter(|s| !s.is_empty());
            let file = d.file.filter(|s| !s.is_empty());
            let (Some(name), Some(file)) = (name, file) else {
                return Err(BenchError::Config(format!(
                    "dataset #{i} needs at least 'name' and 'file'"
                )));
            };
            if datasets.iter().any(|e| e.name == name) {
                return Err(BenchError::Config(format!(
                    "duplicate dataset name in manifest: {name}"
                )));
            }
            let entry = DatasetEntry {
                name,
                file,
                known_hash: d.known_hash.filter(|s| !s.is_empty()),
            };
            // surface bad hash strings at load time, not after a download
            entry.hash()?;
            datasets.push(entry);
        }

        Ok(Manifest {
            data_url: raw.data_url.unwrap_or_else(|| DEFAULT_DATA_URL.to_string()),
            datasets,
        })
    }

    /// Write the manifest with datasets sorted by name, two-space indent and a trailing newline.
    pub fn save(&self, path: &Path) -> BenchResult<()> {
        let mut sorted = self.clone();
        sorted.datasets.sort_by(|a, b| a.name.cmp(&b.name));
        let mut text = serde_json::to_string_pretty(&sorted)
            .map_err(|e| BenchError::Message(format!("failed to serialize manifest: {e}")))?;
        text.push('\n');
        std::fs::write(path, text)
            .map_err(|e| BenchError::io(format!("failed to write {}", path.display()), e))
    }

    pub fn get(&self, name: &str) -> BenchResult<&DatasetEntry> {
        self.datasets
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| BenchError::UnknownDataset {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Dataset names in manifest order.
    pub fn names(&self) -> Vec<String> {
        self.datasets.iter().map(|d| d.name.clone()).collect()
    }

    /// Download URL of an archive.
    pub fn url_for(&self, entry: &DatasetEntry) -> String {
        format!("{}{}", self.data_url, entry.file)
    }

    /// Append a new entry, rejecting duplicate names and files.
    pub fn with_entry(&self, entry: DatasetEntry) -> BenchResult<Self> {
        if self.datasets.iter().any(|d| d.name == entry.name) {
            return Err(BenchError::Config(format!(
                "dataset '{}' already exists in manifest",
                entry.name
            )));
        }
        if self.datasets.iter().any(|d| d.file == entry.file) {
            return Err(BenchError::Config(format!(
                "file '{}' is already referenced in the manifest",
                entry.file
            )));
        }
        let mut next = self.clone();
        next.datasets.push(entry);
        Ok(next)
    }
}
