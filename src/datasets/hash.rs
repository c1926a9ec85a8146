//! Known-hash strings and archive verification.
//!
//! Accepted forms are `sha256:<64 hex>` and a bare 64-hex digest (sha256
//! implied). Other algorithms are rejected when the manifest is loaded.

use std::fmt;
use std::path::Path;

use crate::{BenchError, BenchResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownHash {
    hex: String,
}

impl KnownHash {
    pub fn parse(s: &str) -> BenchResult<Self> {
        let s = s.trim();
        let hex = match s.split_once(':') {
            Some((alg, hex)) if alg.eq_ignore_ascii_case("sha256") => hex,
            Some((alg, _)) => {
                return Err(BenchError::Config(format!(
                    "unsupported hash algorithm '{alg}' (only sha256 is supported)"
                )));
            }
            None => s,
        };
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(BenchError::Config(format!(
                "invalid sha256 digest '{hex}': expected 64 hex chars"
            )));
        }
        Ok(KnownHash {
            hex: hex.to_ascii_lowercase(),
        })
    }

    pub fn from_digest(hex: impl Into<String>) -> Self {
        KnownHash {
            hex: hex.into().to_ascii_lowercase(),
        }
    }

    pub fn hex(&self) -> &str {
        &self.hex
    }

    /// Check `path` against this hash; `label` names the archive in the error.
    pub fn verify(&self, path: &Path, label: &str) -> BenchResult<()> {
        let actual = file_sha256(path)?;
        if actual != self.hex {
            return Err(BenchError::Integrity {
                file: label.to_string(),
                expected: self.to_string(),
                actual: format!("sha256:{actual}"),
            });
        }
        Ok(())
    }
}

impl fmt::Display for KnownHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.hex)
    }
}

/// Lowercase hex sha256 of a file's contents.
pub fn file_sha256(path: &Path) -> BenchResult<String> {
    sha256::try_digest(path)
        .map(|d| d.to_ascii_lowercase())
        .map_err(|e| BenchError::io(format!("failed to hash {}", path.display()), e))
}
