pub mod bench;
pub mod bench_cmd;
pub mod core;
pub mod datasets;
pub mod datasets_cmd;
pub mod engine;
pub mod machine_cmd;
pub mod storage;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("dataset {name:?} not found. Available datasets are: {}", .available.join(", "))]
    UnknownDataset { name: String, available: Vec<String> },
    #[error("hash mismatch for {file}: expected {expected}, got {actual}")]
    Integrity {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("workload failed: {0}")]
    Workload(String),
    #[error("regression check failed: {0}")]
    Regression(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BenchError {
    /// Wrap an I/O error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BenchError::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            BenchError::Config(_) | BenchError::UnknownDataset { .. } => 2,
            BenchError::Integrity { .. } => 3,
            BenchError::Regression(_) => 4,
            _ => 1,
        }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}

pub fn now_string() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(BenchError::Config("x".into()).exit_code(), 2);
        assert_eq!(
            BenchError::UnknownDataset {
                name: "a".into(),
                available: vec![]
            }
            .exit_code(),
            2
        );
        assert_eq!(
            BenchError::Integrity {
                file: "f".into(),
                expected: "e".into(),
                actual: "a".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(BenchError::Regression("r".into()).exit_code(), 4);
        assert_eq!(BenchError::Message("m".into()).exit_code(), 1);
    }

    #[test]
    fn test_unknown_dataset_lists_names() {
        let err = BenchError::UnknownDataset {
            name: "nope".into(),
            available: vec!["A".into(), "B".into()],
        };
        assert_eq!(
            err.to_string(),
            "dataset \"nope\" not found. Available datasets are: A, B"
        );
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
