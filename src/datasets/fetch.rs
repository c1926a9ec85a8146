//! Transport for dataset archives.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use tracing::debug;

use crate::{BenchError, BenchResult};

/// Retrieves the bytes behind a URL.
///
/// Implementations stream into `dest` and return the number of bytes
/// written. They never retry.
pub trait Fetcher: Send + Sync {
    /// Returns the fetcher name (e.g., "url", "mock").
    fn name(&self) -> &str;

    fn fetch(&self, url: &str, dest: &mut dyn Write) -> BenchResult<u64>;
}

/// Fetches `http://`, `https://` and `file://` URLs.
///
/// HTTP requests use ureq defaults (no explicit timeout).
#[derive(Debug, Clone, Default)]
pub struct UrlFetcher;

impl UrlFetcher {
    pub fn new() -> Self {
        UrlFetcher
    }

    fn fetch_http(&self, url: &str, dest: &mut dyn Write) -> BenchResult<u64> {
        let response = ureq::get(url).call().map_err(|e| BenchError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let mut reader = response.into_body().into_reader();
        std::io::copy(&mut reader, dest).map_err(|e| BenchError::Fetch {
            url: url.to_string(),
            reason: format!("failed while reading body: {e}"),
        })
    }

    fn fetch_file(&self, url: &str, path: &str, dest: &mut dyn Write) -> BenchResult<u64> {
        let path = PathBuf::from(path);
        let mut file = File::open(&path).map_err(|e| BenchError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        std::io::copy(&mut file, dest)
            .map_err(|e| BenchError::io(format!("failed to copy {}", path.display()), e))
    }
}

impl Fetcher for UrlFetcher {
    fn name(&self) -> &str {
        "url"
    }

    fn fetch(&self, url: &str, dest: &mut dyn Write) -> BenchResult<u64> {
        debug!(url, "fetching");
        if let Some(path) = url.strip_prefix("file://") {
            return self.fetch_file(url, path, dest);
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.fetch_http(url, dest);
        }
        Err(BenchError::Config(format!("unsupported URL scheme: {url}")))
    }
}

/// Last path segment of a URL, with any query string removed.
///
/// Share links often carry the file name in the query (`...&files=Foo.zip`);
/// in that case the value after the last `=` is used.
pub fn url_basename(url: &str) -> String {
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (url, None),
    };
    if let Some(name) = query
        .and_then(|q| q.rsplit('=').next())
        .filter(|n| n.contains('.'))
    {
        return name.to_string();
    }
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("archive")
        .to_string()
}
