//! Mock fetcher and archive builder for testing.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::time::Duration;

use crate::{BenchError, BenchResult};

use super::fetch::Fetcher;

/// Serves canned bodies from memory and records every requested URL.
#[derive(Debug, Default)]
pub struct MockFetcher {
    bodies: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
    fails: bool,
    delay: Duration,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// Make every fetch fail as a network error would.
    pub fn fails(mut self) -> Self {
        self.fails = true;
        self
    }

    /// Sleep for `delay` before writing each body, like a slow link.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of fetches performed so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(&self, url: &str, dest: &mut dyn Write) -> BenchResult<u64> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        if self.fails {
            return Err(BenchError::Fetch {
                url: url.to_string(),
                reason: "mock network failure".into(),
            });
        }
        let body = self.bodies.get(url).ok_or_else(|| BenchError::Fetch {
            url: url.to_string(),
            reason: "404 Not Found".into(),
        })?;
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        dest.write_all(body)
            .map_err(|e| BenchError::io("failed to write mock body", e))?;
        Ok(body.len() as u64)
    }
}

/// Build an in-memory zip archive from `(path, body)` pairs.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> BenchResult<Vec<u8>> {
    let zip_err = |e: zip::result::ZipError| BenchError::Message(format!("failed to build zip: {e}"));
    let mut buf = Cursor::new(Vec::new());
    let mut writer = zip::ZipWriter::new(&mut buf);
    let opts = zip::write::SimpleFileOptions::default();
    for (name, body) in entries {
        writer.start_file(*name, opts).map_err(zip_err)?;
        writer
            .write_all(body)
            .map_err(|e| BenchError::io("failed to write zip entry", e))?;
    }
    writer.finish().map_err(zip_err)?;
    Ok(buf.into_inner())
}
