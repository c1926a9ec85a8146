//! Manifest-driven dataset download and cache.

pub mod cache;
pub mod fetch;
pub mod hash;
pub mod manifest;
pub mod mock;
pub mod resolver;

pub use cache::{CacheRoot, DATADIR_ENV};
pub use fetch::{Fetcher, UrlFetcher};
pub use hash::KnownHash;
pub use manifest::{DEFAULT_MANIFEST, DatasetEntry, Manifest};
pub use mock::MockFetcher;
pub use resolver::DatasetResolver;
