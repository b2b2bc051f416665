//! Data structures for sync operations.

use crate::error::{Result, SyncError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default number of download workers.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// A single object found by the lister.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDescriptor {
    /// Full object key, slash-separated.
    pub key: String,
    /// Object size in bytes as reported by the listing.
    pub size: u64,
}

impl ObjectDescriptor {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// Where objects come from and where they land.
///
/// # Example
///
/// ```
/// use s3sync::SyncTarget;
///
/// let target = SyncTarget::parse("s3://my-bucket/logs/2024", "./out").unwrap();
/// assert_eq!(target.bucket, "my-bucket");
/// assert_eq!(target.prefix, "logs/2024");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    /// Bucket name (the URL host).
    pub bucket: String,
    /// Key prefix, without a leading slash. Empty selects the whole bucket.
    pub prefix: String,
    /// Local destination root.
    pub dest_dir: PathBuf,
}

impl SyncTarget {
    /// Parses `<scheme>://<bucket>/<prefix>` into a target rooted at `dest_dir`.
    pub fn parse(url: &str, dest_dir: impl AsRef<Path>) -> Result<Self> {
        let invalid = |reason: &str| SyncError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = url.trim();
        let (scheme, rest) = trimmed
            .split_once("://")
            .ok_or_else(|| invalid("expected <scheme>://<bucket>/<prefix>"))?;
        if scheme.is_empty() {
            return Err(invalid("missing scheme"));
        }

        // Query strings and fragments carry no meaning for a listing
        let rest = rest.split(['?', '#']).next().unwrap_or_default();

        let (bucket, path) = match rest.split_once('/') {
            Some((bucket, path)) => (bucket, path),
            None => (rest, ""),
        };
        if bucket.is_empty() {
            return Err(invalid("missing bucket"));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix: path.trim_start_matches('/').to_string(),
            dest_dir: dest_dir.as_ref().to_path_buf(),
        })
    }
}

/// What a worker does after a download fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DownloadFailurePolicy {
    /// Abandon the failed object and keep pulling jobs.
    #[default]
    #[value(name = "skip")]
    SkipObject,
    /// Stop this worker for the rest of the run, shrinking the pool by one.
    #[value(name = "retire-worker")]
    RetireWorker,
}

/// Configuration for a sync run.
///
/// # Example
///
/// ```
/// use s3sync::{DownloadFailurePolicy, SyncConfig};
/// use std::time::Duration;
///
/// let config = SyncConfig {
///     concurrency: 16,
///     on_download_error: DownloadFailurePolicy::SkipObject,
///     download_timeout: Some(Duration::from_secs(300)),
///     show_progress: false,
/// };
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of download workers (default: 10).
    ///
    /// Downloads are I/O-bound, so this may comfortably exceed the core count.
    pub concurrency: usize,
    /// Failure handling for individual downloads (default: skip the object).
    pub on_download_error: DownloadFailurePolicy,
    /// Upper bound on a single object's download. `None` waits forever.
    pub download_timeout: Option<Duration>,
    /// Draw a spinner with the running counters on stderr.
    pub show_progress: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            on_download_error: DownloadFailurePolicy::default(),
            download_timeout: None,
            show_progress: true,
        }
    }
}

/// Final report of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Objects found by the lister.
    pub listed: u64,
    /// Objects written to disk.
    pub downloaded: u64,
    /// Objects whose download failed.
    pub failed: u64,
    /// Bytes written to disk.
    pub bytes: u64,
    /// Workers that stopped early under [`DownloadFailurePolicy::RetireWorker`].
    pub retired_workers: usize,
}
