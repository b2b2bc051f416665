//! Error types for sync operations.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error returned by an [`ObjectStore`](crate::store::ObjectStore) implementation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while syncing a prefix to disk.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The source URL could not be parsed into a bucket and prefix.
    #[error("Invalid source URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The destination root or an object's parent directory could not be created.
    #[error("Failed to create directory {path:?}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A listing page request failed.
    #[error("Failed to list objects: {0}")]
    Listing(#[source] StoreError),

    /// A destination file could not be created.
    #[error("Failed to create file {path:?}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The object could not be streamed to its file.
    #[error("Failed to download '{key}': {source}")]
    Download {
        key: String,
        #[source]
        source: StoreError,
    },

    /// The download did not finish within the configured timeout.
    #[error("Download of '{key}' timed out after {}", fmt_duration(.after))]
    Timeout { key: String, after: Duration },

    /// The key would resolve to a path outside the destination directory.
    #[error("Refusing to write key '{key}' outside the destination directory")]
    UnsafeKey { key: String },

    /// The job queue was closed before the lister finished.
    #[error("Job queue closed before listing completed")]
    QueueClosed,

    /// Every worker retired before all listed objects were processed.
    #[error("All {retired} workers retired before every listed object was processed")]
    WorkersExhausted { retired: usize },

    /// A worker task panicked or was aborted.
    #[error("Worker task failed: {0}")]
    WorkerPanicked(String),
}

impl SyncError {
    /// Whether this error ends the whole run rather than a single object.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SyncError::Download { .. } | SyncError::Timeout { .. } | SyncError::UnsafeKey { .. }
        )
    }
}

fn fmt_duration(d: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*d)
}

/// Result alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
