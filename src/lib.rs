//! s3sync - recursively download an object-storage prefix to a local directory
//!
//! A single lister walks the paginated bucket listing and hands each object
//! to a fixed pool of download workers through a synchronous job queue. The
//! run only returns once every handed-off object has been written to disk or
//! its failure reported.
//!
//! # Features
//!
//! - **Bounded Concurrency**: A fixed worker pool with backpressure on listing
//! - **Nested Keys**: Parent directories are created for slash-separated keys
//! - **Failure Policies**: Skip a failed object or retire its worker
//! - **Download Timeouts**: Optional per-object time limit
//! - **Pluggable Storage**: Any [`ObjectStore`]; [`S3Store`] covers S3, R2 and MinIO
//!
//! # Example
//!
//! ```no_run
//! use s3sync::{sync_prefix, S3Store, S3StoreConfig, SyncConfig, SyncTarget};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = S3Store::from_env(&S3StoreConfig::default()).await;
//! let target = SyncTarget::parse("s3://my-bucket/photos", "./photos")?;
//!
//! let summary = sync_prefix(Arc::new(store), target, &SyncConfig::default()).await?;
//! println!("Found {} objects to download.", summary.listed);
//! # Ok(())
//! # }
//! ```

mod download;
mod error;
mod lister;
mod orchestrator;
mod progress;
mod s3;
mod store;
mod types;

pub use error::{Result, StoreError, SyncError};
pub use lister::list_objects;
pub use orchestrator::sync_prefix;
pub use progress::SyncProgress;
pub use s3::{S3Store, S3StoreConfig, DEFAULT_REGION};
pub use store::{ListPage, ObjectStore};
pub use types::{
    DownloadFailurePolicy, ObjectDescriptor, SyncConfig, SyncSummary, SyncTarget,
    DEFAULT_CONCURRENCY,
};

// Re-export async_trait for store implementors
pub use async_trait::async_trait;
