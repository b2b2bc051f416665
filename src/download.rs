//! Download workers: pull descriptors off the job queue and write them to disk.

use crate::error::{Result, StoreError, SyncError};
use crate::progress::SyncProgress;
use crate::store::ObjectStore;
use crate::types::{DownloadFailurePolicy, ObjectDescriptor, SyncConfig, SyncTarget};
use async_channel::Receiver;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, warn};

/// How a worker left its loop without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerExit {
    /// The queue was closed and drained.
    Drained,
    /// A download failed under [`DownloadFailurePolicy::RetireWorker`].
    Retired,
}

/// Shared state handed to every worker.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub store: Arc<dyn ObjectStore>,
    pub target: Arc<SyncTarget>,
    pub progress: Arc<SyncProgress>,
    pub on_download_error: DownloadFailurePolicy,
    pub download_timeout: Option<Duration>,
}

impl WorkerContext {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        target: Arc<SyncTarget>,
        progress: Arc<SyncProgress>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            target,
            progress,
            on_download_error: config.on_download_error,
            download_timeout: config.download_timeout,
        }
    }
}

/// Maps an object key onto a path under `dest_dir`.
///
/// Keys with `..`, absolute or drive components are rejected so nothing is
/// written outside the destination tree.
pub(crate) fn local_path(dest_dir: &Path, key: &str) -> Result<PathBuf> {
    let relative = Path::new(key);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if key.is_empty() || escapes {
        return Err(SyncError::UnsafeKey {
            key: key.to_string(),
        });
    }
    Ok(dest_dir.join(relative))
}

/// Downloads one object into its file under the destination root.
///
/// Parent directories are created as needed. The file is truncated if it
/// already exists and removed again if the transfer fails.
///
/// # Returns
///
/// Bytes written on success. Directory and file creation failures come back
/// as fatal errors; transfer failures and timeouts as per-object ones.
pub(crate) async fn download_object(
    store: &dyn ObjectStore,
    target: &SyncTarget,
    object: &ObjectDescriptor,
    timeout: Option<Duration>,
) -> Result<u64> {
    let path = local_path(&target.dest_dir, &object.key)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| SyncError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let file = tokio::fs::File::create(&path)
        .await
        .map_err(|source| SyncError::CreateFile {
            path: path.clone(),
            source,
        })?;
    let mut writer = BufWriter::new(file);

    let transfer = async {
        let written = store
            .download(&target.bucket, &object.key, &mut writer)
            .await?;
        writer.flush().await?;
        Ok::<u64, StoreError>(written)
    };

    let result = match timeout {
        Some(after) => match tokio::time::timeout(after, transfer).await {
            Ok(outcome) => outcome.map_err(|source| SyncError::Download {
                key: object.key.clone(),
                source,
            }),
            Err(_) => Err(SyncError::Timeout {
                key: object.key.clone(),
                after,
            }),
        },
        None => transfer.await.map_err(|source| SyncError::Download {
            key: object.key.clone(),
            source,
        }),
    };

    if result.is_err() {
        drop(writer);
        // Leave no truncated file behind
        let _ = tokio::fs::remove_file(&path).await;
    }

    result
}

/// Worker loop: downloads descriptors until the queue is closed and empty.
///
/// A fatal error closes the queue so the lister stops producing, then returns
/// the error. A per-object failure is counted and either skipped or retires
/// this worker, depending on the configured policy.
pub(crate) async fn run_worker(
    id: usize,
    ctx: WorkerContext,
    jobs: Receiver<ObjectDescriptor>,
) -> Result<WorkerExit> {
    debug!("Worker {} started", id);

    while let Ok(object) = jobs.recv().await {
        match download_object(
            ctx.store.as_ref(),
            &ctx.target,
            &object,
            ctx.download_timeout,
        )
        .await
        {
            Ok(bytes) => {
                let done = ctx.progress.record_download(bytes);
                info!(
                    "worker {} downloaded {} ({} bytes), {} objects done",
                    id, object.key, bytes, done
                );
            }
            Err(e) if e.is_fatal() => {
                error!("Worker {} aborting sync: {}", id, e);
                jobs.close();
                return Err(e);
            }
            Err(e) => {
                ctx.progress.record_failure();
                warn!("Worker {}: {}", id, e);
                if ctx.on_download_error == DownloadFailurePolicy::RetireWorker {
                    warn!("Worker {} retiring after failed download", id);
                    return Ok(WorkerExit::Retired);
                }
            }
        }
    }

    debug!("Worker {} drained", id);
    Ok(WorkerExit::Drained)
}
