//! Main orchestration logic for syncing a prefix to disk.

use crate::download::{run_worker, WorkerContext, WorkerExit};
use crate::error::{Result, SyncError};
use crate::lister::list_objects;
use crate::progress::SyncProgress;
use crate::store::ObjectStore;
use crate::types::{ObjectDescriptor, SyncConfig, SyncSummary, SyncTarget};
use std::sync::Arc;
use tracing::{error, info};

/// Downloads every object under the target prefix into the destination directory.
///
/// This is the main entry point. It performs the following steps:
///
/// 1. Creates the destination root
/// 2. Starts `config.concurrency` workers on a shared job queue
/// 3. Lists the prefix on the calling task, handing each object to a worker
/// 4. Closes the queue and waits for every worker to drain
///
/// Objects already handed off are always finished before an error is
/// returned, even when listing failed part way through.
///
/// # Returns
///
/// The run summary, or the first fatal error. A worker's fatal error takes
/// precedence over a listing error. If every worker retired before the queue
/// was drained, the run fails with [`SyncError::WorkersExhausted`].
///
/// # Example
///
/// ```no_run
/// use s3sync::{sync_prefix, S3Store, S3StoreConfig, SyncConfig, SyncTarget};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = S3Store::from_env(&S3StoreConfig::default()).await;
/// let target = SyncTarget::parse("s3://my-bucket/logs", "./logs")?;
/// let summary = sync_prefix(Arc::new(store), target, &SyncConfig::default()).await?;
/// println!("Found {} objects to download.", summary.listed);
/// # Ok(())
/// # }
/// ```
pub async fn sync_prefix(
    store: Arc<dyn ObjectStore>,
    target: SyncTarget,
    config: &SyncConfig,
) -> Result<SyncSummary> {
    if config.concurrency == 0 {
        return Err(SyncError::InvalidConfig(
            "concurrency must be at least 1".to_string(),
        ));
    }

    tokio::fs::create_dir_all(&target.dest_dir)
        .await
        .map_err(|source| SyncError::CreateDir {
            path: target.dest_dir.clone(),
            source,
        })?;

    let progress = Arc::new(if config.show_progress {
        SyncProgress::new()
    } else {
        SyncProgress::hidden()
    });
    let target = Arc::new(target);

    // async-channel rejects a zero capacity; one slot keeps the handoff
    // as close to synchronous as the channel allows
    let (jobs_tx, jobs_rx) = async_channel::bounded::<ObjectDescriptor>(1);

    let ctx = WorkerContext::new(store.clone(), target.clone(), progress.clone(), config);
    let workers: Vec<_> = (1..=config.concurrency)
        .map(|id| tokio::spawn(run_worker(id, ctx.clone(), jobs_rx.clone())))
        .collect();
    // Only workers may hold receivers, so the queue closes itself if they all stop
    drop(jobs_rx);

    info!("Started {} download workers", config.concurrency);

    let listing = list_objects(store.as_ref(), &target, &jobs_tx, &progress).await;
    jobs_tx.close();
    drop(jobs_tx);

    let mut retired_workers = 0;
    let mut worker_error: Option<SyncError> = None;
    for result in futures_util::future::join_all(workers).await {
        match result {
            Ok(Ok(WorkerExit::Drained)) => {}
            Ok(Ok(WorkerExit::Retired)) => retired_workers += 1,
            Ok(Err(e)) => {
                worker_error.get_or_insert(e);
            }
            Err(e) => {
                error!("Worker task join error: {}", e);
                worker_error.get_or_insert(SyncError::WorkerPanicked(e.to_string()));
            }
        }
    }

    let summary = progress.finish(retired_workers);

    if let Some(e) = worker_error {
        return Err(e);
    }

    // Descriptors can be left on the queue once every worker has retired,
    // whether the lister noticed (closed queue) or had already finished
    let unprocessed = summary
        .listed
        .saturating_sub(summary.downloaded + summary.failed);
    if matches!(listing, Err(SyncError::QueueClosed)) || unprocessed > 0 {
        error!(
            "All {} workers retired with {} listed objects unprocessed",
            retired_workers, unprocessed
        );
        return Err(SyncError::WorkersExhausted {
            retired: retired_workers,
        });
    }
    listing?;

    info!(
        "Sync finished: {} listed, {} downloaded, {} failed, {} bytes",
        summary.listed, summary.downloaded, summary.failed, summary.bytes
    );
    Ok(summary)
}
