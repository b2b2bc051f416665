//! Paginated enumeration of a bucket prefix into the job queue.

use crate::error::{Result, SyncError};
use crate::progress::SyncProgress;
use crate::store::ObjectStore;
use crate::types::{ObjectDescriptor, SyncTarget};
use async_channel::Sender;
use tracing::{debug, error, info};

/// Walks every listing page under the target prefix and sends each object to `jobs`.
///
/// Sends block until a worker takes the descriptor, so enumeration never runs
/// ahead of the pool. The page's count is added to `progress` once the whole
/// page has been handed off.
///
/// # Returns
///
/// The total number of objects listed, or the first listing error. A failed
/// page stops enumeration; nothing is retried.
pub async fn list_objects(
    store: &dyn ObjectStore,
    target: &SyncTarget,
    jobs: &Sender<ObjectDescriptor>,
    progress: &SyncProgress,
) -> Result<u64> {
    info!(
        "Looking for objects in bucket: {}, prefix: {}",
        target.bucket, target.prefix
    );

    let mut token: Option<String> = None;
    let mut page_number = 0u64;

    loop {
        page_number += 1;
        let page = store
            .list_page(&target.bucket, &target.prefix, token.take())
            .await
            .map_err(|e| {
                error!("Listing page {} failed: {}", page_number, e);
                SyncError::Listing(e)
            })?;

        let count = page.objects.len() as u64;
        for object in page.objects {
            jobs.send(object)
                .await
                .map_err(|_| SyncError::QueueClosed)?;
        }

        let total = progress.record_listed(count);
        debug!(
            "Listed page {} ({} objects, {} so far)",
            page_number, count, total
        );

        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }

    Ok(progress.listed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::ListPage;
    use std::sync::Mutex;
    use tokio::io::AsyncWrite;

    /// Serves fixed pages and records the tokens it was asked for.
    struct PagedStore {
        pages: Vec<Vec<ObjectDescriptor>>,
        fail_on_page: Option<usize>,
        seen_tokens: Mutex<Vec<Option<String>>>,
    }

    impl PagedStore {
        fn new(pages: Vec<Vec<ObjectDescriptor>>) -> Self {
            Self {
                pages,
                fail_on_page: None,
                seen_tokens: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ObjectStore for PagedStore {
        async fn list_page(
            &self,
            _bucket: &str,
            _prefix: &str,
            continuation_token: Option<String>,
        ) -> std::result::Result<ListPage, StoreError> {
            self.seen_tokens
                .lock()
                .unwrap()
                .push(continuation_token.clone());
            let index = continuation_token
                .map(|t| t.parse::<usize>().unwrap())
                .unwrap_or(0);
            if self.fail_on_page == Some(index) {
                return Err("access denied".into());
            }
            let next_token = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
            Ok(ListPage {
                objects: self.pages[index].clone(),
                next_token,
            })
        }

        async fn download(
            &self,
            _bucket: &str,
            _key: &str,
            _dest: &mut (dyn AsyncWrite + Send + Unpin),
        ) -> std::result::Result<u64, StoreError> {
            unreachable!("lister never downloads")
        }
    }

    fn target() -> SyncTarget {
        SyncTarget::parse("s3://bucket/prefix", "out").unwrap()
    }

    fn page(keys: &[&str]) -> Vec<ObjectDescriptor> {
        keys.iter().map(|k| ObjectDescriptor::new(*k, 1)).collect()
    }

    #[tokio::test]
    async fn test_lists_every_page_in_order() {
        let store = PagedStore::new(vec![page(&["a", "b"]), page(&["c"]), page(&["d", "e"])]);
        let (tx, rx) = async_channel::unbounded();
        let progress = SyncProgress::hidden();

        let total = list_objects(&store, &target(), &tx, &progress).await.unwrap();
        tx.close();

        assert_eq!(total, 5);
        assert_eq!(progress.listed(), 5);
        let mut keys = Vec::new();
        while let Ok(object) = rx.recv().await {
            keys.push(object.key);
        }
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(
            *store.seen_tokens.lock().unwrap(),
            vec![None, Some("1".to_string()), Some("2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_listing_is_not_an_error() {
        let store = PagedStore::new(vec![vec![]]);
        let (tx, _rx) = async_channel::unbounded();
        let progress = SyncProgress::hidden();

        let total = list_objects(&store, &target(), &tx, &progress).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_stops_on_first_failed_page() {
        let mut store = PagedStore::new(vec![page(&["a", "b"]), page(&["c"]), page(&["d"])]);
        store.fail_on_page = Some(1);
        let (tx, rx) = async_channel::unbounded();
        let progress = SyncProgress::hidden();

        let result = list_objects(&store, &target(), &tx, &progress).await;

        assert!(matches!(result, Err(SyncError::Listing(_))));
        assert_eq!(progress.listed(), 2);
        assert_eq!(rx.len(), 2);
        assert_eq!(store.seen_tokens.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_closed_queue_stops_listing() {
        let store = PagedStore::new(vec![page(&["a", "b"])]);
        let (tx, rx) = async_channel::bounded(1);
        rx.close();
        let progress = SyncProgress::hidden();

        let result = list_objects(&store, &target(), &tx, &progress).await;
        assert!(matches!(result, Err(SyncError::QueueClosed)));
    }
}
