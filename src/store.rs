//! Object storage abstraction consumed by the lister and the workers.

use crate::error::StoreError;
use crate::types::ObjectDescriptor;
use tokio::io::AsyncWrite;

/// One page of listing results.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Objects on this page, in listing order.
    pub objects: Vec<ObjectDescriptor>,
    /// Token for the next page; `None` once the listing is exhausted.
    pub next_token: Option<String>,
}

/// Remote object store operations needed to mirror a prefix.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches one page of objects under `prefix`.
    ///
    /// Pass `None` for the first page and the previous page's `next_token` after that.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage, StoreError>;

    /// Streams the full content of `key` into `dest`, returning the bytes written.
    async fn download(
        &self,
        bucket: &str,
        key: &str,
        dest: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, StoreError>;
}
