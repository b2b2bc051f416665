//! [`ObjectStore`] backed by the AWS S3 SDK.
//!
//! Works against AWS itself and S3-compatible services (R2, MinIO) via
//! `endpoint_url` and path-style addressing.

use crate::error::StoreError;
use crate::store::{ListPage, ObjectStore};
use crate::types::ObjectDescriptor;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::Client;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Client settings for [`S3Store`].
#[derive(Debug, Clone)]
pub struct S3StoreConfig {
    pub region: String,
    /// Custom endpoint for S3-compatible services.
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    /// Keys requested per listing page; the service default (1000) when unset.
    pub page_size: Option<i32>,
}

impl Default for S3StoreConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            force_path_style: false,
            page_size: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct S3Store {
    client: Client,
    page_size: Option<i32>,
}

impl S3Store {
    /// Builds a client from the ambient AWS configuration (credentials chain,
    /// profile) with the overrides in `config` applied.
    pub async fn from_env(config: &S3StoreConfig) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint_url) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        Self::with_client(Client::from_conf(builder.build()), config.page_size)
    }

    pub fn with_client(client: Client, page_size: Option<i32>) -> Self {
        Self { client, page_size }
    }
}

fn sdk_error<E: std::error::Error>(err: E) -> StoreError {
    DisplayErrorContext(err).to_string().into()
}

/// Converts one `ListObjectsV2` response into a [`ListPage`].
///
/// Keys ending in `/` are dropped whatever their size, since a path ending in
/// a separator cannot be written as a file. The continuation token is only
/// kept while the response says it is truncated.
fn page_from_response(response: &ListObjectsV2Output) -> ListPage {
    let objects = response
        .contents()
        .iter()
        .filter_map(|obj| {
            let key = obj.key()?;
            if key.ends_with('/') {
                debug!("Skipping directory marker {}", key);
                return None;
            }
            Some(ObjectDescriptor::new(
                key,
                obj.size().unwrap_or(0).max(0) as u64,
            ))
        })
        .collect();

    let next_token = if response.is_truncated().unwrap_or(false) {
        response.next_continuation_token().map(str::to_string)
    } else {
        None
    };

    ListPage {
        objects,
        next_token,
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> Result<ListPage, StoreError> {
        let mut request = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
        if let Some(max_keys) = self.page_size {
            request = request.max_keys(max_keys);
        }
        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(sdk_error)?;
        Ok(page_from_response(&response))
    }

    async fn download(
        &self,
        bucket: &str,
        key: &str,
        dest: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, StoreError> {
        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(sdk_error)?;

        let mut body = object.body;
        let mut written = 0u64;
        while let Some(chunk) = body.try_next().await? {
            dest.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        dest.flush().await?;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::types::Object;

    fn object(key: &str, size: i64) -> Object {
        Object::builder().key(key).size(size).build()
    }

    #[test]
    fn test_truncated_page_keeps_token_and_skips_markers() {
        let response = ListObjectsV2Output::builder()
            .contents(object("logs/", 0))
            .contents(object("logs/a.txt", 12))
            .contents(object("logs/sub/", 7))
            .contents(object("logs/sub/b.txt", 3))
            .is_truncated(true)
            .next_continuation_token("page-2")
            .build();

        let page = page_from_response(&response);

        assert_eq!(
            page.objects,
            vec![
                ObjectDescriptor::new("logs/a.txt", 12),
                ObjectDescriptor::new("logs/sub/b.txt", 3),
            ]
        );
        assert_eq!(page.next_token.as_deref(), Some("page-2"));
    }

    #[test]
    fn test_last_page_drops_stray_token() {
        let response = ListObjectsV2Output::builder()
            .contents(object("a", 1))
            .is_truncated(false)
            .next_continuation_token("ignored")
            .build();

        let page = page_from_response(&response);
        assert_eq!(page.objects.len(), 1);
        assert!(page.next_token.is_none());
    }

    #[test]
    fn test_missing_or_negative_sizes_become_zero() {
        let response = ListObjectsV2Output::builder()
            .contents(object("neg", -5))
            .contents(Object::builder().key("unsized").build())
            .contents(Object::builder().size(9).build())
            .build();

        let page = page_from_response(&response);

        assert_eq!(
            page.objects,
            vec![
                ObjectDescriptor::new("neg", 0),
                ObjectDescriptor::new("unsized", 0),
            ]
        );
        assert!(page.next_token.is_none());
    }
}
