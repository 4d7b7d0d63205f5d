//! S3 Storage Backend
//!
//! Writes block artifacts as objects under
//! `<stream>/<block_id>/{data.parquet,filter.bloom,meta.json}`. Object
//! stores give atomicity per object, not per prefix, so the three-artifact
//! contract is met by ordering: the two payload objects go first
//! (concurrently), and `meta.json` is written last as the commit marker.
//! A reader that finds a block prefix without `meta.json` treats it as
//! uncommitted. On failure anything already written is deleted best-effort.

use crate::backend::{StorageBackend, BLOCK_DATA_FILE, BLOCK_FILTER_FILE, BLOCK_META_FILE};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::sync::Arc;
use streamweaver_block::Block;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Connection settings for the S3 provider.
#[derive(Debug, Clone)]
pub struct S3Options {
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_access_key: String,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint: Option<String>,
}

pub struct S3Storage {
    store: Arc<dyn ObjectStore>,
}

impl S3Storage {
    pub fn new(options: &S3Options) -> Result<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_region(&options.region)
            .with_bucket_name(&options.bucket)
            .with_access_key_id(&options.access_key)
            .with_secret_access_key(&options.secret_access_key);
        if let Some(endpoint) = &options.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }
        Ok(Self {
            store: Arc::new(builder.build()?),
        })
    }

    /// Wrap an already-built object store (used by tests).
    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    fn artifact_path(block: &Block, name: &str) -> ObjectPath {
        ObjectPath::from(format!(
            "{}/{}/{}",
            block.stream_name, block.block_id, name
        ))
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    fn provider(&self) -> &'static str {
        "s3"
    }

    async fn archive_block(&self, ctx: &CancellationToken, block: &Block) -> Result<()> {
        let data_path = Self::artifact_path(block, BLOCK_DATA_FILE);
        let filter_path = Self::artifact_path(block, BLOCK_FILTER_FILE);
        let meta_path = Self::artifact_path(block, BLOCK_META_FILE);

        let upload = async {
            // Payload objects first; meta.json last is the commit point.
            futures::try_join!(
                self.store
                    .put(&data_path, PutPayload::from(block.parquet.clone())),
                self.store
                    .put(&filter_path, PutPayload::from(block.bloom.clone())),
            )?;
            self.store
                .put(&meta_path, PutPayload::from(block.meta.clone()))
                .await?;
            Ok::<_, StorageError>(())
        };

        let result = tokio::select! {
            res = upload => res,
            _ = ctx.cancelled() => Err(StorageError::Cancelled),
        };

        if let Err(e) = result {
            for path in [&meta_path, &data_path, &filter_path] {
                if let Err(cleanup_err) = self.store.delete(path).await {
                    if !matches!(cleanup_err, object_store::Error::NotFound { .. }) {
                        warn!(path = %path, error = %cleanup_err, "Failed to clean up block object");
                    }
                }
            }
            return Err(e);
        }

        debug!(
            stream = %block.stream_name,
            block_id = %block.block_id,
            "Archived block to object store"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use object_store::memory::InMemory;

    fn test_block() -> Block {
        Block {
            stream_name: "orders".to_string(),
            block_id: "block-bbbb".to_string(),
            parquet: Bytes::from_static(b"parquet-bytes"),
            bloom: Bytes::from_static(b"bloom-bytes"),
            meta: Bytes::from_static(b"{}"),
        }
    }

    #[tokio::test]
    async fn success_installs_all_three_objects() {
        let store = Arc::new(InMemory::new());
        let storage = S3Storage::with_store(store.clone());
        let block = test_block();

        storage
            .archive_block(&CancellationToken::new(), &block)
            .await
            .unwrap();

        for name in [BLOCK_DATA_FILE, BLOCK_FILTER_FILE, BLOCK_META_FILE] {
            let path = ObjectPath::from(format!("orders/block-bbbb/{}", name));
            store.get(&path).await.unwrap();
        }
    }

    #[tokio::test]
    async fn cancelled_context_cleans_up() {
        let store = Arc::new(InMemory::new());
        let storage = S3Storage::with_store(store.clone());
        let block = test_block();

        let ctx = CancellationToken::new();
        ctx.cancel();

        let err = storage.archive_block(&ctx, &block).await.unwrap_err();
        assert!(matches!(err, StorageError::Cancelled));

        let listed: Vec<_> = {
            use futures::TryStreamExt;
            store.list(None).try_collect().await.unwrap()
        };
        assert!(listed.is_empty(), "no objects should remain: {:?}", listed);
    }
}
