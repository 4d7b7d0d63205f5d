//! Local Filesystem Storage Backend
//!
//! Writes each block under `<root>/<stream>/<block_id>/`. The three
//! artifacts are written concurrently; each one goes to a `.tmp` sibling,
//! is fsynced, and is renamed into place, so a crash mid-write never
//! leaves a readable half-artifact. The first failing writer cancels its
//! peers through a shared child token, and the whole block directory is
//! removed before the error is returned.

use crate::backend::{StorageBackend, BLOCK_DATA_FILE, BLOCK_FILTER_FILE, BLOCK_META_FILE};
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use streamweaver_block::Block;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct LocalFilesystemStorage {
    root: PathBuf,
}

impl LocalFilesystemStorage {
    /// Open (and create if needed) the storage root directory.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn block_dir(&self, block: &Block) -> PathBuf {
        self.root.join(&block.stream_name).join(&block.block_id)
    }
}

/// Write `data` to `path` via a temp file: write, fsync, rename.
async fn write_artifact(ctx: CancellationToken, path: PathBuf, data: Bytes) -> Result<()> {
    let tmp_path = path.with_extension("tmp");

    let write = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    };

    tokio::select! {
        res = write => res,
        _ = ctx.cancelled() => {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            Err(StorageError::Cancelled)
        }
    }
}

async fn remove_block_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(dir = %dir.display(), error = %e, "Failed to clean up block directory");
        }
    }
}

#[async_trait]
impl StorageBackend for LocalFilesystemStorage {
    fn provider(&self) -> &'static str {
        "local"
    }

    async fn archive_block(&self, ctx: &CancellationToken, block: &Block) -> Result<()> {
        let block_dir = self.block_dir(block);
        tokio::fs::create_dir_all(&block_dir).await?;

        // One child token for the three sibling writers: the first failure
        // (or an outside cancellation) stops the others.
        let write_ctx = ctx.child_token();
        let artifacts = [
            (BLOCK_DATA_FILE, block.parquet.clone()),
            (BLOCK_FILTER_FILE, block.bloom.clone()),
            (BLOCK_META_FILE, block.meta.clone()),
        ];

        let mut writers = JoinSet::new();
        for (name, data) in artifacts {
            let path = block_dir.join(name);
            let token = write_ctx.clone();
            writers.spawn(async move {
                let result = write_artifact(token.clone(), path, data).await;
                if result.is_err() {
                    token.cancel();
                }
                result
            });
        }

        let mut first_error: Option<StorageError> = None;
        while let Some(joined) = writers.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(StorageError::Backend(e.to_string())));
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }

        if let Some(e) = first_error {
            remove_block_dir(&block_dir).await;
            return Err(e);
        }

        debug!(
            stream = %block.stream_name,
            block_id = %block.block_id,
            dir = %block_dir.display(),
            "Archived block to local filesystem"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_block() -> Block {
        Block {
            stream_name: "orders".to_string(),
            block_id: "block-aaaa".to_string(),
            parquet: Bytes::from_static(b"parquet-bytes"),
            bloom: Bytes::from_static(b"bloom-bytes"),
            meta: Bytes::from_static(b"{}"),
        }
    }

    #[tokio::test]
    async fn success_installs_all_three_artifacts() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFilesystemStorage::new(dir.path()).await.unwrap();
        let block = test_block();

        storage
            .archive_block(&CancellationToken::new(), &block)
            .await
            .unwrap();

        let block_dir = dir.path().join("orders").join("block-aaaa");
        for name in [BLOCK_DATA_FILE, BLOCK_FILTER_FILE, BLOCK_META_FILE] {
            let data = tokio::fs::read(block_dir.join(name)).await.unwrap();
            assert!(!data.is_empty());
        }
        // No temp files left behind.
        let mut entries = tokio::fs::read_dir(&block_dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert!(!entry.file_name().to_string_lossy().ends_with(".tmp"));
        }
    }

    #[tokio::test]
    async fn reinstalling_a_block_overwrites() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFilesystemStorage::new(dir.path()).await.unwrap();
        let block = test_block();
        let ctx = CancellationToken::new();

        storage.archive_block(&ctx, &block).await.unwrap();
        storage.archive_block(&ctx, &block).await.unwrap();

        let data = tokio::fs::read(
            dir.path()
                .join("orders")
                .join("block-aaaa")
                .join(BLOCK_DATA_FILE),
        )
        .await
        .unwrap();
        assert_eq!(data, b"parquet-bytes");
    }

    #[tokio::test]
    async fn failure_leaves_no_partial_block() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFilesystemStorage::new(dir.path()).await.unwrap();
        let block = test_block();

        // Occupy the block directory path with a plain file so directory
        // creation fails.
        tokio::fs::create_dir_all(dir.path().join("orders"))
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("orders").join("block-aaaa"), b"x")
            .await
            .unwrap();

        let err = storage
            .archive_block(&CancellationToken::new(), &block)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));

        // The conflicting file is still there, but no artifacts appeared.
        let meta = tokio::fs::metadata(dir.path().join("orders").join("block-aaaa"))
            .await
            .unwrap();
        assert!(meta.is_file());
    }

    #[tokio::test]
    async fn cancelled_context_aborts_the_write() {
        let dir = TempDir::new().unwrap();
        let storage = LocalFilesystemStorage::new(dir.path()).await.unwrap();
        let block = test_block();

        let ctx = CancellationToken::new();
        ctx.cancel();

        let err = storage.archive_block(&ctx, &block).await.unwrap_err();
        assert!(matches!(err, StorageError::Cancelled));
        assert!(!dir.path().join("orders").join("block-aaaa").exists());
    }
}
