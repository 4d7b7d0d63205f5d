//! Storage Provider Selection
//!
//! Configuration-driven construction of the cold-storage backend. The
//! provider is chosen once at startup; everything downstream only sees the
//! [`StorageBackend`] trait.

use crate::backend::StorageBackend;
use crate::error::Result;
use crate::local::LocalFilesystemStorage;
use crate::s3::{S3Options, S3Storage};
use std::path::PathBuf;
use std::sync::Arc;

/// Which cold-storage sink to use, with its provider-specific settings.
#[derive(Debug, Clone)]
pub enum StorageProviderConfig {
    Local { directory: PathBuf },
    S3(S3Options),
}

/// Build the configured storage backend.
pub async fn create_storage_backend(
    config: &StorageProviderConfig,
) -> Result<Arc<dyn StorageBackend>> {
    match config {
        StorageProviderConfig::Local { directory } => Ok(Arc::new(
            LocalFilesystemStorage::new(directory.clone()).await?,
        )),
        StorageProviderConfig::S3(options) => Ok(Arc::new(S3Storage::new(options)?)),
    }
}
