//! Storage Error Types
//!
//! Errors are split along the retry boundary: transient failures (I/O,
//! object-store transport) are retried by the storage manager under
//! backoff; everything else is surfaced immediately.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("No storage backend registered")]
    NoBackendRegistered,

    #[error("Storage manager is not running")]
    NotStarted,

    #[error("Storage manager already started")]
    AlreadyStarted,

    #[error("Storage task queue is full")]
    QueueFull,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Block write failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Permanent backend error: {0}")]
    Permanent(String),
}

impl StorageError {
    /// Whether the storage manager should retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StorageError::Io(_) | StorageError::ObjectStore(_) | StorageError::Backend(_)
        )
    }
}
