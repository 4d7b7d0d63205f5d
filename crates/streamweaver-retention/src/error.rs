use streamweaver_block::BlockError;
use streamweaver_hotstore::HotStoreError;
use streamweaver_storage::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetentionError>;

#[derive(Debug, Error)]
pub enum RetentionError {
    /// Failure to enumerate the governed streams; the only error an
    /// enforcement pass itself returns.
    #[error("Failed to enumerate streams: {0}")]
    Enumeration(String),

    #[error("Hot store error: {0}")]
    HotStore(#[from] HotStoreError),

    #[error("Block encoding error: {0}")]
    Encode(#[from] BlockError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid message ID: {0}")]
    InvalidId(#[from] streamweaver_core::CoreError),

    #[error("Retention manager already started")]
    AlreadyStarted,
}
