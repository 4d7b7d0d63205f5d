use streamweaver_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HotStoreError>;

#[derive(Debug, Error)]
pub enum HotStoreError {
    /// Sentinel for a missing stream; callers must be able to tell this
    /// apart from a stream that merely has no entries.
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Stream metadata not found: {0}")]
    MetadataNotFound(String),

    #[error("Invalid stream metadata field {field}: {value}")]
    InvalidMetadataField { field: String, value: String },

    #[error("Invalid cleanup policy: {0}")]
    InvalidCleanupPolicy(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid message ID: {0}")]
    InvalidId(#[from] CoreError),

    #[error("Hot store error: {0}")]
    Backend(String),
}
