use streamweaver_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BlockError>;

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("Cannot encode an empty batch")]
    EmptyBatch,

    #[error("Unparseable block bounds: {0}")]
    InvalidBounds(#[from] CoreError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bloom filter error: {0}")]
    Filter(String),
}
