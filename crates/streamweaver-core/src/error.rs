use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid stream message ID: {0}")]
    InvalidMessageId(String),

    #[error("Invalid time unit string: {0} (use <n>d for days or <n>h for hours)")]
    InvalidTimeUnit(String),
}
