//! StreamWeaver Retention
//!
//! The retention pipeline: a manager ticks on an interval and runs each
//! registered policy's enforcement pass; the time-based policy walks the
//! stream registry, archives expired messages through the
//! [`Archiver`] into cold storage, and trims the hot store once the
//! archive is acknowledged.

pub mod archiver;
pub mod error;
pub mod manager;
pub mod policy;
pub mod time;

pub use archiver::Archiver;
pub use error::{Result, RetentionError};
pub use manager::{RetentionManager, RetentionManagerConfig};
pub use policy::{PolicyEntry, RetentionPolicyRule};
pub use time::{TimeRetentionPolicy, DEFAULT_BATCH_SIZE};
