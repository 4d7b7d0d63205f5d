//! StreamWeaver Core Types
//!
//! Shared building blocks for the broker: the `StreamMessage` record type,
//! message-ID parsing and arithmetic over the `<ms-epoch>-<seq>` ID space,
//! stream-name hashing, and payload field parsing.
//!
//! Everything here is deliberately dependency-light; the heavier subsystems
//! (hot-store adapter, block encoder, storage manager) build on these types.

pub mod error;
pub mod hash;
pub mod id;
pub mod message;

pub use error::{CoreError, Result};
pub use hash::hash_stream_name;
pub use id::{min_id_for_max_age, now_ms, parse_time_unit, timestamp_of, MessageId};
pub use message::{parse_payload_fields, StreamMessage};
