//! StreamWeaver Hot-Store Adapter
//!
//! Typed façade over the online stream store. The rest of the broker is
//! written against the [`StreamBackend`] trait only: an append-only stream
//! type keyed by `<ms>-<seq>` IDs, plus a hash-KV area (stream metadata)
//! and sets (stream registry, cleanup buckets).
//!
//! This crate performs no retries; errors distinguish a missing stream
//! ([`HotStoreError::StreamNotFound`]) from transport failures so callers
//! can map them to the right behavior (skip vs. surface).
//!
//! [`MemoryStreamBackend`] is the reference implementation; a client for an
//! external store implements the same trait and is swapped in at wiring
//! time.

pub mod error;
pub mod keys;
pub mod memory;
pub mod metadata;
pub mod service;
pub mod types;

pub use error::{HotStoreError, Result};
pub use memory::MemoryStreamBackend;
pub use metadata::StreamMetadataService;
pub use service::{PublishResult, StreamService};
pub use types::{
    CleanupPolicy, CreateStreamParams, RetentionDefaults, StreamInfo, StreamMetadata,
};

use async_trait::async_trait;
use std::collections::HashMap;
use streamweaver_core::StreamMessage;

/// Operations the broker needs from the hot store.
///
/// Range bounds follow the hot store's conventions: `-` is the minimum ID,
/// `+` the maximum, a bare ID is inclusive, and a `(`-prefixed ID is
/// exclusive.
#[async_trait]
pub trait StreamBackend: Send + Sync {
    /// Append a message. `id` is normally `None` (the store assigns the
    /// next ID); an explicit ID must be strictly greater than the last one.
    async fn xadd(
        &self,
        stream: &str,
        id: Option<&str>,
        fields: HashMap<String, String>,
    ) -> Result<String>;

    /// Delete messages by ID, returning how many existed.
    async fn xdel(&self, stream: &str, ids: &[String]) -> Result<u64>;

    /// Stream summary. Returns [`HotStoreError::StreamNotFound`] for a
    /// missing stream; an existing-but-empty stream is not an error.
    async fn xinfo(&self, stream: &str) -> Result<StreamInfo>;

    /// Ascending range query bounded by `count` (0 means unbounded).
    async fn xrange(
        &self,
        stream: &str,
        start: &str,
        end: &str,
        count: usize,
    ) -> Result<Vec<StreamMessage>>;

    /// Delete every message with an ID strictly below `min_id`; returns the
    /// number removed.
    async fn xtrim_min_id(&self, stream: &str, min_id: &str) -> Result<u64>;

    /// Merge fields into a hash at `key`.
    async fn hset(&self, key: &str, fields: HashMap<String, String>) -> Result<()>;

    /// All fields of the hash at `key`; empty map when absent.
    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Add `member` to the set at `key`; true when newly added.
    async fn sadd(&self, key: &str, member: &str) -> Result<bool>;

    /// Members of the set at `key`; empty when absent.
    async fn smembers(&self, key: &str) -> Result<Vec<String>>;
}
