//! Hot-store key layout for broker bookkeeping.
//!
//! The braces in the metadata prefix force keys with the same tag into one
//! cluster slot when the hot store is sharded.

/// Prefix for per-stream metadata hashes; the stream-name hash is appended.
pub const STREAM_METADATA_PREFIX: &str = "{streamweaver_stream_metadata}:";

/// Set of all known stream-name hashes.
pub const STREAM_REGISTRY_KEY: &str = "stream_registry";

pub const CLEANUP_BUCKET_DELETE: &str = "stream_cleanup_bucket:delete";
pub const CLEANUP_BUCKET_ARCHIVE: &str = "stream_cleanup_bucket:archive";
pub const CLEANUP_BUCKET_DELETE_ARCHIVE: &str = "stream_cleanup_bucket:delete_archive";

/// Metadata hash key for a stream-name hash.
pub fn metadata_key(stream_hash: &str) -> String {
    format!("{}{}", STREAM_METADATA_PREFIX, stream_hash)
}
