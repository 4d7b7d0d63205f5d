//! Pluggable Storage Backend Contract

use crate::error::Result;
use async_trait::async_trait;
use streamweaver_block::Block;
use tokio_util::sync::CancellationToken;

/// File names of the three artifacts inside a block directory/prefix.
pub const BLOCK_DATA_FILE: &str = "data.parquet";
pub const BLOCK_FILTER_FILE: &str = "filter.bloom";
pub const BLOCK_META_FILE: &str = "meta.json";

/// A cold-storage sink for archival blocks.
///
/// `archive_block` must be effectively atomic: after a successful return, a
/// reader enumerating `<stream>/<block_id>/` sees all three artifacts;
/// after an error, it sees none. The same `block_id` may be re-submitted
/// after a transient failure, so re-installing an existing block must be
/// overwrite-equivalent.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured provider (`local`, `s3`).
    fn provider(&self) -> &'static str;

    /// Durably install a block, honoring `ctx` for cancellation. Partially
    /// written artifacts must be cleaned up before returning an error.
    async fn archive_block(&self, ctx: &CancellationToken, block: &Block) -> Result<()>;
}
