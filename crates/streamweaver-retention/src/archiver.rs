//! Batch Archiver
//!
//! Bridges the retention policy and cold storage: encodes one batch of
//! expired messages into a block and submits it to the storage manager,
//! returning only once the block is durably installed (or failed for
//! good). Submissions are synchronous with respect to the caller, which
//! keeps at most one batch in flight per stream.

use crate::error::Result;
use std::sync::Arc;
use streamweaver_block::BlockEncoder;
use streamweaver_core::StreamMessage;
use streamweaver_storage::StorageManager;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct Archiver {
    storage: Arc<StorageManager>,
}

impl Archiver {
    pub fn new(storage: Arc<StorageManager>) -> Self {
        Self { storage }
    }

    /// Encode `messages` into a block and persist it.
    ///
    /// An empty batch is a no-op; callers shouldn't produce one, but it is
    /// not worth failing a whole stream over.
    pub async fn archive(
        &self,
        ctx: &CancellationToken,
        stream_name: &str,
        messages: &[StreamMessage],
    ) -> Result<()> {
        if messages.is_empty() {
            warn!(stream = %stream_name, "No messages to archive");
            return Ok(());
        }

        let block = BlockEncoder::encode(stream_name, messages)?;
        let block_id = block.block_id.clone();
        let message_count = messages.len();

        self.storage.submit(ctx, block).await?;

        info!(
            stream = %stream_name,
            block_id = %block_id,
            message_count,
            "Archived block"
        );
        Ok(())
    }
}
