//! Time-Based Retention Policy
//!
//! One enforcement pass walks every registered stream, computes the
//! stream's cutoff ID `"<now_ms - max_age_ms>-0"`, and applies its cleanup
//! policy: trim, archive, or archive-then-trim. For the combined policy
//! the trim is only issued after every block of the pass has been
//! acknowledged by cold storage, so a cold-store reader never observes a
//! gap.
//!
//! The archive scan is bounded: messages older than the cutoff are pulled
//! in batches of at most `batch_size`, each batch is encoded and persisted
//! before the next one is fetched, and the scan cursor advances as an
//! exclusive lower bound toward the fixed cutoff. That yields blocks in
//! strictly ascending ID order, covers every expired message exactly once,
//! and never re-reads.

use crate::archiver::Archiver;
use crate::error::{Result, RetentionError};
use crate::policy::RetentionPolicyRule;
use async_trait::async_trait;
use std::sync::Arc;
use streamweaver_core::{min_id_for_max_age, now_ms, timestamp_of};
use streamweaver_hotstore::{
    HotStoreError, StreamBackend, StreamMetadata, StreamMetadataService,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

pub struct TimeRetentionPolicy {
    backend: Arc<dyn StreamBackend>,
    metadata: Arc<StreamMetadataService>,
    archiver: Arc<Archiver>,
    batch_size: usize,
    ctx: CancellationToken,
}

impl TimeRetentionPolicy {
    pub fn new(
        backend: Arc<dyn StreamBackend>,
        metadata: Arc<StreamMetadataService>,
        archiver: Arc<Archiver>,
        batch_size: usize,
        ctx: CancellationToken,
    ) -> Self {
        Self {
            backend,
            metadata,
            archiver,
            batch_size: batch_size.max(1),
            ctx,
        }
    }

    /// Apply the stream's cleanup policy for one pass.
    async fn apply_to_stream(&self, stream_hash: &str) -> Result<()> {
        let meta = match self.metadata.get_stream_metadata(stream_hash).await {
            Ok(meta) => meta,
            Err(HotStoreError::MetadataNotFound(_)) => {
                warn!(stream_hash = %stream_hash, "No metadata for registered stream, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let min_id = min_id_for_max_age(now_ms(), meta.max_age_ms);
        debug!(
            stream = %meta.name,
            policy = %meta.cleanup_policy,
            min_id = %min_id,
            "Applying time retention policy"
        );

        if meta.cleanup_policy.archives() {
            self.archive_stream(&meta, &min_id).await?;
        }
        if meta.cleanup_policy.deletes() {
            self.trim_stream(&meta, &min_id).await?;
        }
        Ok(())
    }

    async fn trim_stream(&self, meta: &StreamMetadata, min_id: &str) -> Result<()> {
        let removed = self.backend.xtrim_min_id(&meta.name, min_id).await?;
        info!(
            stream = %meta.name,
            min_id = %min_id,
            messages_affected = removed,
            "Trimmed stream"
        );
        Ok(())
    }

    /// Count messages with a timestamp strictly below the cutoff, paging
    /// through the stream without holding more than one page in memory.
    async fn count_older_than(&self, stream: &str, cutoff_ms: i64) -> Result<usize> {
        let mut count = 0;
        let mut start = "-".to_string();
        loop {
            let page = self
                .backend
                .xrange(stream, &start, "+", self.batch_size)
                .await?;
            if page.is_empty() {
                break;
            }
            let mut crossed_cutoff = false;
            for message in &page {
                if timestamp_of(&message.id)? < cutoff_ms {
                    count += 1;
                } else {
                    crossed_cutoff = true;
                    break;
                }
            }
            if crossed_cutoff || page.len() < self.batch_size {
                break;
            }
            start = format!("({}", page.last().expect("nonempty page").id);
        }
        Ok(count)
    }

    /// Materialize every message below `min_id` into blocks of at most
    /// `batch_size` messages, awaiting each block's persistence before
    /// fetching the next batch.
    async fn archive_stream(&self, meta: &StreamMetadata, min_id: &str) -> Result<()> {
        let cutoff_ms = timestamp_of(min_id)?;
        let eligible = self.count_older_than(&meta.name, cutoff_ms).await?;
        if eligible == 0 {
            debug!(stream = %meta.name, "Nothing to archive");
            return Ok(());
        }
        debug!(
            stream = %meta.name,
            eligible,
            batch_size = self.batch_size,
            "Starting archive scan"
        );

        // Exclusive lower bound, advanced past each archived batch; the
        // exclusive upper bound stays pinned at the cutoff.
        let mut cursor = "-".to_string();
        let end = format!("({}", min_id);
        loop {
            if self.ctx.is_cancelled() {
                return Err(RetentionError::Storage(
                    streamweaver_storage::StorageError::Cancelled,
                ));
            }
            let batch = self
                .backend
                .xrange(&meta.name, &cursor, &end, self.batch_size)
                .await?;
            let Some(last) = batch.last() else {
                break;
            };
            let short_page = batch.len() < self.batch_size;
            cursor = format!("({}", last.id);

            self.archiver.archive(&self.ctx, &meta.name, &batch).await?;

            if short_page {
                break;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RetentionPolicyRule for TimeRetentionPolicy {
    async fn enforce(&self) -> Result<()> {
        let streams = self
            .metadata
            .list_streams()
            .await
            .map_err(|e| RetentionError::Enumeration(e.to_string()))?;
        debug!(count = streams.len(), "Enforcing time retention policy");

        for stream_hash in streams {
            if let Err(e) = self.apply_to_stream(&stream_hash).await {
                error!(
                    stream_hash = %stream_hash,
                    error = %e,
                    "Failed to apply time retention policy to stream"
                );
            }
        }
        Ok(())
    }
}
