//! Block Encoder
//!
//! Transforms an ordered batch of stream messages into a [`Block`]:
//! parquet payload, Bloom filter, and metadata JSON. The batch must be
//! nonempty and ascending by ID; the first and last IDs become the block
//! bounds and, hashed together, the block identity.

use crate::block::{Block, BlockMetadata, ParquetFooter};
use crate::bloom::BlockIdFilter;
use crate::error::{BlockError, Result};
use arrow::array::{ArrayRef, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use streamweaver_core::{timestamp_of, StreamMessage};

/// Derive a block's identity from its bounds.
///
/// `block-` + lowercase hex of SHA-256 over `"<end_id>-<start_id>"`;
/// distinct bound pairs yield distinct IDs, identical pairs the same ID.
pub fn generate_block_id(end_id: &str, start_id: &str) -> String {
    let digest = Sha256::digest(format!("{}-{}", end_id, start_id).as_bytes());
    format!("block-{}", hex_encode(&digest))
}

fn hex_encode(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

pub struct BlockEncoder;

impl BlockEncoder {
    /// Encode a batch into a block.
    ///
    /// `messages` must be nonempty and ordered ascending by ID. Any
    /// serialization failure fails the whole block; no partial artifacts
    /// escape this function.
    pub fn encode(stream_name: &str, messages: &[StreamMessage]) -> Result<Block> {
        let first = messages.first().ok_or(BlockError::EmptyBatch)?;
        let last = messages.last().ok_or(BlockError::EmptyBatch)?;

        // A block with unparseable bounds must never be emitted.
        let block_start_timestamp = timestamp_of(&first.id)?;
        let block_end_timestamp = timestamp_of(&last.id)?;
        let block_id = generate_block_id(&last.id, &first.id);

        let (parquet, footer) = Self::serialize_parquet(messages)?;

        let mut filter = BlockIdFilter::new(messages.len());
        for message in messages {
            filter.insert(&message.id);
        }
        let bloom = filter.to_bytes();

        let meta = BlockMetadata {
            stream_name: stream_name.to_string(),
            block_id: block_id.clone(),
            block_start_timestamp,
            block_end_timestamp,
            block_start_id: first.id.clone(),
            block_end_id: last.id.clone(),
            message_count: messages.len(),
            bloom_filter_size: bloom.len(),
            parquet_file_size: parquet.len(),
            parquet_footer: footer,
        };
        let meta_json = serde_json::to_vec(&meta)?;

        Ok(Block {
            stream_name: stream_name.to_string(),
            block_id,
            parquet: Bytes::from(parquet),
            bloom: Bytes::from(bloom),
            meta: Bytes::from(meta_json),
        })
    }

    /// Serialize the batch to an in-memory SNAPPY parquet buffer, capturing
    /// the file footer.
    fn serialize_parquet(messages: &[StreamMessage]) -> Result<(Vec<u8>, ParquetFooter)> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("message_id", DataType::Utf8, false),
            Field::new("data", DataType::Utf8, false),
        ]));

        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        let payloads: Vec<String> = messages.iter().map(|m| m.fields_json()).collect();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(ids)) as ArrayRef,
                Arc::new(StringArray::from(payloads)) as ArrayRef,
            ],
        )?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, Some(props))?;
        writer.write(&batch)?;
        let file_meta = writer.close()?;

        Ok((buf, ParquetFooter::from(&file_meta)))
    }
}
