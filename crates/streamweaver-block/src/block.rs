//! Block and Block Metadata Types

use bytes::Bytes;
use parquet::format;
use serde::{Deserialize, Serialize};

/// An encoded archival block, ready for cold storage.
///
/// Owned by the storage manager once enqueued; backends install all three
/// artifacts under `<stream>/<block_id>/` or none at all.
#[derive(Debug, Clone)]
pub struct Block {
    pub stream_name: String,
    pub block_id: String,
    /// Columnar payload (`data.parquet`).
    pub parquet: Bytes,
    /// Serialized Bloom filter over the payload's message IDs (`filter.bloom`).
    pub bloom: Bytes,
    /// Canonical JSON of [`BlockMetadata`] (`meta.json`).
    pub meta: Bytes,
}

/// Metadata describing one block, stored alongside it as `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockMetadata {
    pub stream_name: String,
    pub block_id: String,
    /// Millisecond timestamp of the first message.
    pub block_start_timestamp: i64,
    /// Millisecond timestamp of the last message.
    pub block_end_timestamp: i64,
    /// ID of the first message in the block.
    pub block_start_id: String,
    /// ID of the last message in the block.
    pub block_end_id: String,
    pub message_count: usize,
    pub bloom_filter_size: usize,
    pub parquet_file_size: usize,
    /// Captured parquet footer, for index-free seeking by readers.
    pub parquet_footer: ParquetFooter,
}

/// Serializable mirror of the parquet file footer.
///
/// The writer's native footer is a thrift structure without a serde
/// representation; this mirror keeps the parts a reader needs to locate row
/// groups and column chunks without parsing the file itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParquetFooter {
    pub version: i32,
    pub num_rows: i64,
    pub created_by: Option<String>,
    pub row_groups: Vec<RowGroupFooter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowGroupFooter {
    pub num_rows: i64,
    pub total_byte_size: i64,
    pub file_offset: Option<i64>,
    pub columns: Vec<ColumnChunkFooter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnChunkFooter {
    pub path: String,
    pub codec: String,
    pub num_values: i64,
    pub data_page_offset: i64,
    pub total_compressed_size: i64,
    pub total_uncompressed_size: i64,
}

fn codec_name(codec: format::CompressionCodec) -> String {
    match codec {
        format::CompressionCodec::UNCOMPRESSED => "UNCOMPRESSED",
        format::CompressionCodec::SNAPPY => "SNAPPY",
        format::CompressionCodec::GZIP => "GZIP",
        format::CompressionCodec::LZO => "LZO",
        format::CompressionCodec::BROTLI => "BROTLI",
        format::CompressionCodec::LZ4 => "LZ4",
        format::CompressionCodec::ZSTD => "ZSTD",
        format::CompressionCodec::LZ4_RAW => "LZ4_RAW",
        _ => "UNKNOWN",
    }
    .to_string()
}

impl From<&format::FileMetaData> for ParquetFooter {
    fn from(meta: &format::FileMetaData) -> Self {
        let row_groups = meta
            .row_groups
            .iter()
            .map(|rg| RowGroupFooter {
                num_rows: rg.num_rows,
                total_byte_size: rg.total_byte_size,
                file_offset: rg.file_offset,
                columns: rg
                    .columns
                    .iter()
                    .filter_map(|chunk| chunk.meta_data.as_ref())
                    .map(|col| ColumnChunkFooter {
                        path: col.path_in_schema.join("."),
                        codec: codec_name(col.codec),
                        num_values: col.num_values,
                        data_page_offset: col.data_page_offset,
                        total_compressed_size: col.total_compressed_size,
                        total_uncompressed_size: col.total_uncompressed_size,
                    })
                    .collect(),
            })
            .collect();

        ParquetFooter {
            version: meta.version,
            num_rows: meta.num_rows,
            created_by: meta.created_by.clone(),
            row_groups,
        }
    }
}
