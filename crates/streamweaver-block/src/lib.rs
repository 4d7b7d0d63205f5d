//! StreamWeaver Block Encoding
//!
//! A *block* is the immutable archival unit for one stream: a batch of
//! messages serialized into three artifacts that travel together to cold
//! storage:
//!
//! 1. `data.parquet`: columnar payload (`message_id`, `data`), SNAPPY
//!    compressed
//! 2. `filter.bloom`: Bloom filter over the message IDs in the payload
//! 3. `meta.json`: block metadata, including the captured parquet footer
//!    so readers can seek without re-parsing the file
//!
//! [`BlockEncoder::encode`] turns an ordered, nonempty batch into a
//! [`Block`]; any serialization failure fails the whole block, and partial
//! blocks are never produced.

pub mod block;
pub mod bloom;
pub mod encoder;
pub mod error;

pub use block::{Block, BlockMetadata, ColumnChunkFooter, ParquetFooter, RowGroupFooter};
pub use bloom::BlockIdFilter;
pub use encoder::{generate_block_id, BlockEncoder};
pub use error::{BlockError, Result};
