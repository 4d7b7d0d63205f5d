//! Bloom Filter over Block Message IDs
//!
//! Each block carries a Bloom filter of the message IDs it contains, sized
//! for the batch at a 1% false-positive rate. Readers use it to skip blocks
//! that definitely do not contain a wanted ID; a `true` answer still means
//! "maybe", never "certainly".
//!
//! The serialized form is a small versioned envelope around the filter's
//! parameters and bitmap, so a reader can reconstruct the exact filter:
//!
//! ```text
//! [version u8][item_count u64][num_bits u64][num_hashes u32][sip_keys 4x u64][bitmap]
//! ```
//!
//! All integers are little-endian.

use crate::error::{BlockError, Result};
use bloomfilter::Bloom;

const FORMAT_VERSION: u8 = 1;
const FALSE_POSITIVE_RATE: f64 = 0.01;
const HEADER_LEN: usize = 1 + 8 + 8 + 4 + 32;

fn read_u64(data: &[u8], cursor: &mut usize) -> u64 {
    let value = u64::from_le_bytes(data[*cursor..*cursor + 8].try_into().unwrap());
    *cursor += 8;
    value
}

/// Bloom filter over the message IDs of a single block.
pub struct BlockIdFilter {
    bloom: Bloom<[u8]>,
    item_count: u64,
}

impl BlockIdFilter {
    /// Create a filter sized for `expected_items` at a 1% FPR.
    pub fn new(expected_items: usize) -> Self {
        Self {
            bloom: Bloom::new_for_fp_rate(expected_items.max(1), FALSE_POSITIVE_RATE),
            item_count: 0,
        }
    }

    pub fn insert(&mut self, message_id: &str) {
        self.bloom.set(message_id.as_bytes());
        self.item_count += 1;
    }

    /// `false` means the ID is definitely absent; `true` means it may be
    /// present.
    pub fn might_contain(&self, message_id: &str) -> bool {
        self.bloom.check(message_id.as_bytes())
    }

    pub fn item_count(&self) -> u64 {
        self.item_count
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let bitmap = self.bloom.bitmap();
        let sip_keys = self.bloom.sip_keys();

        let mut out = Vec::with_capacity(HEADER_LEN + bitmap.len());
        out.push(FORMAT_VERSION);
        out.extend_from_slice(&self.item_count.to_le_bytes());
        out.extend_from_slice(&self.bloom.number_of_bits().to_le_bytes());
        out.extend_from_slice(&self.bloom.number_of_hash_functions().to_le_bytes());
        for (k0, k1) in sip_keys {
            out.extend_from_slice(&k0.to_le_bytes());
            out.extend_from_slice(&k1.to_le_bytes());
        }
        out.extend_from_slice(&bitmap);
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(BlockError::Filter(format!(
                "truncated bloom filter: {} bytes",
                data.len()
            )));
        }
        if data[0] != FORMAT_VERSION {
            return Err(BlockError::Filter(format!(
                "unsupported bloom filter version: {}",
                data[0]
            )));
        }

        let mut cursor = 1;
        let item_count = read_u64(data, &mut cursor);
        let num_bits = read_u64(data, &mut cursor);
        let num_hashes = u32::from_le_bytes(data[cursor..cursor + 4].try_into().unwrap());
        cursor += 4;
        let mut sip_keys = [(0u64, 0u64); 2];
        for key in sip_keys.iter_mut() {
            key.0 = read_u64(data, &mut cursor);
            key.1 = read_u64(data, &mut cursor);
        }

        let bloom = Bloom::from_existing(&data[cursor..], num_bits, num_hashes, sip_keys);
        Ok(Self { bloom, item_count })
    }
}
