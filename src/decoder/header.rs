//! Block header decoding
//!
//! The header is the fixed 80-byte prefix of every block. Its hash is taken at
//! face value; proof-of-work and the merkle root are not checked here.

use super::cursor::ByteCursor;
use super::error::{DecodeError, DecodeResult};
use super::hash::{double_sha256, reversed};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serialized header length in bytes
pub const HEADER_SIZE: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    /// Display (big-endian) order
    #[serde(with = "hex::serde")]
    pub prev_block_hash: [u8; 32],
    /// Display (big-endian) order
    #[serde(with = "hex::serde")]
    pub merkle_root: [u8; 32],
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
    /// `reverse(double_sha256(header bytes))`
    #[serde(with = "hex::serde")]
    pub hash: [u8; 32],
}

impl BlockHeader {
    /// Decode the header from the start of `cursor`, advancing it 80 bytes
    pub fn decode(cursor: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        if cursor.remaining() < HEADER_SIZE {
            return Err(DecodeError::BlockTooShort {
                actual: cursor.remaining(),
            });
        }

        let raw = cursor.read_bytes(HEADER_SIZE)?;
        let mut fields = ByteCursor::new(raw);

        let version = fields.read_i32_le()?;
        let prev_block_hash = reversed(fields.read_array::<32>()?);
        let merkle_root = reversed(fields.read_array::<32>()?);
        let timestamp = fields.read_u32_le()?;
        let bits = fields.read_u32_le()?;
        let nonce = fields.read_u32_le()?;

        Ok(Self {
            version,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce,
            hash: reversed(double_sha256(raw)),
        })
    }

    /// Decode a header from a standalone byte slice
    pub fn from_bytes(bytes: &[u8]) -> DecodeResult<Self> {
        Self::decode(&mut ByteCursor::new(bytes))
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn prev_block_hash_hex(&self) -> String {
        hex::encode(self.prev_block_hash)
    }

    /// Header timestamp as UTC, if representable
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(i64::from(self.timestamp), 0)
    }
}
