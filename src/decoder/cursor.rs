//! Bounds-checked sequential reader over an untrusted byte buffer
//!
//! Every read either yields exactly the requested number of bytes or fails
//! with [`DecodeError::InsufficientData`]. The cursor never reads past the end
//! of its buffer and never fabricates zero-filled data.

use super::error::{DecodeError, DecodeResult};
use byteorder::{ByteOrder, LittleEndian};

/// CompactSize marker for a following 2-byte little-endian value
pub const COMPACT_SIZE_U16: u8 = 0xFD;
/// CompactSize marker for a following 4-byte little-endian value
pub const COMPACT_SIZE_U32: u8 = 0xFE;
/// CompactSize marker for a following 8-byte little-endian value
pub const COMPACT_SIZE_U64: u8 = 0xFF;

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read offset from the start of the buffer
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Restore a previously recorded offset.
    ///
    /// Offsets beyond the buffer end are clamped to the end.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    /// Borrow an already-consumed (or any in-bounds) range of the buffer
    pub fn slice(&self, start: usize, end: usize) -> Option<&'a [u8]> {
        self.data.get(start..end)
    }

    /// Look at the next `n` bytes without consuming them
    pub fn peek_bytes(&self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        self.data.get(self.pos..end)
    }

    /// Read exactly `n` bytes
    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let bytes = self
            .peek_bytes(n)
            .ok_or(DecodeError::InsufficientData {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            })?;
        self.pos += n;
        Ok(bytes)
    }

    /// Read a fixed-size array, e.g. a 32-byte hash
    pub fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> DecodeResult<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32_le(&mut self) -> DecodeResult<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32_le(&mut self) -> DecodeResult<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64_le(&mut self) -> DecodeResult<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i64_le(&mut self) -> DecodeResult<i64> {
        Ok(LittleEndian::read_i64(self.read_bytes(8)?))
    }

    /// Read one CompactSize integer (1, 3, 5 or 9 bytes)
    ///
    /// Non-canonical encodings (e.g. `FD 05 00`) are accepted; this is a
    /// reader, not a consensus validator.
    pub fn read_compact_size(&mut self) -> DecodeResult<u64> {
        let start = self.pos;
        let marker = self.read_u8()?;
        let value = match marker {
            COMPACT_SIZE_U16 => self.read_u16_le().map(u64::from),
            COMPACT_SIZE_U32 => self.read_u32_le().map(u64::from),
            COMPACT_SIZE_U64 => self.read_u64_le(),
            small => Ok(u64::from(small)),
        };
        if value.is_err() {
            // Leave the cursor where the integer started
            self.pos = start;
        }
        value
    }

    /// Read a CompactSize used as an element count.
    ///
    /// The count is checked against the remaining bytes assuming every element
    /// occupies at least `min_element_size` bytes, so an adversarial count can
    /// never drive an oversized allocation.
    pub fn read_count(&mut self, min_element_size: usize) -> DecodeResult<usize> {
        let offset = self.pos;
        let value = self.read_compact_size()?;
        let remaining = self.remaining();
        let max_elements = (remaining / min_element_size.max(1)) as u64;
        if value > max_elements {
            return Err(DecodeError::LengthOverrun {
                offset,
                value,
                remaining,
            });
        }
        Ok(value as usize)
    }

    /// Read a CompactSize length followed by that many bytes
    pub fn read_var_bytes(&mut self) -> DecodeResult<&'a [u8]> {
        let offset = self.pos;
        let len = self.read_compact_size()?;
        let remaining = self.remaining();
        if len > remaining as u64 {
            return Err(DecodeError::LengthOverrun {
                offset,
                value: len,
                remaining,
            });
        }
        self.read_bytes(len as usize)
    }
}
