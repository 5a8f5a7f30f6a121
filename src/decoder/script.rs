//! Script op parsing
//!
//! Tokenises raw script bytes into an ordered list of operations. This is the
//! single op parser used by the block decoder, the envelope reader and the
//! content extractor.
//!
//! Push encodings:
//! - `0x01..=0x4b`: push that many following bytes
//! - `OP_PUSHDATA1/2/4`: 1/2/4-byte little-endian length prefix, then data
//!
//! Every other byte is a non-push opcode with no data. Parsing either
//! accounts for every script byte or fails; a partial op list is never
//! returned.

use super::cursor::ByteCursor;
use serde::Serialize;

pub mod opcodes {
    pub const OP_0: u8 = 0x00;
    pub const OP_PUSHBYTES_MAX: u8 = 0x4b;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    pub const OP_1: u8 = 0x51;
    pub const OP_16: u8 = 0x60;
    pub const OP_IF: u8 = 0x63;
    pub const OP_ENDIF: u8 = 0x68;
    pub const OP_RETURN: u8 = 0x6a;
    pub const OP_CHECKSIG: u8 = 0xac;
}

use opcodes::*;

/// Result type for script parsing
pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("Truncated length prefix for opcode 0x{opcode:02x} at offset {offset}")]
    TruncatedLengthPrefix { offset: usize, opcode: u8 },

    #[error("Push at offset {offset} declares {declared} bytes but only {available} remain")]
    TruncatedPushData {
        offset: usize,
        declared: u64,
        available: usize,
    },
}

/// One parsed script operation borrowing from the script buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScriptOp<'a> {
    pub opcode: u8,
    /// Pushed bytes; `Some` exactly when the op is a push
    #[serde(serialize_with = "serialize_opt_hex")]
    pub data: Option<&'a [u8]>,
    /// Bytes consumed from the script, opcode and length prefix included
    pub encoded_len: usize,
}

impl<'a> ScriptOp<'a> {
    pub fn is_push(&self) -> bool {
        self.data.is_some()
    }

    /// Pushed data, or `None` for non-push opcodes
    pub fn push_data(&self) -> Option<&'a [u8]> {
        self.data
    }
}

fn serialize_opt_hex<S: serde::Serializer>(
    data: &Option<&[u8]>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match data {
        Some(bytes) => serializer.serialize_some(&hex::encode(bytes)),
        None => serializer.serialize_none(),
    }
}

/// Parse a complete script.
///
/// On success the `encoded_len` of the returned ops sums to `script.len()`.
pub fn parse_script(script: &[u8]) -> ScriptResult<Vec<ScriptOp<'_>>> {
    let mut cursor = ByteCursor::new(script);
    let mut ops = Vec::new();

    while !cursor.is_exhausted() {
        let start = cursor.position();
        let opcode = cursor
            .read_u8()
            .map_err(|_| ScriptError::TruncatedLengthPrefix { offset: start, opcode: 0 })?;

        let declared = match opcode {
            1..=OP_PUSHBYTES_MAX => Some(u64::from(opcode)),
            OP_PUSHDATA1 => Some(u64::from(cursor.read_u8().map_err(|_| {
                ScriptError::TruncatedLengthPrefix {
                    offset: start,
                    opcode,
                }
            })?)),
            OP_PUSHDATA2 => Some(u64::from(cursor.read_u16_le().map_err(|_| {
                ScriptError::TruncatedLengthPrefix {
                    offset: start,
                    opcode,
                }
            })?)),
            OP_PUSHDATA4 => Some(u64::from(cursor.read_u32_le().map_err(|_| {
                ScriptError::TruncatedLengthPrefix {
                    offset: start,
                    opcode,
                }
            })?)),
            _ => None,
        };

        let data = match declared {
            Some(len) => {
                let available = cursor.remaining();
                if len > available as u64 {
                    return Err(ScriptError::TruncatedPushData {
                        offset: start,
                        declared: len,
                        available,
                    });
                }
                Some(
                    cursor
                        .read_bytes(len as usize)
                        .map_err(|_| ScriptError::TruncatedPushData {
                            offset: start,
                            declared: len,
                            available,
                        })?,
                )
            }
            None => None,
        };

        ops.push(ScriptOp {
            opcode,
            data,
            encoded_len: cursor.position() - start,
        });
    }

    Ok(ops)
}

/// Concatenate the data of every push op, in order
pub fn concat_push_data(ops: &[ScriptOp<'_>]) -> Vec<u8> {
    let total = pushed_byte_count(ops);
    let mut out = Vec::with_capacity(total);
    for data in ops.iter().filter_map(|op| op.data) {
        out.extend_from_slice(data);
    }
    out
}

/// Total number of bytes carried by push ops
pub fn pushed_byte_count(ops: &[ScriptOp<'_>]) -> usize {
    ops.iter().filter_map(|op| op.data).map(<[u8]>::len).sum()
}

/// Small-integer value of `OP_1..=OP_16`
pub fn small_int(opcode: u8) -> Option<u8> {
    (OP_1..=OP_16)
        .contains(&opcode)
        .then(|| opcode - OP_1 + 1)
}
