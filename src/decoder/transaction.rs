//! Transaction decoding (legacy and SegWit serialisations)

use super::cursor::ByteCursor;
use super::error::{DecodeError, DecodeResult};
use super::hash::{double_sha256, reversed};
use serde::{Serialize, Serializer};

/// SegWit marker and flag following the version field
pub const SEGWIT_MARKER: [u8; 2] = [0x00, 0x01];

/// outpoint (36) + empty script length (1) + sequence (4)
const MIN_INPUT_SIZE: usize = 41;
/// value (8) + empty script length (1)
const MIN_OUTPUT_SIZE: usize = 9;
/// a zero-length witness item still occupies its length byte
const MIN_WITNESS_ITEM_SIZE: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxInput {
    /// Display (big-endian) order
    #[serde(with = "hex::serde")]
    pub prev_txid: [u8; 32],
    pub prev_vout: u32,
    #[serde(with = "hex::serde")]
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

impl TxInput {
    fn decode(cursor: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let prev_txid = reversed(cursor.read_array::<32>()?);
        let prev_vout = cursor.read_u32_le()?;
        let script_sig = cursor.read_var_bytes()?.to_vec();
        let sequence = cursor.read_u32_le()?;
        Ok(Self {
            prev_txid,
            prev_vout,
            script_sig,
            sequence,
        })
    }

    pub fn is_coinbase(&self) -> bool {
        self.prev_txid == [0u8; 32] && self.prev_vout == u32::MAX
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxOutput {
    /// Satoshis
    pub value: i64,
    #[serde(with = "hex::serde")]
    pub script_pubkey: Vec<u8>,
}

impl TxOutput {
    fn decode(cursor: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let value = cursor.read_i64_le()?;
        let script_pubkey = cursor.read_var_bytes()?.to_vec();
        Ok(Self {
            value,
            script_pubkey,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    /// One stack per input when `has_witness`, otherwise empty
    #[serde(serialize_with = "serialize_witnesses")]
    pub witnesses: Vec<Vec<Vec<u8>>>,
    pub lock_time: u32,
    pub has_witness: bool,
    /// Double-SHA256 of the non-witness serialisation, display order
    #[serde(with = "hex::serde")]
    pub txid: [u8; 32],
    /// Double-SHA256 of the full serialised byte range, display order
    #[serde(with = "hex::serde")]
    pub wtxid: [u8; 32],
    /// Serialised length in bytes, witness included
    pub size: usize,
}

fn serialize_witnesses<S: Serializer>(
    witnesses: &[Vec<Vec<u8>>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let encoded: Vec<Vec<String>> = witnesses
        .iter()
        .map(|stack| stack.iter().map(hex::encode).collect())
        .collect();
    encoded.serialize(serializer)
}

impl Transaction {
    /// Decode one transaction starting at the cursor's position.
    ///
    /// On error the cursor position is unspecified; callers that continue
    /// reading must restore their own checkpoint.
    pub fn decode(cursor: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let start = cursor.position();
        let version = cursor.read_i32_le()?;

        // Marker/flag are only consumed when present; otherwise those bytes
        // belong to the input count.
        let has_witness = cursor.peek_bytes(2) == Some(&SEGWIT_MARKER[..]);
        if has_witness {
            cursor.read_bytes(2)?;
        }

        let body_start = cursor.position();
        let input_count = cursor.read_count(MIN_INPUT_SIZE)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(TxInput::decode(cursor)?);
        }

        let output_count = cursor.read_count(MIN_OUTPUT_SIZE)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(TxOutput::decode(cursor)?);
        }
        let body_end = cursor.position();

        let mut witnesses = Vec::new();
        if has_witness {
            witnesses.reserve(inputs.len());
            for _ in 0..inputs.len() {
                let item_count = cursor.read_count(MIN_WITNESS_ITEM_SIZE)?;
                let mut stack = Vec::with_capacity(item_count);
                for _ in 0..item_count {
                    stack.push(cursor.read_var_bytes()?.to_vec());
                }
                witnesses.push(stack);
            }
        }

        let lock_time_start = cursor.position();
        let lock_time = cursor.read_u32_le()?;
        let end = cursor.position();

        let range = |from: usize, to: usize| {
            cursor.slice(from, to).ok_or(DecodeError::InsufficientData {
                offset: from,
                needed: to.saturating_sub(from),
                available: 0,
            })
        };

        let full = range(start, end)?;
        let wtxid = reversed(double_sha256(full));
        let txid = if has_witness {
            let mut stripped = Vec::with_capacity(full.len());
            stripped.extend_from_slice(range(start, start + 4)?);
            stripped.extend_from_slice(range(body_start, body_end)?);
            stripped.extend_from_slice(range(lock_time_start, end)?);
            reversed(double_sha256(&stripped))
        } else {
            wtxid
        };

        let tx = Self {
            version,
            inputs,
            outputs,
            witnesses,
            lock_time,
            has_witness,
            txid,
            wtxid,
            size: end - start,
        };
        tx.check_witness_shape()?;
        Ok(tx)
    }

    /// Decode a buffer holding exactly one transaction
    pub fn from_bytes(bytes: &[u8]) -> DecodeResult<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let tx = Self::decode(&mut cursor)?;
        if !cursor.is_exhausted() {
            return Err(DecodeError::TrailingBytes {
                trailing: cursor.remaining(),
            });
        }
        Ok(tx)
    }

    fn check_witness_shape(&self) -> DecodeResult<()> {
        let stacks = self.witnesses.len();
        let expected = if self.has_witness { self.inputs.len() } else { 0 };
        if stacks != expected {
            return Err(DecodeError::WitnessCountMismatch {
                inputs: self.inputs.len(),
                stacks,
            });
        }
        Ok(())
    }

    pub fn txid_hex(&self) -> String {
        hex::encode(self.txid)
    }

    pub fn wtxid_hex(&self) -> String {
        hex::encode(self.wtxid)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// Witness stack for `input`, empty for legacy transactions
    pub fn witness(&self, input: usize) -> &[Vec<u8>] {
        self.witnesses.get(input).map(Vec::as_slice).unwrap_or(&[])
    }
}
