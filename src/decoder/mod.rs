//! Raw block decoder
//!
//! Turns the serialised bytes of one block into a header, its transactions
//! and the content extracted from them. Decoding is pure: no I/O, no shared
//! state, and every read is bounds-checked by [`cursor::ByteCursor`].
//!
//! Transaction failures are handled according to [`TxFailurePolicy`]. The
//! cursor offset is checkpointed before each transaction; after a failure
//! nothing further is read from the block, since the position of the next
//! transaction can no longer be trusted.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use self::cursor::ByteCursor;
use self::header::BlockHeader;
use self::transaction::Transaction;
use crate::extraction::{extract_from_transaction, ExtractedContent};

pub mod cursor;
pub mod envelope;
pub mod error;
pub mod hash;
pub mod header;
pub mod script;
pub mod transaction;

pub use self::error::{DecodeError, DecodeResult};

/// Smallest possible serialised transaction: version, one input, one output,
/// locktime (4 + 1 + 41 + 1 + 9 + 4)
const MIN_TRANSACTION_SIZE: usize = 60;

/// What to do when one transaction inside a block fails to decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxFailurePolicy {
    /// Fail the whole block with [`DecodeError::Transaction`]
    #[default]
    AbortBlock,
    /// Keep the transactions decoded before the failure and stop there
    KeepDecoded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub tx_failure_policy: TxFailurePolicy,
    /// Run content extraction over every decoded transaction
    pub extract_content: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            tx_failure_policy: TxFailurePolicy::default(),
            extract_content: true,
        }
    }
}

/// A transaction that could not be decoded under [`TxFailurePolicy::KeepDecoded`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxFailure {
    pub index: usize,
    /// Byte offset of the transaction's start within the block
    pub offset: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedBlock {
    pub header: BlockHeader,
    /// Transaction count declared by the block
    pub declared_tx_count: usize,
    pub transactions: Vec<Transaction>,
    pub contents: Vec<ExtractedContent>,
    pub failures: Vec<TxFailure>,
    pub size: usize,
}

impl ParsedBlock {
    pub fn hash_hex(&self) -> String {
        self.header.hash_hex()
    }

    /// True when every declared transaction was decoded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.transactions.len() == self.declared_tx_count
    }
}

/// Decode a block with the default options
pub fn decode_block(bytes: &[u8]) -> DecodeResult<ParsedBlock> {
    decode_block_with(bytes, DecodeOptions::default())
}

/// Decode a hex-encoded block; surrounding whitespace is ignored
pub fn decode_block_hex(hex_str: &str) -> DecodeResult<ParsedBlock> {
    decode_block_hex_with(hex_str, DecodeOptions::default())
}

pub fn decode_block_hex_with(hex_str: &str, options: DecodeOptions) -> DecodeResult<ParsedBlock> {
    let bytes = hex::decode(hex_str.trim())?;
    decode_block_with(&bytes, options)
}

/// Decode a buffer holding exactly one transaction
pub fn decode_transaction(bytes: &[u8]) -> DecodeResult<Transaction> {
    Transaction::from_bytes(bytes)
}

pub fn decode_block_with(bytes: &[u8], options: DecodeOptions) -> DecodeResult<ParsedBlock> {
    let mut cursor = ByteCursor::new(bytes);
    let header = BlockHeader::decode(&mut cursor)?;
    let declared_tx_count = cursor.read_count(MIN_TRANSACTION_SIZE)?;

    debug!(
        "Decoding block {} with {} transactions ({} bytes)",
        header.hash_hex(),
        declared_tx_count,
        bytes.len()
    );

    let mut transactions = Vec::with_capacity(declared_tx_count);
    let mut failures = Vec::new();

    for index in 0..declared_tx_count {
        let checkpoint = cursor.position();
        match Transaction::decode(&mut cursor) {
            Ok(tx) => transactions.push(tx),
            Err(err) => {
                warn!(
                    "Transaction {} at offset {} in block {} failed to decode: {}",
                    index,
                    checkpoint,
                    header.hash_hex(),
                    err
                );
                match options.tx_failure_policy {
                    TxFailurePolicy::AbortBlock => {
                        return Err(DecodeError::Transaction {
                            index,
                            offset: checkpoint,
                            source: Box::new(err),
                        });
                    }
                    TxFailurePolicy::KeepDecoded => {
                        cursor.seek(checkpoint);
                        failures.push(TxFailure {
                            index,
                            offset: checkpoint,
                            error: err.to_string(),
                        });
                        break;
                    }
                }
            }
        }
    }

    if failures.is_empty() && !cursor.is_exhausted() {
        warn!(
            "Block {} has {} unread bytes after its last transaction",
            header.hash_hex(),
            cursor.remaining()
        );
    }

    let contents = if options.extract_content {
        transactions
            .iter()
            .flat_map(extract_from_transaction)
            .collect()
    } else {
        Vec::new()
    };

    Ok(ParsedBlock {
        header,
        declared_tx_count,
        transactions,
        contents,
        failures,
        size: bytes.len(),
    })
}
