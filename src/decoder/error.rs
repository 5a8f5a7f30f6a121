//! Decoder-specific error types

/// Result type for decoder operations
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Structural decoding failures
///
/// Every variant aborts decoding of the affected unit (header, transaction or
/// script) and is handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Block too short: need 80 header bytes, got {actual}")]
    BlockTooShort { actual: usize },

    #[error("Insufficient data at offset {offset}: need {needed} bytes, {available} available")]
    InsufficientData {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("CompactSize value {value} at offset {offset} exceeds the remaining {remaining} bytes")]
    LengthOverrun {
        offset: usize,
        value: u64,
        remaining: usize,
    },

    #[error("Witness stack count mismatch: {inputs} inputs but {stacks} witness stacks")]
    WitnessCountMismatch { inputs: usize, stacks: usize },

    #[error("Transaction {index} at offset {offset} failed to decode: {source}")]
    Transaction {
        index: usize,
        offset: usize,
        #[source]
        source: Box<DecodeError>,
    },

    #[error("Unexpected {trailing} trailing bytes after transaction")]
    TrailingBytes { trailing: usize },

    #[error("Invalid hex input: {0}")]
    InvalidHex(String),
}

impl From<hex::FromHexError> for DecodeError {
    fn from(err: hex::FromHexError) -> Self {
        DecodeError::InvalidHex(err.to_string())
    }
}
