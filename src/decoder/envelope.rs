//! Inscription envelope reader
//!
//! Tapscript witness items may carry an envelope of the form:
//!
//! ```text
//! OP_FALSE OP_IF
//!   OP_PUSH "ord"
//!   OP_PUSH 01 OP_PUSH <content-type>    (tag/value pairs)
//!   OP_0                                  (body separator)
//!   OP_PUSH <data> OP_PUSH <data> ...
//! OP_ENDIF
//! ```
//!
//! Anything that deviates from this shape yields `None`; the caller then falls
//! back to signature scanning.

use super::script::opcodes::{OP_0, OP_ENDIF, OP_IF};
use super::script::{small_int, ScriptOp};

/// Protocol identifier pushed right after `OP_IF`
pub const ENVELOPE_PROTOCOL_ID: &[u8] = b"ord";

/// Tag carrying the declared MIME type
const TAG_CONTENT_TYPE: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InscriptionEnvelope {
    /// Declared content type, if tag 1 was present and valid UTF-8
    pub content_type: Option<String>,
    /// Concatenated body pushes
    pub body: Vec<u8>,
}

/// Locate and read the first well-formed envelope in `ops`
pub fn find_envelope(ops: &[ScriptOp<'_>]) -> Option<InscriptionEnvelope> {
    ops.windows(3)
        .enumerate()
        .filter(|(_, w)| {
            is_false(&w[0]) && w[1].opcode == OP_IF && w[2].data == Some(ENVELOPE_PROTOCOL_ID)
        })
        .find_map(|(start, _)| read_envelope(ops.get(start + 3..)?))
}

fn is_false(op: &ScriptOp<'_>) -> bool {
    op.opcode == OP_0 && op.data.is_none()
}

fn read_envelope(ops: &[ScriptOp<'_>]) -> Option<InscriptionEnvelope> {
    let mut content_type = None;
    let mut iter = ops.iter();

    // Tag/value section
    loop {
        let op = iter.next()?;
        if op.opcode == OP_ENDIF {
            return Some(InscriptionEnvelope {
                content_type,
                body: Vec::new(),
            });
        }
        if is_false(op) {
            break;
        }

        let tag = match op.data {
            Some(data) => data.first().copied(),
            None => small_int(op.opcode),
        }?;
        let value = iter.next()?.data?;
        if tag == TAG_CONTENT_TYPE && content_type.is_none() {
            content_type = std::str::from_utf8(value).ok().map(str::to_string);
        }
    }

    // Body section
    let mut body = Vec::new();
    for op in iter {
        if op.opcode == OP_ENDIF {
            return Some(InscriptionEnvelope { content_type, body });
        }
        match op.data {
            Some(data) => body.extend_from_slice(data),
            None if is_false(op) => {}
            None => return None,
        }
    }

    // Unterminated envelope
    None
}
