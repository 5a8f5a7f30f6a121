//! Content extraction from witness items and scripts
//!
//! Each blob (witness stack item, script-sig or script-pubkey) is examined in
//! a fixed order:
//!
//! 1. inscription envelope, when the blob parses as a script carrying one
//! 2. concatenated push data of a well-formed script, if the pushes cover at
//!    least half of the blob; accepted when it holds an image
//! 3. raw signature scan of the blob for an embedded image
//! 4. text classification of the push data, then of the raw blob
//!
//! A blob matching none of these yields no content, which is the normal
//! outcome for signatures, public keys and ordinary locking scripts.

use crate::decoder::envelope::find_envelope;
use crate::decoder::script::{concat_push_data, parse_script, pushed_byte_count};
use crate::decoder::transaction::Transaction;
use crate::types::content_detection::{
    infer_content_type, is_mostly_printable, locate_image, ContentFormat,
};
use crate::types::trimming::trim_payload;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// Shortest text payload worth reporting
pub const MIN_TEXT_LEN: usize = 8;

/// Where in a transaction a payload was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentLocation {
    Witness { input: usize, item: usize },
    ScriptSig { input: usize },
    ScriptPubkey { output: usize },
}

impl ContentLocation {
    /// Input index for witness/script-sig content, output index otherwise
    pub fn index(&self) -> usize {
        match *self {
            Self::Witness { input, .. } | Self::ScriptSig { input } => input,
            Self::ScriptPubkey { output } => output,
        }
    }

    /// Short label used in file names
    pub fn label(&self) -> String {
        match *self {
            Self::Witness { input, item } => format!("w{}_{}", input, item),
            Self::ScriptSig { input } => format!("ss{}", input),
            Self::ScriptPubkey { output } => format!("spk{}", output),
        }
    }
}

impl fmt::Display for ContentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Witness { input, item } => write!(f, "witness[{}][{}]", input, item),
            Self::ScriptSig { input } => write!(f, "script_sig[{}]", input),
            Self::ScriptPubkey { output } => write!(f, "script_pubkey[{}]", output),
        }
    }
}

/// How the payload was recovered from its blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Envelope,
    PushData,
    RawScan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedContent {
    /// Source transaction id (display hex)
    pub txid: String,
    pub location: ContentLocation,
    pub format: ContentFormat,
    pub method: ExtractionMethod,
    /// Content type declared by an inscription envelope, if any
    pub declared_type: Option<String>,
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
}

impl ExtractedContent {
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Witness/input (or output) index the content came from
    pub fn index(&self) -> usize {
        self.location.index()
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// A payload recovered from one blob, before it is tied to a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobContent {
    pub format: ContentFormat,
    pub method: ExtractionMethod,
    pub declared_type: Option<String>,
    pub data: Vec<u8>,
}

/// Run the extraction pipeline over a single blob
pub fn extract_from_blob(blob: &[u8]) -> Option<BlobContent> {
    if blob.is_empty() {
        return None;
    }

    let ops = parse_script(blob).ok();

    if let Some(envelope) = ops.as_deref().and_then(find_envelope) {
        if !envelope.body.is_empty() {
            let declared = envelope.content_type.as_deref();
            let format = infer_content_type(&envelope.body, declared, None);
            return Some(BlobContent {
                format,
                method: ExtractionMethod::Envelope,
                data: trim_payload(&envelope.body, format).to_vec(),
                declared_type: envelope.content_type,
            });
        }
    }

    // Degenerate parses (a few tiny pushes in a long blob) are not payloads
    let pushed = ops
        .as_deref()
        .filter(|ops| pushed_byte_count(ops) * 2 >= blob.len())
        .map(concat_push_data)
        .filter(|data| !data.is_empty());

    if let Some(data) = pushed.as_deref() {
        if let Some(format @ ContentFormat::Image(_)) = ContentFormat::detect(data) {
            return Some(found(data, format, ExtractionMethod::PushData));
        }
    }

    if let Some((image, offset)) = locate_image(blob) {
        debug!("Raw scan found {:?} at offset {}", image, offset);
        return Some(found(blob, ContentFormat::Image(image), ExtractionMethod::RawScan));
    }

    if let Some(data) = pushed.as_deref() {
        if let Some(format) = classify_text(data) {
            return Some(found(data, format, ExtractionMethod::PushData));
        }
    }

    classify_text(blob).map(|format| found(blob, format, ExtractionMethod::RawScan))
}

/// Every payload carried by a transaction's witnesses and scripts
pub fn extract_from_transaction(tx: &Transaction) -> Vec<ExtractedContent> {
    let txid = tx.txid_hex();
    let mut contents = Vec::new();
    let mut push = |location: ContentLocation, blob: &[u8]| {
        if let Some(content) = extract_from_blob(blob) {
            debug!(
                "Extracted {} ({} bytes) from {} of {}",
                content.format,
                content.data.len(),
                location,
                txid
            );
            contents.push(ExtractedContent {
                txid: txid.clone(),
                location,
                format: content.format,
                method: content.method,
                declared_type: content.declared_type,
                data: content.data,
            });
        }
    };

    for (input, stack) in tx.witnesses.iter().enumerate() {
        for (item, blob) in stack.iter().enumerate() {
            push(ContentLocation::Witness { input, item }, blob);
        }
    }
    for (input, txin) in tx.inputs.iter().enumerate() {
        push(ContentLocation::ScriptSig { input }, &txin.script_sig);
    }
    for (output, txout) in tx.outputs.iter().enumerate() {
        push(ContentLocation::ScriptPubkey { output }, &txout.script_pubkey);
    }

    contents
}

fn found(data: &[u8], format: ContentFormat, method: ExtractionMethod) -> BlobContent {
    BlobContent {
        format,
        method,
        declared_type: None,
        data: trim_payload(data, format).to_vec(),
    }
}

/// Text format of `data` after cleanup, if it is long enough to report
fn classify_text(data: &[u8]) -> Option<ContentFormat> {
    let format = match ContentFormat::detect(data)? {
        format @ ContentFormat::Text(_) => format,
        _ => return None,
    };
    let trimmed = trim_payload(data, format);
    (trimmed.len() >= MIN_TEXT_LEN && is_mostly_printable(trimmed)).then_some(format)
}
