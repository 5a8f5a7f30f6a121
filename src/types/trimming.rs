//! Payload cleanup after classification
//!
//! Images are cut to start at the first valid occurrence of their signature
//! and, where the container declares or marks its own end, stop there. Text
//! payloads lose script framing (a single leading push opcode), leading
//! control bytes and trailing NUL padding; HTML additionally starts at the
//! first `<`.
//!
//! All passes only narrow the input slice.

use super::content_detection::{find_image_start, find_subslice, is_printable, ImageFormat};
use super::content_detection::{ContentFormat, TextFormat};
use crate::decoder::script::opcodes::{OP_PUSHBYTES_MAX, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

const PNG_IEND: &[u8] = b"IEND";
const JPEG_EOI: &[u8] = &[0xFF, 0xD9];
const GIF_TRAILER: u8 = 0x3B;

/// Apply the cleanup pass matching `format`
pub fn trim_payload(data: &[u8], format: ContentFormat) -> &[u8] {
    match format {
        ContentFormat::Image(image) => trim_image(data, image),
        ContentFormat::Text(text) => trim_text(data, text),
        ContentFormat::Binary => data,
    }
}

/// Drop leading garbage before the signature and trailing bytes past the
/// image's end marker. Data without a valid signature is returned unchanged.
pub fn trim_image(data: &[u8], format: ImageFormat) -> &[u8] {
    let Some(start) = find_image_start(data, format) else {
        return data;
    };
    let image = &data[start..];
    let end = match format {
        ImageFormat::Png => png_end(image),
        ImageFormat::Jpeg => jpeg_end(image),
        ImageFormat::Gif => gif_end(image),
        ImageFormat::WebP => webp_end(image),
        ImageFormat::Avif => isobmff_end(image),
    };
    &image[..end.unwrap_or(image.len())]
}

/// Strip text framing, then for HTML start at the first `<`
pub fn trim_text(data: &[u8], format: TextFormat) -> &[u8] {
    let text = strip_trailing_padding(strip_text_framing(data));
    match format {
        TextFormat::Html => match text.iter().position(|&b| b == b'<') {
            Some(pos) => &text[pos..],
            None => text,
        },
        _ => text,
    }
}

/// Remove one leading push opcode and any leading ASCII control bytes.
///
/// A push prefix is only treated as framing when its opcode byte is not
/// itself printable text, or when its declared length covers exactly the
/// rest of the buffer; otherwise e.g. the `H` of "Hello" would be taken for
/// a 72-byte push.
pub fn strip_text_framing(data: &[u8]) -> &[u8] {
    let rest = match push_prefix(data) {
        Some((header_len, declared)) => {
            let remaining = data.len() - header_len;
            let opcode_is_text = is_printable(data[0]);
            let fits = declared <= remaining;
            if fits && (!opcode_is_text || declared == remaining) {
                &data[header_len..]
            } else {
                data
            }
        }
        None => data,
    };

    let start = rest
        .iter()
        .position(|&b| !is_leading_control(b))
        .unwrap_or(rest.len());
    &rest[start..]
}

fn is_leading_control(byte: u8) -> bool {
    (byte < 0x20 && !matches!(byte, b'\t' | b'\n' | b'\r')) || byte == 0x7F
}

fn strip_trailing_padding(data: &[u8]) -> &[u8] {
    let end = data
        .iter()
        .rposition(|&b| !is_leading_control(b))
        .map_or(0, |pos| pos + 1);
    &data[..end]
}

/// (header length, declared data length) of a leading push opcode
fn push_prefix(data: &[u8]) -> Option<(usize, usize)> {
    let opcode = *data.first()?;
    match opcode {
        1..=OP_PUSHBYTES_MAX => Some((1, opcode as usize)),
        OP_PUSHDATA1 => Some((2, *data.get(1)? as usize)),
        OP_PUSHDATA2 => Some((3, LittleEndian::read_u16(data.get(1..3)?) as usize)),
        OP_PUSHDATA4 => Some((5, LittleEndian::read_u32(data.get(1..5)?) as usize)),
        _ => None,
    }
}

/// End of the IEND chunk (type + CRC), walking chunks from the signature
fn png_end(image: &[u8]) -> Option<usize> {
    let mut pos = 8;
    loop {
        let len = BigEndian::read_u32(image.get(pos..pos + 4)?) as usize;
        let chunk_type = image.get(pos + 4..pos + 8)?;
        let chunk_end = pos.checked_add(12)?.checked_add(len)?;
        if chunk_end > image.len() {
            // Corrupt length; fall back to the first IEND marker
            return find_subslice(image, PNG_IEND)
                .map(|iend| iend + PNG_IEND.len() + 4)
                .filter(|&end| end <= image.len());
        }
        if chunk_type == PNG_IEND {
            return Some(chunk_end);
        }
        pos = chunk_end;
    }
}

fn jpeg_end(image: &[u8]) -> Option<usize> {
    image
        .windows(JPEG_EOI.len())
        .rposition(|w| w == JPEG_EOI)
        .map(|pos| pos + JPEG_EOI.len())
}

fn gif_end(image: &[u8]) -> Option<usize> {
    image
        .iter()
        .rposition(|&b| b == GIF_TRAILER)
        .map(|pos| pos + 1)
}

/// RIFF chunk size counts everything after the 8-byte RIFF header
fn webp_end(image: &[u8]) -> Option<usize> {
    let size = LittleEndian::read_u32(image.get(4..8)?) as usize;
    let end = size.checked_add(8)?;
    (end <= image.len()).then_some(end)
}

/// End of the last complete top-level ISO-BMFF box
fn isobmff_end(image: &[u8]) -> Option<usize> {
    let mut pos = 0;
    let mut last_complete = None;
    while let Some(header) = image.get(pos..pos + 8) {
        let size = match BigEndian::read_u32(&header[0..4]) {
            0 => image.len() - pos,
            1 => {
                let large = image.get(pos + 8..pos + 16)?;
                usize::try_from(BigEndian::read_u64(large)).ok()?
            }
            n => n as usize,
        };
        if size < 8 {
            break;
        }
        let end = pos.checked_add(size)?;
        if end > image.len() {
            break;
        }
        last_complete = Some(end);
        pos = end;
    }
    last_complete
}
