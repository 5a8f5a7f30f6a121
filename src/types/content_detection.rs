//! Content Type Detection
//!
//! Classifies recovered bytes into a closed set of formats. Detection runs as
//! an ordered chain of detectors, each returning either a definitive format or
//! no opinion:
//!
//! 1. Image magic signatures (PNG, JPEG, GIF, WebP with RIFF/WEBP validation)
//! 2. ISO-BMFF brand sniffing (AVIF)
//! 3. HTML doctype/tag sniffing
//! 4. JSON structural validity
//! 5. Printable-byte ratio (plain text), otherwise opaque binary
//!
//! Image signatures are located anywhere in the buffer, since payloads
//! recovered from witness data frequently carry leading garbage; see
//! [`crate::types::trimming`] for the cleanup pass.
//!
//! ## Usage
//!
//! ```rust
//! use witness_scan::types::content_detection::{ContentFormat, ImageFormat};
//!
//! let data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]; // PNG magic
//! let format = ContentFormat::detect(&data);
//! assert_eq!(format, Some(ContentFormat::Image(ImageFormat::Png)));
//! assert_eq!(format.unwrap().mime_type(), "image/png");
//! ```

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

pub const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
pub const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
pub const GIF89A_MAGIC: &[u8] = b"GIF89a";
pub const GIF87A_MAGIC: &[u8] = b"GIF87a";
pub const RIFF_MAGIC: &[u8] = b"RIFF";
pub const WEBP_FOURCC: &[u8] = b"WEBP";
pub const FTYP_BOX: &[u8] = b"ftyp";
pub const AVIF_BRANDS: [&[u8]; 2] = [b"avif", b"avis"];

/// Plain-magic signature table, searched anywhere in the buffer
const MAGIC_SIGNATURES: &[(ImageFormat, &[u8])] = &[
    (ImageFormat::Png, PNG_MAGIC),
    (ImageFormat::Gif, GIF89A_MAGIC),
    (ImageFormat::Gif, GIF87A_MAGIC),
    (ImageFormat::Jpeg, JPEG_MAGIC),
];

/// HTML markers are only looked for near the start of the payload
const HTML_SCAN_WINDOW: usize = 1024;

/// Image format detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    /// PNG image (magic: 89 50 4E 47 0D 0A 1A 0A)
    Png,
    /// JPEG image (magic: FF D8 FF)
    Jpeg,
    /// GIF image (magic: GIF87a or GIF89a)
    Gif,
    /// WebP image (magic: RIFF....WEBP)
    WebP,
    /// AVIF image (ftyp box with avif/avis brand)
    Avif,
}

/// Text format detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextFormat {
    Html,
    Json,
    PlainText,
}

/// Closed set of formats recognised in recovered payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentFormat {
    Image(ImageFormat),
    Text(TextFormat),
    /// Unrecognised binary
    Binary,
}

/// A detector either settles the format or has no opinion
pub type Detector = fn(&[u8]) -> Option<ContentFormat>;

/// Byte-level detectors in priority order
pub const BYTE_DETECTORS: &[(&str, Detector)] = &[
    ("image-signature", detect_image_signature),
    ("isobmff-brand", detect_isobmff_brand),
    ("html", detect_html),
    ("json", detect_json),
];

impl ContentFormat {
    /// Detect content format from byte data
    ///
    /// Returns `None` for empty input and for data no detector (including
    /// the printable-ratio heuristic) recognises.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }

        BYTE_DETECTORS
            .iter()
            .find_map(|(_, detector)| detector(data))
            .or_else(|| detect_plain_text(data))
    }

    /// Get MIME type string for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContentFormat::Image(fmt) => fmt.mime_type(),
            ContentFormat::Text(TextFormat::Html) => "text/html",
            ContentFormat::Text(TextFormat::Json) => "application/json",
            ContentFormat::Text(TextFormat::PlainText) => "text/plain",
            ContentFormat::Binary => "application/octet-stream",
        }
    }

    /// File extension without a leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            ContentFormat::Image(fmt) => fmt.extension(),
            ContentFormat::Text(TextFormat::Html) => "html",
            ContentFormat::Text(TextFormat::Json) => "json",
            ContentFormat::Text(TextFormat::PlainText) => "txt",
            ContentFormat::Binary => "bin",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentFormat::Image(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ContentFormat::Text(_))
    }

    /// Reconstruct a format from a MIME string, ignoring parameters
    /// such as `;charset=utf-8`
    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(ContentFormat::Image(ImageFormat::Png)),
            "image/jpeg" | "image/jpg" => Some(ContentFormat::Image(ImageFormat::Jpeg)),
            "image/gif" => Some(ContentFormat::Image(ImageFormat::Gif)),
            "image/webp" => Some(ContentFormat::Image(ImageFormat::WebP)),
            "image/avif" => Some(ContentFormat::Image(ImageFormat::Avif)),
            "text/html" => Some(ContentFormat::Text(TextFormat::Html)),
            "application/json" | "text/json" => Some(ContentFormat::Text(TextFormat::Json)),
            "text/plain" => Some(ContentFormat::Text(TextFormat::PlainText)),
            "application/octet-stream" => Some(ContentFormat::Binary),
            _ => None,
        }
    }

    /// Reconstruct a format from a file name or bare extension
    pub fn from_extension(file_name: &str) -> Option<Self> {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .unwrap_or(file_name)
            .to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(ContentFormat::Image(ImageFormat::Png)),
            "jpg" | "jpeg" => Some(ContentFormat::Image(ImageFormat::Jpeg)),
            "gif" => Some(ContentFormat::Image(ImageFormat::Gif)),
            "webp" => Some(ContentFormat::Image(ImageFormat::WebP)),
            "avif" => Some(ContentFormat::Image(ImageFormat::Avif)),
            "html" | "htm" => Some(ContentFormat::Text(TextFormat::Html)),
            "json" => Some(ContentFormat::Text(TextFormat::Json)),
            "txt" | "text" => Some(ContentFormat::Text(TextFormat::PlainText)),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::WebP => "webp",
            ImageFormat::Avif => "avif",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Avif => "image/avif",
        }
    }
}

/// Infer the format of a payload, optionally guided by a declared MIME type
/// and a file name.
///
/// Byte-level detectors always win. Hints are consulted only when none of
/// them has an opinion, ahead of the printable-ratio heuristic. This is a
/// pure function of its arguments.
pub fn infer_content_type(
    data: &[u8],
    declared_type: Option<&str>,
    file_name_hint: Option<&str>,
) -> ContentFormat {
    if data.is_empty() {
        return ContentFormat::Binary;
    }

    BYTE_DETECTORS
        .iter()
        .find_map(|(_, detector)| detector(data))
        .or_else(|| declared_type.and_then(ContentFormat::from_mime_type))
        .or_else(|| file_name_hint.and_then(ContentFormat::from_extension))
        .or_else(|| detect_plain_text(data))
        .unwrap_or(ContentFormat::Binary)
}

/// Earliest image signature in `data` and its offset.
///
/// Plain magic signatures, WebP (RIFF container validated) and AVIF (ftyp
/// brand validated) are all considered; the lowest offset wins.
pub fn locate_image(data: &[u8]) -> Option<(ImageFormat, usize)> {
    let magic = MAGIC_SIGNATURES
        .iter()
        .filter_map(|(format, magic)| find_subslice(data, magic).map(|pos| (*format, pos)));
    let containers = [
        find_webp(data).map(|pos| (ImageFormat::WebP, pos)),
        find_avif(data).map(|pos| (ImageFormat::Avif, pos)),
    ];

    magic
        .chain(containers.into_iter().flatten())
        .min_by_key(|(_, pos)| *pos)
}

/// Offset of the first valid occurrence of `format`'s signature
pub fn find_image_start(data: &[u8], format: ImageFormat) -> Option<usize> {
    match format {
        ImageFormat::WebP => find_webp(data),
        ImageFormat::Avif => find_avif(data),
        _ => MAGIC_SIGNATURES
            .iter()
            .filter(|(fmt, _)| *fmt == format)
            .filter_map(|(_, magic)| find_subslice(data, magic))
            .min(),
    }
}

fn detect_image_signature(data: &[u8]) -> Option<ContentFormat> {
    let magic_hit = MAGIC_SIGNATURES
        .iter()
        .filter_map(|(format, magic)| find_subslice(data, magic).map(|pos| (*format, pos)));
    let webp_hit = find_webp(data).map(|pos| (ImageFormat::WebP, pos));

    magic_hit
        .chain(webp_hit)
        .min_by_key(|(_, pos)| *pos)
        .map(|(format, _)| ContentFormat::Image(format))
}

fn detect_isobmff_brand(data: &[u8]) -> Option<ContentFormat> {
    find_avif(data).map(|_| ContentFormat::Image(ImageFormat::Avif))
}

fn detect_html(data: &[u8]) -> Option<ContentFormat> {
    let window = &data[..data.len().min(HTML_SCAN_WINDOW)];
    let lower = String::from_utf8_lossy(window).to_ascii_lowercase();

    if lower.contains("<!doctype html") || lower.contains("<html") {
        return Some(ContentFormat::Text(TextFormat::Html));
    }

    let score = ["<head", "<body", "<meta ", "<style", "<script", "<div", "<title"]
        .iter()
        .filter(|tag| lower.contains(*tag))
        .count();
    (score >= 2).then_some(ContentFormat::Text(TextFormat::Html))
}

fn detect_json(data: &[u8]) -> Option<ContentFormat> {
    let core = crate::types::trimming::strip_text_framing(data);
    let trimmed = trim_ascii_whitespace(core);
    if !matches!(trimmed.first(), Some(b'{') | Some(b'[')) {
        return None;
    }
    serde_json::from_slice::<serde_json::Value>(trimmed)
        .ok()
        .filter(|value| value.is_object() || value.is_array())
        .map(|_| ContentFormat::Text(TextFormat::Json))
}

fn detect_plain_text(data: &[u8]) -> Option<ContentFormat> {
    is_mostly_printable(data).then_some(ContentFormat::Text(TextFormat::PlainText))
}

/// Printable ASCII, tab, newline and carriage return
pub fn is_printable(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7E | b'\t' | b'\n' | b'\r')
}

/// True when at least half of the bytes are printable
pub fn is_mostly_printable(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    let printable = data.iter().filter(|&&b| is_printable(b)).count();
    printable * 2 >= data.len()
}

fn trim_ascii_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |pos| pos + 1);
    &data[start..end]
}

/// First occurrence of `needle` in `haystack`
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// First "RIFF" occurrence whose fourcc at +8 is "WEBP"
fn find_webp(data: &[u8]) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = data.get(from..).and_then(|rest| find_subslice(rest, RIFF_MAGIC)) {
        let pos = from + rel;
        if data.get(pos + 8..pos + 12) == Some(WEBP_FOURCC) {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

/// Start of the first ftyp box declaring an AVIF brand (major or compatible)
fn find_avif(data: &[u8]) -> Option<usize> {
    let mut from = 4;
    while let Some(rel) = data.get(from..).and_then(|rest| find_subslice(rest, FTYP_BOX)) {
        let type_pos = from + rel;
        let box_start = type_pos - 4;
        if ftyp_has_avif_brand(data, box_start) {
            return Some(box_start);
        }
        from = type_pos + 1;
    }
    None
}

fn ftyp_has_avif_brand(data: &[u8], box_start: usize) -> bool {
    let Some(size_bytes) = data.get(box_start..box_start + 4) else {
        return false;
    };
    let declared = BigEndian::read_u32(size_bytes) as usize;
    // size, type, major brand, minor version
    if declared < 16 {
        return false;
    }
    let box_end = box_start.saturating_add(declared).min(data.len());
    let Some(body) = data.get(box_start + 8..box_end) else {
        return false;
    };

    let major = body.get(0..4);
    let compatible = body.get(8..).unwrap_or_default().chunks_exact(4);
    major
        .into_iter()
        .chain(compatible)
        .any(|brand| AVIF_BRANDS.iter().any(|avif| *avif == brand))
}
