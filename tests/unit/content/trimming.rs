use witness_scan::types::content_detection::{ContentFormat, ImageFormat, TextFormat, PNG_MAGIC};
use witness_scan::types::trimming::{strip_text_framing, trim_payload};

use crate::common::minimal_png;

#[test]
fn test_png_leading_junk_removed() {
    let mut data = vec![0xDE, 0xAD, 0xBE];
    data.extend_from_slice(&minimal_png());

    let trimmed = trim_payload(&data, ContentFormat::Image(ImageFormat::Png));
    assert!(trimmed.starts_with(PNG_MAGIC));
    assert_eq!(trimmed, minimal_png().as_slice());
}

#[test]
fn test_png_trailing_bytes_after_iend_removed() {
    let mut data = minimal_png();
    data.extend_from_slice(&[0x00, 0x00, 0x68]);
    let trimmed = trim_payload(&data, ContentFormat::Image(ImageFormat::Png));
    assert_eq!(trimmed.len(), minimal_png().len());
}

#[test]
fn test_jpeg_ends_at_last_eoi() {
    let mut data = vec![0x01, 0x02];
    data.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0, 0xFF, 0xD9, 0x10, 0xFF, 0xD9]);
    data.extend_from_slice(&[0x00; 5]);

    let trimmed = trim_payload(&data, ContentFormat::Image(ImageFormat::Jpeg));
    assert_eq!(trimmed, &[0xFF, 0xD8, 0xFF, 0xE0, 0xFF, 0xD9, 0x10, 0xFF, 0xD9]);
}

#[test]
fn test_image_without_signature_unchanged() {
    let data = [0x00, 0x11, 0x22];
    assert_eq!(
        trim_payload(&data, ContentFormat::Image(ImageFormat::Gif)),
        &data[..]
    );
}

#[test]
fn test_text_push_prefix_stripped() {
    let mut data = vec![0x0B];
    data.extend_from_slice(b"Hello World");
    assert_eq!(
        trim_payload(&data, ContentFormat::Text(TextFormat::PlainText)),
        b"Hello World"
    );
}

#[test]
fn test_printable_first_byte_kept() {
    // 'H' is 0x48, a 72-byte push that does not fit: it is text, not framing
    assert_eq!(strip_text_framing(b"Hello World"), b"Hello World");
}

#[test]
fn test_html_starts_at_first_tag() {
    let mut data = vec![0x4C, 0x1A];
    data.extend_from_slice(b"xx<html><body>gm</body></html>");
    let trimmed = trim_payload(&data, ContentFormat::Text(TextFormat::Html));
    assert_eq!(trimmed, b"<html><body>gm</body></html>");
}

#[test]
fn test_trailing_padding_removed() {
    let data = b"padded text\0\0\0";
    assert_eq!(
        trim_payload(data, ContentFormat::Text(TextFormat::PlainText)),
        b"padded text"
    );
}

#[test]
fn test_binary_untouched() {
    let data = [0x00, 0x01, 0x02];
    assert_eq!(trim_payload(&data, ContentFormat::Binary), &data[..]);
}
