use witness_scan::types::content_detection::{
    infer_content_type, locate_image, ContentFormat, ImageFormat, TextFormat,
};

use crate::common::{minimal_png, png_payload};

fn jpeg() -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[0u8; 20]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

fn webp() -> Vec<u8> {
    let mut data = b"RIFF".to_vec();
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(b"WEBPVP8L");
    data.extend_from_slice(&[0u8; 8]);
    data
}

#[test]
fn test_plain_text_mime_type() {
    let format = infer_content_type(b"Hello World", None, None);
    assert_eq!(format, ContentFormat::Text(TextFormat::PlainText));
    assert_eq!(format.mime_type(), "text/plain");
}

#[test]
fn test_image_signatures() {
    let cases = [
        (minimal_png(), ImageFormat::Png, "image/png"),
        (jpeg(), ImageFormat::Jpeg, "image/jpeg"),
        (b"GIF89a\x01\x00\x01\x00\x00\x00\x00;".to_vec(), ImageFormat::Gif, "image/gif"),
        (webp(), ImageFormat::WebP, "image/webp"),
    ];

    for (data, expected, mime) in cases {
        let format = infer_content_type(&data, None, None);
        assert_eq!(format, ContentFormat::Image(expected));
        assert_eq!(format.mime_type(), mime);
    }
}

#[test]
fn test_riff_without_webp_fourcc_is_not_an_image() {
    let mut data = b"RIFF".to_vec();
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(b"WAVEfmt ");
    assert!(locate_image(&data).is_none());
}

#[test]
fn test_json_and_html() {
    assert_eq!(
        infer_content_type(br#"{"p":"brc-20","op":"mint","tick":"ordi","amt":"1000"}"#, None, None),
        ContentFormat::Text(TextFormat::Json)
    );
    assert_eq!(
        infer_content_type(b"<!DOCTYPE html><html><body>hi</body></html>", None, None),
        ContentFormat::Text(TextFormat::Html)
    );
    // Braces alone do not make JSON
    assert_eq!(
        infer_content_type(b"{ not json at all }", None, None),
        ContentFormat::Text(TextFormat::PlainText)
    );
}

#[test]
fn test_bytes_win_over_declared_type() {
    let png = png_payload(64);
    assert_eq!(
        infer_content_type(&png, Some("text/plain"), Some("note.txt")),
        ContentFormat::Image(ImageFormat::Png)
    );
}

#[test]
fn test_hints_used_when_bytes_are_silent() {
    let opaque = [0x00, 0x01, 0x02, 0x03, 0x04];
    assert_eq!(
        infer_content_type(&opaque, Some("image/webp;foo=bar"), None),
        ContentFormat::Image(ImageFormat::WebP)
    );
    assert_eq!(
        infer_content_type(&opaque, None, Some("picture.JPEG")),
        ContentFormat::Image(ImageFormat::Jpeg)
    );
    assert_eq!(
        infer_content_type(&opaque, Some("application/x-unknown"), None),
        ContentFormat::Binary
    );
}

#[test]
fn test_empty_and_binary() {
    assert_eq!(infer_content_type(&[], Some("image/png"), None), ContentFormat::Binary);
    assert_eq!(ContentFormat::detect(&[]), None);
    assert_eq!(ContentFormat::detect(&[0x00, 0x01, 0x02, 0xFE]), None);
    assert_eq!(ContentFormat::Binary.mime_type(), "application/octet-stream");
}

#[test]
fn test_inference_is_deterministic() {
    let data = png_payload(100);
    let first = infer_content_type(&data, Some("image/gif"), Some("a.txt"));
    for _ in 0..10 {
        assert_eq!(infer_content_type(&data, Some("image/gif"), Some("a.txt")), first);
    }
}

#[test]
fn test_locate_image_picks_earliest() {
    let mut data = vec![0x13, 0x37];
    data.extend_from_slice(&jpeg());
    data.extend_from_slice(&minimal_png());
    assert_eq!(locate_image(&data), Some((ImageFormat::Jpeg, 2)));
}
