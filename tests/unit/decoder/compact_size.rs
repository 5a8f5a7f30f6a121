use witness_scan::decoder::cursor::ByteCursor;
use witness_scan::decoder::DecodeError;

use crate::common::compact_size;

fn read(bytes: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut cursor = ByteCursor::new(bytes);
    let value = cursor.read_compact_size()?;
    Ok((value, cursor.position()))
}

#[test]
fn test_width_boundaries() {
    let cases: [(u64, usize); 8] = [
        (0, 1),
        (0xFC, 1),
        (0xFD, 3),
        (0xFFFF, 3),
        (0x1_0000, 5),
        (0xFFFF_FFFF, 5),
        (0x1_0000_0000, 9),
        (u64::MAX, 9),
    ];

    for (value, width) in cases {
        let encoded = compact_size(value);
        assert_eq!(encoded.len(), width, "encoding width for {}", value);
        assert_eq!(read(&encoded).unwrap(), (value, width), "decoding {}", value);
    }
}

#[test]
fn test_little_endian_payloads() {
    assert_eq!(read(&[0x05]).unwrap(), (5, 1));
    assert_eq!(read(&[0xFD, 0x00, 0x01]).unwrap(), (256, 3));
    assert_eq!(read(&[0xFE, 0x78, 0x56, 0x34, 0x12]).unwrap(), (0x1234_5678, 5));
    assert_eq!(
        read(&[0xFF, 0xEF, 0xCD, 0xAB, 0x89, 0x67, 0x45, 0x23, 0x01]).unwrap(),
        (0x0123_4567_89AB_CDEF, 9)
    );
}

#[test]
fn test_non_canonical_encoding_accepted() {
    assert_eq!(read(&[0xFD, 0x05, 0x00]).unwrap(), (5, 3));
    assert_eq!(read(&[0xFE, 0x01, 0x00, 0x00, 0x00]).unwrap(), (1, 5));
}

#[test]
fn test_truncated_prefix_leaves_cursor_in_place() {
    let bytes = [0xFE, 0x01, 0x02];
    let mut cursor = ByteCursor::new(&bytes);

    let err = cursor.read_compact_size().unwrap_err();
    assert!(matches!(err, DecodeError::InsufficientData { offset: 1, .. }));
    assert_eq!(cursor.position(), 0);
}

#[test]
fn test_empty_input() {
    assert!(matches!(
        read(&[]),
        Err(DecodeError::InsufficientData { offset: 0, needed: 1, available: 0 })
    ));
}

#[test]
fn test_count_capped_by_remaining_bytes() {
    // 3 elements of at least 41 bytes cannot fit in 100 bytes
    let mut bytes = vec![0x03];
    bytes.extend_from_slice(&[0u8; 100]);
    let mut cursor = ByteCursor::new(&bytes);

    match cursor.read_count(41) {
        Err(DecodeError::LengthOverrun { offset, value, remaining }) => {
            assert_eq!(offset, 0);
            assert_eq!(value, 3);
            assert_eq!(remaining, 100);
        }
        other => panic!("expected LengthOverrun, got {:?}", other),
    }

    let mut cursor = ByteCursor::new(&bytes);
    assert_eq!(cursor.read_count(50).unwrap(), 2);
}

#[test]
fn test_var_bytes_overrun() {
    let bytes = [0x05, 0xAA, 0xBB];
    let mut cursor = ByteCursor::new(&bytes);
    assert!(matches!(
        cursor.read_var_bytes(),
        Err(DecodeError::LengthOverrun { value: 5, remaining: 2, .. })
    ));

    let bytes = [0x02, 0xAA, 0xBB];
    let mut cursor = ByteCursor::new(&bytes);
    assert_eq!(cursor.read_var_bytes().unwrap(), &[0xAA, 0xBB]);
    assert!(cursor.is_exhausted());
}
