use witness_scan::decoder::transaction::Transaction;
use witness_scan::decoder::{decode_transaction, DecodeError};

use crate::common::{
    display_hash, legacy_two_in_one_out, p2wpkh_script, png_payload, segwit_png_transaction,
    TxBuilder,
};

#[test]
fn test_legacy_transaction_fields() {
    let bytes = legacy_two_in_one_out().lock_time(500_000).build();
    let tx = decode_transaction(&bytes).unwrap();

    assert_eq!(tx.version, 2);
    assert!(!tx.has_witness);
    assert!(tx.witnesses.is_empty());
    assert_eq!(tx.inputs.len(), 2);
    assert_eq!(tx.inputs[0].prev_txid, [0x01; 32]);
    assert_eq!(tx.inputs[1].prev_vout, 1);
    assert_eq!(tx.inputs[0].script_sig, vec![0x00]);
    assert_eq!(tx.inputs[0].sequence, 0xFFFF_FFFF);
    assert_eq!(tx.outputs.len(), 1);
    assert_eq!(tx.outputs[0].value, 50_000);
    assert_eq!(tx.outputs[0].script_pubkey, p2wpkh_script());
    assert_eq!(tx.lock_time, 500_000);
    assert_eq!(tx.size, bytes.len());
    assert!(!tx.is_coinbase());
}

#[test]
fn test_legacy_txid_equals_wtxid() {
    let bytes = legacy_two_in_one_out().build();
    let tx = decode_transaction(&bytes).unwrap();

    assert_eq!(tx.txid_hex(), display_hash(&bytes));
    assert_eq!(tx.txid, tx.wtxid);
}

#[test]
fn test_segwit_txid_excludes_witness() {
    let builder = segwit_png_transaction();
    let full = builder.build();
    let stripped = builder.build_stripped();
    let tx = decode_transaction(&full).unwrap();

    assert!(tx.has_witness);
    assert_eq!(tx.witnesses.len(), tx.inputs.len());
    assert_eq!(tx.witness(0), &[png_payload(100)][..]);
    assert!(tx.witness(1).is_empty());
    assert!(tx.witness(7).is_empty());

    assert_eq!(tx.txid_hex(), display_hash(&stripped));
    assert_eq!(tx.wtxid_hex(), display_hash(&full));
    assert_ne!(tx.txid, tx.wtxid);
    assert_eq!(tx.size, full.len());
}

#[test]
fn test_witness_does_not_change_txid() {
    let legacy = decode_transaction(&legacy_two_in_one_out().build()).unwrap();
    let segwit = decode_transaction(&segwit_png_transaction().build()).unwrap();
    assert_eq!(legacy.txid, segwit.txid);
}

#[test]
fn test_empty_witness_items_preserved() {
    let bytes = TxBuilder::new()
        .input(0x09, 0, &[])
        .output(1, &[0x51])
        .witness(vec![Vec::new(), vec![0xAB], Vec::new()])
        .build();
    let tx = decode_transaction(&bytes).unwrap();
    assert_eq!(tx.witness(0), &[vec![], vec![0xAB], vec![]][..]);
}

#[test]
fn test_trailing_bytes_rejected() {
    let mut bytes = legacy_two_in_one_out().build();
    bytes.extend_from_slice(&[0xDE, 0xAD]);
    assert_eq!(
        decode_transaction(&bytes),
        Err(DecodeError::TrailingBytes { trailing: 2 })
    );
}

#[test]
fn test_truncated_transaction() {
    let bytes = legacy_two_in_one_out().build();
    for cut in [3, 10, bytes.len() - 1] {
        assert!(
            Transaction::from_bytes(&bytes[..cut]).is_err(),
            "truncation at {} should fail",
            cut
        );
    }
}

#[test]
fn test_oversized_script_length() {
    // version, 1 input, outpoint, script length 0xFD 0xFFFF with nothing behind it
    let mut bytes = 1i32.to_le_bytes().to_vec();
    bytes.push(0x01);
    bytes.extend_from_slice(&[0u8; 36]);
    bytes.extend_from_slice(&[0xFD, 0xFF, 0xFF]);
    bytes.extend_from_slice(&[0u8; 4]);

    let err = decode_transaction(&bytes).unwrap_err();
    assert_eq!(
        err,
        DecodeError::LengthOverrun {
            offset: 41,
            value: 0xFFFF,
            remaining: 4
        }
    );
}
