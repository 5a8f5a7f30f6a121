use witness_scan::decoder::decode_transaction;
use witness_scan::decoder::script::opcodes::{OP_0, OP_CHECKSIG, OP_ENDIF, OP_IF, OP_RETURN};
use witness_scan::extraction::{
    extract_from_blob, extract_from_transaction, ContentLocation, ExtractionMethod,
};
use witness_scan::types::content_detection::{
    locate_image, ContentFormat, ImageFormat, TextFormat,
};

use crate::common::{minimal_png, png_payload, TxBuilder};

fn push(script: &mut Vec<u8>, data: &[u8]) {
    script.push(data.len() as u8);
    script.extend_from_slice(data);
}

#[test]
fn test_envelope_declared_type_reported() {
    let mut script = Vec::new();
    push(&mut script, &[0x33; 32]);
    script.extend_from_slice(&[OP_CHECKSIG, OP_0, OP_IF]);
    push(&mut script, b"ord");
    push(&mut script, &[0x01]);
    push(&mut script, b"text/plain;charset=utf-8");
    script.push(OP_0);
    push(&mut script, b"gm from the envelope");
    script.push(OP_ENDIF);

    let content = extract_from_blob(&script).unwrap();
    assert_eq!(content.method, ExtractionMethod::Envelope);
    assert_eq!(content.format, ContentFormat::Text(TextFormat::PlainText));
    assert_eq!(content.declared_type.as_deref(), Some("text/plain;charset=utf-8"));
    assert_eq!(content.data, b"gm from the envelope".to_vec());
}

#[test]
fn test_op_return_text() {
    let mut script = vec![OP_RETURN];
    push(&mut script, b"hello from an output");

    let content = extract_from_blob(&script).unwrap();
    assert_eq!(content.method, ExtractionMethod::PushData);
    assert_eq!(content.data, b"hello from an output".to_vec());
}

#[test]
fn test_short_text_ignored() {
    let mut script = vec![OP_RETURN];
    push(&mut script, b"hi");
    assert!(extract_from_blob(&script).is_none());
}

#[test]
fn test_opaque_blobs_ignored() {
    // DER-like signature and compressed pubkey
    let mut signature = vec![0x30, 0x44, 0x02, 0x20];
    signature.extend_from_slice(&[0x8F; 32]);
    signature.extend_from_slice(&[0x02, 0x20]);
    signature.extend_from_slice(&[0x91; 32]);
    signature.push(0x01);
    let mut pubkey = vec![0x02];
    pubkey.extend_from_slice(&[0xC4; 32]);

    assert!(extract_from_blob(&signature).is_none());
    assert!(extract_from_blob(&pubkey).is_none());
    assert!(extract_from_blob(&[]).is_none());
}

#[test]
fn test_degenerate_inputs_yield_nothing() {
    let zeros = vec![0u8; 256];
    for blob in [&[][..], &[0x89, 0x50][..], &[0xFF][..], &zeros[..]] {
        assert!(locate_image(blob).is_none());
        assert!(extract_from_blob(blob).is_none());
    }
}

#[test]
fn test_locations_in_scan_order() {
    let mut op_return = vec![OP_RETURN];
    push(&mut op_return, b"output side message");

    let bytes = TxBuilder::new()
        .input(0x05, 0, &[])
        .input(0x06, 0, &[])
        .output(0, &op_return)
        .witness(vec![vec![0x01], minimal_png()])
        .witness(vec![png_payload(40)])
        .build();
    let tx = decode_transaction(&bytes).unwrap();
    let contents = extract_from_transaction(&tx);

    let locations: Vec<ContentLocation> = contents.iter().map(|c| c.location).collect();
    assert_eq!(
        locations,
        vec![
            ContentLocation::Witness { input: 0, item: 1 },
            ContentLocation::Witness { input: 1, item: 0 },
            ContentLocation::ScriptPubkey { output: 0 },
        ]
    );
    assert!(contents.iter().all(|c| c.txid == tx.txid_hex()));
    assert_eq!(contents[0].format, ContentFormat::Image(ImageFormat::Png));
    assert_eq!(contents[0].data, minimal_png());
    assert_eq!(contents[2].location.label(), "spk0");
    assert_eq!(contents[0].location.label(), "w0_1");
}
