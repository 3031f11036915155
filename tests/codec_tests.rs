//! Wire-format tests exercising frame build and decode through the public
//! API: layout of built frames, the decode error taxonomy, and record
//! parsing edge cases that matter on a noisy band.

use openthings_rs::codec::crc::calculate_crc;
use openthings_rs::codec::frame::join_ack_frame;
use openthings_rs::codec::record::RecordValue;
use openthings_rs::codec::{build_frame_with_pip, parse_records};
use openthings_rs::constants::{
    CMD_SWITCH_STATE, CMD_TARGET_TEMP, DEFAULT_DEVICE_ID, ENERGENIE_MFRID, MAX_FRAME_LENGTH,
    MIN_FRAME_LENGTH, PARAM_JOIN, PRODUCT_ETRV, PRODUCT_SMART_PLUG,
};
use openthings_rs::util::{encode_hex, hex_to_bytes};
use openthings_rs::{build_command_frame, decode_frame, OpenThingsError};

const DEVICE_ID: u32 = 0x00_20_66;

#[test]
fn test_switch_frame_layout() {
    let frame =
        build_frame_with_pip(PRODUCT_SMART_PLUG, DEVICE_ID, 0x4D5E, CMD_SWITCH_STATE, 1.0)
            .unwrap();

    // Count byte + 13 counted bytes; the header area stays in clear.
    assert_eq!(frame.len(), 14);
    assert_eq!(frame[0], 13);
    assert_eq!(frame[1], ENERGENIE_MFRID);
    assert_eq!(frame[2], PRODUCT_SMART_PLUG);
    assert_eq!(&frame[3..5], &[0x4D, 0x5E]);

    let decoded = decode_frame(&frame).unwrap();
    assert_eq!(decoded.mfr_id, ENERGENIE_MFRID);
    assert_eq!(decoded.product_id, PRODUCT_SMART_PLUG);
    assert_eq!(decoded.pip, 0x4D5E);
    assert_eq!(decoded.device_id, DEVICE_ID);

    let records = decoded.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].param_id, CMD_SWITCH_STATE);
    assert!(records[0].is_command);
    assert_eq!(records[0].value, RecordValue::Int(1));
}

#[test]
fn test_device_id_and_body_are_whitened() {
    let frame =
        build_frame_with_pip(PRODUCT_ETRV, 0x05_EB_44, 0x0100, CMD_TARGET_TEMP, 21.5).unwrap();

    // The device id bytes on the wire must not be the plain id, or every
    // frame from one device would share a long cleartext run.
    assert_ne!(&frame[5..8], &[0x05, 0xEB, 0x44]);
    assert_eq!(decode_frame(&frame).unwrap().device_id, 0x05_EB_44);
}

#[test]
fn test_pip_changes_ciphertext_not_meaning() {
    let a = build_frame_with_pip(PRODUCT_ETRV, DEVICE_ID, 0x0001, CMD_TARGET_TEMP, 19.0).unwrap();
    let b = build_frame_with_pip(PRODUCT_ETRV, DEVICE_ID, 0xBEEF, CMD_TARGET_TEMP, 19.0).unwrap();

    assert_ne!(a[5..], b[5..]);
    let da = decode_frame(&a).unwrap();
    let db = decode_frame(&b).unwrap();
    assert_eq!(da.device_id, db.device_id);
    assert_eq!(
        da.records().unwrap()[0].as_int(),
        db.records().unwrap()[0].as_int()
    );
}

#[test]
fn test_decode_rejects_empty_input() {
    match decode_frame(&[]) {
        Err(OpenThingsError::TruncatedFrame { have: 0, .. }) => {}
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_decode_rejects_bad_count_byte() {
    // Count below the smallest possible frame.
    let err = decode_frame(&[MIN_FRAME_LENGTH - 1; 16]).unwrap_err();
    assert!(matches!(err, OpenThingsError::FrameLength(_)));

    // Count above the largest the radio can carry.
    let mut oversized = vec![0u8; 80];
    oversized[0] = MAX_FRAME_LENGTH + 1;
    let err = decode_frame(&oversized).unwrap_err();
    assert!(matches!(
        err,
        OpenThingsError::FrameLength(n) if n == MAX_FRAME_LENGTH + 1
    ));
}

#[test]
fn test_decode_rejects_short_buffer() {
    let frame = build_command_frame(PRODUCT_SMART_PLUG, DEVICE_ID, CMD_SWITCH_STATE, 1.0).unwrap();
    let err = decode_frame(&frame[..frame.len() - 3]).unwrap_err();
    match err {
        OpenThingsError::TruncatedFrame { have, need } => {
            assert_eq!(have, frame.len() - 3);
            assert_eq!(need, frame.len());
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_decode_ignores_buffer_padding() {
    // Fixed-size receive buffers hand over trailing garbage; only the
    // counted bytes matter.
    let mut padded =
        build_frame_with_pip(PRODUCT_SMART_PLUG, DEVICE_ID, 0x1234, CMD_SWITCH_STATE, 0.0)
            .unwrap();
    padded.extend_from_slice(&[0xAA; 53]);
    let decoded = decode_frame(&padded).unwrap();
    assert_eq!(decoded.device_id, DEVICE_ID);
}

#[test]
fn test_corruption_anywhere_in_body_fails_crc() {
    let frame =
        build_frame_with_pip(PRODUCT_ETRV, DEVICE_ID, 0x7788, CMD_TARGET_TEMP, 22.0).unwrap();
    for i in 5..frame.len() {
        let mut corrupted = frame.clone();
        corrupted[i] ^= 0x40;
        let err = decode_frame(&corrupted).unwrap_err();
        assert!(
            matches!(err, OpenThingsError::CrcMismatch { .. }),
            "byte {i} corruption produced {err:?}"
        );
    }
}

#[test]
fn test_crc_xmodem_check_value() {
    // The well-known CRC-16/XMODEM check value.
    assert_eq!(calculate_crc(b"123456789"), 0x31C3);
    assert_eq!(calculate_crc(&[]), 0x0000);
}

#[test]
fn test_join_ack_frame_shape() {
    let frame = join_ack_frame(PRODUCT_ETRV, 0x00_0C_8D);
    assert_eq!(frame.len(), 13);
    assert_eq!(frame[0], 12);
    // Acknowledgments use the fixed well-known nonce.
    assert_eq!(&frame[3..5], &[0x01, 0x00]);

    let decoded = decode_frame(&frame).unwrap();
    assert_eq!(decoded.device_id, 0x00_0C_8D);
    let records = decoded.records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].param_id, PARAM_JOIN);
    assert_eq!(records[0].value, RecordValue::None);
}

#[test]
fn test_join_ack_golden_bytes() {
    // Byte-exact acknowledgment for the default device id. Hand-derived:
    // plaintext body 00 20 66 6a 00 00 carries CRC 0x2A55, then the whole
    // region is whitened under the keystream seeded from the fixed nonce.
    let frame = join_ack_frame(PRODUCT_ETRV, DEFAULT_DEVICE_ID);
    assert_eq!(frame, hex_to_bytes("0c 04 03 01 00 c2 9c e8 c1 dd 18 eb 25"));
    assert_eq!(encode_hex(&frame), "0c04030100c29ce8c1dd18eb25");
}

#[test]
fn test_multi_record_region_parses_in_order() {
    let records = parse_records(&[
        0x74, 0x92, 0x16, 0x80, // TEMPERATURE 22.5
        0x76, 0x22, 0x03, 0x20, // VOLTAGE 3.125
        0x66, 0x02, 0x01, 0xF4, // FREQUENCY raw 500
        0x00,
    ])
    .unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].name, "TEMPERATURE");
    assert_eq!(records[0].as_float(), 22.5);
    assert_eq!(records[1].name, "VOLTAGE");
    assert_eq!(records[1].as_float(), 3.125);
    assert_eq!(records[2].name, "FREQUENCY");
    assert_eq!(records[2].as_int(), 500);
}

#[test]
fn test_negative_fixed_point_temperature() {
    // Signed fixed point, high bit set: 0xEC00 = -5120/256 = -20.0
    let records = parse_records(&[0x74, 0x92, 0xEC, 0x00, 0x00]).unwrap();
    assert_eq!(records[0].as_float(), -20.0);
    assert_eq!(records[0].as_int(), -5120);
}

#[test]
fn test_three_byte_signed_int_sign_extends() {
    // A 24-bit -1 must not surface as 16777215.
    let records = parse_records(&[0x21, 0x83, 0xFF, 0xFF, 0xFF, 0x00]).unwrap();
    assert_eq!(records[0].as_int(), -1);
}

#[test]
fn test_record_region_without_terminator_still_parses() {
    // Some firmware revisions drop the terminator when the body is full;
    // running out of region ends the record run the same way.
    let records = parse_records(&[0x74, 0x92, 0x16, 0x80]).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].as_float(), 22.5);
}

#[test]
fn test_record_length_overrunning_region_is_rejected() {
    // Claims 9 value bytes with only 2 present.
    let err = parse_records(&[0x74, 0x09, 0x16, 0x80, 0x00]).unwrap_err();
    assert!(matches!(err, OpenThingsError::RecordParse(_)));
}

#[test]
fn test_empty_record_region_yields_no_records() {
    let records = parse_records(&[0x00]).unwrap();
    assert!(records.is_empty());
}
