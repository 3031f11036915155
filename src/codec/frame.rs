//! Frame building and two-stage frame decoding.
//!
//! A frame on the air is `[count, mfrId, productId, pip, deviceId, records,
//! terminator, crc]` where `count` excludes itself. Everything from the
//! device id onward (CRC included) is whitened with the keystream seeded by
//! the plaintext `pip`; the CRC itself is computed over the plaintext from
//! the device id up to (not including) the CRC bytes.
//!
//! Decoding is split in two stages. [`VerifiedFrame::decode`] undoes the
//! whitening, reads the header and checks the CRC; [`VerifiedFrame::records`]
//! parses the body. The split exists because the receive path has to look at
//! the frame's origin (and its first parameter) before it commits to a full
//! record parse.

use rand::Rng;

use crate::codec::cipher::crypt_region;
use crate::codec::command::encode_command;
use crate::codec::crc::{calculate_crc, verify_crc};
use crate::codec::record::{parse_records, Record, RECORD_TERMINATOR};
use crate::constants::*;
use crate::error::OpenThingsError;

/// Header bytes before the encrypted region.
const HEADER_LEN: usize = IDX_DEVICE_ID;

/// Build an encrypted command frame with a caller-supplied nonce.
///
/// Fixing the nonce fixes the whole ciphertext, which is what the join
/// acknowledgement relies on and what deterministic tests want.
pub fn build_frame_with_pip(
    product_id: u8,
    device_id: u32,
    pip: u16,
    command: u8,
    value: f32,
) -> Result<Vec<u8>, OpenThingsError> {
    let record = encode_command(command, value)?;
    // count byte + header + body + terminator + CRC
    let msglen = HEADER_LEN + 3 + record.len() + 3;

    let mut frame = Vec::with_capacity(msglen);
    frame.push((msglen - 1) as u8);
    frame.push(ENERGENIE_MFRID);
    frame.push(product_id);
    frame.extend_from_slice(&pip.to_be_bytes());
    frame.push((device_id >> 16) as u8);
    frame.push((device_id >> 8) as u8);
    frame.push(device_id as u8);
    frame.extend_from_slice(&record);
    frame.push(RECORD_TERMINATOR);

    let crc = calculate_crc(&frame[IDX_DEVICE_ID..]);
    frame.extend_from_slice(&crc.to_be_bytes());
    crypt_region(pip, &mut frame[IDX_DEVICE_ID..]);

    Ok(frame)
}

/// Build an encrypted command frame with a fresh random nonce.
pub fn build_frame(
    product_id: u8,
    device_id: u32,
    command: u8,
    value: f32,
) -> Result<Vec<u8>, OpenThingsError> {
    let pip: u16 = rand::thread_rng().gen();
    build_frame_with_pip(product_id, device_id, pip, command, value)
}

/// Build the fixed join acknowledgement frame for a device.
///
/// The ACK always carries a single no-data JOIN record and is whitened with
/// the well-known nonce, matching what the commercial gateway transmits.
pub fn join_ack_frame(product_id: u8, device_id: u32) -> Vec<u8> {
    let mut frame = vec![
        12,
        ENERGENIE_MFRID,
        product_id,
        (CRYPT_PIP >> 8) as u8,
        CRYPT_PIP as u8,
        (device_id >> 16) as u8,
        (device_id >> 8) as u8,
        device_id as u8,
        PARAM_JOIN,
        0x00,
        RECORD_TERMINATOR,
    ];

    let crc = calculate_crc(&frame[IDX_DEVICE_ID..]);
    frame.extend_from_slice(&crc.to_be_bytes());
    crypt_region(CRYPT_PIP, &mut frame[IDX_DEVICE_ID..]);

    frame
}

/// A frame that passed length and CRC checks, with its body decrypted but
/// its records not yet parsed.
#[derive(Debug, Clone)]
pub struct VerifiedFrame {
    pub mfr_id: u8,
    pub product_id: u8,
    pub pip: u16,
    pub device_id: u32,
    payload: Vec<u8>,
}

impl VerifiedFrame {
    /// Decrypt and verify a raw frame as it came off the air.
    ///
    /// `raw[0]` is the count byte; anything past `raw[count]` is ignored so
    /// fixed-size receive buffers can be handed in directly.
    pub fn decode(raw: &[u8]) -> Result<Self, OpenThingsError> {
        let count = *raw.first().ok_or(OpenThingsError::TruncatedFrame {
            have: 0,
            need: usize::from(MIN_FRAME_LENGTH) + 1,
        })?;
        if !(MIN_FRAME_LENGTH..=MAX_FRAME_LENGTH).contains(&count) {
            return Err(OpenThingsError::FrameLength(count));
        }
        let len = usize::from(count);
        if raw.len() < len + 1 {
            return Err(OpenThingsError::TruncatedFrame {
                have: raw.len(),
                need: len + 1,
            });
        }

        let mut payload = raw[..=len].to_vec();
        let mfr_id = payload[IDX_MFRID];
        let product_id = payload[IDX_PRODUCT_ID];
        let pip = u16::from_be_bytes([payload[IDX_PIP], payload[IDX_PIP + 1]]);

        crypt_region(pip, &mut payload[IDX_DEVICE_ID..]);

        let device_id = (u32::from(payload[IDX_DEVICE_ID]) << 16)
            | (u32::from(payload[IDX_DEVICE_ID + 1]) << 8)
            | u32::from(payload[IDX_DEVICE_ID + 2]);

        let expected = u16::from_be_bytes([payload[len - 1], payload[len]]);
        verify_crc(&payload[IDX_DEVICE_ID..len - 1], expected).map_err(
            |(expected, calculated)| OpenThingsError::CrcMismatch {
                expected,
                calculated,
            },
        )?;

        Ok(VerifiedFrame {
            mfr_id,
            product_id,
            pip,
            device_id,
            payload,
        })
    }

    /// First byte of the record region: the parameter id of the first
    /// record, or the terminator for an empty body.
    pub fn first_param(&self) -> u8 {
        self.payload[IDX_FIRST_RECORD]
    }

    /// Parse the record region.
    pub fn records(&self) -> Result<Vec<Record>, OpenThingsError> {
        let end = self.payload.len() - 2;
        parse_records(&self.payload[IDX_FIRST_RECORD..end])
    }
}
