//! # OpenThings Frame CRC
//!
//! CRC-16 over the plaintext body of an OpenThings frame (device id through
//! the record terminator). XMODEM-style: polynomial 0x1021, initial value 0,
//! MSB-first, no final complement. The CRC is computed before encryption on
//! build and after decryption on decode.

/// CRC-16 polynomial (CCITT)
const CRC_POLY: u16 = 0x1021;

/// Calculate the OpenThings frame CRC over `data`.
pub fn calculate_crc(data: &[u8]) -> u16 {
    let mut crc = 0u16;

    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ CRC_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

/// Verify a received CRC against the one recomputed from `data`.
///
/// Returns `Ok(())` on match, or `Err((expected, calculated))` so callers can
/// build a precise mismatch error.
pub fn verify_crc(data: &[u8], expected: u16) -> Result<(), (u16, u16)> {
    let calculated = calculate_crc(data);
    if calculated == expected {
        Ok(())
    } else {
        Err((expected, calculated))
    }
}
