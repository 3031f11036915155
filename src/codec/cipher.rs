//! # OpenThings Stream Cipher
//!
//! The body of an OpenThings frame (device id through the trailing CRC) is
//! obscured with a 16-bit LFSR stream cipher keyed by a fixed manufacturer
//! constant and the per-frame PIP nonce from the header. Encryption and
//! decryption are the same operation (XOR symmetry), but the keystream
//! evolves independently of the data, so a region must always be processed
//! in order from its first byte.

use crate::constants::CRYPT_PID;

/// LFSR feedback mask applied when the low bit is set
const FEEDBACK: u16 = 0xF5B5;

/// Whitening constant XORed into every output byte
const WHITEN: u8 = 0x5A;

/// Rounds of LFSR evolution per processed byte
const ROUNDS_PER_BYTE: u32 = 5;

/// Keystream state for one frame body.
///
/// Seeded once per frame; [`Cipher::process`] walks the region in place.
#[derive(Debug, Clone)]
pub struct Cipher {
    state: u16,
}

impl Cipher {
    /// Seed the keystream from the fixed manufacturer constant and the
    /// frame's PIP nonce.
    pub fn new(pip: u16) -> Self {
        Self {
            state: ((CRYPT_PID as u16) << 8) ^ pip,
        }
    }

    /// En/decrypt one byte, advancing the keystream.
    pub fn process_byte(&mut self, data: u8) -> u8 {
        for _ in 0..ROUNDS_PER_BYTE {
            if self.state & 0x01 != 0 {
                self.state = (self.state >> 1) ^ FEEDBACK;
            } else {
                self.state >>= 1;
            }
        }
        (self.state as u8) ^ data ^ WHITEN
    }

    /// En/decrypt a whole region in place.
    pub fn process(&mut self, region: &mut [u8]) {
        for byte in region.iter_mut() {
            *byte = self.process_byte(*byte);
        }
    }
}

/// One-shot helper: en/decrypt `region` in place under `pip`.
pub fn crypt_region(pip: u16, region: &mut [u8]) {
    Cipher::new(pip).process(region);
}
