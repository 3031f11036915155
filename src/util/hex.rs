//! # Hex Encoding/Decoding Utilities
//!
//! Helpers for turning OpenThings frames into readable hex and back,
//! used for log output, the CLI's frame-injection switches, and test
//! vectors.

use thiserror::Error;

/// Errors that can occur during hex operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Odd number of hex characters: {0}")]
    OddLength(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Encode bytes to a lowercase hex string.
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

/// Decode a hex string to bytes.
///
/// Accepts both cases; whitespace is stripped first.
pub fn decode_hex(hex_str: &str) -> Result<Vec<u8>, HexError> {
    if hex_str.is_empty() {
        return Err(HexError::EmptyString);
    }

    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.len() % 2 != 0 {
        return Err(HexError::OddLength(cleaned.len()));
    }

    hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Parse a hex string that may carry separators ("0d:04" or "0d-04").
///
/// More lenient than [`decode_hex`]: every non-hex character is dropped
/// before decoding, which suits hand-typed CLI input.
pub fn parse_hex_lenient(input: &str) -> Result<Vec<u8>, HexError> {
    let hex_chars: String = input.chars().filter(|c| c.is_ascii_hexdigit()).collect();

    if hex_chars.is_empty() {
        return Err(HexError::EmptyString);
    }

    if hex_chars.len() % 2 != 0 {
        return Err(HexError::OddLength(hex_chars.len()));
    }

    hex::decode(&hex_chars).map_err(|e| HexError::DecodeError(e.to_string()))
}

/// Format bytes as "0d 04 03" with spaces between bytes, for logs.
pub fn format_hex_compact(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build test data from a hex string. Panics on invalid hex, so this is
/// for test code only.
pub fn hex_to_bytes(hex: &str) -> Vec<u8> {
    decode_hex(hex).expect("Invalid hex in test data")
}
