//! # Utility Modules
//!
//! Common helpers used throughout the openthings-rs crate: hex
//! encoding/decoding for frame dumps and CLI input, and rate-limited
//! logging for the noisy receive path.

pub mod hex;
pub mod logging;

// Re-export commonly used types and functions
pub use hex::{decode_hex, encode_hex, format_hex_compact, hex_to_bytes, parse_hex_lenient};
pub use logging::{log_frame_hex, LogThrottle};
