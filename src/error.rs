//! # OpenThings Error Handling
//!
//! This module defines the OpenThingsError enum, which represents the different
//! error types that can occur in the openthings-rs crate.

use thiserror::Error;

use crate::radio::TransceiverError;

/// Represents the different error types that can occur in the OpenThings crate.
#[derive(Debug, Error)]
pub enum OpenThingsError {
    /// Indicates a frame length byte outside the valid 10..=66 range.
    #[error("Frame length {0} outside valid range 10..=66")]
    FrameLength(u8),

    /// Indicates the recomputed CRC did not match the trailing CRC bytes.
    #[error("CRC mismatch: expected {expected:#06x}, calculated {calculated:#06x}")]
    CrcMismatch { expected: u16, calculated: u16 },

    /// Indicates a raw buffer shorter than its length byte declares.
    #[error("Truncated frame: {have} bytes present, {need} declared")]
    TruncatedFrame { have: usize, need: usize },

    /// Indicates an attempt to encode a record for an unsupported command.
    #[error("Unknown command: {0:#04x}")]
    UnknownCommand(u8),

    /// Indicates a cache attempt against a product that never listens
    /// or listens continuously (no cached delivery needed or possible).
    #[error("Product {0:#04x} does not accept cached commands")]
    DeviceNotCacheable(u8),

    /// Indicates a cancel (command 0) against a device never seen.
    #[error("Cannot cancel a command for an unknown device")]
    CancelUnknownDevice,

    /// Indicates the radio gate could not be acquired.
    #[error("Radio lock unavailable: {0}")]
    LockUnavailable(String),

    /// Indicates the device registry is full.
    #[error("Device registry full ({0} devices)")]
    CapacityExceeded(usize),

    /// Indicates an operation before the radio was brought up.
    #[error("Radio not initialized")]
    NotInitialized,

    /// Indicates a failure reported by the transceiver collaborator.
    #[error("Transceiver error: {0}")]
    Transceiver(#[from] TransceiverError),

    /// Indicates a nom parsing error in the record region.
    #[error("Record parse error: {0}")]
    RecordParse(String),
}
