//! # openthings-rs - A Rust Crate for the OpenThings RF Protocol
//!
//! The openthings-rs crate implements the OpenThings protocol as spoken by
//! Energenie MiHome devices over 433 MHz FSK: smart plugs, whole-house
//! monitors, radiator valves, thermostats and door/motion sensors.
//!
//! ## Features
//!
//! - Build, encrypt and CRC-protect command frames; decode and verify
//!   received ones into typed records
//! - Track every device heard or commanded in a session registry, with
//!   per-product behavioral handling
//! - Cache commands for battery devices that only listen for a moment
//!   after transmitting, and deliver them into that window automatically
//! - Monitor the air continuously from a background thread
//! - Discover devices and acknowledge join requests
//! - Drive any radio through the [`radio::Transceiver`] trait; a mock
//!   transceiver ships for tests and hardware-free development
//!
//! ## Usage
//!
//! To use the openthings-rs crate in your Rust project, add the following
//! to your Cargo.toml file:
//!
//! ```toml
//! [dependencies]
//! openthings-rs = "1.0.0"
//! ```
//!
//! Then, in your Rust code, you can import the necessary modules and
//! functions:
//!
//! ```rust
//! use openthings_rs::{
//!     build_command_frame, decode_frame, init_logger, log_info,
//!     EngineConfig, OpenThingsEngine, OpenThingsError, Reading, Value,
//! };
//! ```

pub mod cache;
pub mod codec;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod logging;
pub mod radio;
pub mod reading;
pub mod registry;
pub mod util;

pub use crate::error::OpenThingsError;
pub use crate::logging::{init_logger, log_info};

// Core protocol types
pub use codec::{build_frame, build_frame_with_pip, VerifiedFrame};
pub use config::EngineConfig;
pub use engine::OpenThingsEngine;
pub use reading::{Reading, Value};

// Device registry views
pub use registry::{ControlClass, DeviceEntry};

// Radio abstraction
pub use radio::{MockTransceiver, Transceiver};

/// Decode and verify one raw frame as it came off the air.
///
/// # Arguments
/// * `raw` - Frame bytes starting at the count byte; trailing buffer
///   padding past the counted length is ignored
///
/// # Returns
/// * `Ok(VerifiedFrame)` - Decrypted frame with a valid CRC
/// * `Err(OpenThingsError)` - Too short, bad length or failed CRC
pub fn decode_frame(raw: &[u8]) -> Result<VerifiedFrame, OpenThingsError> {
    VerifiedFrame::decode(raw)
}

/// Build an encrypted command frame ready for transmission.
///
/// # Arguments
/// * `product_id` - Product the target device identifies as
/// * `device_id` - 24-bit device id
/// * `command` - Command parameter id (e.g. SWITCH_STATE)
/// * `value` - Command argument; encoded in the smallest fitting record
///
/// # Returns
/// * `Ok(Vec<u8>)` - Complete frame including count byte and CRC
/// * `Err(OpenThingsError)` - The command id is not one we can encode
pub fn build_command_frame(
    product_id: u8,
    device_id: u32,
    command: u8,
    value: f32,
) -> Result<Vec<u8>, OpenThingsError> {
    build_frame(product_id, device_id, command, value)
}
