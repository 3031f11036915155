//! Radio abstraction for ENER314-RT style transceiver boards.
//!
//! The protocol engine never talks to hardware directly. It goes through
//! the [`Transceiver`] trait, serialized by the [`gate::RadioGate`] so that
//! concurrent callers cannot interleave mode switches and transmissions.
//! Received frames accumulate in a [`ring::RxRing`] between polls.

pub mod gate;
pub mod mock;
pub mod ring;

use thiserror::Error;

pub use gate::{DrainMode, RadioGate, RadioGuard};
pub use mock::MockTransceiver;
pub use ring::{ReceivedFrame, RxRing};

/// Errors surfaced by transceiver backends.
#[derive(Error, Debug)]
pub enum TransceiverError {
    /// Backend could not reach the radio hardware
    #[error("hardware access failed: {0}")]
    Hardware(String),
    /// Payload exceeds what a single transmission can carry
    #[error("payload too large: {have} bytes (limit {limit})")]
    PayloadTooLarge { have: usize, limit: usize },
    /// Operation attempted in a mode that does not support it
    #[error("wrong mode for operation: {0}")]
    WrongMode(String),
}

/// Radio modulation schemes the board supports.
///
/// OpenThings telemetry and control always run FSK; OOK exists on the same
/// boards for legacy one-way sockets and stays selectable at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modulation {
    Fsk,
    Ook,
}

/// Radio operating modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// Configurable, not transferring
    Standby,
    /// Continuous receive; frames land in the hardware FIFO
    Receiver,
    /// Actively transmitting
    Transmitter,
}

/// Interface a transceiver backend has to provide.
///
/// Implementations are driven under the radio gate's lock, so they do not
/// need internal synchronization, but they must be `Send` because the
/// monitor thread polls from a different thread than command senders.
pub trait Transceiver: Send {
    /// Bring the radio up into a known state.
    ///
    /// Called once, lazily, by the gate before the first operation.
    fn initialize(&mut self) -> Result<(), TransceiverError>;

    /// Switch modulation and operating mode.
    fn set_mode(&mut self, modulation: Modulation, mode: OperatingMode)
        -> Result<(), TransceiverError>;

    /// Transmit `payload` `repeats` times back to back.
    ///
    /// The backend handles the mode round-trip itself and restores the mode
    /// that was active before the call. Battery devices listen for a short
    /// window only, which is why the same payload goes out repeatedly.
    fn transmit(&mut self, payload: &[u8], repeats: u8) -> Result<(), TransceiverError>;

    /// Whether at least one received frame is waiting in the hardware FIFO.
    fn frame_waiting(&mut self) -> Result<bool, TransceiverError>;

    /// Pull the next frame out of the hardware FIFO.
    ///
    /// # Returns
    /// * `Ok(Some(bytes))` - a frame, first byte is the count byte
    /// * `Ok(None)` - nothing waiting or the payload was unusable
    /// * `Err(_)` - the hardware could not be read
    fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransceiverError>;

    /// Hard-reset the radio.
    fn reset(&mut self) -> Result<(), TransceiverError>;

    /// Release the hardware. The gate drops its initialized state after
    /// this succeeds.
    fn shutdown(&mut self) -> Result<(), TransceiverError>;
}
