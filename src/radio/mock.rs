//! Mock transceiver for testing and bench work without a radio board.
//!
//! The mock is cloneable: hand one clone to the engine and keep another to
//! inject frames onto the simulated airwaves and inspect what got
//! transmitted.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::constants::MAX_FRAME_BYTES;
use crate::radio::{Modulation, OperatingMode, Transceiver, TransceiverError};

#[derive(Debug, Default)]
struct MockState {
    /// Frames waiting to be "received", oldest first
    airwaves: VecDeque<Vec<u8>>,
    /// Everything transmitted: payload plus repeat count
    transmitted: Vec<(Vec<u8>, u8)>,
    mode: Option<(Modulation, OperatingMode)>,
    initialized: bool,
    init_count: u32,
    reset_count: u32,
    shutdown_count: u32,
    /// Error injected into the next trait call
    next_error: Option<TransceiverError>,
}

/// Simulated transceiver backed by shared in-memory state.
#[derive(Clone, Debug)]
pub struct MockTransceiver {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockTransceiver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransceiver {
    pub fn new() -> Self {
        MockTransceiver {
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Put a frame on the simulated airwaves.
    pub fn inject_frame(&self, bytes: Vec<u8>) {
        self.state.lock().unwrap().airwaves.push_back(bytes);
    }

    /// Everything transmitted so far, as (payload, repeats) pairs.
    pub fn transmitted(&self) -> Vec<(Vec<u8>, u8)> {
        self.state.lock().unwrap().transmitted.clone()
    }

    pub fn transmit_count(&self) -> usize {
        self.state.lock().unwrap().transmitted.len()
    }

    /// Last mode set on the radio.
    pub fn mode(&self) -> Option<(Modulation, OperatingMode)> {
        self.state.lock().unwrap().mode
    }

    pub fn init_count(&self) -> u32 {
        self.state.lock().unwrap().init_count
    }

    pub fn reset_count(&self) -> u32 {
        self.state.lock().unwrap().reset_count
    }

    pub fn shutdown_count(&self) -> u32 {
        self.state.lock().unwrap().shutdown_count
    }

    /// Make the next trait call fail with `error`.
    pub fn fail_next(&self, error: TransceiverError) {
        self.state.lock().unwrap().next_error = Some(error);
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, MockState>, TransceiverError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| TransceiverError::Hardware("mock state poisoned".into()))?;
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        Ok(state)
    }
}

impl Transceiver for MockTransceiver {
    fn initialize(&mut self) -> Result<(), TransceiverError> {
        let mut state = self.locked()?;
        state.initialized = true;
        state.init_count += 1;
        Ok(())
    }

    fn set_mode(
        &mut self,
        modulation: Modulation,
        mode: OperatingMode,
    ) -> Result<(), TransceiverError> {
        let mut state = self.locked()?;
        if !state.initialized {
            return Err(TransceiverError::WrongMode("not initialized".into()));
        }
        state.mode = Some((modulation, mode));
        Ok(())
    }

    fn transmit(&mut self, payload: &[u8], repeats: u8) -> Result<(), TransceiverError> {
        if payload.len() > MAX_FRAME_BYTES {
            return Err(TransceiverError::PayloadTooLarge {
                have: payload.len(),
                limit: MAX_FRAME_BYTES,
            });
        }
        let mut state = self.locked()?;
        if !state.initialized {
            return Err(TransceiverError::WrongMode("not initialized".into()));
        }
        state.transmitted.push((payload.to_vec(), repeats));
        Ok(())
    }

    fn frame_waiting(&mut self) -> Result<bool, TransceiverError> {
        Ok(!self.locked()?.airwaves.is_empty())
    }

    fn read_frame(&mut self) -> Result<Option<Vec<u8>>, TransceiverError> {
        Ok(self.locked()?.airwaves.pop_front())
    }

    fn reset(&mut self) -> Result<(), TransceiverError> {
        let mut state = self.locked()?;
        state.reset_count += 1;
        state.mode = None;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), TransceiverError> {
        let mut state = self.locked()?;
        state.initialized = false;
        state.shutdown_count += 1;
        state.mode = None;
        Ok(())
    }
}
