//! Serialized access to the transceiver.
//!
//! Exactly one thread may drive the radio at a time: a transmit in the
//! middle of someone else's mode switch corrupts both. The gate wraps the
//! backend in a mutex and hands out a [`RadioGuard`], which is the only
//! type with radio methods on it, so holding the lock is visible in the
//! signatures instead of being a calling convention.
//!
//! The gate also carries the two bits of state the hardware itself cannot:
//! whether the backend has been brought up (it is initialized lazily on
//! first lock) and whether any caller has ever asked for monitor-mode
//! receive, which latches the board into keeping its FIFO drained from
//! then on.

use std::sync::{Mutex, MutexGuard};

use crate::error::OpenThingsError;
use crate::radio::ring::{ReceivedFrame, RxRing};
use crate::radio::{Modulation, OperatingMode, Transceiver};

/// Why the caller wants the receive FIFO drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// Clearing stale frames ahead of a transmit; only drains when some
    /// caller has previously latched monitoring.
    Control,
    /// Receiving telemetry; latches monitoring on.
    Monitor,
    /// One-off discovery listen; drains without latching.
    Learn,
}

struct GateInner {
    transceiver: Box<dyn Transceiver>,
    initialized: bool,
    monitoring: bool,
}

/// Mutex around the transceiver backend.
pub struct RadioGate {
    inner: Mutex<GateInner>,
}

impl RadioGate {
    pub fn new(transceiver: Box<dyn Transceiver>) -> Self {
        RadioGate {
            inner: Mutex::new(GateInner {
                transceiver,
                initialized: false,
                monitoring: false,
            }),
        }
    }

    /// Take exclusive hold of the radio, bringing it up if this is the
    /// first use. The radio parks in FSK standby after initialization.
    pub fn lock(&self) -> Result<RadioGuard<'_>, OpenThingsError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| OpenThingsError::LockUnavailable(e.to_string()))?;

        if !inner.initialized {
            log::info!("bringing up transceiver");
            inner.transceiver.initialize()?;
            inner
                .transceiver
                .set_mode(Modulation::Fsk, OperatingMode::Standby)?;
            inner.initialized = true;
        }

        Ok(RadioGuard { inner })
    }

    /// Power the radio down and mark the gate uninitialized; the next lock
    /// brings it back up. Unlike [`RadioGate::lock`] this never initializes,
    /// so shutting down a radio that was never brought up is an error.
    pub fn shutdown(&self) -> Result<(), OpenThingsError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| OpenThingsError::LockUnavailable(e.to_string()))?;

        if !inner.initialized {
            return Err(OpenThingsError::NotInitialized);
        }
        inner.transceiver.shutdown()?;
        inner.initialized = false;
        inner.monitoring = false;
        log::info!("transceiver shut down");
        Ok(())
    }
}

/// Exclusive hold of the radio; all hardware operations live here.
pub struct RadioGuard<'a> {
    inner: MutexGuard<'a, GateInner>,
}

impl RadioGuard<'_> {
    /// Move waiting frames from the hardware FIFO into `ring`.
    ///
    /// Pulls at most one ring's worth per call so a chattering transmitter
    /// cannot pin us here. Returns the number of frames moved.
    pub fn drain_into(
        &mut self,
        ring: &mut RxRing,
        mode: DrainMode,
    ) -> Result<usize, OpenThingsError> {
        if mode == DrainMode::Monitor {
            self.inner.monitoring = true;
        }
        if !self.inner.monitoring && mode != DrainMode::Learn {
            return Ok(0);
        }

        // OpenThings devices only ever transmit FSK
        self.inner
            .transceiver
            .set_mode(Modulation::Fsk, OperatingMode::Receiver)?;

        let mut pulled = 0;
        while pulled < ring.capacity() && self.inner.transceiver.frame_waiting()? {
            match self.inner.transceiver.read_frame()? {
                Some(bytes) => {
                    ring.push(ReceivedFrame::new(bytes));
                    pulled += 1;
                }
                None => break,
            }
        }

        if pulled > 0 {
            log::trace!("drained {} frame(s) from FIFO", pulled);
        }
        Ok(pulled)
    }

    /// Transmit a payload `repeats` times.
    pub fn transmit(&mut self, payload: &[u8], repeats: u8) -> Result<(), OpenThingsError> {
        self.inner.transceiver.transmit(payload, repeats)?;
        Ok(())
    }

    /// Hard-reset the radio, then park it back in FSK standby.
    pub fn reset(&mut self) -> Result<(), OpenThingsError> {
        self.inner.transceiver.reset()?;
        self.inner
            .transceiver
            .set_mode(Modulation::Fsk, OperatingMode::Standby)?;
        Ok(())
    }

    /// Whether monitor-mode receive has been latched.
    pub fn is_monitoring(&self) -> bool {
        self.inner.monitoring
    }
}
