//! Cached commands for small-receive-window devices.
//!
//! Battery devices listen for a couple of hundred milliseconds after they
//! transmit and are deaf otherwise. A command for one is therefore built
//! in full at request time and parked here; the receive path injects it
//! the moment a frame from the device decodes, which is the only proof
//! the window is open.

use std::sync::{Mutex, PoisonError};

/// A pre-built command frame waiting for its device's receive window.
#[derive(Debug, Clone)]
pub struct CachedCommand {
    /// Whole encrypted frame, ready for the transmitter
    frame: Vec<u8>,
    /// Command id; 0 while nothing is outstanding
    pub command: u8,
    /// Value the command carried, kept for assumed-effect reporting
    pub data: f32,
    /// Remaining transmit attempts
    pub retries: u8,
    /// False until the device has been heard from (pre-cached placeholder)
    pub active: bool,
}

impl CachedCommand {
    /// Empty slot for a device created from a received frame.
    pub fn new() -> Self {
        CachedCommand {
            frame: Vec::new(),
            command: 0,
            data: 0.0,
            retries: 0,
            active: true,
        }
    }

    /// True while a command is waiting to be transmitted.
    pub fn outstanding(&self) -> bool {
        self.retries > 0
    }

    /// Park a new command, replacing whatever was there.
    pub fn store(&mut self, frame: Vec<u8>, command: u8, data: f32, retries: u8) {
        self.frame = frame;
        self.command = command;
        self.data = data;
        self.retries = retries;
    }

    /// Drop the outstanding command. The frame bytes stay until the next
    /// store; a zero command and retry count make them inert.
    pub fn clear(&mut self) {
        self.command = 0;
        self.retries = 0;
    }

    pub fn frame(&self) -> &[u8] {
        &self.frame
    }
}

impl Default for CachedCommand {
    fn default() -> Self {
        CachedCommand::new()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    active: u32,
    pre_cached: u32,
}

/// Counts of outstanding cached commands across all devices, split by
/// whether the owning device has ever been heard from.
///
/// The decode path consults these on every frame and the receive loop
/// picks its sleep interval from them, so they live under their own small
/// lock rather than the radio gate or the registry.
#[derive(Debug, Default)]
pub struct CacheCounters {
    counts: Mutex<Counts>,
}

impl CacheCounters {
    pub fn new() -> Self {
        CacheCounters::default()
    }

    fn locked(&self) -> std::sync::MutexGuard<'_, Counts> {
        // a poisoned counter lock only means a panic elsewhere; the counts
        // themselves are still usable
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one more outstanding command.
    pub fn add(&self, active: bool) {
        let mut counts = self.locked();
        if active {
            counts.active += 1;
        } else {
            counts.pre_cached += 1;
        }
    }

    /// Record one command gone: transmitted out, acknowledged or canceled.
    pub fn remove(&self, active: bool) {
        let mut counts = self.locked();
        if active {
            counts.active = counts.active.saturating_sub(1);
        } else {
            counts.pre_cached = counts.pre_cached.saturating_sub(1);
        }
    }

    /// Reclassify one pre-cached command as active, once its device has
    /// been heard from.
    pub fn promote(&self) {
        let mut counts = self.locked();
        counts.pre_cached = counts.pre_cached.saturating_sub(1);
        counts.active += 1;
    }

    /// Commands outstanding for devices known to be alive.
    pub fn active(&self) -> u32 {
        self.locked().active
    }

    /// Commands outstanding for devices never yet heard from.
    pub fn pre_cached(&self) -> u32 {
        self.locked().pre_cached
    }

    /// True when any command is outstanding at all.
    pub fn any_outstanding(&self) -> bool {
        let counts = self.locked();
        counts.active > 0 || counts.pre_cached > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_slot_is_active_and_idle() {
        let slot = CachedCommand::new();
        assert!(slot.active);
        assert!(!slot.outstanding());
        assert!(slot.frame().is_empty());
    }

    #[test]
    fn test_store_and_clear() {
        let mut slot = CachedCommand::new();
        slot.store(vec![0x0D, 0x04, 0x03], 0xF4, 21.5, 10);
        assert!(slot.outstanding());
        assert_eq!(slot.command, 0xF4);

        slot.clear();
        assert!(!slot.outstanding());
        assert_eq!(slot.command, 0);
        // frame bytes linger but are unreachable without retries
        assert_eq!(slot.frame(), [0x0D, 0x04, 0x03]);
    }

    #[test]
    fn test_counter_add_remove() {
        let counters = CacheCounters::new();
        assert!(!counters.any_outstanding());

        counters.add(true);
        counters.add(false);
        assert_eq!(counters.active(), 1);
        assert_eq!(counters.pre_cached(), 1);
        assert!(counters.any_outstanding());

        counters.remove(true);
        counters.remove(false);
        assert!(!counters.any_outstanding());
    }

    #[test]
    fn test_counter_promotion() {
        let counters = CacheCounters::new();
        counters.add(false);
        counters.promote();
        assert_eq!(counters.active(), 1);
        assert_eq!(counters.pre_cached(), 0);
    }

    #[test]
    fn test_counter_removal_saturates() {
        let counters = CacheCounters::new();
        counters.remove(true);
        counters.remove(false);
        assert_eq!(counters.active(), 0);
        assert_eq!(counters.pre_cached(), 0);
    }
}
