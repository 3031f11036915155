//! # OpenThings Engine
//!
//! Session-level orchestration of the protocol: one engine owns the radio,
//! the receive ring, the device registry and the cached-command counters,
//! and exposes the operations a host application calls — switching, command
//! transmission, monitoring, discovery and the cached-command machinery for
//! devices that only listen briefly after they transmit.
//!
//! Locking discipline: the engine state (registry + ring) is taken before
//! the radio gate, never the other way round. The cached-command counters
//! have their own short-lived lock and are safe to touch under either.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::cache::{CacheCounters, CachedCommand};
use crate::codec::{build_frame, join_ack_frame, Record, RecordValue, VerifiedFrame};
use crate::config::EngineConfig;
use crate::constants::{
    CMD_JOIN, CMD_SET_THERMOSTAT_MODE, CMD_SWITCH_STATE, CMD_TARGET_TEMP, ENERGENIE_MFRID,
    JOIN_ACK_CMD_XMITS, JOIN_ACK_XMITS, PARAM_JOIN, PARAM_THERMOSTAT_MODE, PARAM_WAKEUP,
    PRODUCT_ETRV, PRODUCT_THERMOSTAT, RX_RING_SLOTS,
};
use crate::error::OpenThingsError;
use crate::log_warn_throttled;
use crate::radio::{DrainMode, RadioGate, RadioGuard, ReceivedFrame, RxRing, Transceiver};
use crate::reading::Reading;
use crate::registry::thermostat::assumed_effect_name;
use crate::registry::{
    product_info, ControlClass, Device, DeviceEntry, DeviceRegistry, ProductState, ThermostatMode,
    ValveState,
};
use crate::util::{log_frame_hex, LogThrottle};

/// Registry and receive ring, guarded together. Frame processing reads the
/// ring and writes the registry in one critical section, so they share a
/// lock rather than risk a torn view between the two.
struct EngineState {
    registry: DeviceRegistry,
    ring: RxRing,
}

/// The protocol engine. Cheap to share behind an [`Arc`]; every operation
/// takes `&self` and does its own locking.
pub struct OpenThingsEngine {
    state: Mutex<EngineState>,
    gate: RadioGate,
    counters: CacheCounters,
    config: EngineConfig,
    drop_warnings: Mutex<LogThrottle>,
    monitor: Mutex<Option<JoinHandle<()>>>,
    stop: AtomicBool,
}

impl OpenThingsEngine {
    /// Creates an engine over the given transceiver with default tuning.
    pub fn new(transceiver: Box<dyn Transceiver>) -> Self {
        OpenThingsEngine::with_config(transceiver, EngineConfig::default())
    }

    /// Creates an engine with explicit tuning parameters.
    pub fn with_config(transceiver: Box<dyn Transceiver>, config: EngineConfig) -> Self {
        OpenThingsEngine {
            state: Mutex::new(EngineState {
                registry: DeviceRegistry::with_capacity(config.max_devices),
                ring: RxRing::new(RX_RING_SLOTS),
            }),
            gate: RadioGate::new(transceiver),
            counters: CacheCounters::new(),
            config,
            // One noise report per couple of seconds is plenty; the 433 MHz
            // band produces an endless stream of CRC failures otherwise.
            drop_warnings: Mutex::new(LogThrottle::new(10_000, 5)),
            monitor: Mutex::new(None),
            stop: AtomicBool::new(false),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, EngineState>, OpenThingsError> {
        self.state
            .lock()
            .map_err(|e| OpenThingsError::LockUnavailable(e.to_string()))
    }

    /// Brings the radio up without transmitting anything.
    ///
    /// Initialization normally happens lazily on first use; calling this
    /// early surfaces hardware faults at startup instead of mid-session.
    /// With `hold` set the radio guard is returned still locked, so the
    /// caller can keep other threads off the air while it finishes its own
    /// setup.
    pub fn initialize(&self, hold: bool) -> Result<Option<RadioGuard<'_>>, OpenThingsError> {
        let guard = self.gate.lock()?;
        if hold {
            Ok(Some(guard))
        } else {
            Ok(None)
        }
    }

    /// Switches a mains-powered device on or off.
    ///
    /// Any frames sitting in the radio FIFO are parked in the receive ring
    /// before the transmission, so a monitor loop running alongside does
    /// not lose them while the radio is in transmit mode.
    pub fn switch(
        &self,
        product_id: u8,
        device_id: u32,
        on: bool,
        xmits: u8,
    ) -> Result<(), OpenThingsError> {
        let value = if on { 1.0 } else { 0.0 };
        let frame = build_frame(product_id, device_id, CMD_SWITCH_STATE, value)?;

        let mut state = self.state()?;
        let state = &mut *state;
        let mut radio = self.gate.lock()?;
        let parked = radio.drain_into(&mut state.ring, DrainMode::Control)?;
        if parked > 0 {
            debug!("parked {} inbound frame(s) ahead of switch", parked);
        }
        radio.transmit(&frame, xmits)?;
        info!(
            "switched device {}: {} ({} xmits)",
            device_id,
            if on { "ON" } else { "OFF" },
            xmits
        );
        Ok(())
    }

    /// Transmits a command frame immediately, without caching or receive
    /// bookkeeping. Suited to always-listening devices; a sleeping device
    /// will only hear this by luck.
    pub fn send_command(
        &self,
        product_id: u8,
        device_id: u32,
        command: u8,
        value: f32,
        xmits: u8,
    ) -> Result<(), OpenThingsError> {
        let frame = build_frame(product_id, device_id, command, value)?;
        let mut radio = self.gate.lock()?;
        radio.transmit(&frame, xmits)?;
        info!(
            "sent command {:#04x} value {} to device {} ({} xmits)",
            command, value, device_id, xmits
        );
        Ok(())
    }

    /// Parks a command for a device with a small receive window, to be
    /// transmitted each time the device is heard until it acknowledges or
    /// the retries run out. `command` 0 cancels whatever is parked.
    ///
    /// An unknown device is pre-registered from the given product id so the
    /// command can go out on its very first report, but only if that product
    /// actually has a small receive window.
    pub fn cache_command(
        &self,
        product_id: u8,
        device_id: u32,
        command: u8,
        value: f32,
        retries: u8,
    ) -> Result<(), OpenThingsError> {
        let mut state = self.state()?;
        self.cache_command_locked(&mut state, product_id, device_id, command, value, retries)
    }

    /// Cached-command body, callable while the engine state is already
    /// locked (the thermostat auto-telemetry path needs that).
    fn cache_command_locked(
        &self,
        state: &mut EngineState,
        product_id: u8,
        device_id: u32,
        command: u8,
        value: f32,
        retries: u8,
    ) -> Result<(), OpenThingsError> {
        let registered = match state.registry.get(device_id) {
            Some(device) => {
                if device.control != ControlClass::SmallWindow {
                    return Err(OpenThingsError::DeviceNotCacheable(device.product_id));
                }
                true
            }
            None => {
                if command == 0 {
                    return Err(OpenThingsError::CancelUnknownDevice);
                }
                if product_info(product_id).control != ControlClass::SmallWindow {
                    return Err(OpenThingsError::DeviceNotCacheable(product_id));
                }
                false
            }
        };

        let device = state
            .registry
            .put(device_id, ENERGENIE_MFRID, product_id, false)?;
        if !registered {
            // Nothing has been heard from this device yet, so the command
            // counts as pre-cached until the first transmission promotes it.
            if let Some(cache) = device.cache.as_mut() {
                cache.active = false;
            }
            info!(
                "pre-registered device {} (product {:#04x}) for cached command",
                device_id, product_id
            );
        }
        if !device.accepts_cached() {
            return Err(OpenThingsError::DeviceNotCacheable(device.product_id));
        }

        if command == 0 {
            if let Some(cache) = device.cache.as_mut() {
                if cache.command > 0 {
                    let cancelled = cache.command;
                    let was_active = cache.active;
                    cache.clear();
                    self.counters.remove(was_active);
                    info!(
                        "cancelled cached command {:#04x} for device {}",
                        cancelled, device_id
                    );
                }
            }
            return Ok(());
        }

        // Build the frame now, against the registered product id, so the
        // receive path only has to hand bytes to the radio.
        let frame = build_frame(device.product_id, device_id, command, value)?;
        if let Some(cache) = device.cache.as_mut() {
            if cache.outstanding() {
                warn!(
                    "replacing cached command {:#04x} with {:#04x} for device {}",
                    cache.command, command, device_id
                );
            } else {
                self.counters.add(cache.active);
            }
            cache.store(frame, command, value, retries);
        }

        // A valve does not report back the values it was told to hold, so
        // record the commanded value as if it had.
        match (&mut device.state, command) {
            (ProductState::Valve(trv), CMD_TARGET_TEMP) => {
                trv.target_c = f64::from(value);
            }
            (ProductState::Valve(trv), CMD_SWITCH_STATE) => {
                trv.valve = ValveState::from_command_value(value as i64);
            }
            _ => {}
        }

        debug!(
            "cached command {:#04x} value {} retries {} for device {}",
            command, value, retries, device_id
        );
        Ok(())
    }

    /// Polls the air for one valid reading.
    ///
    /// Drains the radio FIFO into the ring, then decodes ring entries until
    /// one yields a surfaceable reading. Keeps polling until `timeout_ms`
    /// has elapsed; zero means a single pass. Frames that fail CRC or
    /// record parsing are dropped with a throttled warning. Returns
    /// `Ok(None)` when the timeout passes quietly.
    pub fn receive(&self, timeout_ms: u64) -> Result<Option<Reading>, OpenThingsError> {
        let started = Instant::now();
        loop {
            {
                let mut state = self.state()?;
                let state = &mut *state;
                {
                    let mut radio = self.gate.lock()?;
                    radio.drain_into(&mut state.ring, DrainMode::Monitor)?;
                }
                while let Some(frame) = state.ring.pop() {
                    if let Some(reading) = self.process_frame(state, &frame)? {
                        return Ok(Some(reading));
                    }
                }
            }

            let elapsed = started.elapsed().as_millis() as u64;
            if elapsed >= timeout_ms {
                return Ok(None);
            }
            // Poll hard while a command is waiting on a short receive
            // window, gently otherwise.
            let sleep_ms = if self.counters.active() > 0 {
                self.config.cached_poll_sleep_ms
            } else {
                self.config.idle_poll_sleep_ms
            };
            thread::sleep(Duration::from_millis(sleep_ms.min(
                timeout_ms.saturating_sub(elapsed),
            )));
        }
    }

    /// Decodes one ring entry into a reading, running the cached-command
    /// and registry side effects along the way. `Ok(None)` means the frame
    /// was dropped or carried nothing to surface.
    fn process_frame(
        &self,
        state: &mut EngineState,
        frame: &ReceivedFrame,
    ) -> Result<Option<Reading>, OpenThingsError> {
        let decoded = match VerifiedFrame::decode(&frame.bytes) {
            Ok(decoded) => decoded,
            Err(err) => {
                self.warn_dropped(&frame.bytes, &err);
                return Ok(None);
            }
        };

        // The sender is certainly awake right now, so squeeze any parked
        // command in before its receive window closes. Thermostats only
        // listen after announcing WAKEUP, so for them anything else goes
        // through the acknowledgment path instead.
        if self.counters.any_outstanding() {
            if let Some(device) = state.registry.get_mut(decoded.device_id) {
                let pending = device.control == ControlClass::SmallWindow
                    && device
                        .cache
                        .as_ref()
                        .map_or(false, CachedCommand::outstanding);
                let listening = decoded.product_id != PRODUCT_THERMOSTAT
                    || decoded.first_param() == PARAM_WAKEUP;
                if pending && listening {
                    self.send_cached(device)?;
                }
            }
        }

        let records = match decoded.records() {
            Ok(records) => records,
            Err(err) => {
                self.warn_dropped(&frame.bytes, &err);
                return Ok(None);
            }
        };
        if records.is_empty() {
            return Ok(None);
        }

        let mut reading = Reading::new(
            decoded.device_id,
            decoded.mfr_id,
            decoded.product_id,
            frame.received_at,
        );
        let mut joined = false;
        for record in &records {
            reading.push_record(record);
            match &record.value {
                // A valued JOIN record is a device asking to be adopted.
                RecordValue::Int(_) => {
                    if record.param_id == PARAM_JOIN || record.param_id == CMD_JOIN {
                        self.transmit_join_ack(
                            decoded.product_id,
                            decoded.device_id,
                            JOIN_ACK_XMITS,
                        )?;
                        joined = true;
                    }
                }
                // Dataless JOIN only counts in command form; the reported
                // form is what our own acknowledgment looks like on the
                // air, and answering it would echo forever.
                RecordValue::None => {
                    if record.param_id == CMD_JOIN {
                        self.transmit_join_ack(
                            decoded.product_id,
                            decoded.device_id,
                            JOIN_ACK_CMD_XMITS,
                        )?;
                        joined = true;
                    }
                }
                _ => {}
            }
        }

        let device = state
            .registry
            .put(decoded.device_id, decoded.mfr_id, decoded.product_id, joined)?;
        // The registered product wins over whatever this frame claims.
        let registered_product = device.product_id;

        if registered_product == PRODUCT_ETRV {
            if let (ProductState::Valve(trv), Some(cache)) = (&mut device.state, &mut device.cache)
            {
                if let Some(first) = records.first() {
                    let acked = trv.apply_record(first, frame.received_at);
                    if acked.contains(&cache.command) {
                        let done = cache.command;
                        let was_active = cache.active;
                        cache.clear();
                        self.counters.remove(was_active);
                        info!(
                            "device {} answered cached command {:#04x}",
                            decoded.device_id, done
                        );
                    }
                }
                reading.push("command", cache.command);
                reading.push("retries", cache.retries);
                trv.append_status(&mut reading);
            }
        } else if registered_product == PRODUCT_THERMOSTAT {
            self.thermostat_post(
                state,
                &mut reading,
                decoded.device_id,
                decoded.first_param(),
                &records,
                frame.received_at,
            )?;
        }

        Ok(Some(reading))
    }

    /// Thermostat bookkeeping after a frame from one has been surfaced.
    ///
    /// While a command is parked, any report that is not a WAKEUP proves the
    /// thermostat heard us: the parked command is retired, and commands the
    /// device never reports back get their assumed effect appended to the
    /// reading. With nothing parked, a WAKEUP from a thermostat that has
    /// not produced telemetry recently is answered by re-sending its stored
    /// mode, which prods it into a full report.
    fn thermostat_post(
        &self,
        state: &mut EngineState,
        reading: &mut Reading,
        device_id: u32,
        first_param: u8,
        records: &[Record],
        at: DateTime<Utc>,
    ) -> Result<(), OpenThingsError> {
        let mut telemetry_mode = None;
        if let Some(device) = state.registry.get_mut(device_id) {
            if let (ProductState::Thermostat(stat), Some(cache)) =
                (&mut device.state, &mut device.cache)
            {
                if cache.command != 0 {
                    if first_param != PARAM_WAKEUP {
                        for record in records {
                            if record.param_id == PARAM_THERMOSTAT_MODE {
                                stat.mode = ThermostatMode::from_report(record.as_int());
                            }
                        }
                        if let Some(name) = assumed_effect_name(cache.command) {
                            reading.push(name, cache.data);
                        }
                        let done = cache.command;
                        let was_active = cache.active;
                        cache.clear();
                        self.counters.remove(was_active);
                        stat.telemetry_at = Some(at);
                        info!(
                            "thermostat {} answered cached command {:#04x}",
                            device_id, done
                        );
                    }
                } else if stat.wants_auto_telemetry()
                    && first_param == PARAM_WAKEUP
                    && stat.telemetry_stale(at, self.config.auto_telemetry_secs)
                {
                    telemetry_mode = Some(stat.mode);
                }
            }
        }

        // Re-sending the stored mode is the only way to ask a thermostat
        // for telemetry; it answers any command with a full report.
        if let Some(mode) = telemetry_mode {
            debug!("requesting telemetry from quiet thermostat {}", device_id);
            self.cache_command_locked(
                state,
                PRODUCT_THERMOSTAT,
                device_id,
                CMD_SET_THERMOSTAT_MODE,
                mode.as_command_value(),
                self.config.auto_telemetry_retries,
            )?;
        }

        if let Some(device) = state.registry.get(device_id) {
            if let Some(cache) = device.cache.as_ref() {
                reading.push("command", cache.command);
                reading.push("retries", cache.retries);
            }
        }
        Ok(())
    }

    /// Transmits a device's parked command once, single repeat — the
    /// receive window it is aimed at lasts milliseconds.
    fn send_cached(&self, device: &mut Device) -> Result<(), OpenThingsError> {
        let device_id = device.device_id;
        let cache = match device.cache.as_mut() {
            Some(cache) => cache,
            None => return Ok(()),
        };
        if !cache.outstanding() || cache.frame().len() <= 1 {
            return Ok(());
        }

        let command = cache.command;
        {
            let mut radio = self.gate.lock()?;
            radio.transmit(cache.frame(), 1)?;
            // First successful transmission turns a pre-cached command for
            // a device we had never heard into an active one.
            if self.counters.pre_cached() > 0 && !cache.active {
                cache.active = true;
                self.counters.promote();
            }
        }

        cache.retries -= 1;
        if cache.retries == 0 {
            self.counters.remove(cache.active);
            cache.clear();
            info!(
                "cached command {:#04x} for device {} ran out of retries",
                command, device_id
            );
        }
        debug!(
            "sent cached command {:#04x} to device {}, {} retries left",
            command, device_id, cache.retries
        );
        Ok(())
    }

    /// Listens for devices without consuming their frames.
    ///
    /// Runs up to `passes` drain passes one second apart, stopping early
    /// once the ring is full, then registers every decodable sender. JOIN
    /// requests are acknowledged. The ring is only peeked, so a monitor
    /// loop still surfaces everything the scan saw.
    pub fn scan(&self, passes: u32) -> Result<(), OpenThingsError> {
        let mut pulled = 0usize;
        for pass in 0..passes {
            let filled = {
                let mut state = self.state()?;
                let state = &mut *state;
                let mut radio = self.gate.lock()?;
                pulled += radio.drain_into(&mut state.ring, DrainMode::Learn)?;
                pulled >= state.ring.capacity()
            };
            if filled {
                break;
            }
            if pass + 1 < passes {
                thread::sleep(Duration::from_secs(1));
            }
        }

        let mut state = self.state()?;
        let EngineState { ring, registry } = &mut *state;
        let mut decoded_frames = 0u32;
        for frame in ring.iter() {
            let decoded = match VerifiedFrame::decode(&frame.bytes) {
                Ok(decoded) => decoded,
                Err(_) => continue,
            };
            let records = match decoded.records() {
                Ok(records) => records,
                Err(_) => continue,
            };
            if records.is_empty() {
                continue;
            }
            let mut joined = false;
            for record in &records {
                if record.param_id == PARAM_JOIN {
                    self.transmit_join_ack(decoded.product_id, decoded.device_id, JOIN_ACK_XMITS)?;
                    joined = true;
                }
            }
            registry.put(decoded.device_id, decoded.mfr_id, decoded.product_id, joined)?;
            decoded_frames += 1;
        }
        info!(
            "scan complete: {} frame(s) decoded, {} device(s) known",
            decoded_frames,
            registry.len()
        );
        Ok(())
    }

    /// Returns every known device, scanning first if the registry is empty
    /// or `force_scan` is set.
    pub fn device_list(&self, force_scan: bool) -> Result<Vec<DeviceEntry>, OpenThingsError> {
        let empty = self.state()?.registry.is_empty();
        if empty || force_scan {
            self.scan(self.config.scan_passes)?;
        }
        Ok(self.state()?.registry.entries())
    }

    /// Acknowledges a JOIN request by hand, for hosts that run their own
    /// adoption flow.
    pub fn join_ack(
        &self,
        product_id: u8,
        device_id: u32,
        xmits: u8,
    ) -> Result<(), OpenThingsError> {
        info!(
            "acknowledging join for device {} (product {:#04x})",
            device_id, product_id
        );
        self.transmit_join_ack(product_id, device_id, xmits)
    }

    fn transmit_join_ack(
        &self,
        product_id: u8,
        device_id: u32,
        xmits: u8,
    ) -> Result<(), OpenThingsError> {
        let frame = join_ack_frame(product_id, device_id);
        let mut radio = self.gate.lock()?;
        radio.transmit(&frame, xmits)
    }

    /// Starts a background thread that polls [`receive`](Self::receive) and
    /// delivers readings over the returned channel. A previous monitor
    /// thread, if any, is stopped first. The thread stops on its own if the
    /// receiver is dropped or the radio fails.
    pub fn start_monitor(self: &Arc<Self>, poll_timeout_ms: u64) -> Receiver<Reading> {
        self.stop_monitoring();
        self.stop.store(false, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel();
        let engine = Arc::clone(self);
        let handle = thread::spawn(move || {
            while !engine.stop.load(Ordering::SeqCst) {
                match engine.receive(poll_timeout_ms) {
                    Ok(Some(reading)) => {
                        if tx.send(reading).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        // A zero poll timeout never sleeps inside receive,
                        // so pace the loop here instead of spinning.
                        if poll_timeout_ms == 0 {
                            thread::sleep(Duration::from_millis(
                                engine.config.idle_poll_sleep_ms,
                            ));
                        }
                    }
                    Err(err) => {
                        error!("monitor loop stopping: {}", err);
                        break;
                    }
                }
            }
            debug!("monitor thread exiting");
        });

        let mut slot = self.monitor.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(handle);
        rx
    }

    /// Stops the monitor thread and waits for it to finish. Safe to call
    /// when none is running.
    pub fn stop_monitoring(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let handle = {
            let mut slot = self.monitor.lock().unwrap_or_else(PoisonError::into_inner);
            slot.take()
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("monitor thread panicked before shutdown");
            }
        }
    }

    /// Stops monitoring and powers the radio down. Errors with
    /// [`OpenThingsError::NotInitialized`] if the radio was never brought up.
    pub fn shutdown(&self) -> Result<(), OpenThingsError> {
        self.stop_monitoring();
        self.gate.shutdown()
    }

    fn warn_dropped(&self, raw: &[u8], err: &OpenThingsError) {
        let mut throttle = self
            .drop_warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        log_warn_throttled!(
            throttle,
            "dropping undecodable frame ({} bytes): {}",
            raw.len(),
            err
        );
        log_frame_hex("dropped", raw);
    }
}
