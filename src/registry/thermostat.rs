//! Room thermostat stored state.
//!
//! The thermostat wakes, transmits WAKEUP, listens briefly and sleeps
//! again; telemetry only flows out of it while a command sits in that
//! window. The engine therefore tracks the last commanded mode and the
//! last time telemetry succeeded, and re-caches a "set mode" keep-alive
//! when the device has been silent too long.

use chrono::{DateTime, Duration, Utc};

use crate::codec::params::lookup_param;
use crate::constants::{
    CMD_HUMID_OFFSET, CMD_HYSTERESIS, CMD_RELAY_POLARITY, CMD_SET_THERMOSTAT_MODE, CMD_TEMP_OFFSET,
};

/// Operating mode commanded via SET_THERMOSTAT_MODE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThermostatMode {
    Off,
    Auto,
    On,
    /// Mode is managed externally; no keep-alive is auto-cached.
    #[default]
    Gateway,
}

impl ThermostatMode {
    /// Mode reported in a THERMOSTAT_MODE record. Values outside the
    /// commanded range fall back to Gateway, which keeps the keep-alive
    /// machinery quiet rather than replaying a value we cannot name.
    pub fn from_report(value: i64) -> Self {
        match value {
            0 => ThermostatMode::Off,
            1 => ThermostatMode::Auto,
            2 => ThermostatMode::On,
            _ => ThermostatMode::Gateway,
        }
    }

    /// Command payload value for SET_THERMOSTAT_MODE.
    pub fn as_command_value(self) -> f32 {
        match self {
            ThermostatMode::Off => 0.0,
            ThermostatMode::Auto => 1.0,
            ThermostatMode::On => 2.0,
            ThermostatMode::Gateway => 3.0,
        }
    }
}

/// State accumulated for one thermostat.
#[derive(Debug, Clone, Default)]
pub struct ThermostatState {
    pub mode: ThermostatMode,
    /// When a command was last acknowledged (telemetry last flowed)
    pub telemetry_at: Option<DateTime<Utc>>,
}

impl ThermostatState {
    /// True when telemetry has been silent for more than `max_age_secs`,
    /// meaning the keep-alive should be re-cached on the device's next
    /// wakeup.
    pub fn telemetry_stale(&self, now: DateTime<Utc>, max_age_secs: u64) -> bool {
        match self.telemetry_at {
            None => true,
            Some(at) => at + Duration::seconds(max_age_secs as i64) < now,
        }
    }

    /// True when the stored mode calls for automatic keep-alive telemetry.
    pub fn wants_auto_telemetry(&self) -> bool {
        self.mode != ThermostatMode::Gateway
    }
}

/// Commands whose effect the thermostat never reports back. Their
/// acknowledgment field is synthesized from the cached value instead.
pub const UNREPORTED_COMMANDS: [u8; 5] = [
    CMD_HYSTERESIS,
    CMD_HUMID_OFFSET,
    CMD_RELAY_POLARITY,
    CMD_SET_THERMOSTAT_MODE,
    CMD_TEMP_OFFSET,
];

/// Response-form field name for a command whose effect must be assumed.
pub fn assumed_effect_name(command: u8) -> Option<&'static str> {
    if UNREPORTED_COMMANDS.contains(&command) {
        lookup_param(command)
    } else {
        None
    }
}
