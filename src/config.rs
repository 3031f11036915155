//! Engine configuration.
//!
//! Every knob defaults to the reference timing for the device family, so a
//! config value is only ever supplied to deviate. The struct deserializes
//! from partial JSON; absent fields keep their defaults.

use serde::{Deserialize, Serialize};

use crate::constants::{
    CACHED_POLL_SLEEP_MS, IDLE_POLL_SLEEP_MS, MAX_DEVICES, SCAN_PASSES,
    THERMOSTAT_AUTO_TELEMETRY_RETRIES, THERMOSTAT_AUTO_TELEMETRY_SECS, TRV_TX_RETRIES,
};

/// Tunable engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Registry capacity; exceeding it is a hard error
    pub max_devices: usize,

    /// Receive-loop sleep while a command is actively cached, in ms.
    /// Kept short because the target's receive window is around 200 ms.
    pub cached_poll_sleep_ms: u64,

    /// Receive-loop sleep with nothing cached, in ms
    pub idle_poll_sleep_ms: u64,

    /// Telemetry silence before the thermostat keep-alive re-arms, in s
    pub auto_telemetry_secs: u64,

    /// Retry budget for the auto-cached keep-alive command
    pub auto_telemetry_retries: u8,

    /// Default retry budget for cached commands
    pub default_cache_retries: u8,

    /// Default transmit repeats for immediate commands
    pub default_xmits: u8,

    /// Learn-mode passes in a discovery scan
    pub scan_passes: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_devices: MAX_DEVICES,
            cached_poll_sleep_ms: CACHED_POLL_SLEEP_MS,
            idle_poll_sleep_ms: IDLE_POLL_SLEEP_MS,
            auto_telemetry_secs: THERMOSTAT_AUTO_TELEMETRY_SECS,
            auto_telemetry_retries: THERMOSTAT_AUTO_TELEMETRY_RETRIES,
            default_cache_retries: TRV_TX_RETRIES,
            default_xmits: 20,
            scan_passes: SCAN_PASSES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_timings() {
        let config = EngineConfig::default();
        assert_eq!(config.max_devices, 30);
        assert_eq!(config.cached_poll_sleep_ms, 25);
        assert_eq!(config.idle_poll_sleep_ms, 500);
        assert_eq!(config.auto_telemetry_secs, 300);
        assert_eq!(config.auto_telemetry_retries, 3);
        assert_eq!(config.default_cache_retries, 10);
        assert_eq!(config.scan_passes, 11);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"max_devices": 5, "idle_poll_sleep_ms": 100}"#).unwrap();
        assert_eq!(config.max_devices, 5);
        assert_eq!(config.idle_poll_sleep_ms, 100);
        assert_eq!(config.cached_poll_sleep_ms, 25);
        assert_eq!(config.scan_passes, 11);
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = EngineConfig {
            default_xmits: 7,
            ..EngineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.default_xmits, 7);
        assert_eq!(back.max_devices, config.max_devices);
    }
}
