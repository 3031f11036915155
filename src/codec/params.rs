//! OpenThings Parameter Database
//!
//! This module maintains the table of known OpenThings parameter identifiers
//! and their report names, and the naming rules applied while decoding
//! records.
//!
//! Parameter identifiers are 7 bits on the wire; bit 7 marks the record as a
//! command ("this is being commanded, not reported"). Decoded records keep
//! the raw 8-bit id and derive their display name from the 7-bit form:
//!
//! - known report:  `TEMPERATURE`
//! - known command: `_TEMPERATURE` (underscore prefix)
//! - unknown id:    `UNKNOWN_0x4e` (lowercase hex of the raw id)

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Bit 7 of a parameter id: the record is a command
pub const COMMAND_FLAG: u8 = 0x80;

/// Database of known OpenThings parameters keyed by 7-bit report id.
pub static KNOWN_PARAMS: Lazy<HashMap<u8, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert(0x21, "ALARM");
    map.insert(0x26, "DIAGNOSTICS");
    map.insert(0x2A, "THERMOSTAT_MODE");
    map.insert(0x2B, "RELAY_POLARITY");
    map.insert(0x2D, "DEBUG_OUTPUT");
    map.insert(0x3A, "HUMID_OFFSET");
    map.insert(0x3D, "TEMP_OFFSET");
    map.insert(0x3F, "IDENTIFY");
    map.insert(0x40, "SOURCE_SELECTOR"); // write only
    map.insert(0x41, "WATER_DETECTOR");
    map.insert(0x42, "GLASS_BREAKAGE");
    map.insert(0x43, "CLOSURES");
    map.insert(0x44, "DOOR_BELL");
    map.insert(0x45, "ENERGY");
    map.insert(0x46, "FALL_SENSOR");
    map.insert(0x47, "GAS_VOLUME");
    map.insert(0x48, "AIR_PRESSURE");
    map.insert(0x49, "ILLUMINANCE");
    map.insert(0x4B, "TARGET_TEMP");
    map.insert(0x4C, "LEVEL");
    map.insert(0x4D, "RAINFALL");
    map.insert(0x4F, "BUTTON"); // MiHome Click
    map.insert(0x50, "APPARENT_POWER");
    map.insert(0x51, "POWER_FACTOR");
    map.insert(0x52, "REPORT_PERIOD");
    map.insert(0x53, "SMOKE_DETECTOR");
    map.insert(0x54, "TIME_AND_DATE");
    map.insert(0x56, "VIBRATION");
    map.insert(0x57, "WATER_VOLUME");
    map.insert(0x58, "WIND_SPEED");
    map.insert(0x59, "WAKEUP");
    map.insert(0x61, "GAS_PRESSURE");
    map.insert(0x62, "BATTERY_LEVEL");
    map.insert(0x63, "CO_DETECTOR");
    map.insert(0x64, "DOOR_SENSOR");
    map.insert(0x65, "EMERGENCY");
    map.insert(0x66, "FREQUENCY");
    map.insert(0x67, "GAS_FLOW_RATE");
    map.insert(0x68, "REL_HUMIDITY");
    map.insert(0x69, "CURRENT");
    map.insert(0x6A, "JOIN");
    map.insert(0x6B, "RF_QUALITY");
    map.insert(0x6C, "LIGHT_LEVEL");
    map.insert(0x6D, "MOTION_DETECTOR");
    map.insert(0x6F, "OCCUPANCY");
    map.insert(0x70, "REAL_POWER");
    map.insert(0x71, "REACTIVE_POWER");
    map.insert(0x72, "ROTATION_SPEED");
    map.insert(0x73, "SWITCH_STATE");
    map.insert(0x74, "TEMPERATURE");
    map.insert(0x76, "VOLTAGE");
    map.insert(0x77, "WATER_FLOW_RATE");
    map.insert(0x78, "WATER_PRESSURE");
    map.insert(0x7E, "HYSTERESIS");

    map
});

/// Look up the report name for a 7-bit parameter id.
pub fn lookup_param(id: u8) -> Option<&'static str> {
    KNOWN_PARAMS.get(&(id & !COMMAND_FLAG)).copied()
}

/// Display name for a raw (8-bit) parameter id as carried in a record.
///
/// Commands get an underscore prefix; unknown ids get a synthesized
/// `UNKNOWN_0x..` label so unrecognized parameters remain representable.
pub fn param_name(raw_id: u8) -> String {
    let is_command = raw_id & COMMAND_FLAG != 0;
    match lookup_param(raw_id) {
        Some(name) if is_command => format!("_{name}"),
        Some(name) => name.to_string(),
        None => format!("UNKNOWN_0x{raw_id:02x}"),
    }
}
