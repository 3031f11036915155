//! OpenThings Protocol Constants
//!
//! This module defines constants used in the OpenThings FSK protocol
//! implementation, based on the Energenie MiHome device family.

/// Energenie manufacturer id carried in every frame header
pub const ENERGENIE_MFRID: u8 = 0x04;

/// Manufacturer constant folded into the stream cipher seed
pub const CRYPT_PID: u8 = 242;

/// Default PIP used for fixed-shape frames (join acknowledge)
pub const CRYPT_PIP: u16 = 0x0100;

/// Default device id used in fixed-shape frame templates
pub const DEFAULT_DEVICE_ID: u32 = 0x002066;

// ----------------------------------------------------------------------------
// Frame geometry
// ----------------------------------------------------------------------------

/// Smallest valid value of the frame length byte
pub const MIN_FRAME_LENGTH: u8 = 10;

/// Largest valid value of the frame length byte (link MTU)
pub const MAX_FRAME_LENGTH: u8 = 66;

/// Largest whole-frame byte count (length byte + MAX_FRAME_LENGTH)
pub const MAX_FRAME_BYTES: usize = MAX_FRAME_LENGTH as usize + 1;

/// Byte index of the manufacturer id in a frame
pub const IDX_MFRID: usize = 1;

/// Byte index of the product id in a frame
pub const IDX_PRODUCT_ID: usize = 2;

/// Byte index of the big-endian PIP nonce in a frame
pub const IDX_PIP: usize = 3;

/// Byte index of the big-endian 24-bit device id in a frame
pub const IDX_DEVICE_ID: usize = 5;

/// Byte index of the first record in a frame
pub const IDX_FIRST_RECORD: usize = 8;

/// Maximum number of records decoded from one frame
pub const MAX_RECORDS: usize = 15;

/// Longest value payload a single record can carry
pub const MAX_RECORD_VALUE_LEN: usize = 15;

// ----------------------------------------------------------------------------
// Receive path
// ----------------------------------------------------------------------------

/// Capacity of the receive ring buffer (raw frames)
pub const RX_RING_SLOTS: usize = 5;

/// Registry capacity; exceeding this is a hard error
pub const MAX_DEVICES: usize = 30;

/// Receive-loop sleep while a cached command is outstanding (ms)
pub const CACHED_POLL_SLEEP_MS: u64 = 25;

/// Receive-loop sleep when nothing is cached (ms)
pub const IDLE_POLL_SLEEP_MS: u64 = 500;

// ----------------------------------------------------------------------------
// Cached-command retry budgets
// ----------------------------------------------------------------------------

/// Default transmit retries for radiator valve commands
pub const TRV_TX_RETRIES: u8 = 10;

/// Default transmit retries for user-issued thermostat commands
pub const THERMOSTAT_TX_RETRIES: u8 = 2;

/// Retry budget for the auto-cached thermostat keep-alive
pub const THERMOSTAT_AUTO_TELEMETRY_RETRIES: u8 = 3;

/// Seconds of telemetry silence before the thermostat keep-alive fires
pub const THERMOSTAT_AUTO_TELEMETRY_SECS: u64 = 300;

/// Transmit repeats for a join acknowledgment to a valued JOIN record
pub const JOIN_ACK_XMITS: u8 = 20;

/// Transmit repeats for a join acknowledgment to a bare JOIN command
pub const JOIN_ACK_CMD_XMITS: u8 = 10;

/// Learn-mode passes performed by a forced discovery scan
pub const SCAN_PASSES: u32 = 11;

// ----------------------------------------------------------------------------
// Product ids (manufacturer 0x04)
// ----------------------------------------------------------------------------

/// MIHO004 monitor-only plug
pub const PRODUCT_MONITOR_PLUG: u8 = 0x01;

/// MIHO005 adaptor plus (switchable, always listening)
pub const PRODUCT_SMART_PLUG: u8 = 0x02;

/// MIHO013 eTRV radiator valve (small receive window)
pub const PRODUCT_ETRV: u8 = 0x03;

/// MIHO006 whole-house monitor
pub const PRODUCT_HOUSE_MONITOR: u8 = 0x05;

/// MIHO032 motion sensor
pub const PRODUCT_MOTION_SENSOR: u8 = 0x0C;

/// MIHO033 open sensor
pub const PRODUCT_OPEN_SENSOR: u8 = 0x0D;

/// MIHO069 room thermostat (small receive window)
pub const PRODUCT_THERMOSTAT: u8 = 0x12;

/// MIHO089 click button
pub const PRODUCT_CLICK: u8 = 0x13;

// ----------------------------------------------------------------------------
// Parameter ids (report form, bit 7 clear)
// ----------------------------------------------------------------------------

pub const PARAM_ALARM: u8 = 0x21;
pub const PARAM_DIAGNOSTICS: u8 = 0x26;
pub const PARAM_THERMOSTAT_MODE: u8 = 0x2A;
pub const PARAM_TARGET_TEMP: u8 = 0x4B;
pub const PARAM_WAKEUP: u8 = 0x59;
pub const PARAM_JOIN: u8 = 0x6A;
pub const PARAM_SWITCH_STATE: u8 = 0x73;
pub const PARAM_TEMPERATURE: u8 = 0x74;
pub const PARAM_VOLTAGE: u8 = 0x76;

// ----------------------------------------------------------------------------
// Command ids (bit 7 set)
// ----------------------------------------------------------------------------

/// Ask an eTRV to run its valve-exercise routine
pub const CMD_EXERCISE_VALVE: u8 = 0xA3;

/// 0 = low power mode off, 1 = on (eTRV)
pub const CMD_SET_LOW_POWER_MODE: u8 = 0xA4;

/// Set eTRV valve state (0=open, 1=closed, 2=auto)
pub const CMD_SET_VALVE_STATE: u8 = 0xA5;

/// Request the eTRV diagnostic flag word
pub const CMD_REQUEST_DIAGNOSTICS: u8 = 0xA6;

/// Set thermostat mode (0=off, 1=auto, 2=on)
pub const CMD_SET_THERMOSTAT_MODE: u8 = 0xAA;

/// Thermostat relay polarity (0, 1)
pub const CMD_RELAY_POLARITY: u8 = 0xAB;

/// Thermostat humidity calibration (-20..20)
pub const CMD_HUMID_OFFSET: u8 = 0xBA;

/// Thermostat temperature calibration (-20..10)
pub const CMD_TEMP_OFFSET: u8 = 0xBD;

/// Ask a device to run its identification routine
pub const CMD_IDENTIFY: u8 = 0xBF;

/// Alternate thermostat target-temperature command
pub const CMD_SET_TARGET_TEMPERATURE: u8 = 0xCB;

/// Update a device's reporting interval
pub const CMD_SET_REPORTING_INTERVAL: u8 = 0xD2;

/// Request the eTRV battery voltage
pub const CMD_REQUEST_VOLTAGE: u8 = 0xE2;

/// Join request/acknowledge command form
pub const CMD_JOIN: u8 = 0xEA;

/// Set the state of a switched device (also sets eTRV valve)
pub const CMD_SWITCH_STATE: u8 = 0xF3;

/// Send a new target temperature to an eTRV
pub const CMD_TARGET_TEMP: u8 = 0xF4;

/// Thermostat trigger hysteresis
pub const CMD_HYSTERESIS: u8 = 0xFE;
