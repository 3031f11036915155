//! Command record encoding.
//!
//! Actuator commands travel inside a frame as a single record: the command
//! id (bit 7 set), a type/length byte, and up to two value bytes. The
//! type/length byte per command is fixed by what the receiving firmware
//! accepts, so the encoder maps each supported command to its wire form
//! rather than deriving one from the value.

use crate::constants::*;
use crate::error::OpenThingsError;

/// Marker for commands that carry no value bytes.
const NO_DATA: u8 = 0xFF;

/// Type/length byte expected by the device firmware for each command.
fn wire_type(command: u8) -> Option<u8> {
    match command {
        CMD_SET_LOW_POWER_MODE
        | CMD_SWITCH_STATE
        | CMD_SET_VALVE_STATE
        | CMD_SET_THERMOSTAT_MODE
        | CMD_RELAY_POLARITY => Some(0x01),
        // Fixed-point: value * 256 sent as two bytes, fraction in the low byte
        CMD_TARGET_TEMP | CMD_TEMP_OFFSET => Some(0x92),
        CMD_REQUEST_DIAGNOSTICS | CMD_EXERCISE_VALVE | CMD_REQUEST_VOLTAGE | CMD_IDENTIFY => {
            Some(NO_DATA)
        }
        CMD_SET_REPORTING_INTERVAL => Some(0x02),
        CMD_HYSTERESIS => Some(0x11),
        CMD_HUMID_OFFSET => Some(0x81),
        CMD_SET_TARGET_TEMPERATURE => Some(0x12),
        _ => None,
    }
}

/// Encode a command and value into record bytes (without the terminator).
///
/// Returns the record exactly as it is placed into the frame body. Unknown
/// commands are rejected rather than sent with a guessed encoding.
pub fn encode_command(command: u8, value: f32) -> Result<Vec<u8>, OpenThingsError> {
    let wire = wire_type(command).ok_or(OpenThingsError::UnknownCommand(command))?;

    let mut record = vec![command, wire];
    match wire {
        NO_DATA => {
            // No type byte either when there is no value
            record[1] = 0x00;
        }
        0x01 | 0x81 => {
            let data = value as i32;
            record.push((data & 0xFF) as u8);
        }
        0x02 => {
            let data = value as i32;
            record.push(((data >> 8) & 0xFF) as u8);
            record.push((data & 0xFF) as u8);
        }
        0x11 => {
            // Whole degrees shifted into the high nibble (UINT4 binary point)
            let data = (value as i32) * 16;
            record.push((data & 0xFF) as u8);
        }
        0x12 | 0x92 => {
            let data = (value * 256.0) as i32;
            record.push(((data >> 8) & 0xFF) as u8);
            record.push((data & 0xFF) as u8);
        }
        _ => unreachable!("wire_type returned an unhandled encoding"),
    }

    Ok(record)
}
