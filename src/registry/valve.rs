//! Radiator valve (eTRV) stored state.
//!
//! Valves transmit for a few hundred milliseconds per reporting interval
//! and are deaf the rest of the time, so most of what a caller wants to
//! know about one has accumulated across earlier reports. This module
//! keeps that accumulated state, folds each incoming record into it, and
//! appends it to every reading the valve produces.

use bitflags::bitflags;
use chrono::{DateTime, Utc};

use crate::codec::Record;
use crate::constants::{
    CMD_EXERCISE_VALVE, CMD_REQUEST_DIAGNOSTICS, CMD_REQUEST_VOLTAGE, PARAM_DIAGNOSTICS,
    PARAM_TEMPERATURE, PARAM_VOLTAGE,
};
use crate::reading::Reading;

/// Valve position as last reported or commanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValveState {
    Open,
    Closed,
    Auto,
    Error,
    #[default]
    Unknown,
}

impl ValveState {
    pub fn as_str(self) -> &'static str {
        match self {
            ValveState::Open => "open",
            ValveState::Closed => "closed",
            ValveState::Auto => "auto",
            ValveState::Error => "error",
            ValveState::Unknown => "unknown",
        }
    }

    /// Position selected by a numeric command value (0=open, 1=closed,
    /// 2=auto). Anything else is not a position a command can ask for.
    pub fn from_command_value(value: i64) -> Self {
        match value {
            0 => ValveState::Open,
            1 => ValveState::Closed,
            2 => ValveState::Auto,
            3 => ValveState::Error,
            _ => ValveState::Unknown,
        }
    }
}

bitflags! {
    /// DIAGNOSTICS flag word reported by the valve.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DiagnosticFlags: u16 {
        /// Motor current below expectation
        const MOTOR_CURRENT_LOW  = 0x0001;
        /// Motor current always high
        const MOTOR_CURRENT_HIGH = 0x0002;
        /// Motor taking too long to open or close
        const MOTOR_SLOW         = 0x0004;
        /// Air and pipe sensors disagree (advisory, not an error)
        const SENSOR_DISCREPANCY = 0x0008;
        /// Air sensor out of expected range
        const AIR_SENSOR_RANGE   = 0x0010;
        /// Pipe sensor out of expected range
        const PIPE_SENSOR_RANGE  = 0x0020;
        /// Low power mode is enabled
        const LOW_POWER_MODE     = 0x0040;
        /// No target temperature has been set by the host
        const NO_TARGET_TEMP     = 0x0080;
        /// Valve may be sticking
        const VALVE_STICKING     = 0x0100;
        /// Valve exercise succeeded
        const EXERCISE_SUCCESS   = 0x0200;
        /// Valve exercise failed
        const EXERCISE_FAIL      = 0x0400;
        /// Driver micro watchdog reset
        const WATCHDOG_RESET     = 0x0800;
        /// Driver micro noise reset
        const NOISE_RESET        = 0x1000;
        /// Battery below 2.2 V, valve forced open
        const LOW_BATTERY_OPEN   = 0x2000;
        /// Request-for-heat messaging enabled (not acted on)
        const HEAT_REQUEST_EN    = 0x4000;
        /// Request for heat (not acted on)
        const HEAT_REQUEST       = 0x8000;
    }
}

/// State accumulated for one radiator valve across its reports.
#[derive(Debug, Clone, Default)]
pub struct TrvState {
    /// Last reported temperature, degrees C
    pub current_c: f64,
    /// Last commanded target temperature; 0 means none set
    pub target_c: f64,
    /// Last reported battery voltage; 0 until first report
    pub voltage: f64,
    pub voltage_at: Option<DateTime<Utc>>,
    /// Last reported DIAGNOSTICS flag word
    pub diagnostics: u16,
    pub diagnostics_at: Option<DateTime<Utc>>,
    pub valve: ValveState,
    /// Outcome of the last valve exercise
    pub exercise_ok: bool,
    pub exercised_at: Option<DateTime<Utc>>,
    pub low_power_mode: bool,
    pub errors: bool,
    pub error_text: String,
}

impl TrvState {
    /// Fold one decoded record into the stored state.
    ///
    /// Returns the command ids this report implicitly acknowledges: a
    /// VOLTAGE report answers REQUEST_VOLTAGE, and a DIAGNOSTICS report
    /// answers both REQUEST_DIAGNOSTICS and EXERCISE_VALVE (the exercise
    /// routine finishes with a diagnostics report). The caller clears a
    /// matching outstanding cached command.
    pub fn apply_record(&mut self, record: &Record, at: DateTime<Utc>) -> &'static [u8] {
        match record.param_id {
            PARAM_TEMPERATURE => {
                self.current_c = record.as_float();
                &[]
            }
            PARAM_VOLTAGE => {
                self.voltage = record.as_float();
                self.voltage_at = Some(at);
                &[CMD_REQUEST_VOLTAGE]
            }
            PARAM_DIAGNOSTICS => {
                self.apply_diagnostics(record.as_int() as u16, at);
                &[CMD_REQUEST_DIAGNOSTICS, CMD_EXERCISE_VALVE]
            }
            _ => &[],
        }
    }

    /// Store a DIAGNOSTICS flag word and recompute the derived error state.
    ///
    /// The error flag and text are rebuilt from scratch on every report;
    /// clauses are concatenated in bit order without separators.
    fn apply_diagnostics(&mut self, mask: u16, at: DateTime<Utc>) {
        self.diagnostics = mask;
        self.diagnostics_at = Some(at);
        self.errors = false;
        self.error_text.clear();

        let flags = DiagnosticFlags::from_bits_truncate(mask);

        if flags.contains(DiagnosticFlags::MOTOR_CURRENT_LOW) {
            self.errors = true;
            self.error_text.push_str("Motor current below expectation.");
        }
        if flags.contains(DiagnosticFlags::MOTOR_CURRENT_HIGH) {
            self.errors = true;
            self.error_text.push_str("Motor current always high.");
        }
        if flags.contains(DiagnosticFlags::MOTOR_SLOW) {
            self.errors = true;
            self.error_text.push_str("Motor taking too long to open/close.");
        }
        if flags.contains(DiagnosticFlags::SENSOR_DISCREPANCY) {
            // advisory only, the error flag stays as it is
            self.error_text
                .push_str("Discrepancy between air and pipe sensors.");
        }
        if flags.contains(DiagnosticFlags::AIR_SENSOR_RANGE) {
            self.errors = true;
            self.error_text.push_str("Air sensor out of expected range.");
        }
        if flags.contains(DiagnosticFlags::PIPE_SENSOR_RANGE) {
            self.errors = true;
            self.error_text.push_str("Pipe sensor out of expected range.");
        }

        self.low_power_mode = flags.contains(DiagnosticFlags::LOW_POWER_MODE);

        if flags.contains(DiagnosticFlags::NO_TARGET_TEMP) {
            self.target_c = 0.0;
        }
        if flags.contains(DiagnosticFlags::VALVE_STICKING) {
            self.valve = ValveState::Error;
            self.errors = true;
            self.error_text.push_str("Valve may be sticking.");
        }
        if flags.contains(DiagnosticFlags::EXERCISE_SUCCESS) {
            self.exercise_ok = true;
            self.exercised_at = Some(at);
        }
        if flags.contains(DiagnosticFlags::EXERCISE_FAIL) {
            self.exercise_ok = false;
            self.exercised_at = Some(at);
            self.errors = true;
            self.error_text.push_str("Exercise Valve failed.");
        }
        if flags.contains(DiagnosticFlags::WATCHDOG_RESET) {
            self.errors = true;
            self.error_text
                .push_str("Driver micro watchdog reset, data refresh needed");
        }
        if flags.contains(DiagnosticFlags::NOISE_RESET) {
            self.errors = true;
            self.error_text
                .push_str("Driver micro noise reset, data refresh needed");
        }
        if flags.contains(DiagnosticFlags::LOW_BATTERY_OPEN) {
            self.errors = true;
            self.error_text
                .push_str("Battery voltage below 2.2V, valve opened");
        }
    }

    /// Append the stored state to a reading.
    ///
    /// Only fields that have ever been populated are emitted, so a freshly
    /// seen valve adds nothing.
    pub fn append_status(&self, reading: &mut Reading) {
        if self.target_c > 0.0 {
            reading.push("TARGET_TEMP", self.target_c);
        }
        if self.voltage > 0.0 {
            reading.push("VOLTAGE", self.voltage);
            reading.push("VOLTAGE_TS", self.voltage_at.map_or(0, |at| at.timestamp()));
        }
        if self.valve != ValveState::Unknown {
            reading.push("VALVE_STATE", self.valve.as_str());
        }
        if let Some(at) = self.exercised_at {
            reading.push(
                "EXERCISE_VALVE",
                if self.exercise_ok { "success" } else { "fail" },
            );
            reading.push("VALVE_TS", at.timestamp());
        }
        if let Some(at) = self.diagnostics_at {
            reading.push("DIAGNOSTICS", self.diagnostics);
            reading.push("DIAGNOSTICS_TS", at.timestamp());
            reading.push("LOW_POWER_MODE", self.low_power_mode);
            reading.push("ERRORS", self.errors);
            reading.push("ERROR_TEXT", self.error_text.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_records;
    use crate::reading::Value;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn record(bytes: &[u8]) -> Record {
        parse_records(bytes).unwrap().remove(0)
    }

    #[test]
    fn test_fresh_valve_appends_nothing() {
        let trv = TrvState::default();
        let mut reading = Reading::new(1, 4, 3, at());
        trv.append_status(&mut reading);
        assert!(reading.fields().is_empty());
        assert_eq!(trv.valve, ValveState::Unknown);
    }

    #[test]
    fn test_temperature_stores_float_view() {
        let mut trv = TrvState::default();
        let acks = trv.apply_record(&record(&[0x74, 0x92, 0x16, 0x80, 0x00]), at());
        assert!(acks.is_empty());
        assert!((trv.current_c - 22.5).abs() < 1e-9);
    }

    #[test]
    fn test_voltage_acknowledges_request() {
        let mut trv = TrvState::default();
        let acks = trv.apply_record(&record(&[0x76, 0x22, 0x03, 0x20, 0x00]), at());
        assert_eq!(acks, [CMD_REQUEST_VOLTAGE]);
        assert!((trv.voltage - 3.125).abs() < 1e-9);
        assert_eq!(trv.voltage_at, Some(at()));
    }

    #[test]
    fn test_exercise_success_sets_outcome_without_error() {
        let mut trv = TrvState::default();
        // success + low power mode
        let acks = trv.apply_record(&record(&[0x26, 0x42, 0x02, 0x40, 0x00]), at());
        assert_eq!(acks, [CMD_REQUEST_DIAGNOSTICS, CMD_EXERCISE_VALVE]);
        assert!(trv.exercise_ok);
        assert_eq!(trv.exercised_at, Some(at()));
        assert!(trv.low_power_mode);
        assert!(!trv.errors);
        assert!(trv.error_text.is_empty());
    }

    #[test]
    fn test_motor_errors_concatenate_in_bit_order() {
        let mut trv = TrvState::default();
        trv.apply_record(&record(&[0x26, 0x42, 0x00, 0x03, 0x00]), at());
        assert!(trv.errors);
        assert_eq!(
            trv.error_text,
            "Motor current below expectation.Motor current always high."
        );
    }

    #[test]
    fn test_sensor_discrepancy_is_advisory() {
        let mut trv = TrvState::default();
        trv.apply_record(&record(&[0x26, 0x42, 0x00, 0x08, 0x00]), at());
        assert!(!trv.errors);
        assert_eq!(trv.error_text, "Discrepancy between air and pipe sensors.");
    }

    #[test]
    fn test_sticking_valve_forces_error_position() {
        let mut trv = TrvState {
            valve: ValveState::Auto,
            ..TrvState::default()
        };
        trv.apply_record(&record(&[0x26, 0x42, 0x01, 0x00, 0x00]), at());
        assert_eq!(trv.valve, ValveState::Error);
        assert!(trv.errors);
        assert_eq!(trv.error_text, "Valve may be sticking.");
    }

    #[test]
    fn test_no_target_bit_clears_stored_target() {
        let mut trv = TrvState {
            target_c: 19.5,
            ..TrvState::default()
        };
        trv.apply_record(&record(&[0x26, 0x42, 0x00, 0x80, 0x00]), at());
        assert_eq!(trv.target_c, 0.0);
    }

    #[test]
    fn test_zero_mask_clears_low_power_and_errors() {
        let mut trv = TrvState {
            low_power_mode: true,
            errors: true,
            error_text: "Motor current always high.".to_string(),
            ..TrvState::default()
        };
        trv.apply_record(&record(&[0x26, 0x42, 0x00, 0x00, 0x00]), at());
        assert!(!trv.low_power_mode);
        assert!(!trv.errors);
        assert!(trv.error_text.is_empty());
        assert_eq!(trv.diagnostics, 0);
    }

    #[test]
    fn test_exercise_failure_after_success() {
        let mut trv = TrvState::default();
        trv.apply_record(&record(&[0x26, 0x42, 0x02, 0x00, 0x00]), at());
        assert!(trv.exercise_ok);

        let later = Utc.timestamp_opt(1_700_000_600, 0).unwrap();
        trv.apply_record(&record(&[0x26, 0x42, 0x04, 0x00, 0x00]), later);
        assert!(!trv.exercise_ok);
        assert_eq!(trv.exercised_at, Some(later));
        assert_eq!(trv.error_text, "Exercise Valve failed.");
    }

    #[test]
    fn test_status_appendage_field_order() {
        let mut trv = TrvState {
            target_c: 21.0,
            ..TrvState::default()
        };
        trv.apply_record(&record(&[0x76, 0x22, 0x03, 0x00, 0x00]), at());
        trv.apply_record(&record(&[0x26, 0x42, 0x02, 0x00, 0x00]), at());
        trv.valve = ValveState::Auto;

        let mut reading = Reading::new(1, 4, 3, at());
        trv.append_status(&mut reading);

        let names: Vec<&str> = reading
            .fields()
            .iter()
            .map(|(n, _)| n.as_str())
            .collect();
        assert_eq!(
            names,
            [
                "TARGET_TEMP",
                "VOLTAGE",
                "VOLTAGE_TS",
                "VALVE_STATE",
                "EXERCISE_VALVE",
                "VALVE_TS",
                "DIAGNOSTICS",
                "DIAGNOSTICS_TS",
                "LOW_POWER_MODE",
                "ERRORS",
                "ERROR_TEXT"
            ]
        );
        assert_eq!(
            reading.get("VALVE_STATE"),
            Some(&Value::Text("auto".to_string()))
        );
        assert_eq!(
            reading.get("EXERCISE_VALVE"),
            Some(&Value::Text("success".to_string()))
        );
        assert_eq!(reading.get("VOLTAGE_TS"), Some(&Value::Int(1_700_000_000)));
    }

    #[test]
    fn test_command_value_positions() {
        assert_eq!(ValveState::from_command_value(0), ValveState::Open);
        assert_eq!(ValveState::from_command_value(1), ValveState::Closed);
        assert_eq!(ValveState::from_command_value(2), ValveState::Auto);
        assert_eq!(ValveState::from_command_value(7), ValveState::Unknown);
        assert_eq!(ValveState::Closed.as_str(), "closed");
    }
}
