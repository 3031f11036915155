//! End-to-end engine scenarios over the mock transceiver: whole sessions
//! of discovery, actuation, cached delivery and monitoring, exercising the
//! same call sequences a host application makes.

use std::sync::Arc;
use std::time::Duration;

use openthings_rs::codec::cipher::crypt_region;
use openthings_rs::codec::crc::calculate_crc;
use openthings_rs::constants::{
    CMD_TARGET_TEMP, ENERGENIE_MFRID, IDX_DEVICE_ID, PRODUCT_ETRV, PRODUCT_MONITOR_PLUG,
    PRODUCT_SMART_PLUG,
};
use openthings_rs::reading::Value;
use openthings_rs::{
    decode_frame, ControlClass, EngineConfig, MockTransceiver, OpenThingsEngine, OpenThingsError,
};

/// Builds an encrypted, CRC-valid report frame with the given record bytes.
fn report_frame(product_id: u8, device_id: u32, records: &[u8]) -> Vec<u8> {
    let mut frame = vec![
        0,
        ENERGENIE_MFRID,
        product_id,
        0x01,
        0x00,
        (device_id >> 16) as u8,
        (device_id >> 8) as u8,
        device_id as u8,
    ];
    frame.extend_from_slice(records);
    frame.push(0x00);
    frame[0] = frame.len() as u8 + 1;
    let crc = calculate_crc(&frame[IDX_DEVICE_ID..]);
    frame.extend_from_slice(&crc.to_be_bytes());
    crypt_region(0x0100, &mut frame[IDX_DEVICE_ID..]);
    frame
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        scan_passes: 1,
        idle_poll_sleep_ms: 1,
        cached_poll_sleep_ms: 1,
        ..EngineConfig::default()
    }
}

fn engine_with(config: EngineConfig) -> (Arc<OpenThingsEngine>, MockTransceiver) {
    let radio = MockTransceiver::new();
    let engine = Arc::new(OpenThingsEngine::with_config(Box::new(radio.clone()), config));
    (engine, radio)
}

// 22.5 C fixed-point TEMPERATURE report
const TEMPERATURE_REC: [u8; 4] = [0x74, 0x92, 0x16, 0x80];
// JOIN request with a value byte
const JOIN_REC: [u8; 3] = [0x6A, 0x01, 0x01];

#[test]
fn test_adopt_then_drive_a_radiator_valve() {
    let (engine, radio) = engine_with(fast_config());
    let valve = 0x00_0C_8D;

    // The valve announces itself; discovery adopts and acknowledges it.
    radio.inject_frame(report_frame(PRODUCT_ETRV, valve, &JOIN_REC));
    let rows = engine.device_list(false).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].joined);
    assert_eq!(rows[0].control, ControlClass::SmallWindow);
    assert_eq!(radio.transmit_count(), 1);

    // The scan only peeked; surface the join frame before parking anything
    // so the counts below stay readable.
    assert!(engine.receive(0).unwrap().is_some());

    // Park a target temperature for the valve's next wakeup.
    engine
        .cache_command(PRODUCT_ETRV, valve, CMD_TARGET_TEMP, 21.5, 3)
        .unwrap();
    radio.inject_frame(report_frame(PRODUCT_ETRV, valve, &TEMPERATURE_REC));
    let reading = engine.receive(0).unwrap().unwrap();

    assert_eq!(reading.device_id, valve);
    assert_eq!(reading.get("TEMPERATURE"), Some(&Value::Float(22.5)));
    assert_eq!(
        reading.get("command"),
        Some(&Value::Int(i64::from(CMD_TARGET_TEMP)))
    );
    assert_eq!(reading.get("retries"), Some(&Value::Int(2)));
    assert_eq!(reading.get("TARGET_TEMP"), Some(&Value::Float(21.5)));

    // The transmitted cached frame targets the valve with the command.
    let sent = radio.transmitted();
    let cached = decode_frame(&sent.last().unwrap().0).unwrap();
    assert_eq!(cached.device_id, valve);
    assert_eq!(cached.records().unwrap()[0].param_id, CMD_TARGET_TEMP);
}

#[test]
fn test_cached_delivery_counts_down_to_zero() {
    let (engine, radio) = engine_with(fast_config());
    let valve = 0x00_0C_8D;

    engine
        .cache_command(PRODUCT_ETRV, valve, CMD_TARGET_TEMP, 19.0, 2)
        .unwrap();

    radio.inject_frame(report_frame(PRODUCT_ETRV, valve, &TEMPERATURE_REC));
    let first = engine.receive(0).unwrap().unwrap();
    assert_eq!(first.get("retries"), Some(&Value::Int(1)));

    radio.inject_frame(report_frame(PRODUCT_ETRV, valve, &TEMPERATURE_REC));
    let second = engine.receive(0).unwrap().unwrap();
    assert_eq!(second.get("command"), Some(&Value::Int(0)));
    assert_eq!(second.get("retries"), Some(&Value::Int(0)));
    assert_eq!(radio.transmit_count(), 2);

    // Retries exhausted: further reports ride for free.
    radio.inject_frame(report_frame(PRODUCT_ETRV, valve, &TEMPERATURE_REC));
    assert!(engine.receive(0).unwrap().is_some());
    assert_eq!(radio.transmit_count(), 2);
}

#[test]
fn test_readings_serialize_flat() {
    let (engine, radio) = engine_with(fast_config());
    radio.inject_frame(report_frame(PRODUCT_SMART_PLUG, 0x00_20_66, &TEMPERATURE_REC));

    let reading = engine.receive(0).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&reading.to_json().unwrap()).unwrap();

    assert_eq!(json["deviceId"], 0x00_20_66);
    assert_eq!(json["mfrId"], i64::from(ENERGENIE_MFRID));
    assert_eq!(json["productId"], i64::from(PRODUCT_SMART_PLUG));
    assert!(json["timestamp"].is_i64());
    assert_eq!(json["TEMPERATURE"], 22.5);
}

#[test]
fn test_registry_capacity_is_a_hard_error() {
    let config = EngineConfig {
        max_devices: 1,
        ..fast_config()
    };
    let (engine, radio) = engine_with(config);

    radio.inject_frame(report_frame(PRODUCT_SMART_PLUG, 0x00_00_01, &TEMPERATURE_REC));
    assert!(engine.receive(0).unwrap().is_some());

    radio.inject_frame(report_frame(PRODUCT_MONITOR_PLUG, 0x00_00_02, &TEMPERATURE_REC));
    let err = engine.receive(0).unwrap_err();
    assert!(matches!(err, OpenThingsError::CapacityExceeded(1)));
}

#[test]
fn test_partial_config_file_fills_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("engine.json");
    std::fs::write(&path, r#"{ "max_devices": 5, "scan_passes": 2 }"#).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let config: EngineConfig = serde_json::from_str(&text).unwrap();

    assert_eq!(config.max_devices, 5);
    assert_eq!(config.scan_passes, 2);
    // Unspecified knobs keep their defaults.
    let defaults = EngineConfig::default();
    assert_eq!(config.idle_poll_sleep_ms, defaults.idle_poll_sleep_ms);
    assert_eq!(config.auto_telemetry_secs, defaults.auto_telemetry_secs);
}

#[test]
fn test_monitor_streams_mixed_devices() {
    let (engine, radio) = engine_with(fast_config());
    radio.inject_frame(report_frame(PRODUCT_SMART_PLUG, 0x00_00_11, &TEMPERATURE_REC));
    radio.inject_frame(report_frame(PRODUCT_ETRV, 0x00_00_22, &TEMPERATURE_REC));
    radio.inject_frame(report_frame(PRODUCT_MONITOR_PLUG, 0x00_00_33, &TEMPERATURE_REC));

    let rx = engine.start_monitor(10);
    let mut seen = Vec::new();
    for _ in 0..3 {
        let reading = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("monitor should deliver all injected frames");
        seen.push(reading.device_id);
    }
    engine.stop_monitoring();

    seen.sort_unstable();
    assert_eq!(seen, [0x11, 0x22, 0x33]);

    let rows = engine.device_list(false).unwrap();
    assert_eq!(rows.len(), 3);
}

#[test]
fn test_switching_while_monitoring_does_not_deadlock() {
    let (engine, radio) = engine_with(fast_config());
    let rx = engine.start_monitor(5);

    let switcher = {
        let engine = Arc::clone(&engine);
        std::thread::spawn(move || {
            for i in 0..20 {
                engine
                    .switch(PRODUCT_SMART_PLUG, 0x00_20_66, i % 2 == 0, 1)
                    .unwrap();
            }
        })
    };

    radio.inject_frame(report_frame(PRODUCT_SMART_PLUG, 0x00_20_66, &TEMPERATURE_REC));
    let reading = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("monitoring continues during switching");
    assert_eq!(reading.device_id, 0x00_20_66);

    switcher.join().unwrap();
    engine.stop_monitoring();
    // 20 switches plus nothing else from the monitor side.
    assert_eq!(radio.transmit_count(), 20);
}

#[test]
fn test_session_shutdown_releases_radio() {
    let (engine, radio) = engine_with(fast_config());
    engine.initialize(false).unwrap();
    engine.shutdown().unwrap();
    assert_eq!(radio.shutdown_count(), 1);
}
