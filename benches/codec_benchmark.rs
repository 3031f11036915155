use criterion::{black_box, criterion_group, criterion_main, Criterion};
use openthings_rs::codec::cipher::crypt_region;
use openthings_rs::codec::crc::calculate_crc;
use openthings_rs::codec::{build_frame_with_pip, VerifiedFrame};
use openthings_rs::constants::{
    CMD_TARGET_TEMP, ENERGENIE_MFRID, IDX_DEVICE_ID, PRODUCT_ETRV, PRODUCT_SMART_PLUG,
};

/// A periodic adaptor-plus report: power pair, mains stats, switch state.
fn sample_frame() -> Vec<u8> {
    let records = [
        0x70, 0x82, 0x01, 0xA4, // REAL_POWER 420 W
        0x71, 0x82, 0x00, 0x3C, // REACTIVE_POWER 60 VAR
        0x76, 0x01, 0xF0, // VOLTAGE 240 V
        0x66, 0x22, 0x32, 0x40, // FREQUENCY 50.25 Hz
        0x73, 0x01, 0x01, // SWITCH_STATE on
    ];
    let mut frame = vec![
        0,
        ENERGENIE_MFRID,
        PRODUCT_SMART_PLUG,
        0x01,
        0x00,
        0x00,
        0x20,
        0x66,
    ];
    frame.extend_from_slice(&records);
    frame.push(0x00);
    frame[0] = frame.len() as u8 + 1;
    let crc = calculate_crc(&frame[IDX_DEVICE_ID..]);
    frame.extend_from_slice(&crc.to_be_bytes());
    crypt_region(0x0100, &mut frame[IDX_DEVICE_ID..]);
    frame
}

fn benchmark_build_frame(c: &mut Criterion) {
    c.bench_function("build_command_frame", |b| {
        b.iter(|| {
            let frame = build_frame_with_pip(
                black_box(PRODUCT_ETRV),
                black_box(0x000C8D),
                black_box(0x4D5E),
                CMD_TARGET_TEMP,
                21.5,
            );
            let _ = black_box(frame);
        })
    });
}

fn benchmark_decode_frame(c: &mut Criterion) {
    let data = sample_frame();

    c.bench_function("decode_frame", |b| {
        b.iter(|| {
            let frame = VerifiedFrame::decode(black_box(&data));
            let _ = black_box(frame);
        })
    });
}

fn benchmark_decode_records(c: &mut Criterion) {
    let data = sample_frame();
    let frame = VerifiedFrame::decode(&data).unwrap();

    c.bench_function("parse_records", |b| {
        b.iter(|| {
            let records = black_box(&frame).records();
            let _ = black_box(records);
        })
    });
}

fn benchmark_crc(c: &mut Criterion) {
    let data = sample_frame();

    c.bench_function("calculate_crc", |b| {
        b.iter(|| black_box(calculate_crc(black_box(&data))))
    });
}

criterion_group!(
    benches,
    benchmark_build_frame,
    benchmark_decode_frame,
    benchmark_decode_records,
    benchmark_crc
);
criterion_main!(benches);
