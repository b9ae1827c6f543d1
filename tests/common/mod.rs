#![allow(dead_code)]
use swathio::{
    bytes::{Encoder, Endianness},
    lidar::{record_id, ScanParameters, ScanTime, MAGIC, RAW_PULSE_SIZE, SCAN_TIME_SIZE},
    model::Kind,
    oic::{nav_type, ChannelDescriptor, OicRecord, SampleEncoding, Side, SonarType},
};

/// A two channel angle-bathymetry sonar ping without processed arrays.
pub fn angle_ping(sec: i32) -> OicRecord {
    let mut rec = OicRecord {
        kind: Kind::Data,
        ..OicRecord::default()
    };
    let h = &mut rec.header;
    h.type_id = 1;
    h.nav_type = nav_type::LONLAT;
    h.fish_x = 238.5;
    h.fish_y = 36.75;
    h.sec = sec;
    h.usec = 250_000;
    h.ship_speed = 2.0;
    h.fish_depth = 100.0;
    h.fish_range = 10.0;
    h.sound_velocity = 1500.0;
    h.fish_ping_period = 0.1;
    h.num_chan = 2;
    for (i, (side, samples)) in [
        (Side::Port, [10i16, 0, -5, 20, 30]),
        (Side::Starboard, [0, 15, 25, 0, 5]),
    ]
    .into_iter()
    .enumerate()
    {
        h.channels[i] = ChannelDescriptor {
            sonar_type: SonarType::Angle.into(),
            side: side.into(),
            size: SampleEncoding::Short.into(),
            num_samples: 5,
            ..ChannelDescriptor::default()
        };
        let dat = rec.raw[i].ensure_capacity(10).unwrap();
        for (k, s) in samples.iter().enumerate() {
            dat[2 * k..2 * k + 2].copy_from_slice(&s.to_ne_bytes());
        }
    }
    rec
}

pub fn scan_parameters(counts: u16) -> ScanParameters {
    ScanParameters {
        file_version: 1,
        sub_version: 1,
        scan_type: 1,
        cross_track_angle_start: -15.0,
        cross_track_angle_end: 15.0,
        counts_per_scan: counts,
        counts_per_cross_track: counts,
        counts_per_forward_track: 1,
        ..ScanParameters::default()
    }
}

/// Legacy LIDAR stream: a parameter block followed by raw scans of the given ranges.
pub fn legacy_lidar(counts: u16, scans: &[&[f32]]) -> Vec<u8> {
    let order = Endianness::Little;
    let mut e = Encoder::with_capacity(64, order);
    e.u16(record_id::PARAMETER);
    scan_parameters(counts).encode(&mut e);
    for (iscan, ranges) in scans.iter().enumerate() {
        let mut t = Encoder::with_capacity(SCAN_TIME_SIZE, order);
        ScanTime {
            year: 116,
            month: 1,
            day: 1,
            days_since_jan_1: 32,
            hour: 12,
            minutes: 30,
            seconds: u8::try_from(iscan).unwrap(),
            nanoseconds: 0,
        }
        .encode(&mut t);
        e.bytes(&t.into_inner());
        for &range in *ranges {
            let mut p = Encoder::with_capacity(RAW_PULSE_SIZE, order);
            p.f32(range);
            p.u16(200);
            p.f32(30.0);
            p.f32(0.0);
            p.f32(0.0);
            p.f32(0.0);
            p.f32(0.0);
            p.i32(0);
            p.u8(0);
            e.bytes(&p.into_inner());
        }
    }
    e.into_inner()
}

/// Tagged LIDAR stream start: magic and a parameter record.
pub fn tagged_lidar_start(counts: u16) -> Vec<u8> {
    let mut e = Encoder::with_capacity(64, Endianness::Little);
    e.u16(MAGIC);
    e.u16(record_id::PARAMETER);
    scan_parameters(counts).encode(&mut e);
    e.into_inner()
}
