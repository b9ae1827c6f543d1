//! 3DatDepth wire layouts: record ids, parameter block, scan headers and pulses.
use serde::{Deserialize, Serialize};

use crate::{
    bytes::{Decoder, Encoder},
    model::{Beamflag, Pulse},
    timecode::BrokenTime,
};

/// Leading file magic of tagged (version 1.1) files.
pub const MAGIC: u16 = 0x3D46;

/// Record ids of tagged files. A legacy file starts with [PARAMETER] in place of the
/// magic.
pub mod record_id {
    pub const PARAMETER: u16 = 0x3D07;
    pub const COMMENT: u16 = 0x3D43;
    pub const ATTITUDE: u16 = 0x3D41;
    pub const HEADING: u16 = 0x3D48;
    pub const POSITION: u16 = 0x3D50;
    pub const SENSORDEPTH: u16 = 0x3D5A;
    pub const RAW_LIDAR: u16 = 0x3D52;
    pub const LIDAR: u16 = 0x3D4C;
}

/// Parameter block, not counting a record id.
pub const PARAMETER_SIZE: usize = 36;
/// Calendar prefix shared by every scan header.
pub const SCAN_TIME_SIZE: usize = 14;
pub const RAW_SCAN_HEADER_SIZE: usize = SCAN_TIME_SIZE + 4;
pub const SCAN_HEADER_SIZE: usize = SCAN_TIME_SIZE + 4 * 8 + 4 * 4 + 4;
pub const RAW_PULSE_SIZE: usize = 31;
pub const PULSE_SIZE: usize = RAW_PULSE_SIZE + 8 + 1 + 6 * 8 + 3 * 4;
/// Longest comment, terminating NUL included.
pub const MAX_COMMENT: usize = 1944;

/// Global scan geometry declared by a parameter record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScanParameters {
    pub file_version: u16,
    pub sub_version: u16,
    pub scan_type: u16,
    pub cross_track_angle_start: f32,
    pub cross_track_angle_end: f32,
    pub forward_track_angle_start: f32,
    pub forward_track_angle_end: f32,
    pub counts_per_scan: u16,
    pub counts_per_cross_track: u16,
    pub counts_per_forward_track: u16,
    pub scanner_efficiency: u16,
    pub scans_per_file: u16,
    pub scan_count: u32,
}

impl ScanParameters {
    #[must_use]
    pub fn decode(d: &mut Decoder) -> Self {
        let mut p = ScanParameters {
            file_version: d.u16(),
            sub_version: d.u16(),
            scan_type: d.u16(),
            cross_track_angle_start: d.f32(),
            cross_track_angle_end: d.f32(),
            forward_track_angle_start: d.f32(),
            forward_track_angle_end: d.f32(),
            counts_per_scan: d.u16(),
            counts_per_cross_track: d.u16(),
            counts_per_forward_track: d.u16(),
            scanner_efficiency: d.u16(),
            scans_per_file: d.u16(),
            scan_count: d.u32(),
        };
        if p.counts_per_scan == 0 {
            p.counts_per_scan = match (p.counts_per_cross_track, p.counts_per_forward_track) {
                (cross, 0) => cross,
                (0, forward) => forward,
                (cross, forward) => cross.saturating_mul(forward),
            };
        }
        p
    }

    /// Encode as version 1.1 regardless of the version that was read.
    pub fn encode(&self, e: &mut Encoder) {
        e.u16(1);
        e.u16(1);
        e.u16(self.scan_type);
        e.f32(self.cross_track_angle_start);
        e.f32(self.cross_track_angle_end);
        e.f32(self.forward_track_angle_start);
        e.f32(self.forward_track_angle_end);
        e.u16(self.counts_per_scan);
        e.u16(self.counts_per_cross_track);
        e.u16(self.counts_per_forward_track);
        e.u16(self.scanner_efficiency);
        e.u16(self.scans_per_file);
        e.u32(self.scan_count);
    }

    /// Soundings per scan, falling back to the cross and forward counts.
    #[must_use]
    pub fn pulses_per_scan(&self) -> usize {
        if self.counts_per_scan > 0 {
            usize::from(self.counts_per_scan)
        } else {
            usize::from(self.counts_per_cross_track) * usize::from(self.counts_per_forward_track)
        }
    }
}

/// Broken-out scan timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub days_since_jan_1: u16,
    pub hour: u16,
    pub minutes: u8,
    pub seconds: u8,
    pub nanoseconds: u32,
}

impl ScanTime {
    #[must_use]
    pub fn decode(d: &mut Decoder) -> Self {
        ScanTime {
            year: d.u16(),
            month: d.u8(),
            day: d.u8(),
            days_since_jan_1: d.u16(),
            hour: d.u16(),
            minutes: d.u8(),
            seconds: d.u8(),
            nanoseconds: d.u32(),
        }
    }

    pub fn encode(&self, e: &mut Encoder) {
        e.u16(self.year);
        e.u8(self.month);
        e.u8(self.day);
        e.u16(self.days_since_jan_1);
        e.u16(self.hour);
        e.u8(self.minutes);
        e.u8(self.seconds);
        e.u32(self.nanoseconds);
    }

    /// Legacy files store years since 1900 and zero based months.
    #[must_use]
    pub fn fix_legacy(mut self) -> Self {
        if self.year < 2000 {
            self.year += 1900;
            self.month += 1;
        }
        self
    }

    #[must_use]
    pub fn broken(&self) -> BrokenTime {
        BrokenTime {
            year: i32::from(self.year),
            month: u32::from(self.month),
            day: u32::from(self.day),
            hour: u32::from(self.hour),
            minute: u32::from(self.minutes),
            second: u32::from(self.seconds),
            microsecond: self.nanoseconds / 1000,
        }
    }

    #[must_use]
    pub fn from_broken(t: &BrokenTime) -> Self {
        ScanTime {
            year: u16::try_from(t.year).unwrap_or_default(),
            month: u8::try_from(t.month).unwrap_or_default(),
            day: u8::try_from(t.day).unwrap_or_default(),
            days_since_jan_1: u16::try_from(t.day_of_year()).unwrap_or_default(),
            hour: u16::try_from(t.hour).unwrap_or_default(),
            minutes: u8::try_from(t.minute).unwrap_or_default(),
            seconds: u8::try_from(t.second).unwrap_or_default(),
            nanoseconds: t.microsecond.saturating_mul(1000),
        }
    }
}

/// Fill the instrument fields of `p` from a raw pulse and reset its derived fields.
pub fn decode_raw_pulse(d: &mut Decoder, p: &mut Pulse) {
    *p = Pulse {
        range: d.f32(),
        amplitude: d.u16(),
        snr: d.f32(),
        cross_track_angle: d.f32(),
        forward_track_angle: d.f32(),
        cross_track_offset: d.f32(),
        forward_track_offset: d.f32(),
        pulse_time_offset: d.i32(),
        saturated: d.u8(),
        ..Pulse::null()
    };
}

/// Fill `p` from a processed pulse.
pub fn decode_pulse(d: &mut Decoder, p: &mut Pulse) {
    decode_raw_pulse(d, p);
    p.time_d = d.f64();
    p.beamflag = Beamflag(d.u8());
    p.acrosstrack = d.f64();
    p.alongtrack = d.f64();
    p.depth = d.f64();
    p.navlon = d.f64();
    p.navlat = d.f64();
    p.sensordepth = d.f64();
    p.heading = d.f32();
    p.roll = d.f32();
    p.pitch = d.f32();
}

/// Encode `p` as a processed pulse.
pub fn encode_pulse(e: &mut Encoder, p: &Pulse) {
    e.f32(p.range);
    e.u16(p.amplitude);
    e.f32(p.snr);
    e.f32(p.cross_track_angle);
    e.f32(p.forward_track_angle);
    e.f32(p.cross_track_offset);
    e.f32(p.forward_track_offset);
    e.i32(p.pulse_time_offset);
    e.u8(p.saturated);
    e.f64(p.time_d);
    e.u8(p.beamflag.0);
    e.f64(p.acrosstrack);
    e.f64(p.alongtrack);
    e.f64(p.depth);
    e.f64(p.navlon);
    e.f64(p.navlat);
    e.f64(p.sensordepth);
    e.f32(p.heading);
    e.f32(p.roll);
    e.f32(p.pitch);
}

/// Last position record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionFix {
    pub time_d: f64,
    pub longitude: f64,
    pub latitude: f64,
}

/// Last attitude record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttitudeFix {
    pub time_d: f64,
    pub roll: f64,
    pub pitch: f64,
    pub heave: f64,
}

/// Last heading record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadingFix {
    pub time_d: f64,
    pub heading: f64,
}

/// Last sensor depth record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorDepthFix {
    pub time_d: f64,
    pub sensordepth: f64,
}
