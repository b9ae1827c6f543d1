//! OIC GeoDAS record header.
use serde::{Deserialize, Serialize};

use crate::bytes::{Decoder, Encoder, Endianness};

pub const MAX_CHANNELS: usize = 8;
/// Header type id of a comment record.
pub const ID_COMMENT: u8 = 127;
/// Largest client payload, which is also the largest comment including its terminator.
pub const MAX_CLIENT: usize = 252;

/// Length of the fields both variants share.
const COMMON_SIZE: usize = 248;
/// Length of the processed data counts the extended variant appends.
const EXTENDED_SIZE: usize = 28;

/// Wire variant of an OIC file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    /// `GEO` records with raw channels only.
    Geo,
    /// `GE2` records that may carry processed bathymetry and sidescan after the channels.
    Ge2,
}

impl Variant {
    #[must_use]
    pub fn magic(self) -> [u8; 3] {
        match self {
            Variant::Geo => *b"GEO",
            Variant::Ge2 => *b"GE2",
        }
    }

    /// Total header length including the magic.
    #[must_use]
    pub fn header_size(self) -> usize {
        match self {
            Variant::Geo => COMMON_SIZE,
            Variant::Ge2 => COMMON_SIZE + EXTENDED_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SonarType {
    Sidescan,
    /// Per-sample vertical distance at a fixed across-track spacing, or a triple of two-way
    /// time, angle and amplitude.
    Angle,
    Multibeam,
}

impl TryFrom<u8> for SonarType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SonarType::Sidescan),
            1 => Ok(SonarType::Angle),
            2 => Ok(SonarType::Multibeam),
            v => Err(v),
        }
    }
}

impl From<SonarType> for u8 {
    fn from(value: SonarType) -> Self {
        match value {
            SonarType::Sidescan => 0,
            SonarType::Angle => 1,
            SonarType::Multibeam => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Port,
    Starboard,
}

impl TryFrom<u8> for Side {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Side::Port),
            1 => Ok(Side::Starboard),
            v => Err(v),
        }
    }
}

impl From<Side> for u8 {
    fn from(value: Side) -> Self {
        match value {
            Side::Port => 0,
            Side::Starboard => 1,
        }
    }
}

/// How each sample of a channel is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    Char,
    Short,
    Int,
    Float,
    /// Three floats: two-way travel time, angle and amplitude.
    TripleFloat,
}

impl SampleEncoding {
    /// Bytes per sample.
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            SampleEncoding::Char => 1,
            SampleEncoding::Short => 2,
            SampleEncoding::Int | SampleEncoding::Float => 4,
            SampleEncoding::TripleFloat => 12,
        }
    }

    /// Width of the individual values that are byte swapped.
    #[must_use]
    pub fn swap_width(self) -> usize {
        match self {
            SampleEncoding::TripleFloat => 4,
            other => other.width(),
        }
    }
}

impl TryFrom<u8> for SampleEncoding {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SampleEncoding::Char),
            1 => Ok(SampleEncoding::Short),
            2 => Ok(SampleEncoding::Int),
            3 => Ok(SampleEncoding::Float),
            4 => Ok(SampleEncoding::TripleFloat),
            v => Err(v),
        }
    }
}

impl From<SampleEncoding> for u8 {
    fn from(value: SampleEncoding) -> Self {
        match value {
            SampleEncoding::Char => 0,
            SampleEncoding::Short => 1,
            SampleEncoding::Int => 2,
            SampleEncoding::Float => 3,
            SampleEncoding::TripleFloat => 4,
        }
    }
}

/// Navigation type codes.
pub mod nav_type {
    pub const UNKNOWN: u8 = 0;
    pub const UTM: u8 = 1;
    pub const LONLAT: u8 = 2;
}

/// Describes one channel payload. Codes are kept as stored so that records with codes
/// this crate does not interpret still round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    pub offset: i32,
    pub sonar_type: u8,
    pub side: u8,
    pub size: u8,
    pub empty: u8,
    pub frequency: i32,
    pub num_samples: i32,
}

impl ChannelDescriptor {
    #[must_use]
    pub fn sonar_type(&self) -> Option<SonarType> {
        SonarType::try_from(self.sonar_type).ok()
    }

    #[must_use]
    pub fn side(&self) -> Option<Side> {
        Side::try_from(self.side).ok()
    }

    #[must_use]
    pub fn encoding(&self) -> Option<SampleEncoding> {
        SampleEncoding::try_from(self.size).ok()
    }

    /// Sample count, with negative counts treated as empty.
    #[must_use]
    pub fn samples(&self) -> usize {
        usize::try_from(self.num_samples).unwrap_or(0)
    }

    /// Payload length in bytes, or `None` if the encoding is unknown or the length does
    /// not fit in memory.
    #[must_use]
    pub fn payload_len(&self) -> Option<usize> {
        self.samples().checked_mul(self.encoding()?.width())
    }
}

/// Decoded OIC record header.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Header {
    pub type_id: u8,
    pub proc_status: i32,
    pub data_size: i32,
    pub client_size: u8,
    pub fish_status: u8,
    pub nav_used: u8,
    pub nav_type: u8,
    pub utm_zone: i32,
    pub ship_x: f32,
    pub ship_y: f32,
    pub ship_course: f32,
    /// knots
    pub ship_speed: f32,
    pub sec: i32,
    pub usec: i32,
    pub spare_gain: f32,
    pub fish_heading: f32,
    pub fish_depth: f32,
    pub fish_range: f32,
    pub fish_pulse_width: f32,
    pub gain_c0: f32,
    pub gain_c1: f32,
    pub gain_c2: f32,
    pub fish_pitch: f32,
    pub fish_roll: f32,
    pub fish_yaw: f32,
    pub fish_x: f32,
    pub fish_y: f32,
    pub fish_layback: f32,
    pub fish_altitude: f32,
    pub fish_altitude_samples: i32,
    pub fish_ping_period: f32,
    pub sound_velocity: f32,
    pub num_chan: i32,
    pub channels: [ChannelDescriptor; MAX_CHANNELS],
    pub beams_bath: i32,
    pub beams_amp: i32,
    pub bath_chan_port: i32,
    pub bath_chan_stbd: i32,
    pub pixels_ss: i32,
    pub ss_chan_port: i32,
    pub ss_chan_stbd: i32,
}

impl Header {
    /// Decode a complete header, magic included. `buf` must hold at least
    /// `variant.header_size()` bytes.
    #[must_use]
    pub fn decode(buf: &[u8], variant: Variant, order: Endianness) -> Header {
        let mut d = Decoder::at(buf, 3, order);
        let mut h = Header {
            type_id: d.u8(),
            proc_status: d.i32(),
            data_size: d.i32(),
            client_size: d.u8(),
            fish_status: d.u8(),
            nav_used: d.u8(),
            nav_type: d.u8(),
            utm_zone: d.i32(),
            ship_x: d.f32(),
            ship_y: d.f32(),
            ship_course: d.f32(),
            ship_speed: d.f32(),
            sec: d.i32(),
            usec: d.i32(),
            spare_gain: d.f32(),
            fish_heading: d.f32(),
            fish_depth: d.f32(),
            fish_range: d.f32(),
            fish_pulse_width: d.f32(),
            gain_c0: d.f32(),
            gain_c1: d.f32(),
            gain_c2: d.f32(),
            fish_pitch: d.f32(),
            fish_roll: d.f32(),
            fish_yaw: d.f32(),
            fish_x: d.f32(),
            fish_y: d.f32(),
            fish_layback: d.f32(),
            fish_altitude: d.f32(),
            fish_altitude_samples: d.i32(),
            fish_ping_period: d.f32(),
            sound_velocity: d.f32(),
            num_chan: d.i32(),
            ..Header::default()
        };
        for chan in &mut h.channels {
            chan.offset = d.i32();
        }
        for chan in &mut h.channels {
            chan.sonar_type = d.u8();
            chan.side = d.u8();
            chan.size = d.u8();
            chan.empty = d.u8();
            chan.frequency = d.i32();
            chan.num_samples = d.i32();
        }
        if variant == Variant::Ge2 {
            h.beams_bath = d.i32();
            h.beams_amp = d.i32();
            h.bath_chan_port = d.i32();
            h.bath_chan_stbd = d.i32();
            h.pixels_ss = d.i32();
            h.ss_chan_port = d.i32();
            h.ss_chan_stbd = d.i32();
        }
        h
    }

    /// Encode the header, magic included.
    #[must_use]
    pub fn encode(&self, variant: Variant, order: Endianness) -> Vec<u8> {
        let mut e = Encoder::with_capacity(variant.header_size(), order);
        e.bytes(&variant.magic());
        e.u8(self.type_id);
        e.i32(self.proc_status);
        e.i32(self.data_size);
        e.u8(self.client_size);
        e.u8(self.fish_status);
        e.u8(self.nav_used);
        e.u8(self.nav_type);
        e.i32(self.utm_zone);
        for v in [self.ship_x, self.ship_y, self.ship_course, self.ship_speed] {
            e.f32(v);
        }
        e.i32(self.sec);
        e.i32(self.usec);
        for v in [
            self.spare_gain,
            self.fish_heading,
            self.fish_depth,
            self.fish_range,
            self.fish_pulse_width,
            self.gain_c0,
            self.gain_c1,
            self.gain_c2,
            self.fish_pitch,
            self.fish_roll,
            self.fish_yaw,
            self.fish_x,
            self.fish_y,
            self.fish_layback,
            self.fish_altitude,
        ] {
            e.f32(v);
        }
        e.i32(self.fish_altitude_samples);
        e.f32(self.fish_ping_period);
        e.f32(self.sound_velocity);
        e.i32(self.num_chan);
        for chan in &self.channels {
            e.i32(chan.offset);
        }
        for chan in &self.channels {
            e.u8(chan.sonar_type);
            e.u8(chan.side);
            e.u8(chan.size);
            e.u8(chan.empty);
            e.i32(chan.frequency);
            e.i32(chan.num_samples);
        }
        if variant == Variant::Ge2 {
            for v in [
                self.beams_bath,
                self.beams_amp,
                self.bath_chan_port,
                self.bath_chan_stbd,
                self.pixels_ss,
                self.ss_chan_port,
                self.ss_chan_stbd,
            ] {
                e.i32(v);
            }
        }
        e.into_inner()
    }

    /// Number of channel descriptors in use, or `None` when the count is out of range.
    #[must_use]
    pub fn channel_count(&self) -> Option<usize> {
        usize::try_from(self.num_chan)
            .ok()
            .filter(|n| (1..=MAX_CHANNELS).contains(n))
    }

    /// Channel index assigned to bathymetry on `side`, if any.
    #[must_use]
    pub fn bath_chan(&self, side: Side) -> Option<usize> {
        let idx = match side {
            Side::Port => self.bath_chan_port,
            Side::Starboard => self.bath_chan_stbd,
        };
        usize::try_from(idx).ok().filter(|&i| i < MAX_CHANNELS)
    }

    /// Channel index assigned to sidescan on `side`, if any.
    #[must_use]
    pub fn ss_chan(&self, side: Side) -> Option<usize> {
        let idx = match side {
            Side::Port => self.ss_chan_port,
            Side::Starboard => self.ss_chan_stbd,
        };
        usize::try_from(idx).ok().filter(|&i| i < MAX_CHANNELS)
    }

    pub(crate) fn set_bath_chan(&mut self, side: Side, idx: i32) {
        match side {
            Side::Port => self.bath_chan_port = idx,
            Side::Starboard => self.bath_chan_stbd = idx,
        }
    }

    pub(crate) fn set_ss_chan(&mut self, side: Side, idx: i32) {
        match side {
            Side::Port => self.ss_chan_port = idx,
            Side::Starboard => self.ss_chan_stbd = idx,
        }
    }

    #[must_use]
    pub fn time_d(&self) -> f64 {
        f64::from(self.sec) + 0.000_001 * f64::from(self.usec)
    }

    pub(crate) fn set_time_d(&mut self, time_d: f64) {
        let mut sec = time_d.trunc();
        let mut usec = ((time_d - sec) * 1_000_000.0).round();
        if usec >= 1_000_000.0 {
            sec += 1.0;
            usec -= 1_000_000.0;
        }
        self.sec = sec as i32;
        self.usec = usec as i32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        let mut h = Header {
            type_id: 3,
            proc_status: 1,
            data_size: 1234,
            client_size: 0,
            nav_type: nav_type::LONLAT,
            sec: 1_000_000,
            usec: 250_000,
            fish_heading: 45.5,
            fish_depth: 110.0,
            fish_x: 238.0,
            fish_y: 36.5,
            sound_velocity: 1500.0,
            num_chan: 2,
            beams_bath: 7,
            bath_chan_port: 0,
            bath_chan_stbd: 1,
            ss_chan_port: -1,
            ss_chan_stbd: -1,
            ..Header::default()
        };
        h.channels[0] = ChannelDescriptor {
            sonar_type: SonarType::Angle.into(),
            side: Side::Port.into(),
            size: SampleEncoding::Short.into(),
            num_samples: 5,
            frequency: 100_000,
            ..ChannelDescriptor::default()
        };
        h.channels[1] = ChannelDescriptor {
            side: Side::Starboard.into(),
            ..h.channels[0]
        };
        h
    }

    #[test]
    fn header_sizes() {
        let h = sample_header();
        assert_eq!(h.encode(Variant::Geo, Endianness::Big).len(), 248);
        assert_eq!(h.encode(Variant::Ge2, Endianness::Big).len(), 276);
        assert_eq!(&h.encode(Variant::Ge2, Endianness::Big)[..3], b"GE2");
        assert_eq!(&h.encode(Variant::Geo, Endianness::Little)[..3], b"GEO");
    }

    #[test]
    fn decode_encoded_header() {
        let h = sample_header();
        for order in [Endianness::Big, Endianness::Little] {
            let buf = h.encode(Variant::Ge2, order);
            assert_eq!(Header::decode(&buf, Variant::Ge2, order), h, "{order:?}");
        }
    }

    #[test]
    fn geo_header_drops_processed_counts() {
        let h = sample_header();
        let buf = h.encode(Variant::Geo, Endianness::Big);
        let back = Header::decode(&buf, Variant::Geo, Endianness::Big);
        assert_eq!(back.beams_bath, 0);
        assert_eq!(back.channels, h.channels);
        assert_eq!(back.num_chan, 2);
    }

    #[test]
    fn known_field_offsets() {
        let h = sample_header();
        let buf = h.encode(Variant::Ge2, Endianness::Big);
        assert_eq!(buf[3], 3, "type");
        assert_eq!(&buf[116..120], &2i32.to_be_bytes(), "num_chan");
        // first descriptor follows the 8 offsets
        assert_eq!(buf[152], 1, "sonar type");
        assert_eq!(buf[153], 0, "side");
        assert_eq!(buf[154], 1, "size");
        assert_eq!(&buf[248..252], &7i32.to_be_bytes(), "beams_bath");
    }

    #[test]
    fn descriptor_payload() {
        let mut d = ChannelDescriptor {
            size: SampleEncoding::TripleFloat.into(),
            num_samples: 10,
            ..ChannelDescriptor::default()
        };
        assert_eq!(d.payload_len(), Some(120));
        d.size = 9;
        assert_eq!(d.payload_len(), None);
        d.size = 1;
        d.num_samples = -4;
        assert_eq!(d.payload_len(), Some(0));
    }

    #[test]
    fn channel_count_bounds() {
        let mut h = sample_header();
        assert_eq!(h.channel_count(), Some(2));
        h.num_chan = 0;
        assert_eq!(h.channel_count(), None);
        h.num_chan = 9;
        assert_eq!(h.channel_count(), None);
    }

    #[test]
    fn time_split() {
        let mut h = Header::default();
        h.set_time_d(1_000_000.999_999_7);
        assert_eq!(h.sec, 1_000_001);
        assert_eq!(h.usec, 0);
        h.set_time_d(12.5);
        assert_eq!((h.sec, h.usec), (12, 500_000));
        assert!((h.time_d() - 12.5).abs() < 1e-9);
    }
}
