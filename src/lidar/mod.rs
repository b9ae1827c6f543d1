//! 3DatDepth SL1 subsea scanning LIDAR.
//!
//! Tagged files open with [MAGIC] and carry a 2 byte id ahead of every record. Legacy
//! files open directly with a parameter block and hold nothing but raw scans, each a
//! calendar header followed by pulses until the next header.
mod processing;
mod records;

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

pub use processing::calculate_bathymetry;
pub use records::{
    record_id, AttitudeFix, HeadingFix, PositionFix, ScanParameters, ScanTime, SensorDepthFix,
    MAGIC, MAX_COMMENT, PARAMETER_SIZE, PULSE_SIZE, RAW_PULSE_SIZE, RAW_SCAN_HEADER_SIZE,
    SCAN_HEADER_SIZE, SCAN_TIME_SIZE,
};

use crate::{
    buffer::resize_checked,
    bytes::{read_u16, Bytes, Decoder, Encoder, Endianness},
    codec::{not_data, FormatCodec, FormatKind, PreprocessParams},
    config::{CodecConfig, LonFlip},
    error::{Error, Result},
    geometry::Platform,
    model::{
        Altitude, BeamWidth, DetectType, Dimensions, Gains, Kind, NavSample, Pulse, PulseType,
        Sounding, TravelTimes,
    },
    timecode::{epoch_seconds_or_zero, BrokenTime},
};

/// Pulses a single scan may declare.
const MAX_PULSES: usize = u16::MAX as usize;

/// Everything decoded from the stream so far. Ancillary records update their own fields
/// and leave the last scan in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LidarRecord {
    pub kind: Kind,
    /// Id of the last record read or written.
    pub record_id: u16,
    pub params: ScanParameters,
    /// Scans since the last parameter record, starting at 0.
    pub current_scan: i64,

    pub time: ScanTime,
    /// Epoch seconds of the scan.
    pub time_d: f64,
    pub navlon: f64,
    pub navlat: f64,
    pub sensordepth: f64,
    pub heading: f32,
    pub roll: f32,
    pub pitch: f32,
    /// km/hr
    pub speed: f32,
    /// False until pulse geometry has been computed for a raw scan.
    pub bathymetry_calculated: bool,
    /// Pulses received in the current scan.
    pub num_pulses: usize,
    /// At least one entry per declared pulse. Entries past `num_pulses` are null.
    pub pulses: Vec<Pulse>,

    pub comment: String,

    pub position: PositionFix,
    pub attitude: AttitudeFix,
    pub heading_fix: HeadingFix,
    pub sensordepth_fix: SensorDepthFix,
}

impl Default for LidarRecord {
    fn default() -> Self {
        LidarRecord {
            kind: Kind::None,
            record_id: 0,
            params: ScanParameters::default(),
            current_scan: -1,
            time: ScanTime::default(),
            time_d: 0.0,
            navlon: 0.0,
            navlat: 0.0,
            sensordepth: 0.0,
            heading: 0.0,
            roll: 0.0,
            pitch: 0.0,
            speed: 0.0,
            bathymetry_calculated: false,
            num_pulses: 0,
            pulses: Vec::new(),
            comment: String::new(),
            position: PositionFix::default(),
            attitude: AttitudeFix::default(),
            heading_fix: HeadingFix::default(),
            sensordepth_fix: SensorDepthFix::default(),
        }
    }
}

impl LidarRecord {
    /// Set the scan time and its broken-out fields.
    pub fn set_time_d(&mut self, time_d: f64) {
        self.time_d = time_d;
        match BrokenTime::from_epoch_seconds(time_d) {
            Some(t) => self.time = ScanTime::from_broken(&t),
            None => warn!(time_d, "time cannot be split into calendar fields"),
        }
    }

    fn received(&self) -> &[Pulse] {
        &self.pulses[..self.num_pulses.min(self.pulses.len())]
    }

    /// Null every stored pulse past those received.
    fn clear_tail(&mut self) {
        let n = self.num_pulses.min(self.pulses.len());
        for p in &mut self.pulses[n..] {
            *p = Pulse::null();
        }
    }

    fn reset_navigation(&mut self) {
        self.time_d = 0.0;
        self.navlon = 0.0;
        self.navlat = 0.0;
        self.sensordepth = 0.0;
        self.heading = 0.0;
        self.roll = 0.0;
        self.pitch = 0.0;
        self.speed = 0.0;
    }
}

/// Where a read session is in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing read yet; the next read classifies the file from its first 2 bytes.
    #[default]
    HeaderPending,
    /// Reading records of a recognized file version.
    Reading { file_version: u16, sub_version: u16 },
    /// The file start was not recognized; no further records are produced.
    Failed,
}

/// Codec session for 3DatDepth files.
#[derive(Debug, Clone)]
pub struct LidarCodec {
    state: SessionState,
    magic_written: bool,
    order: Endianness,
    lonflip: LonFlip,
}

impl LidarCodec {
    #[must_use]
    pub fn new(config: &CodecConfig) -> Self {
        LidarCodec {
            state: SessionState::HeaderPending,
            magic_written: false,
            order: config.byte_order_or(Endianness::Little),
            lonflip: config.lonflip,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    fn read_u16<R: Read>(&self, bytes: &mut Bytes<R>) -> Result<u16> {
        let mut buf = [0u8; 2];
        bytes.read_exact(&mut buf)?;
        Ok(read_u16(&buf, 0, self.order))
    }

    fn read_parameter<R: Read>(&self, bytes: &mut Bytes<R>, rec: &mut LidarRecord) -> Result<Kind> {
        let mut buf = [0u8; PARAMETER_SIZE];
        bytes.read_exact(&mut buf)?;
        rec.params = ScanParameters::decode(&mut Decoder::new(&buf, self.order));
        rec.current_scan = -1;
        rec.num_pulses = 0;
        rec.pulses.clear();
        resize_checked(&mut rec.pulses, rec.params.pulses_per_scan(), Pulse::null())?;
        rec.record_id = record_id::PARAMETER;
        rec.kind = Kind::Parameter;
        debug!(
            version = rec.params.file_version,
            sub_version = rec.params.sub_version,
            pulses_per_scan = rec.pulses.len(),
            "scan parameters"
        );
        Ok(Kind::Parameter)
    }

    /// Read a fixed size record body into a scratch buffer.
    fn body<R: Read, const N: usize>(&self, bytes: &mut Bytes<R>) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        bytes.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_tagged<R: Read>(&self, bytes: &mut Bytes<R>, rec: &mut LidarRecord) -> Result<Kind> {
        let id = self.read_u16(bytes)?;
        let kind = match id {
            record_id::PARAMETER => return self.read_parameter(bytes, rec),
            record_id::COMMENT => {
                let len = usize::from(self.read_u16(bytes)?);
                let mut text = vec![0u8; len];
                bytes.read_exact(&mut text)?;
                let end = text.iter().position(|&b| b == 0).unwrap_or(len);
                rec.comment = String::from_utf8_lossy(&text[..end]).into_owned();
                Kind::Comment
            }
            record_id::POSITION => {
                let buf = self.body::<R, 24>(bytes)?;
                let mut d = Decoder::new(&buf, self.order);
                rec.position = PositionFix {
                    time_d: d.f64(),
                    longitude: d.f64(),
                    latitude: d.f64(),
                };
                Kind::Nav
            }
            record_id::ATTITUDE => {
                let buf = self.body::<R, 32>(bytes)?;
                let mut d = Decoder::new(&buf, self.order);
                rec.attitude = AttitudeFix {
                    time_d: d.f64(),
                    roll: d.f64(),
                    pitch: d.f64(),
                    heave: d.f64(),
                };
                Kind::Attitude
            }
            record_id::HEADING => {
                let buf = self.body::<R, 16>(bytes)?;
                let mut d = Decoder::new(&buf, self.order);
                rec.heading_fix = HeadingFix {
                    time_d: d.f64(),
                    heading: d.f64(),
                };
                Kind::Heading
            }
            record_id::SENSORDEPTH => {
                let buf = self.body::<R, 16>(bytes)?;
                let mut d = Decoder::new(&buf, self.order);
                rec.sensordepth_fix = SensorDepthFix {
                    time_d: d.f64(),
                    sensordepth: d.f64(),
                };
                Kind::SensorDepth
            }
            record_id::RAW_LIDAR => self.read_scan(bytes, rec, false)?,
            record_id::LIDAR => self.read_scan(bytes, rec, true)?,
            other => {
                rec.kind = Kind::None;
                return Err(Error::unintelligible(format!(
                    "unknown record id {other:#06x} at offset {}",
                    bytes.offset() - 2
                )));
            }
        };
        rec.record_id = id;
        rec.kind = kind;
        Ok(kind)
    }

    fn read_scan<R: Read>(
        &self,
        bytes: &mut Bytes<R>,
        rec: &mut LidarRecord,
        processed: bool,
    ) -> Result<Kind> {
        let size = if processed {
            SCAN_HEADER_SIZE
        } else {
            RAW_SCAN_HEADER_SIZE
        };
        let mut buf = [0u8; SCAN_HEADER_SIZE];
        bytes.read_exact(&mut buf[..size])?;
        let mut d = Decoder::new(&buf[..size], self.order);

        rec.current_scan += 1;
        rec.time = ScanTime::decode(&mut d);
        if processed {
            rec.time_d = d.f64();
            rec.navlon = d.f64();
            rec.navlat = d.f64();
            rec.sensordepth = d.f64();
            rec.heading = d.f32();
            rec.roll = d.f32();
            rec.pitch = d.f32();
            rec.speed = d.f32();
        } else {
            rec.reset_navigation();
            rec.time_d = epoch_seconds_or_zero(&rec.time.broken());
        }
        rec.bathymetry_calculated = processed;

        let num = d.u32() as usize;
        if num > MAX_PULSES {
            rec.kind = Kind::None;
            return Err(Error::unintelligible(format!(
                "scan declares {num} pulses"
            )));
        }
        if num > rec.pulses.len() {
            resize_checked(&mut rec.pulses, num, Pulse::null())?;
        }

        let width = if processed { PULSE_SIZE } else { RAW_PULSE_SIZE };
        let mut pbuf = [0u8; PULSE_SIZE];
        for pulse in &mut rec.pulses[..num] {
            bytes.read_exact(&mut pbuf[..width])?;
            let mut d = Decoder::new(&pbuf[..width], self.order);
            if processed {
                records::decode_pulse(&mut d, pulse);
            } else {
                records::decode_raw_pulse(&mut d, pulse);
            }
        }
        rec.num_pulses = num;
        rec.clear_tail();
        trace!(
            scan = rec.current_scan,
            pulses = num,
            processed,
            "scan record"
        );
        Ok(Kind::Data)
    }

    /// Legacy scans have no length; pulses run until a window matching the first 4 bytes
    /// of the scan header, which is returned to the stream for the next read.
    fn read_legacy_scan<R: Read>(
        &self,
        bytes: &mut Bytes<R>,
        rec: &mut LidarRecord,
    ) -> Result<Kind> {
        let mut header = [0u8; SCAN_TIME_SIZE];
        bytes.read_exact(&mut header)?;

        rec.current_scan += 1;
        rec.record_id = record_id::RAW_LIDAR;
        rec.reset_navigation();
        rec.time = ScanTime::decode(&mut Decoder::new(&header, self.order)).fix_legacy();
        rec.time_d = epoch_seconds_or_zero(&rec.time.broken());
        rec.bathymetry_calculated = false;

        let capacity = rec.params.pulses_per_scan();
        let mut buf = [0u8; RAW_PULSE_SIZE];
        rec.num_pulses = 0;
        loop {
            if bytes.fill(&mut buf[..4])? < 4 {
                debug!(pulses = rec.num_pulses, "stream ended inside legacy scan");
                break;
            }
            if buf[..4] == header[..4] {
                bytes.push(&buf[..4]);
                break;
            }
            bytes.read_exact(&mut buf[4..])?;
            if rec.num_pulses >= rec.pulses.len() {
                resize_checked(&mut rec.pulses, rec.num_pulses + 1, Pulse::null())?;
            }
            records::decode_raw_pulse(
                &mut Decoder::new(&buf, self.order),
                &mut rec.pulses[rec.num_pulses],
            );
            rec.num_pulses += 1;
            if rec.num_pulses >= capacity {
                break;
            }
        }
        rec.clear_tail();
        rec.kind = Kind::Data;
        trace!(
            scan = rec.current_scan,
            pulses = rec.num_pulses,
            "legacy scan"
        );
        Ok(Kind::Data)
    }

    fn encode(&self, rec: &LidarRecord) -> Option<Vec<u8>> {
        let mut e;
        match rec.kind {
            Kind::Parameter => {
                e = Encoder::with_capacity(2 + PARAMETER_SIZE, self.order);
                e.u16(record_id::PARAMETER);
                rec.params.encode(&mut e);
            }
            Kind::Comment => {
                let text = rec.comment.as_bytes();
                let n = text.len().min(MAX_COMMENT - 1);
                e = Encoder::with_capacity(4 + n + 1, self.order);
                e.u16(record_id::COMMENT);
                e.u16(u16::try_from(n + 1).unwrap_or(u16::MAX));
                e.bytes(&text[..n]);
                e.u8(0);
            }
            Kind::Nav => {
                e = Encoder::with_capacity(2 + 24, self.order);
                e.u16(record_id::POSITION);
                e.f64(rec.position.time_d);
                e.f64(rec.position.longitude);
                e.f64(rec.position.latitude);
            }
            Kind::Attitude => {
                e = Encoder::with_capacity(2 + 32, self.order);
                e.u16(record_id::ATTITUDE);
                e.f64(rec.attitude.time_d);
                e.f64(rec.attitude.roll);
                e.f64(rec.attitude.pitch);
                e.f64(rec.attitude.heave);
            }
            Kind::Heading => {
                e = Encoder::with_capacity(2 + 16, self.order);
                e.u16(record_id::HEADING);
                e.f64(rec.heading_fix.time_d);
                e.f64(rec.heading_fix.heading);
            }
            Kind::SensorDepth => {
                e = Encoder::with_capacity(2 + 16, self.order);
                e.u16(record_id::SENSORDEPTH);
                e.f64(rec.sensordepth_fix.time_d);
                e.f64(rec.sensordepth_fix.sensordepth);
            }
            Kind::Data => {
                let pulses = rec.received();
                e = Encoder::with_capacity(
                    2 + SCAN_HEADER_SIZE + pulses.len() * PULSE_SIZE,
                    self.order,
                );
                e.u16(record_id::LIDAR);
                rec.time.encode(&mut e);
                e.f64(rec.time_d);
                e.f64(rec.navlon);
                e.f64(rec.navlat);
                e.f64(rec.sensordepth);
                e.f32(rec.heading);
                e.f32(rec.roll);
                e.f32(rec.pitch);
                e.f32(rec.speed);
                e.u32(u32::try_from(pulses.len()).unwrap_or(u32::MAX));
                for p in pulses {
                    records::encode_pulse(&mut e, p);
                }
            }
            Kind::None => return None,
        }
        Some(e.into_inner())
    }

    fn require_data(rec: &LidarRecord) -> Result<()> {
        if rec.kind == Kind::Data {
            Ok(())
        } else {
            Err(not_data(rec.kind))
        }
    }
}

impl FormatCodec for LidarCodec {
    type Record = LidarRecord;

    fn format(&self) -> FormatKind {
        FormatKind::Lidar3dDepthP
    }

    fn allocate(&self) -> Result<LidarRecord> {
        Ok(LidarRecord::default())
    }

    fn read_record<R: Read>(&mut self, bytes: &mut Bytes<R>, rec: &mut LidarRecord) -> Result<Kind> {
        match self.state {
            SessionState::Failed => return Err(Error::Eof),
            SessionState::HeaderPending => match self.read_u16(bytes)? {
                MAGIC => {
                    debug!("tagged file, version 1.1");
                    self.state = SessionState::Reading {
                        file_version: 1,
                        sub_version: 1,
                    };
                }
                record_id::PARAMETER => {
                    debug!("legacy file, version 1.0");
                    self.state = SessionState::Reading {
                        file_version: 1,
                        sub_version: 0,
                    };
                    return self.read_parameter(bytes, rec);
                }
                other => {
                    self.state = SessionState::Failed;
                    rec.kind = Kind::None;
                    return Err(Error::unintelligible(format!(
                        "unrecognized file start {other:#06x}"
                    )));
                }
            },
            SessionState::Reading { .. } => {}
        }

        match self.state {
            SessionState::Reading { sub_version: 0, .. } => self.read_legacy_scan(bytes, rec),
            _ => self.read_tagged(bytes, rec),
        }
    }

    fn write_record<W: Write>(&mut self, w: &mut W, rec: &LidarRecord) -> Result<()> {
        if !self.magic_written {
            let mut e = Encoder::with_capacity(2, self.order);
            e.u16(MAGIC);
            w.write_all(&e.into_inner()).map_err(Error::write)?;
            self.magic_written = true;
        }
        match self.encode(rec) {
            Some(buf) => w.write_all(&buf).map_err(Error::write),
            None => {
                debug!("record of kind none not written");
                Ok(())
            }
        }
    }

    fn kind(&self, rec: &LidarRecord) -> Kind {
        rec.kind
    }

    fn dimensions(&self, rec: &LidarRecord) -> Dimensions {
        if rec.kind != Kind::Data {
            return Dimensions::default();
        }
        let nbath = rec.params.pulses_per_scan();
        Dimensions {
            nbath,
            namp: nbath,
            nss: 0,
        }
    }

    fn max_dimensions(&self, rec: &LidarRecord) -> Dimensions {
        let nbath = rec.params.pulses_per_scan().max(rec.pulses.len());
        Dimensions {
            nbath,
            namp: nbath,
            nss: 0,
        }
    }

    fn beamwidth(&self) -> BeamWidth {
        BeamWidth {
            alongtrack: 0.02,
            acrosstrack: 0.02,
        }
    }

    fn extract(&self, rec: &LidarRecord) -> Result<Sounding> {
        match rec.kind {
            Kind::Data => {}
            Kind::Comment => return Ok(Sounding::comment(rec.comment.clone())),
            _ => return Err(Error::Other),
        }
        let nbath = self.dimensions(rec).nbath;
        let mut s = Sounding {
            kind: Kind::Data,
            time_d: epoch_seconds_or_zero(&rec.time.broken()),
            navlon: self.lonflip.apply(rec.navlon),
            navlat: rec.navlat,
            speed: f64::from(rec.speed),
            heading: f64::from(rec.heading),
            ..Sounding::default()
        };
        let null = Pulse::null();
        for i in 0..nbath {
            let p = rec.pulses.get(i).unwrap_or(&null);
            s.beamflag.push(p.beamflag);
            s.bath.push(p.depth + p.sensordepth);
            s.amp.push(f64::from(p.amplitude));
            s.bathacrosstrack.push(p.acrosstrack);
            s.bathalongtrack.push(p.alongtrack);
        }
        Ok(s)
    }

    fn insert(&self, rec: &mut LidarRecord, sounding: &Sounding) -> Result<()> {
        match sounding.kind {
            Kind::Data => {
                let dlon = sounding.navlon - rec.navlon;
                let dlat = sounding.navlat - rec.navlat;
                let dheading = sounding.heading - f64::from(rec.heading);

                rec.set_time_d(sounding.time_d);
                rec.navlon = sounding.navlon;
                rec.navlat = sounding.navlat;
                rec.speed = sounding.speed as f32;
                rec.heading = sounding.heading as f32;

                let nbath = sounding.bath.len();
                if nbath > rec.pulses.len() {
                    resize_checked(&mut rec.pulses, nbath, Pulse::null())?;
                }
                rec.num_pulses = rec.num_pulses.max(nbath);
                for (i, pulse) in rec.pulses[..nbath].iter_mut().enumerate() {
                    pulse.beamflag = sounding.beamflag.get(i).copied().unwrap_or(pulse.beamflag);
                    pulse.navlon += dlon;
                    pulse.navlat += dlat;
                    let mut heading = f64::from(pulse.heading) + dheading;
                    if heading < 0.0 {
                        heading += 360.0;
                    }
                    if heading > 360.0 {
                        heading -= 360.0;
                    }
                    pulse.heading = heading as f32;
                    pulse.depth = sounding.bath[i] - pulse.sensordepth;
                    if let Some(&amp) = sounding.amp.get(i) {
                        pulse.amplitude = amp.clamp(0.0, f64::from(u16::MAX)) as u16;
                    }
                    if let Some(&x) = sounding.bathacrosstrack.get(i) {
                        pulse.acrosstrack = x;
                    }
                    if let Some(&y) = sounding.bathalongtrack.get(i) {
                        pulse.alongtrack = y;
                    }
                }
                rec.kind = Kind::Data;
                Ok(())
            }
            Kind::Comment => {
                let text = sounding.comment.as_deref().unwrap_or_default();
                let mut end = text.len().min(MAX_COMMENT - 1);
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                rec.time_d = sounding.time_d;
                rec.comment = text[..end].to_string();
                rec.kind = Kind::Comment;
                Ok(())
            }
            _ => Err(Error::Other),
        }
    }

    fn extract_nav(&self, rec: &LidarRecord) -> Result<NavSample> {
        Self::require_data(rec)?;
        Ok(NavSample {
            time_d: rec.time_d,
            navlon: self.lonflip.apply(rec.navlon),
            navlat: rec.navlat,
            speed: f64::from(rec.speed),
            heading: f64::from(rec.heading),
            draft: rec.sensordepth,
            roll: f64::from(rec.roll),
            pitch: f64::from(rec.pitch),
            heave: 0.0,
        })
    }

    fn insert_nav(&self, rec: &mut LidarRecord, nav: &NavSample) -> Result<()> {
        if rec.kind != Kind::Data {
            return Ok(());
        }
        let sensordepth = nav.draft - nav.heave;
        let dlon = nav.navlon - rec.navlon;
        let dlat = nav.navlat - rec.navlat;
        let dheading = nav.heading - f64::from(rec.heading);
        let dsensordepth = sensordepth - rec.sensordepth;
        let droll = nav.roll - f64::from(rec.roll);
        let dpitch = nav.pitch - f64::from(rec.pitch);

        rec.set_time_d(nav.time_d);
        rec.navlon = nav.navlon;
        rec.navlat = nav.navlat;
        rec.speed = nav.speed as f32;
        rec.heading = nav.heading as f32;
        rec.sensordepth = sensordepth;
        rec.roll = nav.roll as f32;
        rec.pitch = nav.pitch as f32;

        let n = rec.num_pulses.min(rec.pulses.len());
        for pulse in &mut rec.pulses[..n] {
            pulse.navlon += dlon;
            pulse.navlat += dlat;
            pulse.sensordepth += dsensordepth;
            let mut heading = f64::from(pulse.heading) + dheading;
            if heading < 0.0 {
                heading += 360.0;
            }
            if heading > 360.0 {
                heading -= 360.0;
            }
            pulse.heading = heading as f32;
            pulse.roll = (f64::from(pulse.roll) + droll) as f32;
            pulse.pitch = (f64::from(pulse.pitch) + dpitch) as f32;
        }
        Ok(())
    }

    fn extract_altitude(&self, rec: &LidarRecord) -> Result<Altitude> {
        Self::require_data(rec)?;
        let altitude = rec
            .received()
            .iter()
            .map(|p| (p.acrosstrack.hypot(p.alongtrack), p.depth))
            .fold((f64::INFINITY, 0.0), |best, cur| if cur.0 < best.0 { cur } else { best })
            .1;
        Ok(Altitude {
            transducer_depth: rec.sensordepth,
            altitude,
        })
    }

    fn insert_altitude(&self, _rec: &mut LidarRecord, _altitude: &Altitude) -> Result<()> {
        Err(Error::Other)
    }

    fn travel_times(&self, rec: &LidarRecord) -> Result<TravelTimes> {
        Self::require_data(rec)?;
        let n = self.dimensions(rec).nbath;
        Ok(TravelTimes {
            ttimes: vec![0.0; n],
            angles: vec![0.0; n],
            angles_forward: vec![0.0; n],
            angles_null: vec![0.0; n],
            heave: vec![0.0; n],
            alongtrack_offset: vec![0.0; n],
            draft: 0.0,
            ssv: 0.0,
        })
    }

    fn detects(&self, rec: &LidarRecord) -> Result<Vec<DetectType>> {
        Self::require_data(rec)?;
        Ok(vec![DetectType::Lidar; self.dimensions(rec).nbath])
    }

    fn pulses(&self, rec: &LidarRecord) -> Result<Vec<PulseType>> {
        Self::require_data(rec)?;
        Ok(vec![PulseType::Lidar; self.dimensions(rec).nbath])
    }

    fn gains(&self, rec: &LidarRecord) -> Result<Gains> {
        Self::require_data(rec)?;
        Ok(Gains::default())
    }

    fn ping_number(&self, rec: &LidarRecord) -> Result<i64> {
        Self::require_data(rec)?;
        Ok(rec.current_scan)
    }

    fn preprocess(
        &self,
        rec: &mut LidarRecord,
        params: &PreprocessParams,
        platform: Option<&dyn Platform>,
    ) -> Result<()> {
        processing::preprocess(rec, params, platform);
        Ok(())
    }
}
