//! OIC GeoDAS towed sonar records.
//!
//! A record is a fixed size header, an optional client block, one raw payload per
//! channel and, for the extended `GE2` variant, processed bathymetry, amplitude and
//! sidescan arrays. Records without processed arrays have them rebuilt from the raw
//! angle, multibeam and sidescan channels on read.
mod header;
mod reconstruct;

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

pub use header::{
    nav_type, ChannelDescriptor, Header, SampleEncoding, Side, SonarType, Variant,
    ID_COMMENT, MAX_CHANNELS, MAX_CLIENT,
};

use crate::{
    buffer::{resize_checked, ChannelBuffer},
    bytes::{swap_in_place, Bytes, Decoder, Encoder, Endianness},
    codec::{not_data, FormatCodec, FormatKind, PreprocessParams},
    config::{CodecConfig, LonFlip},
    error::{Error, Result},
    geometry::{rollpitch_to_takeoff, Platform},
    model::{
        Altitude, BeamWidth, Beamflag, DetectType, Dimensions, Gains, Kind, NavSample,
        PulseType, Sounding, TravelTimes,
    },
    synchronizer::Synchronizer,
};

/// Most bathymetry beams a record is expected to carry.
pub const MAX_BEAMS: usize = 1024;
/// Most amplitude values a record is expected to carry.
pub const MAX_AMP: usize = 256;
/// Most sidescan pixels a record is expected to carry.
pub const MAX_PIXELS: usize = 2048;

/// Bytes per bathymetry beam in the processed block: a flag and five floats.
const BEAM_BYTES: usize = 1 + 5 * 4;
/// Bytes per sidescan pixel in the processed block: three floats.
const PIXEL_BYTES: usize = 3 * 4;

/// Processed bathymetry, amplitude and sidescan arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedData {
    pub beamflag: Vec<Beamflag>,
    /// Depth below the surface (m).
    pub bath: Vec<f32>,
    pub bathacrosstrack: Vec<f32>,
    pub bathalongtrack: Vec<f32>,
    /// Two-way travel time (s).
    pub tt: Vec<f32>,
    /// Cross-track angle, 90 is vertical (degrees).
    pub angle: Vec<f32>,
    pub amp: Vec<f32>,
    pub ss: Vec<f32>,
    pub ssacrosstrack: Vec<f32>,
    pub ssalongtrack: Vec<f32>,
}

impl ProcessedData {
    /// Size every array, keeping existing values.
    pub(crate) fn resize(&mut self, nbath: usize, namp: usize, nss: usize) -> Result<()> {
        resize_checked(&mut self.beamflag, nbath, Beamflag::NULL)?;
        for v in [
            &mut self.bath,
            &mut self.bathacrosstrack,
            &mut self.bathalongtrack,
            &mut self.tt,
            &mut self.angle,
        ] {
            resize_checked(v, nbath, 0.0)?;
        }
        resize_checked(&mut self.amp, namp, 0.0)?;
        for v in [&mut self.ss, &mut self.ssacrosstrack, &mut self.ssalongtrack] {
            resize_checked(v, nss, 0.0)?;
        }
        Ok(())
    }

    /// Size every array and zero it.
    pub(crate) fn reset(&mut self, nbath: usize, namp: usize, nss: usize) -> Result<()> {
        self.beamflag.clear();
        for v in [
            &mut self.bath,
            &mut self.bathacrosstrack,
            &mut self.bathalongtrack,
            &mut self.tt,
            &mut self.angle,
            &mut self.amp,
            &mut self.ss,
            &mut self.ssacrosstrack,
            &mut self.ssalongtrack,
        ] {
            v.clear();
        }
        self.resize(nbath, namp, nss)
    }
}

/// Everything decoded from one OIC record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OicRecord {
    pub kind: Kind,
    pub header: Header,
    /// Opaque client block. Comment text lives here, NUL terminated.
    pub client: Vec<u8>,
    /// Raw channel payloads in host byte order.
    pub raw: [ChannelBuffer; MAX_CHANNELS],
    pub data: ProcessedData,
}

impl OicRecord {
    /// Comment text up to the first NUL.
    #[must_use]
    pub fn comment(&self) -> Option<String> {
        if self.kind != Kind::Comment {
            return None;
        }
        let end = self
            .client
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.client.len());
        Some(String::from_utf8_lossy(&self.client[..end]).into_owned())
    }
}

fn count(n: i32) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn count_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Codec session for either OIC variant.
#[derive(Debug, Clone)]
pub struct OicCodec {
    variant: Variant,
    order: Endianness,
    lonflip: LonFlip,
    sync: Synchronizer,
    scratch: Vec<u8>,
}

impl OicCodec {
    #[must_use]
    pub fn new(variant: Variant, config: &CodecConfig) -> Self {
        OicCodec {
            variant,
            order: config.byte_order_or(Endianness::Big),
            lonflip: config.lonflip,
            sync: Synchronizer::new(&variant.magic(), 4),
            scratch: Vec::new(),
        }
    }

    #[must_use]
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Bytes discarded while searching for record starts so far.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.sync.skipped
    }

    fn read_channels<R: Read>(&self, bytes: &mut Bytes<R>, rec: &mut OicRecord, n: usize) -> Result<()> {
        for ichan in 0..n {
            let desc = rec.header.channels[ichan];
            let (Some(enc), Some(len)) = (desc.encoding(), desc.payload_len()) else {
                rec.kind = Kind::None;
                return Err(Error::unintelligible(format!(
                    "channel {ichan} has unknown sample size code {}",
                    desc.size
                )));
            };
            let dat = rec.raw[ichan].ensure_capacity(len)?;
            bytes.read_exact(dat)?;
            if !self.order.is_native() {
                swap_in_place(dat, enc.swap_width());
            }
        }
        Ok(())
    }

    /// Write each declared channel payload, zero padded to its descriptor length.
    fn write_channels<W: Write>(&self, w: &mut W, rec: &OicRecord) -> Result<()> {
        let nchan = rec.header.channel_count().unwrap_or(0);
        for ichan in 0..nchan {
            let desc = rec.header.channels[ichan];
            let (Some(enc), Some(len)) = (desc.encoding(), desc.payload_len()) else {
                continue;
            };
            let src = rec.raw[ichan].as_slice();
            let mut dat = vec![0u8; len];
            let n = len.min(src.len());
            dat[..n].copy_from_slice(&src[..n]);
            if !self.order.is_native() {
                swap_in_place(&mut dat, enc.swap_width());
            }
            w.write_all(&dat).map_err(Error::write)?;
        }
        Ok(())
    }

    fn read_processed<R: Read>(&mut self, bytes: &mut Bytes<R>, rec: &mut OicRecord) -> Result<()> {
        let nbath = count(rec.header.beams_bath);
        let namp = count(rec.header.beams_amp);
        let nss = count(rec.header.pixels_ss);
        let total = nbath
            .checked_mul(BEAM_BYTES)
            .zip(namp.checked_mul(4))
            .zip(nss.checked_mul(PIXEL_BYTES))
            .and_then(|((b, a), s)| b.checked_add(a)?.checked_add(s))
            .ok_or(Error::MemoryFail {
                requested: usize::MAX,
            })?;
        resize_checked(&mut self.scratch, total, 0)?;
        bytes.read_exact(&mut self.scratch[..total])?;

        let data = &mut rec.data;
        data.reset(nbath, namp, nss)?;
        let mut d = Decoder::new(&self.scratch[..total], self.order);
        for flag in &mut data.beamflag {
            *flag = Beamflag(d.u8());
        }
        for v in [
            &mut data.bath,
            &mut data.bathacrosstrack,
            &mut data.bathalongtrack,
            &mut data.tt,
            &mut data.angle,
            &mut data.amp,
            &mut data.ss,
            &mut data.ssacrosstrack,
            &mut data.ssalongtrack,
        ] {
            for x in v.iter_mut() {
                *x = d.f32();
            }
        }
        trace!(nbath, namp, nss, "read processed arrays");
        Ok(())
    }

    fn encode_processed(&self, rec: &OicRecord) -> Vec<u8> {
        let nbath = count(rec.header.beams_bath);
        let namp = count(rec.header.beams_amp);
        let nss = count(rec.header.pixels_ss);
        let data = &rec.data;
        let mut e = Encoder::with_capacity(
            nbath * BEAM_BYTES + namp * 4 + nss * PIXEL_BYTES,
            self.order,
        );
        let at = |v: &[f32], i: usize| v.get(i).copied().unwrap_or_default();
        if nbath > 0 {
            for i in 0..nbath {
                e.u8(data.beamflag.get(i).copied().unwrap_or(Beamflag::NULL).0);
            }
            for v in [
                &data.bath,
                &data.bathacrosstrack,
                &data.bathalongtrack,
                &data.tt,
                &data.angle,
            ] {
                for i in 0..nbath {
                    e.f32(at(v, i));
                }
            }
        }
        for i in 0..namp {
            e.f32(at(&data.amp, i));
        }
        if nss > 0 {
            for v in [&data.ss, &data.ssacrosstrack, &data.ssalongtrack] {
                for i in 0..nss {
                    e.f32(at(v, i));
                }
            }
        }
        e.into_inner()
    }

    fn require_data(rec: &OicRecord) -> Result<()> {
        if rec.kind == Kind::Data {
            Ok(())
        } else {
            Err(not_data(rec.kind))
        }
    }

    fn navigation(&self, h: &Header) -> (f64, f64) {
        if h.nav_type == nav_type::LONLAT {
            (self.lonflip.apply(f64::from(h.fish_x)), f64::from(h.fish_y))
        } else {
            (0.0, 0.0)
        }
    }
}

/// Stored longitudes are kept in [0, 360).
fn stored_longitude(lon: f64) -> f64 {
    if lon < 0.0 {
        lon + 360.0
    } else {
        lon
    }
}

fn widen(v: &[f32]) -> Vec<f64> {
    v.iter().map(|&x| f64::from(x)).collect()
}

impl FormatCodec for OicCodec {
    type Record = OicRecord;

    fn format(&self) -> FormatKind {
        match self.variant {
            Variant::Geo => FormatKind::OicGeo,
            Variant::Ge2 => FormatKind::OicGe2,
        }
    }

    fn allocate(&self) -> Result<OicRecord> {
        Ok(OicRecord::default())
    }

    fn read_record<R: Read>(&mut self, bytes: &mut Bytes<R>, rec: &mut OicRecord) -> Result<Kind> {
        let loc = self.sync.scan(bytes)?;
        let mut buf = vec![0u8; self.variant.header_size()];
        buf[..loc.window.len()].copy_from_slice(&loc.window);
        bytes.read_exact(&mut buf[loc.window.len()..])?;
        rec.header = Header::decode(&buf, self.variant, self.order);

        rec.client.clear();
        resize_checked(&mut rec.client, usize::from(rec.header.client_size), 0)?;
        bytes.read_exact(&mut rec.client)?;

        if rec.header.type_id == ID_COMMENT {
            // comments may still carry channel payloads that must be consumed
            if let Some(nchan) = rec.header.channel_count() {
                self.read_channels(bytes, rec, nchan)?;
            }
            rec.kind = Kind::Comment;
            debug!(offset = loc.offset, "comment record");
            return Ok(Kind::Comment);
        }
        let Some(nchan) = rec.header.channel_count() else {
            rec.kind = Kind::None;
            return Err(Error::unintelligible(format!(
                "channel count {} out of range at offset {}",
                rec.header.num_chan, loc.offset
            )));
        };
        self.read_channels(bytes, rec, nchan)?;

        let processed = rec.header.beams_bath > 0
            || rec.header.beams_amp > 0
            || rec.header.pixels_ss > 0;
        if self.variant == Variant::Ge2 && processed {
            self.read_processed(bytes, rec)?;
        } else if let Err(err) =
            reconstruct::reconstruct(&mut rec.header, &rec.raw, &mut rec.data)
        {
            rec.kind = Kind::None;
            return Err(err);
        }

        rec.kind = Kind::Data;
        trace!(
            offset = loc.offset,
            channels = nchan,
            beams = rec.header.beams_bath,
            pixels = rec.header.pixels_ss,
            "data record"
        );
        Ok(Kind::Data)
    }

    fn write_record<W: Write>(&mut self, w: &mut W, rec: &OicRecord) -> Result<()> {
        w.write_all(&rec.header.encode(self.variant, self.order))
            .map_err(Error::write)?;

        let mut client = vec![0u8; usize::from(rec.header.client_size)];
        let n = client.len().min(rec.client.len());
        client[..n].copy_from_slice(&rec.client[..n]);
        w.write_all(&client).map_err(Error::write)?;

        if !matches!(rec.kind, Kind::Data | Kind::Comment) {
            return Ok(());
        }
        self.write_channels(w, rec)?;

        if rec.kind == Kind::Data && self.variant == Variant::Ge2 {
            w.write_all(&self.encode_processed(rec))
                .map_err(Error::write)?;
        }
        Ok(())
    }

    fn kind(&self, rec: &OicRecord) -> Kind {
        rec.kind
    }

    fn dimensions(&self, rec: &OicRecord) -> Dimensions {
        if rec.kind != Kind::Data {
            return Dimensions::default();
        }
        Dimensions {
            nbath: count(rec.header.beams_bath),
            namp: count(rec.header.beams_amp),
            nss: count(rec.header.pixels_ss),
        }
    }

    fn max_dimensions(&self, _rec: &OicRecord) -> Dimensions {
        Dimensions {
            nbath: MAX_BEAMS,
            namp: MAX_AMP,
            nss: MAX_PIXELS,
        }
    }

    fn beamwidth(&self) -> BeamWidth {
        BeamWidth {
            alongtrack: 2.0,
            acrosstrack: 0.2,
        }
    }

    fn extract(&self, rec: &OicRecord) -> Result<Sounding> {
        match rec.kind {
            Kind::Data => {}
            Kind::Comment => return Ok(Sounding::comment(rec.comment().unwrap_or_default())),
            _ => return Err(Error::Other),
        }
        let h = &rec.header;
        let data = &rec.data;
        let (navlon, navlat) = self.navigation(h);
        let dims = self.dimensions(rec);
        Ok(Sounding {
            kind: Kind::Data,
            time_d: h.time_d(),
            navlon,
            navlat,
            speed: 3.6 * f64::from(h.ship_speed),
            heading: f64::from(h.fish_heading),
            beamflag: data.beamflag.iter().take(dims.nbath).copied().collect(),
            bath: widen(&data.bath[..dims.nbath.min(data.bath.len())]),
            amp: widen(&data.amp[..dims.namp.min(data.amp.len())]),
            bathacrosstrack: widen(&data.bathacrosstrack[..dims.nbath.min(data.bathacrosstrack.len())]),
            bathalongtrack: widen(&data.bathalongtrack[..dims.nbath.min(data.bathalongtrack.len())]),
            ss: widen(&data.ss[..dims.nss.min(data.ss.len())]),
            ssacrosstrack: widen(&data.ssacrosstrack[..dims.nss.min(data.ssacrosstrack.len())]),
            ssalongtrack: widen(&data.ssalongtrack[..dims.nss.min(data.ssalongtrack.len())]),
            comment: None,
        })
    }

    fn insert(&self, rec: &mut OicRecord, sounding: &Sounding) -> Result<()> {
        match sounding.kind {
            Kind::Data => {
                let h = &mut rec.header;
                if h.type_id == ID_COMMENT {
                    h.type_id = 0;
                }
                h.set_time_d(sounding.time_d);
                h.nav_type = nav_type::LONLAT;
                h.fish_x = stored_longitude(sounding.navlon) as f32;
                h.fish_y = sounding.navlat as f32;
                h.fish_heading = sounding.heading as f32;
                h.ship_speed = (sounding.speed / 3.6) as f32;

                let nbath = sounding.bath.len();
                let namp = sounding.amp.len();
                let nss = sounding.ss.len();
                h.beams_bath = count_i32(nbath);
                h.beams_amp = count_i32(namp);
                h.pixels_ss = count_i32(nss);

                let data = &mut rec.data;
                data.resize(nbath, namp, nss)?;
                let at = |v: &[f64], i: usize| v.get(i).copied().unwrap_or_default() as f32;
                for i in 0..nbath {
                    data.beamflag[i] = sounding.beamflag.get(i).copied().unwrap_or(Beamflag::NONE);
                    data.bath[i] = at(&sounding.bath, i);
                    data.bathacrosstrack[i] = at(&sounding.bathacrosstrack, i);
                    data.bathalongtrack[i] = at(&sounding.bathalongtrack, i);
                }
                for i in 0..namp {
                    data.amp[i] = at(&sounding.amp, i);
                }
                for i in 0..nss {
                    data.ss[i] = at(&sounding.ss, i);
                    data.ssacrosstrack[i] = at(&sounding.ssacrosstrack, i);
                    data.ssalongtrack[i] = at(&sounding.ssalongtrack, i);
                }
                rec.kind = Kind::Data;
                Ok(())
            }
            Kind::Comment => {
                let text = sounding.comment.as_deref().unwrap_or_default().as_bytes();
                let n = text.len().min(MAX_CLIENT - 1);
                let size = ((n + 1 + 1) & !1).min(MAX_CLIENT);
                rec.client.clear();
                rec.client.extend_from_slice(&text[..n]);
                rec.client.resize(size, 0);

                let h = &mut rec.header;
                h.type_id = ID_COMMENT;
                h.client_size = u8::try_from(size).unwrap_or(u8::MAX);
                h.num_chan = 0;
                h.beams_bath = 0;
                h.beams_amp = 0;
                h.pixels_ss = 0;
                rec.kind = Kind::Comment;
                Ok(())
            }
            _ => Err(Error::Other),
        }
    }

    fn extract_nav(&self, rec: &OicRecord) -> Result<NavSample> {
        Self::require_data(rec)?;
        let h = &rec.header;
        let (navlon, navlat) = self.navigation(h);
        Ok(NavSample {
            time_d: h.time_d(),
            navlon,
            navlat,
            speed: 3.6 * f64::from(h.ship_speed),
            heading: f64::from(h.fish_heading),
            draft: f64::from(h.fish_depth),
            roll: f64::from(h.fish_roll),
            pitch: f64::from(h.fish_pitch),
            heave: 0.0,
        })
    }

    fn insert_nav(&self, rec: &mut OicRecord, nav: &NavSample) -> Result<()> {
        if rec.kind != Kind::Data {
            return Ok(());
        }
        let h = &mut rec.header;
        h.set_time_d(nav.time_d);
        h.nav_type = nav_type::LONLAT;
        h.fish_x = stored_longitude(nav.navlon) as f32;
        h.fish_y = nav.navlat as f32;
        h.fish_heading = nav.heading as f32;
        h.ship_speed = (nav.speed / 3.6) as f32;
        h.fish_depth = nav.draft as f32;
        h.fish_roll = nav.roll as f32;
        h.fish_pitch = nav.pitch as f32;
        Ok(())
    }

    fn extract_altitude(&self, rec: &OicRecord) -> Result<Altitude> {
        Self::require_data(rec)?;
        Ok(Altitude {
            transducer_depth: f64::from(rec.header.fish_depth),
            altitude: f64::from(rec.header.fish_altitude),
        })
    }

    fn insert_altitude(&self, rec: &mut OicRecord, altitude: &Altitude) -> Result<()> {
        if rec.kind == Kind::Data {
            rec.header.fish_depth = altitude.transducer_depth as f32;
            rec.header.fish_altitude = altitude.altitude as f32;
        }
        Ok(())
    }

    fn travel_times(&self, rec: &OicRecord) -> Result<TravelTimes> {
        Self::require_data(rec)?;
        let h = &rec.header;
        let nbath = self.dimensions(rec).nbath;
        let pitch = f64::from(h.fish_pitch);
        let mut tt = TravelTimes {
            draft: f64::from(h.fish_depth),
            ssv: f64::from(h.sound_velocity),
            ..TravelTimes::default()
        };
        for i in 0..nbath {
            let angle = rec.data.angle.get(i).copied().unwrap_or_default();
            let (theta, phi) = rollpitch_to_takeoff(pitch, f64::from(angle));
            tt.ttimes
                .push(f64::from(rec.data.tt.get(i).copied().unwrap_or_default()));
            tt.angles.push(theta);
            tt.angles_forward.push(phi);
            tt.angles_null.push(0.0);
            tt.heave.push(0.0);
            tt.alongtrack_offset.push(0.0);
        }
        Ok(tt)
    }

    fn detects(&self, rec: &OicRecord) -> Result<Vec<DetectType>> {
        Self::require_data(rec)?;
        Ok(vec![DetectType::Phase; self.dimensions(rec).nbath])
    }

    fn pulses(&self, rec: &OicRecord) -> Result<Vec<PulseType>> {
        Self::require_data(rec)?;
        Ok(vec![PulseType::Cw; self.dimensions(rec).nbath])
    }

    fn gains(&self, rec: &OicRecord) -> Result<Gains> {
        Self::require_data(rec)?;
        Ok(Gains {
            transmit_gain: f64::from(rec.header.gain_c0),
            pulse_length: f64::from(rec.header.fish_pulse_width),
            receive_gain: f64::from(rec.header.gain_c1),
        })
    }

    fn ping_number(&self, rec: &OicRecord) -> Result<i64> {
        Self::require_data(rec)?;
        Ok(i64::from(rec.header.sec))
    }

    fn preprocess(
        &self,
        _rec: &mut OicRecord,
        _params: &PreprocessParams,
        _platform: Option<&dyn Platform>,
    ) -> Result<()> {
        Ok(())
    }
}
