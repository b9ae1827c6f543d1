//! Bathymetry and sidescan rebuilt from raw OIC channels.
use tracing::{trace, warn};

use super::{
    header::{Header, SampleEncoding, Side, SonarType, MAX_CHANNELS},
    ProcessedData,
};
use crate::{
    buffer::ChannelBuffer,
    bytes::{read_f32, read_i16, read_i32, Endianness},
    error::{Error, Result},
    geometry::{range_angle_to_xyz, rollpitch_to_takeoff, RTD},
    model::Beamflag,
};

/// Sample `i` of a single value channel held in host byte order.
fn scalar(buf: &[u8], enc: SampleEncoding, i: usize) -> f64 {
    let order = Endianness::native();
    match enc {
        SampleEncoding::Char => f64::from(buf[i] as i8),
        SampleEncoding::Short => f64::from(read_i16(buf, 2 * i, order)),
        SampleEncoding::Int => f64::from(read_i32(buf, 4 * i, order)),
        SampleEncoding::Float => f64::from(read_f32(buf, 4 * i, order)),
        SampleEncoding::TripleFloat => 0.0,
    }
}

/// (two-way time, angle, amplitude) of sample `i` of a triple float channel.
fn triple(buf: &[u8], i: usize) -> (f64, f64, f64) {
    let order = Endianness::native();
    (
        f64::from(read_f32(buf, 12 * i, order)),
        f64::from(read_f32(buf, 12 * i + 4, order)),
        f64::from(read_f32(buf, 12 * i + 8, order)),
    )
}

/// Vertical distance carried by an angle channel sample; decimeters for the integer
/// encodings. Zero or less means no return.
fn vertical(buf: &[u8], enc: SampleEncoding, i: usize) -> f64 {
    match enc {
        SampleEncoding::Short | SampleEncoding::Int => 0.1 * scalar(buf, enc, i),
        SampleEncoding::Float => scalar(buf, enc, i),
        SampleEncoding::Char | SampleEncoding::TripleFloat => 0.0,
    }
}

/// A channel payload together with its layout, if the payload is complete.
fn channel<'a>(
    header: &Header,
    raw: &'a [ChannelBuffer; MAX_CHANNELS],
    ichan: usize,
) -> Option<(&'a [u8], SampleEncoding, usize)> {
    let desc = header.channels[ichan];
    let enc = desc.encoding()?;
    let ns = desc.samples();
    let buf = raw[ichan].as_slice();
    if buf.len() < ns * enc.width() {
        warn!(
            channel = ichan,
            have = buf.len(),
            need = ns * enc.width(),
            "channel payload shorter than its descriptor"
        );
        return None;
    }
    Some((buf, enc, ns))
}

fn index(j: i64, len: usize, what: &str) -> Option<usize> {
    match usize::try_from(j) {
        Ok(j) if j < len => Some(j),
        _ => {
            warn!(index = j, len, array = what, "index out of range, sample skipped");
            None
        }
    }
}

fn altitude_samples(header: &Header, ns: usize) -> i32 {
    let n = 2.0 * f64::from(header.fish_altitude) * ns as f64
        / f64::from(header.sound_velocity)
        / f64::from(header.fish_ping_period);
    // a NaN from a zero period or velocity saturates to 0
    (n as i32).max(0)
}

/// Angle channels carry one vertical distance per sample, so a triple float angle
/// channel has no meaningful beam layout.
fn check_angle_encodings(header: &Header) -> Result<()> {
    let nchan = header.channel_count().unwrap_or(0);
    for (ichan, desc) in header.channels[..nchan].iter().enumerate() {
        if desc.sonar_type() == Some(SonarType::Angle)
            && desc.encoding() == Some(SampleEncoding::TripleFloat)
        {
            return Err(Error::unintelligible(format!(
                "angle channel {ichan} declares triple float samples"
            )));
        }
    }
    Ok(())
}

/// Assign channels and compute the beam and pixel counts implied by the raw data.
fn layout(header: &mut Header, raw: &[ChannelBuffer; MAX_CHANNELS]) {
    header.beams_bath = 0;
    header.beams_amp = 0;
    header.pixels_ss = 0;
    header.bath_chan_port = -1;
    header.bath_chan_stbd = -1;
    header.ss_chan_port = -1;
    header.ss_chan_stbd = -1;
    let (mut valid_port, mut valid_stbd) = (0i32, 0i32);

    let nchan = header.channel_count().unwrap_or(0);
    for ichan in 0..nchan {
        let desc = header.channels[ichan];
        let (Some(sonar), Some(side)) = (desc.sonar_type(), desc.side()) else {
            continue;
        };
        let ns = i32::try_from(desc.samples()).unwrap_or(i32::MAX);
        match sonar {
            SonarType::Sidescan => {
                if header.ss_chan(side).is_some() {
                    continue;
                }
                header.set_ss_chan(side, ichan as i32);
                header.fish_altitude_samples = altitude_samples(header, desc.samples());
                let extra = (header.fish_altitude_samples - 1).min(0);
                header.pixels_ss = header.pixels_ss.saturating_add(ns.saturating_sub(extra));
            }
            SonarType::Angle => {
                if header.bath_chan(side).is_some() {
                    continue;
                }
                header.set_bath_chan(side, ichan as i32);
                let valid = match channel(header, raw, ichan) {
                    Some((buf, enc, ns)) => (0..ns)
                        .filter(|&i| match enc {
                            SampleEncoding::Short
                            | SampleEncoding::Int
                            | SampleEncoding::Float => scalar(buf, enc, i) > 0.0,
                            _ => false,
                        })
                        .count(),
                    None => 0,
                };
                let valid = i32::try_from(valid).unwrap_or(i32::MAX);
                match side {
                    Side::Port => valid_port = valid,
                    Side::Starboard => valid_stbd = valid,
                }
                header.beams_bath = valid_port.max(valid_stbd).saturating_mul(2).saturating_add(1);
            }
            SonarType::Multibeam => {
                if header.bath_chan(side).is_some() {
                    continue;
                }
                header.set_bath_chan(side, ichan as i32);
                header.beams_bath = header.beams_bath.saturating_add(ns);
                header.beams_amp = header.beams_amp.saturating_add(ns);
            }
        }
    }
}

/// Place one sounding at `range` along cross-track angle `beta` into beam `j`.
fn put_beam(header: &Header, data: &mut ProcessedData, j: usize, range: f64, beta: f64) {
    let (theta, phi) = rollpitch_to_takeoff(f64::from(header.fish_pitch), beta);
    let xyz = range_angle_to_xyz(range, theta, phi);
    data.bathacrosstrack[j] = xyz.acrosstrack as f32;
    data.bathalongtrack[j] = xyz.alongtrack as f32;
    data.bath[j] = (xyz.depth + f64::from(header.fish_depth)) as f32;
    data.tt[j] = (2.0 * range / f64::from(header.sound_velocity)) as f32;
    data.angle[j] = beta as f32;
}

fn clear_beam(data: &mut ProcessedData, j: usize) {
    data.bathacrosstrack[j] = 0.0;
    data.bathalongtrack[j] = 0.0;
    data.bath[j] = 0.0;
    data.tt[j] = 0.0;
    data.angle[j] = 0.0;
}

fn bathymetry_side(
    header: &Header,
    raw: &[ChannelBuffer; MAX_CHANNELS],
    data: &mut ProcessedData,
    side: Side,
) {
    let Some(ichan) = header.bath_chan(side) else {
        return;
    };
    let Some((buf, enc, ns)) = channel(header, raw, ichan) else {
        return;
    };
    // port beams are laid out from the center outward to lower indices
    let step: i64 = match side {
        Side::Port => -1,
        Side::Starboard => 1,
    };
    let sign = step as f64;
    let nbath = data.bath.len();
    let triple_samples = enc == SampleEncoding::TripleFloat;

    let mut j: i64 = match (triple_samples, side) {
        (true, Side::Port) => ns as i64,
        (true, Side::Starboard) => i64::from(header.beams_bath) - ns as i64 - 1,
        (false, _) => i64::from(header.beams_bath / 2),
    };
    let dx = f64::from(header.fish_range) / ns as f64;
    let roll = f64::from(header.fish_roll);
    let sv = f64::from(header.sound_velocity);

    for i in 0..ns {
        let (range, beta) = if triple_samples {
            j += step;
            let (tt, angle, amp) = triple(buf, i);
            if let Some(k) = index(j, data.amp.len(), "amp") {
                data.amp[k] = amp as f32;
            }
            (0.5 * sv * tt, sign * angle + roll)
        } else {
            let zz = vertical(buf, enc, i);
            if zz > 0.0 {
                j += step;
                let xx = sign * (i as f64 + 0.5) * dx;
                let range = xx.hypot(zz);
                (range, RTD * (xx / range).acos())
            } else {
                (0.0, 0.0)
            }
        };

        if range > 0.0 {
            if let Some(k) = index(j, nbath, "bath") {
                put_beam(header, data, k, range, beta);
            }
        } else if triple_samples {
            if let Some(k) = index(j, nbath, "bath") {
                clear_beam(data, k);
            }
        }
    }
}

fn sidescan_side(
    header: &Header,
    raw: &[ChannelBuffer; MAX_CHANNELS],
    data: &mut ProcessedData,
    side: Side,
) {
    let Some(ichan) = header.ss_chan(side) else {
        return;
    };
    let Some((buf, enc, ns)) = channel(header, raw, ichan) else {
        return;
    };
    let alt = usize::try_from(header.fish_altitude_samples).unwrap_or(0);
    let sample_interval = f64::from(header.fish_ping_period) / ns as f64;
    let sv = f64::from(header.sound_velocity);
    let pitch = f64::from(header.fish_pitch);
    let npix = data.ss.len();
    let pixels_ss = i64::from(header.pixels_ss);

    for i in (alt + 1)..ns {
        let (j, beta) = match side {
            Side::Port => (
                ns as i64 - i as i64 + alt as i64,
                180.0 - RTD * (alt as f64 / i as f64).asin(),
            ),
            Side::Starboard => (
                pixels_ss - ns as i64 + i as i64 - alt as i64 - 1,
                RTD * (alt as f64 / i as f64).asin(),
            ),
        };
        let Some(k) = index(j, npix, "ss") else {
            continue;
        };
        data.ss[k] = scalar(buf, enc, i) as f32;
        let range = 0.5 * sv * sample_interval * i as f64;
        let (theta, phi) = rollpitch_to_takeoff(pitch, beta);
        let xyz = range_angle_to_xyz(range, theta, phi);
        data.ssacrosstrack[k] = xyz.acrosstrack as f32;
        data.ssalongtrack[k] = xyz.alongtrack as f32;
    }
}

/// Rebuild processed bathymetry, amplitude and sidescan from the raw channels.
///
/// The header's channel assignments, beam and pixel counts and altitude sample count are
/// recomputed. Angle channels contribute `2 * max(port, starboard) + 1` beams with a
/// synthesized nadir beam in the center; multibeam channels contribute one beam per
/// sample.
///
/// # Errors
/// [crate::Error::Unintelligible] for an angle channel with triple float samples.
/// [crate::Error::MemoryFail] if the processed arrays cannot be sized.
pub(crate) fn reconstruct(
    header: &mut Header,
    raw: &[ChannelBuffer; MAX_CHANNELS],
    data: &mut ProcessedData,
) -> Result<()> {
    check_angle_encodings(header)?;
    layout(header, raw);
    let nbath = usize::try_from(header.beams_bath).unwrap_or(0);
    let namp = usize::try_from(header.beams_amp).unwrap_or(0);
    let nss = usize::try_from(header.pixels_ss).unwrap_or(0);
    data.reset(nbath, namp, nss)?;

    let angle_pair = [Side::Port, Side::Starboard].iter().all(|&side| {
        header
            .bath_chan(side)
            .and_then(|i| header.channels[i].sonar_type())
            == Some(SonarType::Angle)
    });
    if angle_pair && nbath > 0 {
        let j = nbath / 2;
        put_beam(header, data, j, f64::from(header.fish_altitude), 90.0);
    }

    bathymetry_side(header, raw, data, Side::Port);
    bathymetry_side(header, raw, data, Side::Starboard);
    sidescan_side(header, raw, data, Side::Port);
    sidescan_side(header, raw, data, Side::Starboard);

    for (flag, bath) in data.beamflag.iter_mut().zip(&data.bath) {
        *flag = if *bath == 0.0 {
            Beamflag::NULL
        } else {
            Beamflag::NONE
        };
    }

    trace!(
        beams_bath = header.beams_bath,
        beams_amp = header.beams_amp,
        pixels_ss = header.pixels_ss,
        "reconstructed processed data"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oic::header::ChannelDescriptor;

    fn short_channel(side: Side, sonar: SonarType, samples: &[i16]) -> (ChannelDescriptor, ChannelBuffer) {
        let desc = ChannelDescriptor {
            sonar_type: sonar.into(),
            side: side.into(),
            size: SampleEncoding::Short.into(),
            num_samples: samples.len() as i32,
            ..ChannelDescriptor::default()
        };
        let mut buf = ChannelBuffer::new();
        let dat = buf.ensure_capacity(samples.len() * 2).unwrap();
        for (i, s) in samples.iter().enumerate() {
            dat[2 * i..2 * i + 2].copy_from_slice(&s.to_ne_bytes());
        }
        (desc, buf)
    }

    fn angle_header() -> (Header, [ChannelBuffer; MAX_CHANNELS]) {
        let mut header = Header {
            num_chan: 2,
            fish_depth: 100.0,
            fish_range: 10.0,
            sound_velocity: 1500.0,
            fish_ping_period: 0.1,
            ..Header::default()
        };
        let mut raw: [ChannelBuffer; MAX_CHANNELS] = Default::default();
        let (d, b) = short_channel(Side::Port, SonarType::Angle, &[10, 0, -5, 20, 30]);
        header.channels[0] = d;
        raw[0] = b;
        let (d, b) = short_channel(Side::Starboard, SonarType::Angle, &[0, 15, 25, 0, 5]);
        header.channels[1] = d;
        raw[1] = b;
        (header, raw)
    }

    #[test]
    fn angle_channels_layout() {
        let (mut header, raw) = angle_header();
        let mut data = ProcessedData::default();
        reconstruct(&mut header, &raw, &mut data).unwrap();

        assert_eq!(header.beams_bath, 7);
        assert_eq!(header.beams_amp, 0);
        assert_eq!(header.pixels_ss, 0);
        assert_eq!(header.bath_chan_port, 0);
        assert_eq!(header.bath_chan_stbd, 1);
        assert_eq!(data.bath.len(), 7);

        assert_eq!(data.bath[3], 100.0, "nadir beam sits at the fish depth");
        assert_eq!(data.angle[3], 90.0);
        assert!(data.beamflag.iter().all(|f| f.is_valid()));
    }

    #[test]
    fn angle_beams_fan_out_from_center() {
        let (mut header, raw) = angle_header();
        let mut data = ProcessedData::default();
        reconstruct(&mut header, &raw, &mut data).unwrap();

        // port sample 0 is 1.0 m down at 1.0 m to port
        let dx = 10.0 / 5.0;
        assert!((data.bath[2] - 101.0).abs() < 1e-4);
        assert!((data.bathacrosstrack[2] + 0.5 * dx as f32).abs() < 1e-4);
        assert!(data.bathacrosstrack[0] < data.bathacrosstrack[1]);
        assert!(data.bathacrosstrack[1] < data.bathacrosstrack[2]);
        // starboard sample 1 is 1.5 m down at 3.0 m to starboard
        assert!((data.bath[4] - 101.5).abs() < 1e-4);
        assert!((data.bathacrosstrack[4] - 1.5 * dx as f32).abs() < 1e-4);
        assert!(data.bathacrosstrack[6] > data.bathacrosstrack[5]);
        for j in 0..7 {
            assert!(data.tt[j] > 0.0 || j == 3);
        }
    }

    #[test]
    fn multibeam_triples() {
        let mut header = Header {
            num_chan: 1,
            sound_velocity: 1500.0,
            fish_depth: 50.0,
            ..Header::default()
        };
        header.channels[0] = ChannelDescriptor {
            sonar_type: SonarType::Multibeam.into(),
            side: Side::Port.into(),
            size: SampleEncoding::TripleFloat.into(),
            num_samples: 2,
            ..ChannelDescriptor::default()
        };
        let mut raw: [ChannelBuffer; MAX_CHANNELS] = Default::default();
        let dat = raw[0].ensure_capacity(24).unwrap();
        // 0.02 s two-way at 120 degrees, then no return
        for (k, v) in [0.02f32, -120.0, 7.0, 0.0, 10.0, 3.0].iter().enumerate() {
            dat[4 * k..4 * k + 4].copy_from_slice(&v.to_ne_bytes());
        }
        let mut data = ProcessedData::default();
        reconstruct(&mut header, &raw, &mut data).unwrap();

        assert_eq!(header.beams_bath, 2);
        assert_eq!(header.beams_amp, 2);
        // port beams run outward toward index 0
        assert_eq!(data.amp, [3.0, 7.0]);
        // 15 m slant range 30 degrees off vertical to port
        assert!((data.bath[1] - (50.0 + 15.0 * (30f32).to_radians().cos())).abs() < 1e-3);
        assert!((data.bathacrosstrack[1] + 7.5).abs() < 1e-3);
        assert!((data.tt[1] - 0.02).abs() < 1e-6);
        assert_eq!(data.bath[0], 0.0);
        assert!(data.beamflag[0].is_null());
        assert!(data.beamflag[1].is_valid());
    }

    #[test]
    fn sidescan_placement() {
        let mut header = Header {
            num_chan: 2,
            sound_velocity: 1500.0,
            fish_ping_period: 0.1,
            fish_altitude: 0.0,
            ..Header::default()
        };
        let mut raw: [ChannelBuffer; MAX_CHANNELS] = Default::default();
        let (d, b) = short_channel(Side::Port, SonarType::Sidescan, &[1, 2, 3, 4]);
        header.channels[0] = d;
        raw[0] = b;
        let (d, b) = short_channel(Side::Starboard, SonarType::Sidescan, &[5, 6, 7, 8]);
        header.channels[1] = d;
        raw[1] = b;

        let mut data = ProcessedData::default();
        reconstruct(&mut header, &raw, &mut data).unwrap();

        assert_eq!(header.fish_altitude_samples, 0);
        assert_eq!(header.pixels_ss, 10);
        assert_eq!(data.ss.len(), 10);
        // port samples 1..4 land at 3, 2, 1; starboard at 6, 7, 8
        assert_eq!(&data.ss[1..4], &[4.0, 3.0, 2.0]);
        assert_eq!(&data.ss[6..9], &[6.0, 7.0, 8.0]);
        assert!(data.ssacrosstrack[1] < data.ssacrosstrack[3]);
        assert!(data.ssacrosstrack[3] < 0.0);
        assert!(data.ssacrosstrack[6] > 0.0);
    }

    #[test]
    fn short_payload_is_skipped() {
        let (mut header, mut raw) = angle_header();
        raw[1].ensure_capacity(4).unwrap();
        let mut data = ProcessedData::default();
        reconstruct(&mut header, &raw, &mut data).unwrap();
        assert_eq!(header.beams_bath, 7, "port still counts");
        assert_eq!(data.bath[4], 0.0);
        assert!(data.beamflag[4].is_null());
    }

    #[test]
    fn triple_float_angle_channel_is_rejected() {
        let (mut header, mut raw) = angle_header();
        header.channels[1].size = SampleEncoding::TripleFloat.into();
        raw[1].ensure_capacity(60).unwrap();
        let mut data = ProcessedData::default();
        let err = reconstruct(&mut header, &raw, &mut data).unwrap_err();
        assert!(matches!(err, Error::Unintelligible(_)), "{err:?}");
    }
}
