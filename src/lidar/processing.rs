//! Pulse geometry and merging of asynchronous navigation into scans.
use tracing::trace;

use super::LidarRecord;
use crate::{
    codec::{AttitudePoint, NavPoint, PreprocessParams},
    geometry::{
        bracket, interpolate, interpolate_heading, range_angle_to_xyz, takeoff_from_rollpitch,
        Attitude, Platform, Position,
    },
    model::{Beamflag, Kind},
    timecode::epoch_seconds_or_zero,
};

/// Pulses shorter than this are treated as no return.
const MIN_RANGE: f64 = 0.001;

/// Hours per microsecond times meters per kilometer: scales a pulse time offset and a
/// speed in km/hr to an along-track distance in meters.
const OFFSET_SPEED_SCALE: f64 = 2.777_777e-7;

/// Compute depth and horizontal offsets of every received pulse from its range, angles
/// and attitude. Pulses without a return are flagged null and zeroed.
///
/// The scan's `time_d` is recomputed from its broken-out time fields first, so edits to
/// `time` made since the record was read carry through.
pub fn calculate_bathymetry(rec: &mut LidarRecord) {
    if rec.kind != Kind::Data {
        return;
    }
    rec.time_d = epoch_seconds_or_zero(&rec.time.broken());
    let speed = f64::from(rec.speed);
    let n = rec.num_pulses.min(rec.pulses.len());
    let mut valid = 0usize;
    for pulse in &mut rec.pulses[..n] {
        let range = f64::from(pulse.range);
        if range > MIN_RANGE {
            let (theta, phi) = takeoff_from_rollpitch(
                f64::from(pulse.forward_track_angle),
                f64::from(pulse.cross_track_angle),
                f64::from(pulse.roll),
                f64::from(pulse.pitch),
            );
            let xyz = range_angle_to_xyz(range, theta, phi);
            pulse.beamflag = Beamflag::NONE;
            pulse.depth = xyz.depth;
            pulse.acrosstrack = xyz.acrosstrack + f64::from(pulse.cross_track_offset);
            pulse.alongtrack = xyz.alongtrack
                + f64::from(pulse.forward_track_offset)
                + OFFSET_SPEED_SCALE * f64::from(pulse.pulse_time_offset) * speed;
            valid += 1;
        } else {
            pulse.beamflag = Beamflag::NULL;
            pulse.depth = 0.0;
            pulse.acrosstrack = 0.0;
            pulse.alongtrack = 0.0;
        }
    }
    rec.bathymetry_calculated = true;
    trace!(pulses = n, valid, "calculated bathymetry");
}

/// Search hints for each series, carried from the scan time through every pulse.
#[derive(Debug, Default)]
struct Cursors {
    nav: usize,
    sensordepth: usize,
    heading: usize,
    attitude: usize,
}

/// Values of the asynchronous series at one time. `None` for an empty series.
#[derive(Debug, Default)]
struct Sample {
    nav: Option<(f64, f64, f64)>,
    sensordepth: Option<f64>,
    heading: Option<f64>,
    attitude: Option<(f64, f64)>,
}

fn sample(params: &PreprocessParams, t: f64, cursors: &mut Cursors) -> Sample {
    let nav = bracket(&params.nav, |p: &NavPoint| p.time, t, &mut cursors.nav).map(|b| {
        let (lo, hi) = (&params.nav[b.lo], &params.nav[b.hi]);
        (
            b.lerp_longitude(lo.lon, hi.lon),
            b.lerp(lo.lat, hi.lat),
            b.lerp(lo.speed, hi.speed),
        )
    });
    let attitude = bracket(
        &params.attitude,
        |p: &AttitudePoint| p.time,
        t,
        &mut cursors.attitude,
    )
    .map(|b| {
        let (lo, hi) = (&params.attitude[b.lo], &params.attitude[b.hi]);
        // the attitude series uses the opposite roll sign to the scanner
        (-b.lerp(lo.roll, hi.roll), b.lerp(lo.pitch, hi.pitch))
    });
    Sample {
        nav,
        sensordepth: interpolate(&params.sensordepth, t, &mut cursors.sensordepth),
        heading: interpolate_heading(&params.heading, t, &mut cursors.heading),
        attitude,
    }
}

/// Merge asynchronous series into a scan, optionally move it through a platform lever
/// arm, then recompute its bathymetry.
///
/// The scan and each pulse are sampled at their own times; a pulse's time is the scan
/// time plus its offset in microseconds.
pub(crate) fn preprocess(
    rec: &mut LidarRecord,
    params: &PreprocessParams,
    platform: Option<&dyn Platform>,
) {
    if rec.kind != Kind::Data {
        return;
    }
    if let Some(time_d) = params.timestamp {
        rec.set_time_d(time_d);
    }

    let mut cursors = Cursors::default();
    let s = sample(params, rec.time_d, &mut cursors);
    if let Some((lon, lat, speed)) = s.nav {
        rec.navlon = lon;
        rec.navlat = lat;
        rec.speed = speed as f32;
    }
    if let Some(depth) = s.sensordepth {
        rec.sensordepth = depth;
    }
    if let Some(heading) = s.heading {
        rec.heading = heading as f32;
    }
    if let Some((roll, pitch)) = s.attitude {
        rec.roll = roll as f32;
        rec.pitch = pitch as f32;
    }
    if let Some(platform) = platform {
        let attitude = Attitude {
            heading: f64::from(rec.heading),
            roll: f64::from(rec.roll),
            pitch: f64::from(rec.pitch),
        };
        let pos = platform.position(
            Position {
                lon: rec.navlon,
                lat: rec.navlat,
                depth: rec.sensordepth,
            },
            attitude,
        );
        rec.navlon = pos.lon;
        rec.navlat = pos.lat;
        rec.sensordepth = pos.depth;
        let att = platform.orientation(attitude);
        rec.heading = att.heading as f32;
        rec.roll = att.roll as f32;
        rec.pitch = att.pitch as f32;
    }

    let time_d = rec.time_d;
    let n = rec.num_pulses.min(rec.pulses.len());
    for pulse in &mut rec.pulses[..n] {
        pulse.time_d = time_d + 0.000_001 * f64::from(pulse.pulse_time_offset);
        let s = sample(params, pulse.time_d, &mut cursors);
        if let Some((lon, lat, _)) = s.nav {
            pulse.navlon = lon;
            pulse.navlat = lat;
        }
        if let Some(depth) = s.sensordepth {
            pulse.sensordepth = depth;
        }
        if let Some(heading) = s.heading {
            pulse.heading = heading as f32;
        }
        if let Some((roll, pitch)) = s.attitude {
            pulse.roll = roll as f32;
            pulse.pitch = pitch as f32;
        }
        if let Some(platform) = platform {
            let attitude = Attitude {
                heading: f64::from(pulse.heading),
                roll: f64::from(pulse.roll),
                pitch: f64::from(pulse.pitch),
            };
            let pos = platform.position(
                Position {
                    lon: pulse.navlon,
                    lat: pulse.navlat,
                    depth: pulse.sensordepth,
                },
                attitude,
            );
            pulse.navlon = pos.lon;
            pulse.navlat = pos.lat;
            pulse.sensordepth = pos.depth;
            let att = platform.orientation(attitude);
            pulse.heading = att.heading as f32;
            pulse.roll = att.roll as f32;
            pulse.pitch = att.pitch as f32;
        }
    }

    calculate_bathymetry(rec);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geometry::SensorOffset, model::Pulse};

    fn scan(pulses: Vec<Pulse>) -> LidarRecord {
        let mut rec = LidarRecord {
            kind: Kind::Data,
            num_pulses: pulses.len(),
            pulses,
            ..LidarRecord::default()
        };
        rec.set_time_d(100.0);
        rec
    }

    #[test]
    fn vertical_pulse() {
        let mut rec = scan(vec![Pulse {
            range: 5.0,
            cross_track_offset: 0.25,
            ..Pulse::null()
        }]);
        calculate_bathymetry(&mut rec);
        let p = &rec.pulses[0];
        assert!(p.beamflag.is_valid());
        assert!((p.depth - 5.0).abs() < 1e-9);
        assert!((p.acrosstrack - 0.25).abs() < 1e-9);
        assert!(p.alongtrack.abs() < 1e-9);
        assert!(rec.bathymetry_calculated);
    }

    #[test]
    fn cross_track_angle_and_roll() {
        let mut rec = scan(vec![Pulse {
            range: 2.0,
            cross_track_angle: 20.0,
            roll: 10.0,
            ..Pulse::null()
        }]);
        calculate_bathymetry(&mut rec);
        // roll takes back part of the scan angle, leaving 10 degrees toward starboard
        let p = &rec.pulses[0];
        assert!((p.depth - 2.0 * 10f64.to_radians().cos()).abs() < 1e-6);
        assert!((p.acrosstrack - 2.0 * 10f64.to_radians().sin()).abs() < 1e-6);
    }

    #[test]
    fn time_offset_moves_along_track() {
        let mut rec = scan(vec![Pulse {
            range: 1.0,
            pulse_time_offset: 1_000_000,
            ..Pulse::null()
        }]);
        rec.speed = 3.6;
        calculate_bathymetry(&mut rec);
        // one second at 1 m/s
        assert!((rec.pulses[0].alongtrack - 1.0).abs() < 1e-5);
    }

    #[test]
    fn short_range_is_null() {
        let mut rec = scan(vec![
            Pulse {
                range: 0.0005,
                depth: 3.0,
                beamflag: Beamflag::NONE,
                ..Pulse::null()
            },
            Pulse::null(),
        ]);
        calculate_bathymetry(&mut rec);
        assert!(rec.pulses.iter().all(|p| p.beamflag.is_null()));
        assert_eq!(rec.pulses[0].depth, 0.0);
    }

    #[test]
    fn scan_time_follows_broken_out_fields() {
        let mut rec = scan(vec![Pulse {
            range: 5.0,
            ..Pulse::null()
        }]);
        rec.set_time_d(1_454_329_815.25);
        rec.time.seconds = 45;
        calculate_bathymetry(&mut rec);
        assert_eq!(rec.time_d, 1_454_329_845.25);
    }

    #[test]
    fn invalid_scan_time_is_epoch() {
        let mut rec = scan(vec![Pulse::null()]);
        rec.time.month = 13;
        calculate_bathymetry(&mut rec);
        assert_eq!(rec.time_d, 0.0);
        assert!(rec.bathymetry_calculated);
    }

    fn params() -> PreprocessParams {
        PreprocessParams::builder()
            .nav(vec![
                NavPoint {
                    time: 99.0,
                    lon: -122.0,
                    lat: 36.0,
                    speed: 3.6,
                },
                NavPoint {
                    time: 101.0,
                    lon: -122.002,
                    lat: 36.002,
                    speed: 7.2,
                },
            ])
            .sensordepth(vec![(90.0, 10.0), (110.0, 12.0)])
            .heading(vec![(99.0, 350.0), (101.0, 10.0)])
            .attitude(vec![AttitudePoint {
                time: 100.0,
                roll: 2.0,
                pitch: -1.0,
                heave: 0.0,
            }])
            .build()
    }

    #[test]
    fn interpolates_scan_and_pulses() {
        let mut rec = scan(vec![
            Pulse {
                range: 4.0,
                ..Pulse::null()
            },
            Pulse {
                range: 4.0,
                pulse_time_offset: 500_000,
                ..Pulse::null()
            },
        ]);
        preprocess(&mut rec, &params(), None);

        assert!((rec.navlon + 122.001).abs() < 1e-9);
        assert!((rec.navlat - 36.001).abs() < 1e-9);
        assert!((rec.speed - 5.4).abs() < 1e-5);
        assert!((rec.sensordepth - 11.0).abs() < 1e-9);
        assert!(rec.heading.abs() < 1e-4 || (rec.heading - 360.0).abs() < 1e-4);
        assert_eq!(rec.roll, -2.0);
        assert_eq!(rec.pitch, -1.0);

        let p = &rec.pulses[1];
        assert!((p.time_d - 100.5).abs() < 1e-9);
        assert!((p.navlon + 122.0015).abs() < 1e-9);
        assert!((p.heading - 5.0).abs() < 1e-4);
        assert!((p.sensordepth - 11.05).abs() < 1e-9);
        assert!(p.beamflag.is_valid());
        assert!(p.depth > 3.9);
    }

    #[test]
    fn timestamp_override() {
        let mut rec = scan(vec![Pulse::null()]);
        let params = PreprocessParams::builder().timestamp(1_454_329_815.25).build();
        preprocess(&mut rec, &params, None);
        assert_eq!(rec.time_d, 1_454_329_815.25);
        assert_eq!(rec.time.year, 2016);
        assert_eq!(rec.time.month, 2);
        assert_eq!(rec.time.day, 1);
        assert_eq!(rec.time.nanoseconds, 250_000_000);
    }

    #[test]
    fn idempotent() {
        let offset = SensorOffset::builder().x(1.0).z(-0.5).build();
        let mut rec = scan(vec![
            Pulse {
                range: 4.0,
                cross_track_angle: -15.0,
                ..Pulse::null()
            };
            3
        ]);
        preprocess(&mut rec, &params(), Some(&offset));
        let once = rec.clone();
        preprocess(&mut rec, &params(), Some(&offset));
        assert_eq!(rec, once);
    }

    #[test]
    fn non_data_untouched() {
        let mut rec = LidarRecord {
            kind: Kind::Comment,
            ..LidarRecord::default()
        };
        let before = rec.clone();
        preprocess(&mut rec, &params(), None);
        assert_eq!(rec, before);
    }
}
