//! Sounding geometry: takeoff angles, range projection, lever arms and time series
//! interpolation.
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Degrees to radians.
pub const DTR: f64 = std::f64::consts::PI / 180.0;
/// Radians to degrees.
pub const RTD: f64 = 180.0 / std::f64::consts::PI;

/// Convert a beam direction given as an along-track angle `alpha` (pitch axis) and a
/// cross-track angle `beta` (roll axis, 90 is vertical) into a takeoff angle `theta`
/// measured from vertical and an azimuth `phi` in the horizontal plane, both in degrees.
///
/// `phi` is 0 to starboard and 90 forward, and always in [0, 360).
#[must_use]
pub fn rollpitch_to_takeoff(alpha: f64, beta: f64) -> (f64, f64) {
    let x = (DTR * alpha).sin();
    let y = (DTR * alpha).cos() * (DTR * beta).cos();
    let z = (DTR * alpha).cos() * (DTR * beta).sin();

    let theta = RTD * z.clamp(-1.0, 1.0).acos();
    let phi = if x != 0.0 || y != 0.0 {
        let phi = RTD * x.atan2(y);
        if phi < 0.0 {
            phi + 360.0
        } else {
            phi
        }
    } else {
        0.0
    };
    (theta, phi)
}

/// Takeoff angle and azimuth for an instrument frame beam after applying platform
/// attitude. Roll and pitch rotate different axes of the beam so this is not a simple
/// sum of angles.
#[must_use]
pub fn takeoff_from_rollpitch(
    along_track_angle: f64,
    cross_track_angle: f64,
    roll: f64,
    pitch: f64,
) -> (f64, f64) {
    let alpha = along_track_angle + pitch;
    let beta = 90.0 - cross_track_angle + roll;
    rollpitch_to_takeoff(alpha, beta)
}

/// Position of a sounding relative to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Xyz {
    pub acrosstrack: f64,
    pub alongtrack: f64,
    pub depth: f64,
}

/// Project a slant range along a takeoff direction.
#[must_use]
pub fn range_angle_to_xyz(range: f64, theta: f64, phi: f64) -> Xyz {
    let xx = range * (DTR * theta).sin();
    Xyz {
        acrosstrack: xx * (DTR * phi).cos(),
        alongtrack: xx * (DTR * phi).sin(),
        depth: range * (DTR * theta).cos(),
    }
}

/// Degrees per meter of longitude and latitude at `lat`, on the WGS-72 ellipsoid series.
#[must_use]
pub fn coor_scale(lat: f64) -> (f64, f64) {
    const C1: f64 = 111_412.84;
    const C2: f64 = -93.5;
    const C3: f64 = 0.118;
    const C4: f64 = 111_132.92;
    const C5: f64 = -559.82;
    const C6: f64 = 1.175;
    const C7: f64 = 0.0023;

    let radlat = DTR * lat;
    let mtodeglon = 1.0
        / (C1 * radlat.cos() + C2 * (3.0 * radlat).cos() + C3 * (5.0 * radlat).cos()).abs();
    let mtodeglat = 1.0
        / (C4
            + C5 * (2.0 * radlat).cos()
            + C6 * (4.0 * radlat).cos()
            + C7 * (6.0 * radlat).cos())
        .abs();
    (mtodeglon, mtodeglat)
}

/// Wrap a heading into [0, 360).
#[must_use]
pub fn normalize_heading(heading: f64) -> f64 {
    let h = heading % 360.0;
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

/// Geographic position with depth positive down.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
    pub depth: f64,
}

/// Heading, roll and pitch in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Attitude {
    pub heading: f64,
    pub roll: f64,
    pub pitch: f64,
}

/// Moves navigation and attitude from a platform's reference point to a sensor on it.
pub trait Platform {
    /// Sensor position given the reference point position and platform attitude.
    fn position(&self, reference: Position, attitude: Attitude) -> Position;
    /// Sensor attitude given the platform attitude.
    fn orientation(&self, attitude: Attitude) -> Attitude;
}

/// A sensor mounted at a fixed offset and orientation from the reference point.
///
/// Offsets are in meters: `x` to starboard, `y` forward and `z` up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TypedBuilder)]
pub struct SensorOffset {
    #[builder(default)]
    pub x: f64,
    #[builder(default)]
    pub y: f64,
    #[builder(default)]
    pub z: f64,
    #[builder(default)]
    pub heading_offset: f64,
    #[builder(default)]
    pub roll_offset: f64,
    #[builder(default)]
    pub pitch_offset: f64,
}

impl SensorOffset {
    /// Rotate the body frame offset into east, north and up components.
    #[must_use]
    pub fn lever(&self, attitude: Attitude) -> (f64, f64, f64) {
        let (sh, ch) = (DTR * attitude.heading).sin_cos();
        let (sr, cr) = (DTR * attitude.roll).sin_cos();
        let (sp, cp) = (DTR * attitude.pitch).sin_cos();
        let (xx, yy, zz) = (self.x, self.y, self.z);

        let lever_x =
            cp * sh * yy + (ch * cr + sh * sp * sr) * xx - (cr * sh * sp - ch * sr) * zz;
        let lever_y =
            ch * cp * yy + (ch * sp * sr - cr * sh) * xx - (sh * sr + ch * cr * sp) * zz;
        let lever_z = sp * yy - cp * sr * xx + cp * cr * zz;
        (lever_x, lever_y, lever_z)
    }
}

impl Platform for SensorOffset {
    fn position(&self, reference: Position, attitude: Attitude) -> Position {
        let (lx, ly, lz) = self.lever(attitude);
        let (mtodeglon, mtodeglat) = coor_scale(reference.lat);
        Position {
            lon: reference.lon + lx * mtodeglon,
            lat: reference.lat + ly * mtodeglat,
            depth: reference.depth - lz,
        }
    }

    fn orientation(&self, attitude: Attitude) -> Attitude {
        Attitude {
            heading: normalize_heading(attitude.heading + self.heading_offset),
            roll: attitude.roll + self.roll_offset,
            pitch: attitude.pitch + self.pitch_offset,
        }
    }
}

/// Location of a query time within a sorted series: the two samples either side and the
/// fraction of the way from the first to the second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lo: usize,
    pub hi: usize,
    pub frac: f64,
}

impl Bracket {
    #[must_use]
    pub fn lerp(&self, a: f64, b: f64) -> f64 {
        if self.frac == 0.0 {
            a
        } else if self.frac == 1.0 {
            b
        } else {
            a + self.frac * (b - a)
        }
    }

    /// Interpolate along the shorter arc between two headings, result in [0, 360).
    #[must_use]
    pub fn lerp_heading(&self, a: f64, b: f64) -> f64 {
        let mut d = b - a;
        if d > 180.0 {
            d -= 360.0;
        } else if d < -180.0 {
            d += 360.0;
        }
        let h = if self.frac == 0.0 {
            a
        } else if self.frac == 1.0 {
            b
        } else {
            a + self.frac * d
        };
        normalize_heading(h)
    }

    /// Interpolate longitude along the shorter arc across the antimeridian.
    #[must_use]
    pub fn lerp_longitude(&self, a: f64, b: f64) -> f64 {
        if self.frac == 0.0 {
            return a;
        } else if self.frac == 1.0 {
            return b;
        }
        let mut d = b - a;
        if d > 180.0 {
            d -= 360.0;
        } else if d < -180.0 {
            d += 360.0;
        }
        let lon = a + self.frac * d;
        if lon > 180.0 && a <= 180.0 {
            lon - 360.0
        } else if lon < -180.0 && a >= -180.0 {
            lon + 360.0
        } else {
            lon
        }
    }
}

/// Find where `t` falls in `samples`, which must be sorted by `time`.
///
/// `cursor` is a search hint that is updated on return. Reusing it for monotonically
/// increasing queries makes each lookup amortized constant time. Times before the first
/// or after the last sample clamp to that sample. Returns `None` for an empty series.
pub fn bracket<T, F>(samples: &[T], time: F, t: f64, cursor: &mut usize) -> Option<Bracket>
where
    F: Fn(&T) -> f64,
{
    let n = samples.len();
    if n == 0 {
        return None;
    }
    if n == 1 || t <= time(&samples[0]) {
        *cursor = 0;
        return Some(Bracket {
            lo: 0,
            hi: 0,
            frac: 0.0,
        });
    }
    if t >= time(&samples[n - 1]) {
        *cursor = n - 1;
        return Some(Bracket {
            lo: n - 1,
            hi: n - 1,
            frac: 0.0,
        });
    }

    // t is strictly inside the series, so both walks stop in bounds
    let mut i = (*cursor).min(n - 2);
    while i > 0 && time(&samples[i]) > t {
        i -= 1;
    }
    while i < n - 2 && time(&samples[i + 1]) < t {
        i += 1;
    }
    *cursor = i;

    let t0 = time(&samples[i]);
    let t1 = time(&samples[i + 1]);
    let frac = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
    Some(Bracket {
        lo: i,
        hi: i + 1,
        frac,
    })
}

/// Piecewise linear value of `series` at `t`.
pub fn interpolate(series: &[(f64, f64)], t: f64, cursor: &mut usize) -> Option<f64> {
    let b = bracket(series, |s| s.0, t, cursor)?;
    Some(b.lerp(series[b.lo].1, series[b.hi].1))
}

/// Heading of `series` at `t`, taking the shorter way around the 0/360 wrap.
pub fn interpolate_heading(series: &[(f64, f64)], t: f64, cursor: &mut usize) -> Option<f64> {
    let b = bracket(series, |s| s.0, t, cursor)?;
    Some(b.lerp_heading(series[b.lo].1, series[b.hi].1))
}

/// Longitude of `series` at `t`, taking the shorter way across the antimeridian.
pub fn interpolate_longitude(
    series: &[(f64, f64)],
    t: f64,
    cursor: &mut usize,
) -> Option<f64> {
    let b = bracket(series, |s| s.0, t, cursor)?;
    Some(b.lerp_longitude(series[b.lo].1, series[b.hi].1))
}
