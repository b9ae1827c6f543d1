//! Format independent representation of swath records.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// What a record carries. Exactly one kind is active per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    #[default]
    None,
    /// Survey soundings.
    Data,
    Comment,
    /// Instrument scan geometry.
    Parameter,
    /// Asynchronous position sample.
    Nav,
    /// Asynchronous roll, pitch and heave sample.
    Attitude,
    /// Asynchronous heading sample.
    Heading,
    /// Asynchronous sensor depth sample.
    SensorDepth,
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Kind::None => "none",
            Kind::Data => "data",
            Kind::Comment => "comment",
            Kind::Parameter => "parameter",
            Kind::Nav => "nav",
            Kind::Attitude => "attitude",
            Kind::Heading => "heading",
            Kind::SensorDepth => "sensordepth",
        };
        write!(f, "{name}")
    }
}

/// Per-sounding validity marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Beamflag(pub u8);

impl Beamflag {
    /// Valid sounding.
    pub const NONE: Beamflag = Beamflag(0x00);
    /// Flagged as bad.
    pub const FLAG: Beamflag = Beamflag(0x01);
    /// No data.
    pub const NULL: Beamflag = Beamflag(0x02);
    /// Flagged by hand in an editor.
    pub const MANUAL: Beamflag = Beamflag(0x05);

    #[must_use]
    pub fn is_valid(self) -> bool {
        self == Self::NONE
    }

    #[must_use]
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[must_use]
    pub fn is_flagged(self) -> bool {
        self.0 & Self::FLAG.0 != 0
    }
}

/// One range measurement within a scan: a single laser pulse or sonar beam.
///
/// The first block of fields is as received from the instrument; the rest are derived
/// from them by the geometry step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pulse {
    /// Range from the sensor (m).
    pub range: f32,
    pub amplitude: u16,
    pub snr: f32,
    /// Instrument frame cross-track angle (degrees).
    pub cross_track_angle: f32,
    /// Instrument frame forward-track angle (degrees).
    pub forward_track_angle: f32,
    pub cross_track_offset: f32,
    pub forward_track_offset: f32,
    /// Microseconds after the scan timestamp.
    pub pulse_time_offset: i32,
    pub saturated: u8,

    /// Epoch seconds of this pulse.
    pub time_d: f64,
    pub beamflag: Beamflag,
    pub acrosstrack: f64,
    pub alongtrack: f64,
    /// Depth below the sensor (m).
    pub depth: f64,
    pub navlon: f64,
    pub navlat: f64,
    pub sensordepth: f64,
    pub heading: f32,
    pub roll: f32,
    pub pitch: f32,
}

impl Pulse {
    /// A pulse with no return, used to fill a scan out to its declared size.
    #[must_use]
    pub fn null() -> Self {
        Pulse {
            beamflag: Beamflag::NULL,
            ..Pulse::default()
        }
    }
}

/// Canonical sounding produced by `extract` and consumed by `insert`.
///
/// Beam and pixel arrays are only populated for [Kind::Data]; a comment record carries
/// only `comment`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sounding {
    pub kind: Kind,
    /// Epoch seconds.
    pub time_d: f64,
    pub navlon: f64,
    pub navlat: f64,
    /// km/hr
    pub speed: f64,
    /// Degrees clockwise from north.
    pub heading: f64,
    pub beamflag: Vec<Beamflag>,
    /// Depth, positive down (m).
    pub bath: Vec<f64>,
    pub amp: Vec<f64>,
    pub bathacrosstrack: Vec<f64>,
    pub bathalongtrack: Vec<f64>,
    pub ss: Vec<f64>,
    pub ssacrosstrack: Vec<f64>,
    pub ssalongtrack: Vec<f64>,
    pub comment: Option<String>,
}

impl Sounding {
    /// A comment record.
    #[must_use]
    pub fn comment<S: Into<String>>(text: S) -> Self {
        Sounding {
            kind: Kind::Comment,
            comment: Some(text.into()),
            ..Sounding::default()
        }
    }
}

/// Navigation and attitude at a single time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NavSample {
    pub time_d: f64,
    pub navlon: f64,
    pub navlat: f64,
    /// km/hr
    pub speed: f64,
    pub heading: f64,
    pub draft: f64,
    pub roll: f64,
    pub pitch: f64,
    pub heave: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Altitude {
    pub transducer_depth: f64,
    pub altitude: f64,
}

/// Travel times and takeoff angles per beam.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TravelTimes {
    pub ttimes: Vec<f64>,
    /// Takeoff angle from vertical (degrees).
    pub angles: Vec<f64>,
    /// Azimuth of the takeoff direction (degrees).
    pub angles_forward: Vec<f64>,
    pub angles_null: Vec<f64>,
    pub heave: Vec<f64>,
    pub alongtrack_offset: Vec<f64>,
    pub draft: f64,
    /// Surface sound velocity (m/s).
    pub ssv: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectType {
    Unknown,
    Amplitude,
    Phase,
    Lidar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseType {
    Unknown,
    Cw,
    UpChirp,
    DownChirp,
    Lidar,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gains {
    pub transmit_gain: f64,
    pub pulse_length: f64,
    pub receive_gain: f64,
}

/// Number of bathymetry beams, amplitude values and sidescan pixels in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub nbath: usize,
    pub namp: usize,
    pub nss: usize,
}

/// Nominal beam widths of an instrument (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeamWidth {
    pub alongtrack: f64,
    pub acrosstrack: f64,
}
