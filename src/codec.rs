//! The contract shared by all format codecs, format selection and read/write sessions.
use std::{
    fmt::Debug,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::debug;
use typed_builder::TypedBuilder;

use crate::{
    bytes::{Bytes, Endianness},
    config::CodecConfig,
    error::{Error, Result},
    geometry::Platform,
    lidar::{LidarCodec, LidarRecord},
    model::{
        Altitude, BeamWidth, DetectType, Dimensions, Gains, Kind, NavSample, PulseType,
        Sounding, TravelTimes,
    },
    oic::{OicCodec, OicRecord, Variant},
};

/// A navigation fix used for interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NavPoint {
    pub time: f64,
    pub lon: f64,
    pub lat: f64,
    /// km/hr
    pub speed: f64,
}

/// An attitude sample used for interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttitudePoint {
    pub time: f64,
    pub roll: f64,
    pub pitch: f64,
    pub heave: f64,
}

/// Asynchronous time series to merge into survey records. Every series must be sorted
/// by time; an empty series leaves the corresponding values untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TypedBuilder)]
pub struct PreprocessParams {
    /// Replaces the record timestamp before anything is interpolated.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[builder(default)]
    #[serde(default)]
    pub nav: Vec<NavPoint>,
    /// (time, sensor depth)
    #[builder(default)]
    #[serde(default)]
    pub sensordepth: Vec<(f64, f64)>,
    /// (time, heading)
    #[builder(default)]
    #[serde(default)]
    pub heading: Vec<(f64, f64)>,
    #[builder(default)]
    #[serde(default)]
    pub attitude: Vec<AttitudePoint>,
}

/// Operations every format codec provides.
///
/// A codec value holds the per-stream session state (format version, pending lookahead
/// bytes, byte order). The record store it allocates holds everything decoded from the
/// most recent record and is reused from one read to the next.
///
/// Accessors that only apply to survey data fail with [Error::Comment] when the record is
/// a comment and [Error::Other] for any other non-data record.
pub trait FormatCodec {
    type Record: Clone + Debug;

    fn format(&self) -> FormatKind;

    /// A fresh, empty record store.
    ///
    /// # Errors
    /// [Error::MemoryFail] if initial storage cannot be allocated.
    fn allocate(&self) -> Result<Self::Record>;

    /// Decode the next record from `bytes` into `rec` and return its kind.
    ///
    /// # Errors
    /// [Error::Eof] at the end of the stream, including a short read inside a record.
    /// [Error::Unintelligible] for a record that cannot be interpreted; the stream is
    /// left positioned so the next call resumes searching for a record.
    fn read_record<R: Read>(&mut self, bytes: &mut Bytes<R>, rec: &mut Self::Record)
        -> Result<Kind>;

    /// Encode `rec` to `w`.
    ///
    /// # Errors
    /// [Error::WriteFail] if the writer fails.
    fn write_record<W: Write>(&mut self, w: &mut W, rec: &Self::Record) -> Result<()>;

    fn kind(&self, rec: &Self::Record) -> Kind;

    /// Beam, amplitude and pixel counts for data records, zero for anything else.
    fn dimensions(&self, rec: &Self::Record) -> Dimensions;

    /// Largest counts a record of this format may carry.
    fn max_dimensions(&self, rec: &Self::Record) -> Dimensions;

    fn beamwidth(&self) -> BeamWidth;

    /// Project a record onto the canonical model. Comment records produce a sounding with
    /// only the comment set.
    ///
    /// # Errors
    /// [Error::Other] for records that are neither data nor comments.
    fn extract(&self, rec: &Self::Record) -> Result<Sounding>;

    /// Overwrite `rec` from a canonical sounding of kind data or comment.
    ///
    /// # Errors
    /// [Error::Other] for any other kind.
    fn insert(&self, rec: &mut Self::Record, sounding: &Sounding) -> Result<()>;

    /// # Errors
    /// [Error::Comment] or [Error::Other] for non-data records.
    fn extract_nav(&self, rec: &Self::Record) -> Result<NavSample>;

    /// # Errors
    /// Implementations may reject records the navigation does not apply to.
    fn insert_nav(&self, rec: &mut Self::Record, nav: &NavSample) -> Result<()>;

    /// # Errors
    /// [Error::Comment] or [Error::Other] for non-data records.
    fn extract_altitude(&self, rec: &Self::Record) -> Result<Altitude>;

    /// # Errors
    /// [Error::Other] if the format does not store altitude.
    fn insert_altitude(&self, rec: &mut Self::Record, altitude: &Altitude) -> Result<()>;

    /// # Errors
    /// [Error::Comment] or [Error::Other] for non-data records.
    fn travel_times(&self, rec: &Self::Record) -> Result<TravelTimes>;

    /// # Errors
    /// [Error::Comment] or [Error::Other] for non-data records.
    fn detects(&self, rec: &Self::Record) -> Result<Vec<DetectType>>;

    /// # Errors
    /// [Error::Comment] or [Error::Other] for non-data records.
    fn pulses(&self, rec: &Self::Record) -> Result<Vec<PulseType>>;

    /// # Errors
    /// [Error::Comment] or [Error::Other] for non-data records.
    fn gains(&self, rec: &Self::Record) -> Result<Gains>;

    /// # Errors
    /// [Error::Comment] or [Error::Other] for non-data records.
    fn ping_number(&self, rec: &Self::Record) -> Result<i64>;

    /// Merge asynchronous navigation and attitude into a data record and recompute its
    /// geometry. Records of other kinds are left unchanged.
    ///
    /// # Errors
    /// [Error::MemoryFail] if derived arrays cannot be grown.
    fn preprocess(
        &self,
        rec: &mut Self::Record,
        params: &PreprocessParams,
        platform: Option<&dyn Platform>,
    ) -> Result<()>;
}

/// Error for an accessor that requires survey data applied to a record of `kind`.
pub(crate) fn not_data(kind: Kind) -> Error {
    match kind {
        Kind::Comment => Error::Comment,
        _ => Error::Other,
    }
}

/// The supported formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatKind {
    /// OIC GeoDAS sonar, 248 byte header, bathymetry rebuilt from raw channels.
    OicGeo,
    /// OIC GeoDAS sonar extended with processed bathymetry and sidescan, 276 byte header.
    OicGe2,
    /// 3DatDepth scanning LIDAR.
    Lidar3dDepthP,
}

impl FormatKind {
    pub const ALL: [FormatKind; 3] = [
        FormatKind::OicGeo,
        FormatKind::OicGe2,
        FormatKind::Lidar3dDepthP,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            FormatKind::OicGeo => "OICGEODA",
            FormatKind::OicGe2 => "OICMBARI",
            FormatKind::Lidar3dDepthP => "3DDEPTHP",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            FormatKind::OicGeo => "OIC GeoDAS towed sonar, sidescan and angle bathymetry",
            FormatKind::OicGe2 => "OIC GeoDAS towed sonar with processed bathymetry and sidescan",
            FormatKind::Lidar3dDepthP => "3DatDepth SL1 subsea scanning LIDAR, processed",
        }
    }

    /// Byte order written by the instrument.
    #[must_use]
    pub fn byte_order(self) -> Endianness {
        match self {
            FormatKind::OicGeo | FormatKind::OicGe2 => Endianness::Big,
            FormatKind::Lidar3dDepthP => Endianness::Little,
        }
    }

    /// A new codec session for this format.
    #[must_use]
    pub fn codec(self, config: &CodecConfig) -> Codec {
        match self {
            FormatKind::OicGeo => Codec::Oic(OicCodec::new(Variant::Geo, config)),
            FormatKind::OicGe2 => Codec::Oic(OicCodec::new(Variant::Ge2, config)),
            FormatKind::Lidar3dDepthP => Codec::Lidar(LidarCodec::new(config)),
        }
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FormatKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FormatKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::unintelligible(format!("unknown format {s}")))
    }
}

/// A codec for any supported format.
#[derive(Debug, Clone)]
pub enum Codec {
    Oic(OicCodec),
    Lidar(LidarCodec),
}

/// A record store for any supported format.
#[derive(Debug, Clone)]
pub enum AnyRecord {
    Oic(Box<OicRecord>),
    Lidar(Box<LidarRecord>),
}

macro_rules! dispatch {
    ($self:expr, $rec:expr, |$c:ident, $r:ident| $body:expr) => {
        match ($self, $rec) {
            (Codec::Oic($c), AnyRecord::Oic($r)) => $body,
            (Codec::Lidar($c), AnyRecord::Lidar($r)) => $body,
            _ => Err(Error::Other),
        }
    };
}

impl FormatCodec for Codec {
    type Record = AnyRecord;

    fn format(&self) -> FormatKind {
        match self {
            Codec::Oic(c) => c.format(),
            Codec::Lidar(c) => c.format(),
        }
    }

    fn allocate(&self) -> Result<AnyRecord> {
        Ok(match self {
            Codec::Oic(c) => AnyRecord::Oic(Box::new(c.allocate()?)),
            Codec::Lidar(c) => AnyRecord::Lidar(Box::new(c.allocate()?)),
        })
    }

    fn read_record<R: Read>(&mut self, bytes: &mut Bytes<R>, rec: &mut AnyRecord) -> Result<Kind> {
        let matched = matches!(
            (&*self, &*rec),
            (Codec::Oic(_), AnyRecord::Oic(_)) | (Codec::Lidar(_), AnyRecord::Lidar(_))
        );
        if !matched {
            debug!(format = %self.format(), "replacing record store of another format");
            *rec = self.allocate()?;
        }
        dispatch!(self, rec, |c, r| c.read_record(bytes, r))
    }

    fn write_record<W: Write>(&mut self, w: &mut W, rec: &AnyRecord) -> Result<()> {
        dispatch!(self, rec, |c, r| c.write_record(w, r))
    }

    fn kind(&self, rec: &AnyRecord) -> Kind {
        match rec {
            AnyRecord::Oic(r) => r.kind,
            AnyRecord::Lidar(r) => r.kind,
        }
    }

    fn dimensions(&self, rec: &AnyRecord) -> Dimensions {
        dispatch!(self, rec, |c, r| Ok(c.dimensions(r))).unwrap_or_default()
    }

    fn max_dimensions(&self, rec: &AnyRecord) -> Dimensions {
        dispatch!(self, rec, |c, r| Ok(c.max_dimensions(r))).unwrap_or_default()
    }

    fn beamwidth(&self) -> BeamWidth {
        match self {
            Codec::Oic(c) => c.beamwidth(),
            Codec::Lidar(c) => c.beamwidth(),
        }
    }

    fn extract(&self, rec: &AnyRecord) -> Result<Sounding> {
        dispatch!(self, rec, |c, r| c.extract(r))
    }

    fn insert(&self, rec: &mut AnyRecord, sounding: &Sounding) -> Result<()> {
        dispatch!(self, rec, |c, r| c.insert(r, sounding))
    }

    fn extract_nav(&self, rec: &AnyRecord) -> Result<NavSample> {
        dispatch!(self, rec, |c, r| c.extract_nav(r))
    }

    fn insert_nav(&self, rec: &mut AnyRecord, nav: &NavSample) -> Result<()> {
        dispatch!(self, rec, |c, r| c.insert_nav(r, nav))
    }

    fn extract_altitude(&self, rec: &AnyRecord) -> Result<Altitude> {
        dispatch!(self, rec, |c, r| c.extract_altitude(r))
    }

    fn insert_altitude(&self, rec: &mut AnyRecord, altitude: &Altitude) -> Result<()> {
        dispatch!(self, rec, |c, r| c.insert_altitude(r, altitude))
    }

    fn travel_times(&self, rec: &AnyRecord) -> Result<TravelTimes> {
        dispatch!(self, rec, |c, r| c.travel_times(r))
    }

    fn detects(&self, rec: &AnyRecord) -> Result<Vec<DetectType>> {
        dispatch!(self, rec, |c, r| c.detects(r))
    }

    fn pulses(&self, rec: &AnyRecord) -> Result<Vec<PulseType>> {
        dispatch!(self, rec, |c, r| c.pulses(r))
    }

    fn gains(&self, rec: &AnyRecord) -> Result<Gains> {
        dispatch!(self, rec, |c, r| c.gains(r))
    }

    fn ping_number(&self, rec: &AnyRecord) -> Result<i64> {
        dispatch!(self, rec, |c, r| c.ping_number(r))
    }

    fn preprocess(
        &self,
        rec: &mut AnyRecord,
        params: &PreprocessParams,
        platform: Option<&dyn Platform>,
    ) -> Result<()> {
        dispatch!(self, rec, |c, r| c.preprocess(r, params, platform))
    }
}

/// A read session: one input stream, one codec and the record store it decodes into.
pub struct Reader<R, C>
where
    R: Read,
    C: FormatCodec,
{
    bytes: Bytes<R>,
    codec: C,
    record: C::Record,
}

impl Reader<BufReader<File>, Codec> {
    /// Open `path` for reading as `format`.
    ///
    /// # Errors
    /// [Error::Io] if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(
        path: P,
        format: FormatKind,
        config: &CodecConfig,
    ) -> Result<Self> {
        let file = File::open(path)?;
        Reader::new(BufReader::new(file), format.codec(config))
    }
}

impl<R, C> Reader<R, C>
where
    R: Read,
    C: FormatCodec,
{
    /// # Errors
    /// [Error::MemoryFail] if the record store cannot be allocated.
    pub fn new(reader: R, codec: C) -> Result<Self> {
        let record = codec.allocate()?;
        Ok(Reader {
            bytes: Bytes::new(reader),
            codec,
            record,
        })
    }

    /// Decode the next record.
    ///
    /// # Errors
    /// See [FormatCodec::read_record].
    pub fn read_record(&mut self) -> Result<&C::Record> {
        self.codec.read_record(&mut self.bytes, &mut self.record)?;
        Ok(&self.record)
    }

    /// The most recently decoded record.
    #[must_use]
    pub fn record(&self) -> &C::Record {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut C::Record {
        &mut self.record
    }

    #[must_use]
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Bytes consumed from the stream so far.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.bytes.offset()
    }

    /// Iterate over copies of the remaining records.
    pub fn records(&mut self) -> Records<'_, R, C> {
        Records {
            reader: self,
            done: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.bytes.into_inner()
    }
}

/// Iterator over the records of a [Reader].
///
/// Ends at the end of the stream. Unintelligible records are produced as errors and
/// iteration continues with the next record; any other error is produced once and ends
/// iteration.
pub struct Records<'a, R, C>
where
    R: Read,
    C: FormatCodec,
{
    reader: &'a mut Reader<R, C>,
    done: bool,
}

impl<R, C> Iterator for Records<'_, R, C>
where
    R: Read,
    C: FormatCodec,
{
    type Item = Result<C::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_record() {
            Ok(rec) => Some(Ok(rec.clone())),
            Err(Error::Eof) => {
                self.done = true;
                None
            }
            Err(err) => {
                if err.is_fatal() {
                    self.done = true;
                }
                Some(Err(err))
            }
        }
    }
}

/// A write session: one output stream and the codec that encodes into it.
pub struct Writer<W, C>
where
    W: Write,
    C: FormatCodec,
{
    writer: W,
    codec: C,
}

impl Writer<BufWriter<File>, Codec> {
    /// Create or truncate `path` for writing as `format`.
    ///
    /// # Errors
    /// [Error::WriteFail] if the file cannot be created.
    pub fn create<P: AsRef<Path>>(
        path: P,
        format: FormatKind,
        config: &CodecConfig,
    ) -> Result<Self> {
        let file = File::create(path).map_err(Error::write)?;
        Ok(Writer::new(BufWriter::new(file), format.codec(config)))
    }
}

impl<W, C> Writer<W, C>
where
    W: Write,
    C: FormatCodec,
{
    pub fn new(writer: W, codec: C) -> Self {
        Writer { writer, codec }
    }

    /// # Errors
    /// See [FormatCodec::write_record].
    pub fn write_record(&mut self, rec: &C::Record) -> Result<()> {
        self.codec.write_record(&mut self.writer, rec)
    }

    /// # Errors
    /// [Error::WriteFail] if buffered output cannot be written.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::write)
    }

    #[must_use]
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Flush and return the underlying writer.
    ///
    /// # Errors
    /// [Error::WriteFail] if buffered output cannot be written.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names_parse() {
        for kind in FormatKind::ALL {
            let parsed: FormatKind = kind.name().parse().expect("name should parse");
            assert_eq!(parsed, kind);
        }
        assert_eq!("oicmbari".parse::<FormatKind>().unwrap(), FormatKind::OicGe2);
        assert!("xtf".parse::<FormatKind>().is_err());
    }

    #[test]
    fn codec_reports_its_format() {
        let config = CodecConfig::default();
        for kind in FormatKind::ALL {
            assert_eq!(kind.codec(&config).format(), kind);
        }
    }

    #[test]
    fn mismatched_record_is_other() {
        let config = CodecConfig::default();
        let oic = FormatKind::OicGe2.codec(&config);
        let lidar = FormatKind::Lidar3dDepthP.codec(&config);
        let rec = lidar.allocate().unwrap();
        assert!(matches!(oic.extract(&rec), Err(Error::Other)));
        assert_eq!(oic.dimensions(&rec), Dimensions::default());
    }

    #[test]
    fn empty_stream_has_no_records() {
        let config = CodecConfig::default();
        for kind in FormatKind::ALL {
            let mut reader = Reader::new(&[0u8; 0][..], kind.codec(&config)).unwrap();
            assert_eq!(reader.records().count(), 0, "{kind}");
        }
    }

    #[test]
    fn preprocess_params_builder() {
        let params = PreprocessParams::builder()
            .timestamp(10.0)
            .heading(vec![(0.0, 10.0), (20.0, 30.0)])
            .build();
        assert_eq!(params.timestamp, Some(10.0));
        assert!(params.nav.is_empty());
        assert_eq!(params.heading.len(), 2);
    }
}
