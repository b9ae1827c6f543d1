//! Swath sonar and scanning LIDAR record codecs.
//!
//! Supported formats:
//! * OIC GeoDAS towed sonar, `GEO` and the extended `GE2` layout with processed
//!   bathymetry and sidescan
//! * 3DatDepth SL1 subsea scanning LIDAR, legacy (1.0) and tagged (1.1) files
//!
//! Every codec decodes into its own record store and projects it onto a common
//! [model::Sounding] through [FormatCodec].
//!
//! ```no_run
//! use swathio::{CodecConfig, FormatCodec, FormatKind, Reader};
//!
//! let config = CodecConfig::default();
//! let mut reader = Reader::open("line.ge2", FormatKind::OicGe2, &config).unwrap();
//! for rec in reader.records() {
//!     let Ok(rec) = rec else { continue };
//!     println!("{:?}", rec);
//! }
//! ```
pub mod buffer;
pub mod bytes;
pub mod codec;
pub mod config;
pub mod error;
pub mod geometry;
pub mod lidar;
pub mod model;
pub mod oic;
mod synchronizer;
pub mod timecode;

pub use codec::{AnyRecord, Codec, FormatCodec, FormatKind, PreprocessParams, Reader, Records, Writer};
pub use config::{CodecConfig, LonFlip};
pub use error::{Error, Result};
