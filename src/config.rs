//! Codec session options.
use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{bytes::Endianness, error::Result};

/// Longitude range convention applied to extracted navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LonFlip {
    /// [-360, 0]
    Negative,
    /// [-180, 180]
    #[default]
    Centered,
    /// [0, 360]
    Positive,
}

impl LonFlip {
    /// Shift `lon` by one turn if it falls outside this range.
    ///
    /// Only a single turn is applied, so values more than a full turn out of range are
    /// left partially corrected.
    #[must_use]
    pub fn apply(self, lon: f64) -> f64 {
        match self {
            LonFlip::Negative => {
                if lon > 0.0 {
                    lon - 360.0
                } else if lon < -360.0 {
                    lon + 360.0
                } else {
                    lon
                }
            }
            LonFlip::Centered => {
                if lon < -180.0 {
                    lon + 360.0
                } else if lon > 180.0 {
                    lon - 360.0
                } else {
                    lon
                }
            }
            LonFlip::Positive => {
                if lon > 360.0 {
                    lon - 360.0
                } else if lon < 0.0 {
                    lon + 360.0
                } else {
                    lon
                }
            }
        }
    }
}

impl TryFrom<i32> for LonFlip {
    type Error = i32;

    /// The conventional -1, 0, 1 selector.
    fn try_from(value: i32) -> std::result::Result<Self, Self::Error> {
        match value {
            -1 => Ok(LonFlip::Negative),
            0 => Ok(LonFlip::Centered),
            1 => Ok(LonFlip::Positive),
            v => Err(v),
        }
    }
}

/// Options shared by every codec in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TypedBuilder)]
pub struct CodecConfig {
    #[builder(default)]
    #[serde(default)]
    pub lonflip: LonFlip,
    /// Byte order to use instead of the format's native order.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub byte_order: Option<Endianness>,
}

impl CodecConfig {
    /// Parse a JSON document such as `{"lonflip": "positive", "byte_order": "little"}`.
    /// Missing fields take their defaults.
    ///
    /// # Errors
    /// [crate::Error::Config] if the document is not valid.
    pub fn from_json(s: &str) -> Result<CodecConfig> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a JSON configuration file.
    ///
    /// # Errors
    /// [crate::Error::Io] if the file cannot be opened, [crate::Error::Config] if its
    /// contents are not valid.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<CodecConfig> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// `order` unless overridden.
    #[must_use]
    pub fn byte_order_or(&self, order: Endianness) -> Endianness {
        self.byte_order.unwrap_or(order)
    }
}
