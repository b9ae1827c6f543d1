//! Conversion between broken-out UTC time fields and epoch seconds.
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// UTC time split into calendar fields, as carried in scan headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BrokenTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

impl BrokenTime {
    /// Seconds since 1970-01-01 UTC, or `None` if the fields do not form a valid date.
    #[must_use]
    pub fn epoch_seconds(&self) -> Option<f64> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?;
        let dt = date.and_hms_opt(self.hour, self.minute, self.second)?;
        let secs = Utc.from_utc_datetime(&dt).timestamp();
        Some(secs as f64 + f64::from(self.microsecond) * 1e-6)
    }

    /// Split epoch seconds into calendar fields, rounding to the nearest microsecond.
    #[must_use]
    pub fn from_epoch_seconds(time_d: f64) -> Option<Self> {
        if !time_d.is_finite() {
            return None;
        }
        let mut secs = time_d.floor() as i64;
        let mut micros = ((time_d - secs as f64) * 1e6).round() as u32;
        if micros >= 1_000_000 {
            secs += 1;
            micros -= 1_000_000;
        }
        let dt: DateTime<Utc> = DateTime::from_timestamp(secs, 0)?;
        Some(BrokenTime {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
            microsecond: micros,
        })
    }

    /// Day of year, 1 based.
    #[must_use]
    pub fn day_of_year(&self) -> u32 {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).map_or(0, |d| d.ordinal())
    }
}

/// Epoch seconds for `t`, or 0.0 for an invalid date such as an all zero header.
pub(crate) fn epoch_seconds_or_zero(t: &BrokenTime) -> f64 {
    match t.epoch_seconds() {
        Some(time_d) => time_d,
        None => {
            warn!(?t, "invalid broken-out time, using epoch");
            0.0
        }
    }
}
