//! CF time units.
//!
//! Archive time variables carry a `units` attribute such as
//! `"days since 1950-01-01 00:00:00"`. Values are converted to seconds and,
//! when the simulation has its own origin, re-based onto it.

use chrono::{NaiveDate, NaiveDateTime};

use super::DatasetError;

const DATE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H",
];

/// Parse a date as written after `since`.
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text
        .trim()
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Unit and origin of an archive time axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeUnits {
    seconds_per_unit: f64,
    origin: Option<NaiveDateTime>,
}

impl Default for TimeUnits {
    fn default() -> Self {
        Self::seconds()
    }
}

impl TimeUnits {
    /// Plain seconds with no origin.
    pub fn seconds() -> Self {
        Self {
            seconds_per_unit: 1.0,
            origin: None,
        }
    }

    /// Parse a CF `units` string.
    ///
    /// The unit word is matched on its prefix (`sec`, `min`, `hour`, `day`);
    /// the `since <date>` part is optional.
    pub fn parse(units: &str) -> Result<Self, DatasetError> {
        let lower = units.trim().to_ascii_lowercase();
        let invalid = || DatasetError::InvalidTimeUnits(units.to_string());

        // Lowercasing keeps byte offsets, the date is read from the original.
        let (unit, since) = match lower.find("since") {
            Some(at) => (lower[..at].trim(), Some(&units.trim()[at + 5..])),
            None => (lower.as_str(), None),
        };
        let seconds_per_unit = if unit.starts_with("sec") || unit == "s" {
            1.0
        } else if unit.starts_with("min") {
            60.0
        } else if unit.starts_with("hour") || unit == "h" {
            3600.0
        } else if unit.starts_with("day") || unit == "d" {
            86_400.0
        } else {
            return Err(invalid());
        };
        let origin = match since {
            Some(text) => Some(parse_date(text).ok_or_else(invalid)?),
            None => None,
        };
        Ok(Self {
            seconds_per_unit,
            origin,
        })
    }

    pub fn seconds_per_unit(&self) -> f64 {
        self.seconds_per_unit
    }

    pub fn origin(&self) -> Option<NaiveDateTime> {
        self.origin
    }

    /// Seconds since `epoch` (or since the unit origin when `epoch` is
    /// `None` or the units carry no origin).
    pub fn to_seconds(&self, value: f64, epoch: Option<NaiveDateTime>) -> f64 {
        let offset = match (self.origin, epoch) {
            (Some(origin), Some(epoch)) => (origin - epoch).num_seconds() as f64,
            _ => 0.0,
        };
        value * self.seconds_per_unit + offset
    }
}

/// Round a time to a multiple of `rounding` seconds (no-op for 0).
///
/// Archive timestamps written in floating-point days drift by fractions of
/// a second; rounding keeps record times on exact multiples.
pub fn round_time(time: f64, rounding: f64) -> f64 {
    if rounding > 0.0 {
        (time / rounding).round() * rounding
    } else {
        time
    }
}
