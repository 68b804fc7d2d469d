//! Accounting period identifier in `YYYY-MM` form.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced when parsing a `YearMonth`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YearMonthError {
    /// Input is not exactly four digits, a dash, and two digits.
    #[error("'{0}' does not match YYYY-MM")]
    Format(String),
    /// Month outside 01-12.
    #[error("month {0} is out of range")]
    MonthOutOfRange(u32),
}

/// A calendar month used as the accounting period key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Creates a period, rejecting months outside 1-12 and years outside 0-9999.
    pub fn new(year: i32, month: u32) -> Result<Self, YearMonthError> {
        if !(1..=12).contains(&month) {
            return Err(YearMonthError::MonthOutOfRange(month));
        }
        if !(0..=9999).contains(&year) {
            return Err(YearMonthError::Format(format!("{year}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month (1-12).
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// Latest representable period.
    pub const MAX: Self = Self {
        year: 9999,
        month: 12,
    };

    /// Period containing the given UTC instant, `None` past year 9999.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Option<Self> {
        Self::new(at.year(), at.month()).ok()
    }

    /// Compact code `YYYYMM` used to tag the remote aggregate.
    #[must_use]
    pub fn compact_code(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = YearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let shape_ok = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..].iter().all(u8::is_ascii_digit);
        if !shape_ok {
            return Err(YearMonthError::Format(s.to_string()));
        }

        let year: i32 = s[..4]
            .parse()
            .map_err(|_| YearMonthError::Format(s.to_string()))?;
        let month: u32 = s[5..]
            .parse()
            .map_err(|_| YearMonthError::Format(s.to_string()))?;
        Self::new(year, month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
