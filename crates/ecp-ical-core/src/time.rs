//! Time types for scraped events.
//!
//! The upstream site writes `start`/`end` as loosely formatted ISO 8601 text:
//! sometimes with an offset, usually without one, occasionally just a date.
//! [`EventTime`] keeps those cases apart so that the normalizer can reason
//! about local wall-clock time and the serializer can emit the right
//! iCalendar value type.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Date-time layouts carrying an explicit UTC offset.
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Date-time layouts without offset (floating, read as local time).
const FLOATING_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Represents the start or end of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific instant with a known UTC offset.
    DateTime(DateTime<FixedOffset>),
    /// A wall-clock time without offset, interpreted in local time.
    Floating(NaiveDateTime),
    /// A calendar date (all-day events).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Parses an upstream timestamp. See [`parse_timestamp`].
    pub fn parse(text: &str) -> CoreResult<Self> {
        parse_timestamp(text)
    }

    /// Returns `true` if this is a calendar date.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns `true` if this carries a time of day.
    pub fn is_datetime(&self) -> bool {
        !self.is_all_day()
    }

    /// Converts to local wall-clock time, discarding the offset.
    ///
    /// Calendar dates map to local midnight.
    pub fn to_local_naive(&self) -> NaiveDateTime {
        match self {
            Self::DateTime(dt) => dt.with_timezone(&Local).naive_local(),
            Self::Floating(naive) => *naive,
            Self::AllDay(date) => date.and_time(NaiveTime::MIN),
        }
    }

    /// Returns the local calendar date of this time.
    pub fn to_local_date(&self) -> NaiveDate {
        match self {
            Self::AllDay(date) => *date,
            other => other.to_local_naive().date(),
        }
    }

    /// Drops the time of day, keeping the local calendar date.
    pub fn into_local_date(self) -> Self {
        Self::AllDay(self.to_local_date())
    }

    /// Returns the elapsed time from `self` to `end`.
    ///
    /// Two zoned instants are compared exactly; any other pairing is compared
    /// on local wall-clock time.
    pub fn duration_until(&self, end: &EventTime) -> Duration {
        match (self, end) {
            (Self::DateTime(start), Self::DateTime(end)) => *end - *start,
            _ => end.to_local_naive() - self.to_local_naive(),
        }
    }
}

/// Parses an ISO 8601-ish timestamp.
///
/// Accepted inputs include RFC 3339 (`2024-01-01T10:00:00-05:00`,
/// `2024-01-01T15:00:00Z`), offsets without a colon, missing seconds,
/// fractional seconds, a space instead of `T`, and bare dates. Values
/// without an offset become [`EventTime::Floating`]; a bare date is read as
/// floating midnight.
///
/// # Errors
///
/// Returns [`CoreError::InvalidTimestamp`] when no layout matches.
pub fn parse_timestamp(text: &str) -> CoreResult<EventTime> {
    let trimmed = text.trim();
    let zulu;
    let candidate = match trimmed.strip_suffix(['Z', 'z']) {
        Some(rest) => {
            zulu = format!("{rest}+00:00");
            zulu.as_str()
        }
        None => trimmed,
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(candidate) {
        return Ok(EventTime::DateTime(dt));
    }

    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(candidate, format) {
            return Ok(EventTime::DateTime(dt));
        }
    }

    for format in FLOATING_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(candidate, format) {
            return Ok(EventTime::Floating(naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(candidate, "%Y-%m-%d") {
        return Ok(EventTime::Floating(date.and_time(NaiveTime::MIN)));
    }

    Err(CoreError::invalid_timestamp(text))
}
