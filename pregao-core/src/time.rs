//! Wall-clock and timestamp helpers.
//!
//! Window policies are evaluated on the wall clock of a configured timezone,
//! never on the host's local time.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Calendar fields of an instant as seen in a specific timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallClock {
    /// Local year.
    pub year: i32,
    /// Local month (1-12).
    pub month: u32,
    /// Local day of month (1-31).
    pub day: u32,
    /// Local hour (0-23).
    pub hour: u32,
    /// Local minute.
    pub minute: u32,
    /// Local second.
    pub second: u32,
    /// Local calendar date formatted as `YYYY-MM-DD`.
    pub day_key: String,
}

impl WallClock {
    /// Local calendar date.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        // Fields come from a valid DateTime, so the date always exists.
        NaiveDate::from_ymd_opt(self.year, self.month, self.day).unwrap_or_default()
    }

    /// Day key of the previous local calendar day.
    #[must_use]
    pub fn previous_day_key(&self) -> String {
        self.date()
            .pred_opt()
            .map_or_else(|| self.day_key.clone(), day_key)
    }
}

/// Read the wall clock of `tz` at instant `now`.
#[must_use]
pub fn wall_clock(now: DateTime<Utc>, tz: Tz) -> WallClock {
    let local = tz.from_utc_datetime(&now.naive_utc());
    WallClock {
        year: local.year(),
        month: local.month(),
        day: local.day(),
        hour: local.hour(),
        minute: local.minute(),
        second: local.second(),
        day_key: day_key(local.date_naive()),
    }
}

/// Format a calendar date as a cache day key.
#[must_use]
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse an ISO-like timestamp emitted by the backend.
///
/// Accepts RFC 3339, SQL-style `YYYY-MM-DD HH:MM:SS[.f]±HH[:MM]`, naive
/// date-times (read as UTC) and bare dates (UTC midnight). Anything else,
/// including the empty string, yields `None` and is treated as absent by
/// callers.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse an optional timestamp string.
#[must_use]
pub fn parse_opt(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(parse_timestamp)
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
