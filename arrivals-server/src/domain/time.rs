//! Clock handling for schedule feeds.
//!
//! Feeds give stop times as "HH:MM:SS" strings measured from the start of the
//! service day. Hours may run past 23 for trips that continue after midnight,
//! so these values can't be stored as a `NaiveTime`.

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minutes in a calendar day.
pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Error returned when parsing an invalid time or date string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of the service day, in seconds since its midnight.
///
/// Unlike a wall-clock time this can exceed 24:00:00.
///
/// # Examples
///
/// ```
/// use arrivals_server::domain::FeedTime;
///
/// let t = FeedTime::parse("25:10:00").unwrap();
/// assert!(t.is_after_midnight());
/// assert_eq!(t.minutes_since_midnight(), 25 * 60 + 10);
/// assert_eq!(t.to_string(), "25:10:00");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedTime(u32);

impl FeedTime {
    /// Latest hour accepted; feeds never run a service day past two days.
    const MAX_HOURS: u32 = 47;

    /// Build a time from hour, minute and second components.
    pub fn from_hms(hours: u32, minutes: u32, seconds: u32) -> Result<Self, TimeError> {
        if hours > Self::MAX_HOURS {
            return Err(TimeError::new("hour out of range"));
        }
        if minutes > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }
        if seconds > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }
        Ok(Self(hours * 3600 + minutes * 60 + seconds))
    }

    /// Parse "H:MM:SS" or "HH:MM:SS".
    ///
    /// ```
    /// use arrivals_server::domain::FeedTime;
    ///
    /// assert!(FeedTime::parse("08:30:00").is_ok());
    /// assert!(FeedTime::parse("8:30:00").is_ok());
    /// assert!(FeedTime::parse("08:30").is_err());
    /// assert!(FeedTime::parse("08:61:00").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.trim().split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimeError::new("expected HH:MM:SS format"));
        };

        if h.is_empty() || h.len() > 2 || m.len() != 2 || sec.len() != 2 {
            return Err(TimeError::new("expected HH:MM:SS format"));
        }

        let hours = parse_digits(h).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        let minutes = parse_digits(m).ok_or_else(|| TimeError::new("invalid minute digits"))?;
        let seconds = parse_digits(sec).ok_or_else(|| TimeError::new("invalid second digits"))?;

        Self::from_hms(hours, minutes, seconds)
    }

    /// Whole minutes since the start of the service day. Seconds are dropped.
    pub fn minutes_since_midnight(&self) -> u32 {
        self.0 / 60
    }

    /// Whether this time falls on the calendar day after the service day.
    pub fn is_after_midnight(&self) -> bool {
        i64::from(self.minutes_since_midnight()) >= MINUTES_PER_DAY
    }

    /// Seconds since the start of the service day.
    pub fn as_secs(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for FeedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedTime({self})")
    }
}

impl fmt::Display for FeedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            (self.0 / 60) % 60,
            self.0 % 60
        )
    }
}

/// Minutes since midnight for a wall-clock time.
pub fn minutes_of_day(time: NaiveTime) -> i64 {
    i64::from(time.hour() * 60 + time.minute())
}

/// Format minutes since midnight as a 12-hour clock, e.g. "1:10 AM".
///
/// Values outside a single day wrap around.
///
/// ```
/// use arrivals_server::domain::format_clock;
///
/// assert_eq!(format_clock(70), "1:10 AM");
/// assert_eq!(format_clock(12 * 60 + 5), "12:05 PM");
/// assert_eq!(format_clock(0), "12:00 AM");
/// ```
pub fn format_clock(minutes: i64) -> String {
    let minutes = minutes.rem_euclid(MINUTES_PER_DAY);
    let hour = minutes / 60;
    let minute = minutes % 60;
    let suffix = if hour < 12 { "AM" } else { "PM" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{hour12}:{minute:02} {suffix}")
}

/// Parse a feed date in "YYYYMMDD" form.
///
/// ```
/// use arrivals_server::domain::parse_feed_date;
/// use chrono::NaiveDate;
///
/// assert_eq!(
///     parse_feed_date("20260201").unwrap(),
///     NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
/// );
/// assert!(parse_feed_date("2026-02-01").is_err());
/// ```
pub fn parse_feed_date(s: &str) -> Result<NaiveDate, TimeError> {
    let s = s.trim();
    if s.len() != 8 || !s.is_ascii() {
        return Err(TimeError::new("expected YYYYMMDD format"));
    }
    let year = parse_digits(&s[0..4]).ok_or_else(|| TimeError::new("invalid year digits"))?;
    let month = parse_digits(&s[4..6]).ok_or_else(|| TimeError::new("invalid month digits"))?;
    let day = parse_digits(&s[6..8]).ok_or_else(|| TimeError::new("invalid day digits"))?;

    NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(|| TimeError::new("no such date"))
}

/// Parse a run of ASCII digits into a u32.
fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_times() {
        let t = FeedTime::parse("00:00:00").unwrap();
        assert_eq!(t.as_secs(), 0);

        let t = FeedTime::parse("23:59:59").unwrap();
        assert_eq!(t.minutes_since_midnight(), 23 * 60 + 59);
        assert!(!t.is_after_midnight());

        let t = FeedTime::parse(" 7:05:30 ").unwrap();
        assert_eq!(t.minutes_since_midnight(), 7 * 60 + 5);
    }

    #[test]
    fn parse_post_midnight_times() {
        let t = FeedTime::parse("24:00:00").unwrap();
        assert!(t.is_after_midnight());
        assert_eq!(t.minutes_since_midnight(), 1440);

        let t = FeedTime::parse("25:10:00").unwrap();
        assert_eq!(t.minutes_since_midnight(), 1510);
    }

    #[test]
    fn reject_invalid_times() {
        assert!(FeedTime::parse("").is_err());
        assert!(FeedTime::parse("12:00").is_err());
        assert!(FeedTime::parse("12:00:00:00").is_err());
        assert!(FeedTime::parse("ab:00:00").is_err());
        assert!(FeedTime::parse("12:60:00").is_err());
        assert!(FeedTime::parse("12:00:60").is_err());
        assert!(FeedTime::parse("48:00:00").is_err());
        assert!(FeedTime::parse("-1:00:00").is_err());
    }

    #[test]
    fn display_pads_components() {
        let t = FeedTime::from_hms(5, 3, 9).unwrap();
        assert_eq!(t.to_string(), "05:03:09");
        assert_eq!(format!("{t:?}"), "FeedTime(05:03:09)");
    }

    #[test]
    fn ordering_follows_seconds() {
        let a = FeedTime::parse("23:59:00").unwrap();
        let b = FeedTime::parse("24:01:00").unwrap();
        assert!(a < b);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "12:00 AM");
        assert_eq!(format_clock(9 * 60 + 7), "9:07 AM");
        assert_eq!(format_clock(13 * 60 + 45), "1:45 PM");
        assert_eq!(format_clock(23 * 60 + 59), "11:59 PM");
        // Wraps past midnight
        assert_eq!(format_clock(25 * 60 + 10), "1:10 AM");
    }

    #[test]
    fn minutes_of_day_ignores_seconds() {
        let t = NaiveTime::from_hms_opt(10, 15, 59).unwrap();
        assert_eq!(minutes_of_day(t), 615);
    }

    #[test]
    fn parse_dates() {
        assert_eq!(
            parse_feed_date("20240229").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_feed_date("20230229").is_err());
        assert!(parse_feed_date("2024022").is_err());
        assert!(parse_feed_date("2024x229").is_err());
    }
}
