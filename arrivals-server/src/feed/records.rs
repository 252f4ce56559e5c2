//! Typed rows of the schedule feed tables.
//!
//! Rows deserialize by column name. Typed fields (times, dates, flags) are
//! converted during deserialization, so a row that fails conversion is
//! reported as a row error and skipped by the decoder.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Deserializer};

use crate::domain::{FeedTime, parse_feed_date};

/// A row of `stops.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Stop {
    pub stop_id: String,
    #[serde(default)]
    pub parent_station: Option<String>,
}

/// A row of `stop_times.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StopTime {
    pub trip_id: String,
    pub stop_id: String,
    #[serde(default, deserialize_with = "de_feed_time")]
    pub arrival_time: Option<FeedTime>,
    #[serde(default, deserialize_with = "de_feed_time")]
    pub departure_time: Option<FeedTime>,
    pub stop_sequence: u32,
}

/// A row of `trips.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Trip {
    pub trip_id: String,
    pub route_id: String,
    pub service_id: String,
    #[serde(default)]
    pub direction_id: Option<u8>,
    #[serde(default)]
    pub trip_headsign: Option<String>,
}

/// A row of `routes.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Route {
    pub route_id: String,
    #[serde(default)]
    pub route_short_name: Option<String>,
    #[serde(default)]
    pub route_long_name: Option<String>,
}

/// A row of `calendar.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CalendarEntry {
    pub service_id: String,
    #[serde(deserialize_with = "de_flag")]
    pub monday: bool,
    #[serde(deserialize_with = "de_flag")]
    pub tuesday: bool,
    #[serde(deserialize_with = "de_flag")]
    pub wednesday: bool,
    #[serde(deserialize_with = "de_flag")]
    pub thursday: bool,
    #[serde(deserialize_with = "de_flag")]
    pub friday: bool,
    #[serde(deserialize_with = "de_flag")]
    pub saturday: bool,
    #[serde(deserialize_with = "de_flag")]
    pub sunday: bool,
    #[serde(deserialize_with = "de_date")]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "de_date")]
    pub end_date: NaiveDate,
}

impl CalendarEntry {
    /// Active flags indexed by days from Monday.
    pub fn weekdays(&self) -> [bool; 7] {
        [
            self.monday,
            self.tuesday,
            self.wednesday,
            self.thursday,
            self.friday,
            self.saturday,
            self.sunday,
        ]
    }

    /// Whether the entry's weekly pattern includes a weekday.
    pub fn runs_on_weekday(&self, weekday: Weekday) -> bool {
        self.weekdays()[weekday.num_days_from_monday() as usize]
    }
}

/// Whether a calendar exception adds or removes service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    Added,
    Removed,
}

/// A row of `calendar_dates.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CalendarException {
    pub service_id: String,
    #[serde(deserialize_with = "de_date")]
    pub date: NaiveDate,
    #[serde(deserialize_with = "de_exception_type")]
    pub exception_type: ExceptionType,
}

fn de_feed_time<'de, D>(deserializer: D) -> Result<Option<FeedTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => FeedTime::parse(s).map(Some).map_err(serde::de::Error::custom),
    }
}

fn de_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_feed_date(&raw).map_err(serde::de::Error::custom)
}

fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "1" => Ok(true),
        "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid day flag {other:?}"
        ))),
    }
}

fn de_exception_type<'de, D>(deserializer: D) -> Result<ExceptionType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "1" => Ok(ExceptionType::Added),
        "2" => Ok(ExceptionType::Removed),
        other => Err(serde::de::Error::custom(format!(
            "invalid exception_type {other:?}"
        ))),
    }
}
