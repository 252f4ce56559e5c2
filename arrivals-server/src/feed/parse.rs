//! Archive decompression and table parsing.

use std::io::{Cursor, Read, Seek};

use serde::de::DeserializeOwned;
use tracing::info;
use zip::ZipArchive;
use zip::result::ZipError;

use super::decode::{RowDecoder, TableReport};
use super::error::FeedError;
use super::records::{CalendarEntry, CalendarException, Route, Stop, StopTime, Trip};

pub const STOPS: &str = "stops.txt";
pub const STOP_TIMES: &str = "stop_times.txt";
pub const TRIPS: &str = "trips.txt";
pub const ROUTES: &str = "routes.txt";
pub const CALENDAR: &str = "calendar.txt";
pub const CALENDAR_DATES: &str = "calendar_dates.txt";

/// Default ceiling on the archive's total decompressed size (1 GiB).
pub const DEFAULT_MAX_DECOMPRESSED_BYTES: u64 = 1024 * 1024 * 1024;

/// Every table of a parsed feed.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub stops: Vec<Stop>,
    pub stop_times: Vec<StopTime>,
    pub trips: Vec<Trip>,
    pub routes: Vec<Route>,
    pub calendar: Vec<CalendarEntry>,
    pub calendar_dates: Vec<CalendarException>,
    /// Decode counts for each table that was present.
    pub reports: Vec<TableReport>,
}

impl ParsedFeed {
    /// Total rows skipped across all tables.
    pub fn skipped_rows(&self) -> usize {
        self.reports.iter().map(|r| r.skipped).sum()
    }
}

/// Parse a zipped schedule feed held in memory.
///
/// Stops, stop times and trips are mandatory. Routes, the weekly calendar
/// and calendar exceptions may be absent.
pub fn parse_archive(bytes: &[u8], max_decompressed_bytes: u64) -> Result<ParsedFeed, FeedError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    check_decompressed_size(&mut archive, max_decompressed_bytes)?;

    let mut reports = Vec::new();

    let stops = required_table::<Stop, _>(&mut archive, STOPS, &["stop_id"], &mut reports)?;
    let stop_times = required_table::<StopTime, _>(
        &mut archive,
        STOP_TIMES,
        &["trip_id", "stop_id", "stop_sequence"],
        &mut reports,
    )?;
    let trips = required_table::<Trip, _>(
        &mut archive,
        TRIPS,
        &["trip_id", "route_id", "service_id"],
        &mut reports,
    )?;

    let routes = optional_table::<Route, _>(&mut archive, ROUTES, &["route_id"], &mut reports)?;
    let calendar = optional_table::<CalendarEntry, _>(
        &mut archive,
        CALENDAR,
        &["service_id", "start_date", "end_date"],
        &mut reports,
    )?;
    let calendar_dates = optional_table::<CalendarException, _>(
        &mut archive,
        CALENDAR_DATES,
        &["service_id", "date", "exception_type"],
        &mut reports,
    )?;

    info!(
        stops = stops.len(),
        stop_times = stop_times.len(),
        trips = trips.len(),
        routes = routes.len(),
        calendar = calendar.len(),
        calendar_dates = calendar_dates.len(),
        "Parsed schedule feed"
    );

    Ok(ParsedFeed {
        stops,
        stop_times,
        trips,
        routes,
        calendar,
        calendar_dates,
        reports,
    })
}

/// Reject archives that would decompress past the limit.
fn check_decompressed_size<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    limit: u64,
) -> Result<(), FeedError> {
    let mut total: u64 = 0;
    for i in 0..archive.len() {
        total = total.saturating_add(archive.by_index(i)?.size());
    }

    if total > limit {
        return Err(FeedError::Malformed {
            file: "archive",
            message: format!("decompressed size {total} bytes exceeds limit {limit} bytes"),
        });
    }
    Ok(())
}

fn required_table<T: DeserializeOwned, R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    file: &'static str,
    columns: &[&str],
    reports: &mut Vec<TableReport>,
) -> Result<Vec<T>, FeedError> {
    decode_table(archive, file, columns, reports)?.ok_or(FeedError::MissingFeedData { file })
}

fn optional_table<T: DeserializeOwned, R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    file: &'static str,
    columns: &[&str],
    reports: &mut Vec<TableReport>,
) -> Result<Vec<T>, FeedError> {
    match decode_table(archive, file, columns, reports)? {
        Some(rows) => Ok(rows),
        None => {
            info!(file, "Optional feed file absent");
            Ok(Vec::new())
        }
    }
}

/// Decode one table, or `None` when the archive doesn't contain it.
fn decode_table<T: DeserializeOwned, R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    file: &'static str,
    columns: &[&str],
    reports: &mut Vec<TableReport>,
) -> Result<Option<Vec<T>>, FeedError> {
    let entry = match archive.by_name(file) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut decoder = RowDecoder::new(file, entry)?;
    decoder.require_columns(columns)?;
    let (rows, report) = decoder.decode_all();
    reports.push(report);

    Ok(Some(rows))
}
