//! Station- and time-keyed lookup tables built from a parsed feed.
//!
//! A [`LookupTables`] bundle is immutable once built. Rebuilding produces a
//! new bundle that replaces the old one wholesale, so readers holding an
//! `Arc<LookupTables>` never see a partial state.

mod build;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::ServiceCalendar;
use crate::domain::{FeedTime, LineCode};

pub use build::build;

/// What a query needs to know about a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripInfo {
    pub route_id: String,
    pub service_id: String,
    pub direction_id: Option<u8>,
    /// Raw headsign, empty when the feed gives none.
    pub headsign: String,
}

/// A weekly service pattern with its validity range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyService {
    /// Active flags indexed by days from Monday.
    pub days: [bool; 7],
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Dates on which a service is explicitly added or removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceExceptions {
    pub added: BTreeSet<NaiveDate>,
    pub removed: BTreeSet<NaiveDate>,
}

/// A stop-time as stored in a station's bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationStopTime {
    pub trip_id: String,
    pub stop_id: String,
    /// Arrival time, falling back to departure when the feed omits it.
    pub arrival: FeedTime,
    pub departure: Option<FeedTime>,
    pub sequence: u32,
}

/// The complete set of lookup structures for one feed.
///
/// All maps are ordered so that identical input serializes to identical
/// bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupTables {
    pub stop_to_station: BTreeMap<String, String>,
    pub station_stops: BTreeMap<String, Vec<String>>,
    pub route_to_line: BTreeMap<String, LineCode>,
    pub trips: BTreeMap<String, TripInfo>,
    pub service_calendar: BTreeMap<String, WeeklyService>,
    pub calendar_exceptions: BTreeMap<String, ServiceExceptions>,
    /// Each station's stop-times, ordered by (arrival, trip, sequence).
    pub stop_times_by_station: BTreeMap<String, Vec<StationStopTime>>,
}

impl LookupTables {
    /// Calendar resolver over this bundle's calendar tables.
    pub fn calendar(&self) -> ServiceCalendar<'_> {
        ServiceCalendar::new(&self.service_calendar, &self.calendar_exceptions)
    }

    /// The line a route belongs to, or the unknown sentinel.
    pub fn line_for_route(&self, route_id: &str) -> LineCode {
        self.route_to_line
            .get(route_id)
            .copied()
            .unwrap_or(LineCode::Unknown)
    }

    /// Stop-times bucketed under a station key.
    pub fn stop_times_at(&self, station: &str) -> &[StationStopTime] {
        self.stop_times_by_station
            .get(station)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Stops registered under a station key.
    pub fn stops_of(&self, station: &str) -> &[String] {
        self.station_stops
            .get(station)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Total stop-times across all stations.
    pub fn stop_time_count(&self) -> usize {
        self.stop_times_by_station.values().map(|v| v.len()).sum()
    }

    pub fn station_count(&self) -> usize {
        self.station_stops.len()
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }
}
