//! Builds [`LookupTables`] from a parsed feed.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::domain::LineCode;
use crate::feed::ParsedFeed;
use crate::feed::records::{ExceptionType, Route};

use super::{LookupTables, ServiceExceptions, StationStopTime, TripInfo, WeeklyService};

/// Build lookup tables, one pass per table.
///
/// Stops go first so stop-times can be bucketed by station. Trips and
/// routes don't depend on stops.
pub fn build(feed: &ParsedFeed) -> LookupTables {
    let mut tables = LookupTables::default();

    for stop in &feed.stops {
        let station = stop
            .parent_station
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&stop.stop_id);

        tables
            .stop_to_station
            .insert(stop.stop_id.clone(), station.to_string());

        let stops = tables.station_stops.entry(station.to_string()).or_default();
        if !stops.contains(&stop.stop_id) {
            stops.push(stop.stop_id.clone());
        }
    }

    for route in &feed.routes {
        tables
            .route_to_line
            .insert(route.route_id.clone(), line_for(route));
    }

    for trip in &feed.trips {
        tables.trips.insert(
            trip.trip_id.clone(),
            TripInfo {
                route_id: trip.route_id.clone(),
                service_id: trip.service_id.clone(),
                direction_id: trip.direction_id,
                headsign: trip.trip_headsign.clone().unwrap_or_default(),
            },
        );
    }

    for entry in &feed.calendar {
        tables.service_calendar.insert(
            entry.service_id.clone(),
            WeeklyService {
                days: entry.weekdays(),
                start: entry.start_date,
                end: entry.end_date,
            },
        );
    }

    for exception in &feed.calendar_dates {
        let dates = tables
            .calendar_exceptions
            .entry(exception.service_id.clone())
            .or_insert_with(ServiceExceptions::default);
        match exception.exception_type {
            ExceptionType::Added => dates.added.insert(exception.date),
            ExceptionType::Removed => dates.removed.insert(exception.date),
        };
    }

    let mut untimed = 0usize;
    let mut by_station: BTreeMap<String, Vec<StationStopTime>> = BTreeMap::new();
    for st in &feed.stop_times {
        let Some(arrival) = st.arrival_time.or(st.departure_time) else {
            untimed += 1;
            continue;
        };

        // Stops missing from stops.txt are their own station.
        let station = tables
            .stop_to_station
            .get(&st.stop_id)
            .unwrap_or(&st.stop_id);

        by_station
            .entry(station.clone())
            .or_default()
            .push(StationStopTime {
                trip_id: st.trip_id.clone(),
                stop_id: st.stop_id.clone(),
                arrival,
                departure: st.departure_time,
                sequence: st.stop_sequence,
            });
    }

    for bucket in by_station.values_mut() {
        bucket.sort_by(|a, b| {
            a.arrival
                .cmp(&b.arrival)
                .then_with(|| a.trip_id.cmp(&b.trip_id))
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
    }
    tables.stop_times_by_station = by_station;

    if untimed > 0 {
        debug!(untimed, "Skipped stop-times with no arrival or departure");
    }

    let unknown_routes = tables
        .route_to_line
        .values()
        .filter(|line| **line == LineCode::Unknown)
        .count();

    info!(
        stations = tables.station_count(),
        trips = tables.trip_count(),
        stop_times = tables.stop_time_count(),
        services = tables.service_calendar.len(),
        exceptions = tables.calendar_exceptions.len(),
        unknown_routes,
        "Built lookup tables"
    );

    tables
}

/// Route identifier first, then its short or long display name.
fn line_for(route: &Route) -> LineCode {
    LineCode::from_route_name(&route.route_id)
        .or_else(|| {
            route
                .route_short_name
                .as_deref()
                .and_then(LineCode::from_route_name)
        })
        .or_else(|| {
            route
                .route_long_name
                .as_deref()
                .and_then(LineCode::from_route_name)
        })
        .unwrap_or(LineCode::Unknown)
}
