//! Scheduled arrivals for a station and a forward time window.

use std::collections::HashSet;

use chrono::NaiveDateTime;

use crate::domain::{
    FeedTime, MINUTES_PER_DAY, ScheduledArrival, StationId, TrackGroup, format_clock,
    minutes_of_day, normalize_headsign,
};
use crate::index::{LookupTables, StationStopTime};

/// Prefix the agency puts on station identifiers in the schedule feed.
const STATION_PREFIX: &str = "STN_";

/// Separator between codes in a compound station identifier.
const COMPOUND_SEPARATOR: &str = "_";

/// Tuning for scheduled-arrival queries.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Window used when the caller doesn't give one
    pub default_window_mins: u32,
    /// How long after its scheduled time a train is still listed
    pub passed_grace_mins: i64,
    /// Latest time of day (minutes since midnight) at which post-midnight
    /// stop-times are still shown
    pub post_midnight_cutoff_mins: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_window_mins: 90,
            passed_grace_mins: 5,
            post_midnight_cutoff_mins: 120,
        }
    }
}

impl QueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_window(mut self, mins: u32) -> Self {
        self.default_window_mins = mins;
        self
    }
}

/// Keys under which a station's stop-times may be filed, in lookup order.
///
/// The feed may file a station under its bare code, under the prefixed
/// code, or, for transfer complexes, under a compound id joining the codes
/// in either order. With three or more codes every ordered pair is tried
/// as well as the full forward and reverse joins.
pub fn station_keys(station: &StationId) -> Vec<String> {
    let codes = station.codes();
    let mut keys: Vec<String> = Vec::new();
    let mut push = |key: String| {
        if !keys.contains(&key) {
            keys.push(key);
        }
    };

    push(station.as_str().to_string());
    for code in codes {
        push(code.clone());
        push(format!("{STATION_PREFIX}{code}"));
    }

    if station.is_compound() {
        let forward = codes.join(COMPOUND_SEPARATOR);
        let reverse: Vec<&str> = codes.iter().rev().map(String::as_str).collect();
        push(format!("{STATION_PREFIX}{forward}"));
        push(format!(
            "{STATION_PREFIX}{}",
            reverse.join(COMPOUND_SEPARATOR)
        ));

        for a in codes {
            for b in codes {
                if a != b {
                    push(format!("{STATION_PREFIX}{a}{COMPOUND_SEPARATOR}{b}"));
                }
            }
        }
    }

    keys
}

/// Every stop-time filed under any of the station's keys.
///
/// Each key contributes its own bucket plus the buckets of the stops
/// registered under it. A bucket is visited at most once, but the same trip
/// may still appear several times.
pub fn resolve_station<'a>(
    tables: &'a LookupTables,
    station: &StationId,
) -> Vec<&'a StationStopTime> {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut found = Vec::new();

    let mut visit = |bucket: &'a str, found: &mut Vec<&'a StationStopTime>| {
        if visited.insert(bucket) {
            found.extend(tables.stop_times_at(bucket));
        }
    };

    for key in station_keys(station) {
        if let Some((bucket, _)) = tables.stop_times_by_station.get_key_value(key.as_str()) {
            visit(bucket, &mut found);
        }
        for stop in tables.stops_of(&key) {
            visit(stop, &mut found);
        }
    }

    found
}

/// Scheduled arrivals at `station` within `window_mins` of `now`.
///
/// A trip contributes at most one arrival. Trips whose service doesn't run
/// on `now`'s date are skipped. Stop-times past 24:00 are shown only in the
/// early hours, shifted back one day. Results are sorted by minutes away.
pub fn scheduled_arrivals(
    tables: &LookupTables,
    station: &StationId,
    window_mins: u32,
    now: NaiveDateTime,
    config: &QueryConfig,
) -> Vec<ScheduledArrival> {
    let today = now.date();
    let current = minutes_of_day(now.time());
    let window = i64::from(window_mins);
    let calendar = tables.calendar();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut arrivals = Vec::new();

    for st in resolve_station(tables, station) {
        if seen.contains(st.trip_id.as_str()) {
            continue;
        }

        let Some(trip) = tables.trips.get(&st.trip_id) else {
            continue;
        };

        if !calendar.runs_on(&trip.service_id, today) {
            continue;
        }

        let Some(arrival_mins) = normalized_minutes(st.arrival, current, config) else {
            continue;
        };

        let minutes_away = arrival_mins - current;
        if minutes_away < -config.passed_grace_mins || minutes_away > window {
            continue;
        }

        seen.insert(&st.trip_id);

        arrivals.push(ScheduledArrival {
            line: tables.line_for_route(&trip.route_id),
            destination: normalize_headsign(&trip.headsign),
            minutes_away,
            min: ScheduledArrival::status_for(minutes_away),
            scheduled_time: format_clock(arrival_mins),
            group: TrackGroup::from_direction(trip.direction_id),
            trip_id: st.trip_id.clone(),
        });
    }

    arrivals.sort_by_key(|a| a.minutes_away);
    arrivals
}

/// Arrival minutes on today's clock, or `None` for post-midnight stop-times
/// outside the early-hours cutoff.
fn normalized_minutes(arrival: FeedTime, current: i64, config: &QueryConfig) -> Option<i64> {
    let minutes = i64::from(arrival.minutes_since_midnight());
    if arrival.is_after_midnight() {
        if current > config.post_midnight_cutoff_mins {
            return None;
        }
        return Some(minutes - MINUTES_PER_DAY);
    }
    Some(minutes)
}
