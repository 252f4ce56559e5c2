//! Data transfer objects for web requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::MergedArrivals;
use crate::cache::CacheStatus;
use crate::domain::{Arrival, LineCode, ScheduledArrival, StationId, TrackGroup};
use crate::merge::{ArrivalFilter, split_by_track};
use crate::stations::StationGroup;

/// Request for a station's merged board.
#[derive(Debug, Default, Deserialize)]
pub struct ArrivalsRequest {
    /// Station code, or comma-joined codes for a transfer station
    pub station: Option<String>,

    /// Minutes ahead to include
    pub window: Option<u32>,

    /// Comma-separated line codes to keep, e.g. "BL,SV"
    pub lines: Option<String>,

    /// Track group to keep: "1" or "2"
    pub track: Option<String>,
}

impl ArrivalsRequest {
    /// Build the filter described by `lines` and `track`.
    pub fn filter(&self) -> Result<ArrivalFilter, String> {
        let mut filter = ArrivalFilter::new();

        if let Some(lines) = self.lines.as_deref().filter(|l| !l.trim().is_empty()) {
            let lines = lines
                .split(',')
                .map(|code| {
                    LineCode::parse(&code.trim().to_ascii_uppercase()).map_err(|e| e.to_string())
                })
                .collect::<Result<Vec<_>, _>>()?;
            filter = filter.with_lines(lines);
        }

        if let Some(track) = self.track.as_deref().filter(|t| !t.trim().is_empty()) {
            let group = TrackGroup::parse(track.trim())
                .ok_or_else(|| format!("Invalid track: {track}"))?;
            filter = filter.with_track(group);
        }

        Ok(filter)
    }
}

/// Request for scheduled arrivals only.
#[derive(Debug, Default, Deserialize)]
pub struct ScheduledRequest {
    pub station: Option<String>,
    pub window: Option<u32>,
}

/// One track's slice of the board.
#[derive(Debug, Serialize)]
pub struct TrackResult {
    pub group: TrackGroup,

    /// Where trains on this track are heading, e.g. "Largo / New Carrollton"
    pub label: String,

    pub arrivals: Vec<Arrival>,
}

/// Merged board response.
#[derive(Debug, Serialize)]
pub struct ArrivalsResponse {
    /// Normalized station id; empty when none was given
    pub station: String,
    pub window: u32,
    pub arrivals: Vec<Arrival>,
    pub tracks: Vec<TrackResult>,
    pub live_count: usize,
    pub scheduled_count: usize,
    pub live_error: Option<String>,
    pub schedule_error: Option<String>,

    /// When the schedule in use was built
    pub schedule_built_at: Option<DateTime<Utc>>,
}

impl ArrivalsResponse {
    /// Response for a request that named no station.
    pub fn empty(window: u32) -> Self {
        Self {
            station: String::new(),
            window,
            arrivals: Vec::new(),
            tracks: Vec::new(),
            live_count: 0,
            scheduled_count: 0,
            live_error: None,
            schedule_error: None,
            schedule_built_at: None,
        }
    }

    pub fn from_merged(
        station: &StationId,
        window: u32,
        merged: MergedArrivals,
        schedule_built_at: Option<DateTime<Utc>>,
    ) -> Self {
        let tracks = split_by_track(&merged.arrivals)
            .into_iter()
            .map(|track| TrackResult {
                group: track.group,
                label: track.label,
                arrivals: track.arrivals,
            })
            .collect();

        Self {
            station: station.as_str().to_string(),
            window,
            arrivals: merged.arrivals,
            tracks,
            live_count: merged.live_count,
            scheduled_count: merged.scheduled_count,
            live_error: merged.live_error,
            schedule_error: merged.schedule_error,
            schedule_built_at,
        }
    }
}

/// Scheduled-only response.
#[derive(Debug, Serialize)]
pub struct ScheduledResponse {
    pub station: String,
    pub window: u32,
    pub arrivals: Vec<ScheduledArrival>,
}

/// Schedule cache state.
#[derive(Debug, Serialize)]
pub struct CacheStatusResponse {
    pub built_at: Option<DateTime<Utc>>,
    pub fresh: bool,
    pub rebuilding: bool,
    pub stations: usize,
    pub trips: usize,
    pub stop_times: usize,
}

impl From<CacheStatus> for CacheStatusResponse {
    fn from(status: CacheStatus) -> Self {
        Self {
            built_at: status.built_at,
            fresh: status.fresh,
            rebuilding: status.rebuilding,
            stations: status.stations,
            trips: status.trips,
            stop_times: status.stop_times,
        }
    }
}

/// One selectable station.
#[derive(Debug, Serialize)]
pub struct StationSummary {
    pub name: String,

    /// Id to pass as the `station` parameter, e.g. "A01,C01"
    pub station: String,

    pub lines: Vec<LineCode>,
}

impl From<StationGroup> for StationSummary {
    fn from(group: StationGroup) -> Self {
        Self {
            name: group.name,
            station: group.station.as_str().to_string(),
            lines: group.lines,
        }
    }
}

/// Station list response.
#[derive(Debug, Serialize)]
pub struct StationListResponse {
    pub stations: Vec<StationSummary>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}
