//! Merging live predictions with scheduled arrivals.
//!
//! Live predictions are authoritative for the next ~25 minutes. Scheduled
//! arrivals fill in the rest of the window, minus any that describe a train
//! already present in the live list.

use std::collections::HashSet;

use crate::domain::{Arrival, LineCode, LiveArrival, ScheduledArrival, TrackGroup, destination_key};

/// How far ahead live predictions are trusted over the schedule.
pub const LIVE_HORIZON_MINS: i64 = 25;

/// Minutes either side of a live prediction that count as the same train.
pub const MATCH_TOLERANCE_MINS: i64 = 5;

/// Maximum destinations named in a track label before it is abbreviated.
const TRACK_LABEL_DESTINATIONS: usize = 2;

type MatchKey = (LineCode, String, i64);

/// Combine live and scheduled arrivals into one time-ordered list.
///
/// When any live prediction exists, scheduled entries inside the live
/// horizon are dropped. A scheduled entry is also dropped when a live
/// prediction on the same line to the same destination is within
/// [`MATCH_TOLERANCE_MINS`] of it. Ties keep live entries first.
pub fn merge_arrivals(live: Vec<LiveArrival>, scheduled: Vec<ScheduledArrival>) -> Vec<Arrival> {
    let mut live_keys: HashSet<MatchKey> = HashSet::new();
    for train in &live {
        let key = destination_key(&train.destination);
        let minutes = train.minutes_away();
        for offset in -MATCH_TOLERANCE_MINS..=MATCH_TOLERANCE_MINS {
            live_keys.insert((train.line, key.clone(), minutes.saturating_add(offset)));
        }
    }

    let have_live = !live.is_empty();
    let surviving = scheduled.into_iter().filter(|train| {
        if have_live && train.minutes_away < LIVE_HORIZON_MINS {
            return false;
        }
        let key = (
            train.line,
            destination_key(&train.destination),
            train.minutes_away,
        );
        !live_keys.contains(&key)
    });

    let mut merged: Vec<Arrival> = live
        .into_iter()
        .map(Arrival::Live)
        .chain(surviving.map(Arrival::Scheduled))
        .collect();
    merged.sort_by_key(Arrival::minutes_away);
    merged
}

/// Narrows a merged list to some lines and one track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrivalFilter {
    /// Lines to keep; empty keeps every line.
    pub lines: Vec<LineCode>,
    pub track: Option<TrackGroup>,
}

impl ArrivalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lines(mut self, lines: impl IntoIterator<Item = LineCode>) -> Self {
        self.lines = lines.into_iter().collect();
        self
    }

    pub fn with_track(mut self, track: TrackGroup) -> Self {
        self.track = Some(track);
        self
    }

    pub fn matches(&self, arrival: &Arrival) -> bool {
        (self.lines.is_empty() || self.lines.contains(&arrival.line()))
            && self.track.is_none_or(|track| arrival.group() == track)
    }

    pub fn apply(&self, arrivals: Vec<Arrival>) -> Vec<Arrival> {
        arrivals.into_iter().filter(|a| self.matches(a)).collect()
    }
}

/// Arrivals on one track, labelled by where they're heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackArrivals {
    pub group: TrackGroup,
    /// Up to two distinct destinations joined by " / ", with "..." when
    /// there are more; "Unknown" when there are none.
    pub label: String,
    pub arrivals: Vec<Arrival>,
}

/// Split a merged list by track, keeping order within each track.
pub fn split_by_track(arrivals: &[Arrival]) -> Vec<TrackArrivals> {
    [TrackGroup::One, TrackGroup::Two]
        .into_iter()
        .map(|group| {
            let arrivals: Vec<Arrival> = arrivals
                .iter()
                .filter(|a| a.group() == group)
                .cloned()
                .collect();
            TrackArrivals {
                group,
                label: track_label(&arrivals),
                arrivals,
            }
        })
        .collect()
}

fn track_label(arrivals: &[Arrival]) -> String {
    let mut destinations: Vec<&str> = Vec::new();
    for dest in arrivals.iter().map(Arrival::destination) {
        if !dest.is_empty() && !destinations.contains(&dest) {
            destinations.push(dest);
        }
    }

    match destinations.len() {
        0 => "Unknown".to_string(),
        n if n <= TRACK_LABEL_DESTINATIONS => destinations.join(" / "),
        _ => format!(
            "{}...",
            destinations[..TRACK_LABEL_DESTINATIONS].join(" / ")
        ),
    }
}
