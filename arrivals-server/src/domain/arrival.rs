//! Arrival records from the schedule and the live feed.

use serde::{Deserialize, Serialize};

use super::{LineCode, TrackGroup};

/// Sort position for live entries whose status isn't a time ("---", "").
pub const UNKNOWN_MINUTES: i64 = 999;

/// Status shown for a train arriving now.
pub const STATUS_ARRIVING: &str = "ARR";

/// Status shown for a train boarding now.
pub const STATUS_BOARDING: &str = "BRD";

/// An arrival computed from the static schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledArrival {
    pub line: LineCode,

    /// Normalized destination, comparable with live destinations.
    pub destination: String,

    /// Whole minutes from now; negative for trains that just left.
    pub minutes_away: i64,

    /// Display status: "ARR" at or past zero, otherwise the minute count.
    pub min: String,

    /// Local clock time of the scheduled arrival, e.g. "1:10 AM".
    pub scheduled_time: String,

    pub group: TrackGroup,

    /// Schedule trip this arrival came from.
    pub trip_id: String,
}

impl ScheduledArrival {
    /// Display status for a minute count.
    pub fn status_for(minutes_away: i64) -> String {
        if minutes_away <= 0 {
            STATUS_ARRIVING.to_string()
        } else {
            minutes_away.to_string()
        }
    }
}

/// A prediction from the live feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveArrival {
    pub line: LineCode,
    pub destination: String,

    /// Literal status from the feed: "ARR", "BRD", a minute count, or a
    /// placeholder such as "---".
    pub min: String,

    /// Train length in cars, when reported.
    pub car_count: Option<String>,

    pub group: TrackGroup,
}

impl LiveArrival {
    /// Create a prediction without a car count.
    pub fn new(
        line: LineCode,
        destination: impl Into<String>,
        min: impl Into<String>,
        group: TrackGroup,
    ) -> Self {
        Self {
            line,
            destination: destination.into(),
            min: min.into(),
            car_count: None,
            group,
        }
    }

    /// Set the car count.
    pub fn with_cars(mut self, cars: impl Into<String>) -> Self {
        self.car_count = Some(cars.into());
        self
    }

    /// Minutes until arrival, for ordering and matching.
    ///
    /// "ARR" and "BRD" count as zero. Unparseable or out-of-range statuses
    /// sort last.
    pub fn minutes_away(&self) -> i64 {
        match self.min.trim() {
            STATUS_ARRIVING | STATUS_BOARDING => 0,
            other => other
                .parse()
                .ok()
                .filter(|m| (0..UNKNOWN_MINUTES).contains(m))
                .unwrap_or(UNKNOWN_MINUTES),
        }
    }
}

/// One entry of a merged arrival list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Arrival {
    Live(LiveArrival),
    Scheduled(ScheduledArrival),
}

impl Arrival {
    pub fn line(&self) -> LineCode {
        match self {
            Arrival::Live(a) => a.line,
            Arrival::Scheduled(a) => a.line,
        }
    }

    pub fn destination(&self) -> &str {
        match self {
            Arrival::Live(a) => &a.destination,
            Arrival::Scheduled(a) => &a.destination,
        }
    }

    pub fn minutes_away(&self) -> i64 {
        match self {
            Arrival::Live(a) => a.minutes_away(),
            Arrival::Scheduled(a) => a.minutes_away,
        }
    }

    pub fn group(&self) -> TrackGroup {
        match self {
            Arrival::Live(a) => a.group,
            Arrival::Scheduled(a) => a.group,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Arrival::Live(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(min: &str) -> LiveArrival {
        LiveArrival::new(LineCode::Red, "Shady Grove", min, TrackGroup::One)
    }

    #[test]
    fn live_status_minutes() {
        assert_eq!(live("ARR").minutes_away(), 0);
        assert_eq!(live("BRD").minutes_away(), 0);
        assert_eq!(live("7").minutes_away(), 7);
        assert_eq!(live(" 12 ").minutes_away(), 12);
        assert_eq!(live("---").minutes_away(), UNKNOWN_MINUTES);
        assert_eq!(live("").minutes_away(), UNKNOWN_MINUTES);
        assert_eq!(live("-4").minutes_away(), UNKNOWN_MINUTES);
        assert_eq!(live("9223372036854775807").minutes_away(), UNKNOWN_MINUTES);
    }

    #[test]
    fn scheduled_status() {
        assert_eq!(ScheduledArrival::status_for(-3), "ARR");
        assert_eq!(ScheduledArrival::status_for(0), "ARR");
        assert_eq!(ScheduledArrival::status_for(14), "14");
    }

    #[test]
    fn merged_entries_are_tagged() {
        let arrival = Arrival::Live(live("3").with_cars("8"));
        let json = serde_json::to_value(&arrival).unwrap();
        assert_eq!(json["type"], "live");
        assert_eq!(json["line"], "RD");
        assert_eq!(json["carCount"], "8");
        assert_eq!(json["group"], "1");

        let arrival = Arrival::Scheduled(ScheduledArrival {
            line: LineCode::Blue,
            destination: "Largo".to_string(),
            minutes_away: 31,
            min: "31".to_string(),
            scheduled_time: "10:31 AM".to_string(),
            group: TrackGroup::Two,
            trip_id: "T1".to_string(),
        });
        let json = serde_json::to_value(&arrival).unwrap();
        assert_eq!(json["type"], "scheduled");
        assert_eq!(json["minutesAway"], 31);
        assert_eq!(json["scheduledTime"], "10:31 AM");
    }
}
