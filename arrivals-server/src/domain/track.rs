//! Track groups.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A coarse directional grouping of arrivals at a station.
///
/// Live predictions report the group directly ("1" or "2"); scheduled
/// arrivals derive it from the trip's direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrackGroup {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
}

impl TrackGroup {
    /// Parse the live feed's group field.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "1" => Some(TrackGroup::One),
            "2" => Some(TrackGroup::Two),
            _ => None,
        }
    }

    /// Track group for a schedule trip direction.
    ///
    /// Direction 0 runs on track 1; everything else, including a missing
    /// direction, runs on track 2.
    pub fn from_direction(direction_id: Option<u8>) -> Self {
        match direction_id {
            Some(0) => TrackGroup::One,
            _ => TrackGroup::Two,
        }
    }

    /// Returns the group as the feed writes it.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackGroup::One => "1",
            TrackGroup::Two => "2",
        }
    }
}

impl fmt::Debug for TrackGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackGroup({})", self.as_str())
    }
}

impl fmt::Display for TrackGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
