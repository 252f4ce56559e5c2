//! Domain types for metro arrivals.
//!
//! These types validate their invariants at construction, so code that
//! receives them can trust their values.

mod arrival;
mod destination;
mod line;
mod station;
mod time;
mod track;

pub use arrival::{
    Arrival, LiveArrival, STATUS_ARRIVING, STATUS_BOARDING, ScheduledArrival, UNKNOWN_MINUTES,
};
pub use destination::{destination_key, normalize_headsign};
pub use line::{InvalidLineCode, LineCode};
pub use station::StationId;
pub use time::{FeedTime, MINUTES_PER_DAY, TimeError, format_clock, minutes_of_day, parse_feed_date};
pub use track::TrackGroup;
