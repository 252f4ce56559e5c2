//! Live prediction response DTOs.
//!
//! These map directly to the agency's prediction JSON. Every field is
//! optional because the feed sends nulls and empty strings freely for
//! trains that aren't in passenger service.

use serde::{Deserialize, Serialize};

use crate::domain::{LineCode, LiveArrival, TrackGroup};

/// Response from `GetPrediction`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PredictionResponse {
    #[serde(default)]
    pub trains: Vec<TrainPrediction>,
}

/// One predicted train at a station.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrainPrediction {
    /// Number of cars, or "-" when unknown.
    pub car: Option<String>,

    /// Abbreviated destination, e.g. "Franconia".
    pub destination: Option<String>,

    pub destination_code: Option<String>,

    /// Full destination name, e.g. "Franconia-Springfield".
    pub destination_name: Option<String>,

    /// Track group, "1" or "2".
    pub group: Option<String>,

    /// Two-letter line code; "--" or "No" for trains out of service.
    pub line: Option<String>,

    pub location_code: Option<String>,

    pub location_name: Option<String>,

    /// "ARR", "BRD", a minute count, or "---".
    pub min: Option<String>,
}

impl TrainPrediction {
    /// Convert to a domain arrival.
    ///
    /// Predictions without a recognisable track group are dropped; an
    /// unrecognised line becomes [`LineCode::Unknown`].
    pub fn to_arrival(&self) -> Option<LiveArrival> {
        let group = TrackGroup::parse(self.group.as_deref()?)?;
        let line = self
            .line
            .as_deref()
            .and_then(|l| LineCode::parse(l.trim()).ok())
            .unwrap_or(LineCode::Unknown);

        let destination = non_empty(self.destination.as_deref())
            .or_else(|| non_empty(self.destination_name.as_deref()))
            .unwrap_or("Unknown");

        let min = self.min.as_deref().unwrap_or_default().trim();
        let arrival = LiveArrival::new(line, destination, min, group);

        match non_empty(self.car.as_deref()).filter(|c| *c != "-") {
            Some(cars) => Some(arrival.with_cars(cars)),
            None => Some(arrival),
        }
    }
}

impl PredictionResponse {
    /// Domain arrivals for every usable prediction, in feed order.
    pub fn into_arrivals(self) -> Vec<LiveArrival> {
        self.trains
            .iter()
            .filter_map(TrainPrediction::to_arrival)
            .collect()
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Trains": [
            {"Car": "8", "Destination": "Frnconia", "DestinationCode": "J03",
             "DestinationName": "Franconia-Springfield", "Group": "2", "Line": "BL",
             "LocationCode": "C05", "LocationName": "Rosslyn", "Min": "4"},
            {"Car": "-", "Destination": "", "DestinationCode": null,
             "DestinationName": "Largo", "Group": "1", "Line": "SV",
             "LocationCode": "C05", "LocationName": "Rosslyn", "Min": "BRD"},
            {"Car": null, "Destination": "No Passenger", "DestinationCode": null,
             "DestinationName": "No Passenger", "Group": "1", "Line": "--",
             "LocationCode": "C05", "LocationName": "Rosslyn", "Min": "---"},
            {"Car": "6", "Destination": "Vienna", "DestinationCode": "K08",
             "DestinationName": "Vienna/Fairfax-GMU", "Group": null, "Line": "OR",
             "LocationCode": "C05", "LocationName": "Rosslyn", "Min": "12"}
        ]
    }"#;

    #[test]
    fn parses_agency_response() {
        let response: PredictionResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(response.trains.len(), 4);
        assert_eq!(response.trains[0].location_code.as_deref(), Some("C05"));
    }

    #[test]
    fn converts_to_arrivals() {
        let response: PredictionResponse = serde_json::from_str(SAMPLE).unwrap();
        let arrivals = response.into_arrivals();

        // the prediction with no group is dropped
        assert_eq!(arrivals.len(), 3);

        assert_eq!(arrivals[0].line, LineCode::Blue);
        assert_eq!(arrivals[0].destination, "Frnconia");
        assert_eq!(arrivals[0].car_count.as_deref(), Some("8"));
        assert_eq!(arrivals[0].group, TrackGroup::Two);
        assert_eq!(arrivals[0].minutes_away(), 4);

        assert_eq!(arrivals[1].destination, "Largo");
        assert_eq!(arrivals[1].car_count, None);
        assert_eq!(arrivals[1].minutes_away(), 0);

        assert_eq!(arrivals[2].line, LineCode::Unknown);
        assert_eq!(arrivals[2].min, "---");
    }

    #[test]
    fn missing_trains_field_is_empty() {
        let response: PredictionResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_arrivals().is_empty());
    }
}
