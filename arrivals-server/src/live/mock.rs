//! Mock live source for running without API access.
//!
//! Serves prediction responses loaded from JSON files as if they came from
//! the live endpoint.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::RwLock;

use crate::domain::{LiveArrival, StationId};

use super::client::LiveSource;
use super::error::LiveError;
use super::types::PredictionResponse;

/// Live source that serves canned predictions.
///
/// Stations without data get an empty list, as a quiet station would.
#[derive(Debug, Default)]
pub struct MockPredictions {
    /// Predictions keyed by comma-joined station codes.
    stations: RwLock<HashMap<String, Vec<LiveArrival>>>,
    requests: AtomicUsize,
    failing: AtomicBool,
}

impl MockPredictions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `{codes}.json` files from a directory, e.g. `C05.json` or
    /// `A01,C01.json`.
    pub fn from_dir(data_dir: impl AsRef<Path>) -> Result<Self, LiveError> {
        let data_dir = data_dir.as_ref();
        let mut stations = HashMap::new();

        let entries = std::fs::read_dir(data_dir).map_err(|e| LiveError::Api {
            status: 0,
            message: format!("Failed to read mock data directory: {}", e),
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| LiveError::Api {
                status: 0,
                message: format!("Failed to read directory entry: {}", e),
            })?;

            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let Some(station) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(StationId::parse)
            else {
                continue;
            };

            let json = std::fs::read_to_string(&path).map_err(|e| LiveError::Api {
                status: 0,
                message: format!("Failed to read {:?}: {}", path, e),
            })?;

            stations.insert(station.as_str().to_string(), parse(&json)?);
        }

        Ok(Self {
            stations: RwLock::new(stations),
            ..Self::default()
        })
    }

    /// A mock holding one station's response.
    pub fn from_json(station: &str, json: &str) -> Result<Self, LiveError> {
        let mut mock = Self::new();
        let key = StationId::parse(station)
            .map(|s| s.as_str().to_string())
            .unwrap_or_default();
        mock.stations.get_mut().insert(key, parse(json)?);
        Ok(mock)
    }

    /// Replace a station's predictions.
    pub async fn set(&self, station: &StationId, arrivals: Vec<LiveArrival>) {
        self.stations
            .write()
            .await
            .insert(station.as_str().to_string(), arrivals);
    }

    /// Make every request fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of prediction requests served, including failed ones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub async fn available_stations(&self) -> Vec<String> {
        let mut stations: Vec<String> = self.stations.read().await.keys().cloned().collect();
        stations.sort();
        stations
    }
}

impl LiveSource for MockPredictions {
    async fn predictions(&self, station: &StationId) -> Result<Vec<LiveArrival>, LiveError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(LiveError::Api {
                status: 503,
                message: "mock failure".to_string(),
            });
        }

        let stations = self.stations.read().await;
        Ok(stations.get(station.as_str()).cloned().unwrap_or_default())
    }
}

fn parse(json: &str) -> Result<Vec<LiveArrival>, LiveError> {
    let response: PredictionResponse = serde_json::from_str(json).map_err(|e| LiveError::Json {
        message: e.to_string(),
        body: None,
    })?;
    Ok(response.into_arrivals())
}
