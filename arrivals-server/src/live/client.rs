//! Live prediction HTTP client.

use std::future::Future;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::domain::{LiveArrival, StationId};

use super::error::LiveError;
use super::types::PredictionResponse;

/// Default base URL for the agency's rail prediction API.
const DEFAULT_BASE_URL: &str = "https://api.wmata.com";

/// Anything that can supply live predictions for a station.
pub trait LiveSource: Send + Sync + 'static {
    fn predictions(
        &self,
        station: &StationId,
    ) -> impl Future<Output = Result<Vec<LiveArrival>, LiveError>> + Send;
}

impl<T: LiveSource> LiveSource for Arc<T> {
    fn predictions(
        &self,
        station: &StationId,
    ) -> impl Future<Output = Result<Vec<LiveArrival>, LiveError>> + Send {
        (**self).predictions(station)
    }
}

/// Configuration for the prediction client.
#[derive(Debug, Clone)]
pub struct PredictionClientConfig {
    /// API key sent in the `api_key` header
    pub api_key: String,
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl PredictionClientConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Client for the station prediction endpoint.
///
/// Makes one request per call; retries are the caller's business.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    base_url: String,
    configured: bool,
}

impl PredictionClient {
    /// Create a new prediction client.
    pub fn new(config: PredictionClientConfig) -> Result<Self, LiveError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&config.api_key).map_err(|_| LiveError::Api {
            status: 0,
            message: "Invalid API key format".to_string(),
        })?;
        headers.insert(HeaderName::from_static("api_key"), api_key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            configured: !config.api_key.trim().is_empty(),
        })
    }

    fn url(&self, station: &StationId) -> String {
        format!(
            "{}/StationPrediction.svc/json/GetPrediction/{}",
            self.base_url,
            station.as_str()
        )
    }

    /// Fetch current predictions for every code of a station.
    pub async fn get_predictions(&self, station: &StationId) -> Result<Vec<LiveArrival>, LiveError> {
        if !self.configured {
            return Err(LiveError::NotConfigured(
                "WMATA_API_KEY is not set".to_string(),
            ));
        }

        let response = self.http.get(self.url(station)).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(LiveError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LiveError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        let parsed: PredictionResponse =
            serde_json::from_str(&body).map_err(|e| LiveError::Json {
                message: e.to_string(),
                body: Some(body.chars().take(500).collect()),
            })?;

        Ok(parsed.into_arrivals())
    }
}

impl LiveSource for PredictionClient {
    fn predictions(
        &self,
        station: &StationId,
    ) -> impl Future<Output = Result<Vec<LiveArrival>, LiveError>> + Send {
        self.get_predictions(station)
    }
}
