//! Station list HTTP client.

use std::future::Future;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use super::error::StationError;

/// Default base URL for the agency's rail API.
const DEFAULT_BASE_URL: &str = "https://api.wmata.com";

/// Wrapper for the station list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StationsResponse {
    pub stations: Vec<StationDto>,
}

/// One station code as the API lists it.
///
/// Unused line slots come back as `null` or an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StationDto {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub line_code1: Option<String>,
    #[serde(default)]
    pub line_code2: Option<String>,
    #[serde(default)]
    pub line_code3: Option<String>,
    #[serde(default)]
    pub line_code4: Option<String>,
}

impl StationDto {
    /// Non-empty line codes in slot order.
    pub fn line_codes(&self) -> impl Iterator<Item = &str> {
        [
            &self.line_code1,
            &self.line_code2,
            &self.line_code3,
            &self.line_code4,
        ]
        .into_iter()
        .filter_map(|code| code.as_deref().map(str::trim))
        .filter(|code| !code.is_empty())
    }
}

/// Anything that can list the network's stations.
pub trait StationSource: Send + Sync + 'static {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<StationDto>, StationError>> + Send;
}

impl<T: StationSource> StationSource for Arc<T> {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<StationDto>, StationError>> + Send {
        (**self).fetch_all()
    }
}

/// Configuration for the station list client.
#[derive(Debug, Clone)]
pub struct StationClientConfig {
    /// API key sent in the `api_key` header
    pub api_key: String,
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl StationClientConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Client for the `jStations` endpoint.
#[derive(Debug, Clone)]
pub struct StationClient {
    http: reqwest::Client,
    base_url: String,
    configured: bool,
}

impl StationClient {
    /// Create a new station list client.
    pub fn new(config: StationClientConfig) -> Result<Self, StationError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&config.api_key).map_err(|_| StationError::Api {
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

    fn url(&self) -> String {
        format!("{}/Rail.svc/json/jStations", self.base_url)
    }

    /// Fetch every station code on the network.
    pub async fn get_stations(&self) -> Result<Vec<StationDto>, StationError> {
        if !self.configured {
            return Err(StationError::NotConfigured(
                "WMATA_API_KEY is not set".to_string(),
            ));
        }

        let response = self.http.get(self.url()).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(StationError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StationError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        let response: StationsResponse =
            serde_json::from_str(&body).map_err(|e| StationError::Json {
                message: e.to_string(),
            })?;

        Ok(response.stations)
    }
}

impl StationSource for StationClient {
    fn fetch_all(&self) -> impl Future<Output = Result<Vec<StationDto>, StationError>> + Send {
        self.get_stations()
    }
}
