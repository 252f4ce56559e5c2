//! Schedule feed download client.

use std::future::Future;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info};

use super::error::FeedError;

/// Default location of the rail schedule archive.
const DEFAULT_FEED_URL: &str = "https://api.wmata.com/gtfs/rail-gtfs-static.zip";

/// Something that can produce the raw bytes of a schedule archive.
///
/// The cache depends on this rather than on HTTP so tests can substitute
/// in-memory archives.
pub trait FeedSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<u8>, FeedError>> + Send;
}

impl<T: FeedSource> FeedSource for Arc<T> {
    fn fetch(&self) -> impl Future<Output = Result<Vec<u8>, FeedError>> + Send {
        (**self).fetch()
    }
}

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// API key sent in the `api_key` header
    pub api_key: String,
    /// Archive URL
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl FeedClientConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: DEFAULT_FEED_URL.to_string(),
            timeout_secs: 120,
        }
    }

    /// Set a custom archive URL (for testing).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Downloads the schedule archive over HTTP.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    url: String,
    configured: bool,
}

impl FeedClient {
    /// Create a new feed client.
    pub fn new(config: FeedClientConfig) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&config.api_key).map_err(|_| FeedError::Api {
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
            url: config.url,
            configured: !config.api_key.trim().is_empty(),
        })
    }

    /// Download the full archive.
    pub async fn download(&self) -> Result<Vec<u8>, FeedError> {
        if !self.configured {
            return Err(FeedError::NotConfigured(
                "WMATA_API_KEY is not set".to_string(),
            ));
        }

        debug!(url = %self.url, "Downloading schedule feed");
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FeedError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = response.bytes().await?;
        info!(bytes = bytes.len(), "Downloaded schedule feed");
        Ok(bytes.to_vec())
    }
}

impl FeedSource for FeedClient {
    fn fetch(&self) -> impl Future<Output = Result<Vec<u8>, FeedError>> + Send {
        self.download()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = FeedClientConfig::new("key");
        assert_eq!(config.api_key, "key");
        assert_eq!(config.url, DEFAULT_FEED_URL);
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn config_builder() {
        let config = FeedClientConfig::new("key")
            .with_url("http://localhost:9999/feed.zip")
            .with_timeout(5);
        assert_eq!(config.url, "http://localhost:9999/feed.zip");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn rejects_unprintable_key() {
        let result = FeedClient::new(FeedClientConfig::new("bad\nkey"));
        assert!(matches!(result, Err(FeedError::Api { status: 0, .. })));
    }

    #[tokio::test]
    async fn empty_key_is_not_configured() {
        let client = FeedClient::new(FeedClientConfig::new("")).unwrap();
        let err = client.fetch().await.unwrap_err();
        assert!(matches!(err, FeedError::NotConfigured(_)));
    }
}
