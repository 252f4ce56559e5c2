//! Short-lived caching of live predictions.
//!
//! Predictions change every few seconds upstream, but several callers often
//! ask for the same station within one polling interval. Responses are kept
//! per station for a short TTL.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::{LiveArrival, StationId};

use super::client::LiveSource;
use super::error::LiveError;

type PredictionEntry = Arc<Vec<LiveArrival>>;

/// Configuration for the prediction cache.
#[derive(Debug, Clone)]
pub struct PredictionCacheConfig {
    /// TTL for cached responses.
    pub ttl: Duration,

    /// Maximum number of cached stations.
    pub max_capacity: u64,
}

impl Default for PredictionCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            max_capacity: 200,
        }
    }
}

/// Live source with per-station response caching.
///
/// Failed requests are not cached.
pub struct CachedPredictions<L> {
    source: L,
    responses: MokaCache<StationId, PredictionEntry>,
}

impl<L: LiveSource> CachedPredictions<L> {
    pub fn new(source: L, config: &PredictionCacheConfig) -> Self {
        let responses = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { source, responses }
    }

    /// Predictions for a station, from cache when recent enough.
    pub async fn get(&self, station: &StationId) -> Result<PredictionEntry, LiveError> {
        if let Some(cached) = self.responses.get(station).await {
            return Ok(cached);
        }

        let entry = Arc::new(self.source.predictions(station).await?);
        self.responses.insert(station.clone(), entry.clone()).await;

        Ok(entry)
    }
}

impl<L: LiveSource> LiveSource for CachedPredictions<L> {
    async fn predictions(&self, station: &StationId) -> Result<Vec<LiveArrival>, LiveError> {
        self.get(station).await.map(|entry| entry.as_ref().clone())
    }
}
