//! Live train predictions.
//!
//! Predictions come from the agency's `StationPrediction` endpoint, which
//! reports each approaching train's line, destination, track group and a
//! status of "ARR", "BRD" or minutes away. They are accurate for roughly
//! the next 25 minutes.

mod cached;
mod client;
mod error;
mod mock;
mod types;

pub use cached::{CachedPredictions, PredictionCacheConfig};
pub use client::{LiveSource, PredictionClient, PredictionClientConfig};
pub use error::LiveError;
pub use mock::MockPredictions;
pub use types::{PredictionResponse, TrainPrediction};
