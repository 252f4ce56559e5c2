//! Schedule cache error types.

use std::sync::Arc;

use crate::feed::FeedError;

/// Errors from the schedule cache.
///
/// `Clone` so a single in-flight rebuild can hand its failure to every
/// caller waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// Downloading or parsing the feed failed
    #[error("schedule rebuild failed: {0}")]
    Rebuild(Arc<FeedError>),

    /// Persisted storage couldn't be read or written
    #[error("schedule store error: {message}")]
    Store { message: String },

    /// A background task panicked or was cancelled
    #[error("schedule worker failed: {message}")]
    Worker { message: String },
}

impl CacheError {
    pub(crate) fn store(message: impl Into<String>) -> Self {
        CacheError::Store {
            message: message.into(),
        }
    }

    /// Whether retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CacheError::Rebuild(e) => e.is_transient(),
            CacheError::Store { .. } | CacheError::Worker { .. } => false,
        }
    }
}

impl From<FeedError> for CacheError {
    fn from(e: FeedError) -> Self {
        CacheError::Rebuild(Arc::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_error_wraps_feed_error() {
        let err = CacheError::from(FeedError::MissingFeedData { file: "stops.txt" });
        assert_eq!(
            err.to_string(),
            "schedule rebuild failed: feed is missing required file stops.txt"
        );
        assert!(!err.is_transient());

        let cloned = err.clone();
        assert_eq!(cloned.to_string(), err.to_string());
    }

    #[test]
    fn transient_follows_feed_error() {
        let err = CacheError::from(FeedError::Api {
            status: 503,
            message: String::new(),
        });
        assert!(err.is_transient());
        assert!(!CacheError::store("disk full").is_transient());
    }
}
