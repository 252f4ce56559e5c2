//! Schedule feed error types.

/// Errors from downloading or parsing the schedule feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Network or transport failure fetching the archive
    #[error("feed unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// Invalid API key or unauthorized
    #[error("unauthorized: check WMATA_API_KEY")]
    Unauthorized,

    /// Feed endpoint returned an error status
    #[error("feed API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Feed source not configured
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// A mandatory table is absent from the archive
    #[error("feed is missing required file {file}")]
    MissingFeedData { file: &'static str },

    /// A table can't be read at all
    #[error("malformed feed file {file}: {message}")]
    Malformed { file: &'static str, message: String },

    /// The archive itself is unreadable
    #[error("unreadable feed archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl FeedError {
    /// Whether retrying later might succeed without a feed change.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::Unavailable(_) => true,
            FeedError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
