//! Station list error types.

/// Errors from fetching the station list.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// HTTP request failed
    #[error("station list unavailable: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid API key or unauthorized
    #[error("unauthorized: check WMATA_API_KEY")]
    Unauthorized,

    /// API returned an error status
    #[error("station API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response JSON
    #[error("unreadable station list: {message}")]
    Json { message: String },

    #[error("station list not configured: {0}")]
    NotConfigured(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StationError::Api {
            status: 404,
            message: "Not Found".into(),
        };
        assert_eq!(err.to_string(), "station API error 404: Not Found");
        assert_eq!(
            StationError::Unauthorized.to_string(),
            "unauthorized: check WMATA_API_KEY"
        );
    }
}
