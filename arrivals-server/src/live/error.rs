//! Live prediction error types.

/// Errors from the live prediction client.
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    /// Network or transport failure, including timeouts
    #[error("predictions unavailable: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body isn't the expected prediction JSON
    #[error("unreadable predictions: {message}{}", body_suffix(.body))]
    Json {
        message: String,
        body: Option<String>,
    },

    /// Prediction endpoint returned an error status
    #[error("prediction API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Invalid API key or unauthorized
    #[error("unauthorized: check WMATA_API_KEY")]
    Unauthorized,

    #[error("live predictions not configured: {0}")]
    NotConfigured(String),
}

fn body_suffix(body: &Option<String>) -> String {
    body.as_ref()
        .map(|b| format!(" (body: {b})"))
        .unwrap_or_default()
}

impl LiveError {
    /// Whether the next poll might succeed without a configuration change.
    pub fn is_transient(&self) -> bool {
        match self {
            LiveError::Http(_) => true,
            LiveError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
