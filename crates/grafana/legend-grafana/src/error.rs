//! Error types for Grafana API calls

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrafanaError {
    /// The API key cannot be sent as a header
    #[error("Invalid Grafana API key: {0}")]
    InvalidApiKey(String),

    /// Transport level failure
    #[error("Network error: {message}")]
    Network { message: String },

    /// Grafana answered with a non-success status
    #[error("Grafana API error: HTTP {status} on {path}: {body}")]
    Api {
        status: u16,
        path: String,
        body: String,
    },

    /// A response body did not have the expected shape
    #[error("Unexpected Grafana response: {message}")]
    Serialization { message: String },
}

impl GrafanaError {
    pub fn network<T: std::fmt::Display>(msg: T) -> Self {
        Self::Network {
            message: msg.to_string(),
        }
    }

    /// HTTP status for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            GrafanaError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GrafanaError>;
