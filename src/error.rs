//! Error types for ingestion and coordinate conversion

use thiserror::Error;

/// Errors that abort a paged fetch
#[derive(Debug, Error)]
pub enum FetchError {
    /// Missing or unusable configuration, raised before any request is sent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Server answered with a non-success status
    #[error("API returned error status {status}: {body}")]
    Transport { status: u16, body: String },

    /// Connection, TLS or timeout failure inside the HTTP client
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body is not valid JSON
    #[error("Failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request was abandoned because cancellation was signalled
    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    pub fn transport(status: u16, body: impl Into<String>) -> Self {
        Self::Transport {
            status,
            body: body.into(),
        }
    }
}

/// Errors from the strict coordinate conversion path
#[derive(Debug, Error, PartialEq)]
pub enum GeodesyError {
    /// Datum shift produced a non-finite coordinate
    #[error("Non-finite datum shift result for ({lon}, {lat})")]
    NumericDegeneracy { lon: f64, lat: f64 },
}
