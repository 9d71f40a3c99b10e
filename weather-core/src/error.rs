//! Error types for the weather service.
//!
//! A single `thiserror` hierarchy shared by the client, snapshot pipeline,
//! and API layers. The cache itself never fails and has no variants here.

use thiserror::Error;

/// Result type alias using `WeatherError`.
pub type Result<T> = std::result::Result<T, WeatherError>;

/// Main error type for all weather-service operations.
#[derive(Debug, Error)]
pub enum WeatherError {
    // ═══════════════════════════════════════════════════════════════════════════
    // UPSTREAM ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The OpenWeatherMap API key was not provided.
    #[error("OpenWeatherMap API key is required")]
    MissingApiKey,

    /// The provider does not know the requested city.
    #[error("City \"{0}\" not found")]
    CityNotFound(String),

    /// The provider answered with a non-success status.
    #[error("API error: {0}")]
    UpstreamStatus(u16),

    /// HTTP request failed before a response was received.
    #[error("Network error: {0}")]
    HttpError(String),

    /// The provider response was missing fields or had the wrong shape.
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SNAPSHOT PIPELINE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Queue send/receive/delete failed.
    #[error("Queue error: {0}")]
    QueueError(String),

    /// Object or table storage failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// A queued message could not be interpreted.
    #[error("Invalid snapshot message: {0}")]
    InvalidMessage(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // GENERIC ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl WeatherError {
    /// Returns true if this error is transient (a retry may succeed).
    pub fn is_recoverable(&self) -> bool {
        match self {
            WeatherError::HttpError(_) | WeatherError::QueueError(_) => true,
            WeatherError::UpstreamStatus(code) => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    /// Returns true if the error means the requested city does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WeatherError::CityNotFound(_))
    }
}
