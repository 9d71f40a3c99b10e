//! DTOs for API requests and responses.

use serde::{Deserialize, Serialize};

/// Query string for `/weather` and `/forecast`.
#[derive(Debug, Default, Deserialize)]
pub struct CityQuery {
    /// City name as typed by the user
    pub city: Option<String>,
}

impl CityQuery {
    /// Returns the trimmed city, or `None` when missing or blank.
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status
    pub status: String,
    /// Version
    pub version: String,
    /// Seconds since the state was created
    pub uptime_seconds: u64,
}

/// Recent log lines, newest first.
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<String>,
}

/// Response for the cache reset endpoint.
#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub cleared: bool,
}
