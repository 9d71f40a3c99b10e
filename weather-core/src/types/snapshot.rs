//! Snapshot pipeline payloads.
//!
//! The producer wraps raw provider JSON in a [`SnapshotMessage`]; the consumer
//! archives the raw JSON and derives a [`SnapshotRecord`] for the table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AlertLevel;

/// Message body placed on the snapshot queue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMessage {
    /// Stable short key for the city (e.g. "newyork")
    pub city_key: String,
    /// Query string sent to the provider (e.g. "New York,US")
    pub city_query: String,
    /// When the producer captured the data
    pub timestamp: DateTime<Utc>,
    /// Raw provider payload
    pub data: serde_json::Value,
}

impl SnapshotMessage {
    /// Wraps raw provider data captured now.
    pub fn new(
        city_key: impl Into<String>,
        city_query: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            city_key: city_key.into(),
            city_query: city_query.into(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// A message handed out by a queue, identified by its receipt handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Handle used to delete the message once processed
    pub receipt_handle: String,
    /// Raw message body
    pub body: String,
}

/// Row written to the snapshot table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// City key (partition key)
    pub city: String,
    /// Hour bucket, `YYYY-MM-DD-HH` (sort key)
    pub timestamp: String,
    /// Temperature in °C
    pub temp: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Atmospheric pressure (hPa)
    pub pressure: f64,
    /// Short condition label
    pub weather_main: String,
    /// Threshold classification of `temp`
    pub alert_level: AlertLevel,
}
