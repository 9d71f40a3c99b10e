//! Snapshot producer: fetch each city, enqueue the raw payload.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, instrument, warn};

use weather_client::OpenWeatherClient;
use weather_core::constants::SNAPSHOT_CITIES;
use weather_core::error::Result;
use weather_core::traits::SnapshotQueue;
use weather_core::types::SnapshotMessage;

/// Outcome of one producer run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProduceReport {
    /// City keys whose snapshot was enqueued
    pub sent: Vec<String>,
    /// City keys whose upstream fetch failed
    pub failed: Vec<String>,
}

/// Captures current weather for a fixed set of cities.
pub struct SnapshotProducer {
    client: OpenWeatherClient,
    queue: Arc<dyn SnapshotQueue>,
    cities: Vec<(String, String)>,
}

impl SnapshotProducer {
    /// Creates a producer for the default snapshot cities.
    pub fn new(client: OpenWeatherClient, queue: Arc<dyn SnapshotQueue>) -> Self {
        let cities = SNAPSHOT_CITIES
            .iter()
            .map(|(key, query)| (key.to_string(), query.to_string()))
            .collect();
        Self::with_cities(client, queue, cities)
    }

    /// Creates a producer for explicit `(city_key, city_query)` pairs.
    pub fn with_cities(
        client: OpenWeatherClient,
        queue: Arc<dyn SnapshotQueue>,
        cities: Vec<(String, String)>,
    ) -> Self {
        Self {
            client,
            queue,
            cities,
        }
    }

    /// Returns the configured cities.
    pub fn cities(&self) -> &[(String, String)] {
        &self.cities
    }

    /// Fetches every city concurrently and enqueues one message per success.
    ///
    /// A failed fetch is logged and reported but does not stop the run;
    /// a queue failure does.
    #[instrument(skip(self), fields(cities = self.cities.len()))]
    pub async fn run_once(&self) -> Result<ProduceReport> {
        let fetches = self
            .cities
            .iter()
            .map(|(_, query)| self.client.fetch_current(query));
        let results = join_all(fetches).await;

        let mut report = ProduceReport::default();
        for ((key, query), result) in self.cities.iter().zip(results) {
            match result {
                Ok(data) => {
                    let message = SnapshotMessage::new(key.as_str(), query.as_str(), data);
                    self.queue.send(serde_json::to_string(&message)?).await?;
                    info!(city = %query, "Enqueued weather snapshot");
                    report.sent.push(key.clone());
                }
                Err(e) => {
                    warn!(city = %query, error = %e, "Failed to fetch weather for snapshot");
                    report.failed.push(key.clone());
                }
            }
        }

        Ok(report)
    }
}
