//! Snapshot consumer: drain the queue into object and table storage.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use weather_core::constants::{
    CONSUMER_BATCH_SIZE, CONSUMER_IDLE_SECONDS, CONSUMER_WAIT_SECONDS, SNAPSHOT_OBJECT_PREFIX,
};
use weather_core::error::{Result, WeatherError};
use weather_core::traits::{ObjectStore, SnapshotQueue, SnapshotTable};
use weather_core::types::{AlertLevel, QueuedMessage, SnapshotRecord, TemperatureThresholds};

/// Polling configuration.
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    /// Maximum messages per receive
    pub max_messages: usize,
    /// Long-poll wait per receive
    pub wait: Duration,
    /// Pause between polls
    pub idle: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_messages: CONSUMER_BATCH_SIZE,
            wait: Duration::from_secs(CONSUMER_WAIT_SECONDS),
            idle: Duration::from_secs(CONSUMER_IDLE_SECONDS),
        }
    }
}

/// What happened to one message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Message was valid; each flag says whether that write succeeded.
    Stored {
        /// Raw JSON written to the object store
        archived: bool,
        /// Row written to the table
        recorded: bool,
    },
    /// Message was malformed or incomplete and dropped.
    Skipped(String),
}

/// Counts for one poll.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Messages received
    pub received: usize,
    /// Messages with at least one successful write
    pub stored: usize,
    /// Messages dropped as invalid
    pub skipped: usize,
    /// Messages acknowledged on the queue
    pub deleted: usize,
}

/// Object key for a city's snapshot in an hour bucket.
pub fn object_key(city_key: &str, hour_bucket: &str) -> String {
    format!("{}/{}/{}.json", SNAPSHOT_OBJECT_PREFIX, city_key, hour_bucket)
}

/// Derives the table row from raw provider data.
pub fn build_record(
    city_key: &str,
    hour_bucket: &str,
    data: &Value,
    thresholds: &TemperatureThresholds,
) -> Result<SnapshotRecord> {
    let number = |pointer: &str| {
        data.pointer(pointer)
            .and_then(Value::as_f64)
            .ok_or_else(|| WeatherError::InvalidMessage(format!("missing numeric field `{}`", pointer)))
    };
    let temp = number("/main/temp")?;
    let weather_main = data
        .pointer("/weather/0/main")
        .and_then(Value::as_str)
        .ok_or_else(|| WeatherError::InvalidMessage("missing field `/weather/0/main`".into()))?;

    Ok(SnapshotRecord {
        city: city_key.to_string(),
        timestamp: hour_bucket.to_string(),
        temp,
        humidity: number("/main/humidity")?,
        pressure: number("/main/pressure")?,
        weather_main: weather_main.to_string(),
        alert_level: thresholds.alert_level(temp),
    })
}

/// Drains snapshot messages into archival storage.
///
/// Every received message is deleted after processing, including ones that
/// were skipped as invalid, so a poison message is never redelivered.
pub struct SnapshotConsumer {
    queue: Arc<dyn SnapshotQueue>,
    store: Arc<dyn ObjectStore>,
    table: Arc<dyn SnapshotTable>,
    thresholds: TemperatureThresholds,
    config: ConsumerConfig,
}

impl SnapshotConsumer {
    /// Creates a consumer with the default polling configuration.
    pub fn new(
        queue: Arc<dyn SnapshotQueue>,
        store: Arc<dyn ObjectStore>,
        table: Arc<dyn SnapshotTable>,
        thresholds: TemperatureThresholds,
    ) -> Self {
        Self {
            queue,
            store,
            table,
            thresholds,
            config: ConsumerConfig::default(),
        }
    }

    /// Overrides the polling configuration.
    pub fn with_config(mut self, config: ConsumerConfig) -> Self {
        self.config = config;
        self
    }

    /// Processes one message, stamping it with the current hour bucket.
    pub async fn process_message(&self, message: &QueuedMessage) -> ProcessOutcome {
        self.process_message_at(message, Utc::now()).await
    }

    pub(crate) async fn process_message_at(&self, message: &QueuedMessage, now: DateTime<Utc>) -> ProcessOutcome {
        let body: Value = match serde_json::from_str(&message.body) {
            Ok(v) => v,
            Err(e) => {
                warn!(body = %message.body, error = %e, "Malformed message skipped");
                return ProcessOutcome::Skipped(format!("malformed JSON: {}", e));
            }
        };

        let fields = (
            body.get("city_key").and_then(Value::as_str),
            body.get("city_query").and_then(Value::as_str),
            body.get("data"),
        );
        let (city_key, city_query, data) = match fields {
            (Some(k), Some(q), Some(d)) => (k, q, d),
            _ => {
                warn!(body = %message.body, "Skipping incomplete message");
                return ProcessOutcome::Skipped("missing city_key, city_query or data".into());
            }
        };

        if let Some(temp) = data.pointer("/main/temp").and_then(Value::as_f64) {
            match self.thresholds.alert_level(temp) {
                AlertLevel::Hot => warn!(city = city_query, temp, "City is hot"),
                AlertLevel::Cold => warn!(city = city_query, temp, "City is cold"),
                AlertLevel::Normal => {}
            }
        }

        let hour_bucket = now.format("%Y-%m-%d-%H").to_string();

        let archived = match self.archive(city_key, &hour_bucket, data).await {
            Ok(()) => true,
            Err(e) => {
                warn!(city = city_key, error = %e, "Failed to archive snapshot");
                false
            }
        };

        let recorded = match self.record(city_key, &hour_bucket, data).await {
            Ok(()) => true,
            Err(e) => {
                warn!(city = city_key, error = %e, "Failed to store snapshot row");
                false
            }
        };

        ProcessOutcome::Stored { archived, recorded }
    }

    async fn archive(&self, city_key: &str, hour_bucket: &str, data: &Value) -> Result<()> {
        let key = object_key(city_key, hour_bucket);
        self.store
            .put_object(&key, serde_json::to_vec(data)?, "application/json")
            .await?;
        info!(city = city_key, key = %key, "Archived snapshot");
        Ok(())
    }

    async fn record(&self, city_key: &str, hour_bucket: &str, data: &Value) -> Result<()> {
        let record = build_record(city_key, hour_bucket, data, &self.thresholds)?;
        self.table.put_item(record).await?;
        info!(city = city_key, timestamp = hour_bucket, "Stored snapshot row");
        Ok(())
    }

    /// Receives one batch, processes it, and acknowledges every message.
    #[instrument(skip(self))]
    pub async fn poll_once(&self) -> Result<PollReport> {
        let batch = self.receive_batch().await?;
        Ok(self.process_batch(batch).await)
    }

    async fn receive_batch(&self) -> Result<Vec<QueuedMessage>> {
        self.queue
            .receive(self.config.max_messages, self.config.wait)
            .await
    }

    /// Processes and deletes every message of a received batch.
    ///
    /// Must run to completion: received messages are in flight and are only
    /// released by `delete`.
    async fn process_batch(&self, batch: Vec<QueuedMessage>) -> PollReport {
        let mut report = PollReport {
            received: batch.len(),
            ..Default::default()
        };

        for message in &batch {
            match self.process_message(message).await {
                ProcessOutcome::Stored { archived, recorded } if archived || recorded => report.stored += 1,
                ProcessOutcome::Stored { .. } => {}
                ProcessOutcome::Skipped(_) => report.skipped += 1,
            }

            match self.queue.delete(&message.receipt_handle).await {
                Ok(()) => report.deleted += 1,
                Err(e) => warn!(error = %e, "Failed to delete message"),
            }
        }

        if report.received > 0 {
            debug!(?report, "Poll complete");
        }
        report
    }

    /// Polls until `shutdown` turns true, pausing between polls.
    ///
    /// A batch that has been received is always processed and deleted before
    /// the loop checks for shutdown again. Receive errors are logged and
    /// retried on the next poll.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            batch = self.config.max_messages,
            wait_secs = self.config.wait.as_secs(),
            "Snapshot consumer started"
        );

        while !*shutdown.borrow() {
            // Shutdown may interrupt the long-poll wait, never a received batch.
            let received = tokio::select! {
                _ = shutdown.changed() => break,
                result = self.receive_batch() => result,
            };

            match received {
                Ok(batch) => {
                    self.process_batch(batch).await;
                }
                Err(e) => warn!(error = %e, "Poll failed"),
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.config.idle) => {}
            }
        }

        info!("Snapshot consumer stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;

    use crate::memory::{MemoryObjectStore, MemoryQueue, MemorySnapshotTable};
    use weather_core::types::SnapshotMessage;

    struct FailingStore;

    #[async_trait]
    impl ObjectStore for FailingStore {
        async fn put_object(&self, _key: &str, _body: Vec<u8>, _content_type: &str) -> Result<()> {
            Err(WeatherError::StorageError("bucket unavailable".into()))
        }
    }

    fn owm_data(temp: f64) -> Value {
        json!({
            "main": {"temp": temp, "humidity": 60, "pressure": 1009},
            "weather": [{"main": "Clear"}]
        })
    }

    fn message(receipt: &str, body: String) -> QueuedMessage {
        QueuedMessage {
            receipt_handle: receipt.into(),
            body,
        }
    }

    /// Store whose writes take longer than the shutdown delay in the tests.
    struct SlowStore {
        inner: MemoryObjectStore,
        delay: Duration,
    }

    #[async_trait]
    impl ObjectStore for SlowStore {
        async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.put_object(key, body, content_type).await
        }
    }

    struct Fixture {
        queue: Arc<MemoryQueue>,
        store: Arc<MemoryObjectStore>,
        table: Arc<MemorySnapshotTable>,
        consumer: SnapshotConsumer,
    }

    fn fixture() -> Fixture {
        let queue = Arc::new(MemoryQueue::new());
        let store = Arc::new(MemoryObjectStore::new());
        let table = Arc::new(MemorySnapshotTable::new());
        let consumer = SnapshotConsumer::new(
            queue.clone(),
            store.clone(),
            table.clone(),
            TemperatureThresholds::default(),
        )
        .with_config(ConsumerConfig {
            max_messages: 5,
            wait: Duration::ZERO,
            idle: Duration::from_millis(5),
        });
        Fixture {
            queue,
            store,
            table,
            consumer,
        }
    }

    #[test]
    fn test_object_key() {
        assert_eq!(object_key("london", "2024-06-01-13"), "weather_data/london/2024-06-01-13.json");
    }

    #[test]
    fn test_build_record_classifies() {
        let thresholds = TemperatureThresholds::default();
        let hot = build_record("cairo", "2024-06-01-13", &owm_data(41.0), &thresholds).unwrap();
        assert_eq!(hot.alert_level, AlertLevel::Hot);
        assert_eq!(hot.humidity, 60.0);
        assert_eq!(hot.pressure, 1009.0);
        assert_eq!(hot.weather_main, "Clear");

        let cold = build_record("oslo", "2024-01-01-06", &owm_data(-8.0), &thresholds).unwrap();
        assert_eq!(cold.alert_level, AlertLevel::Cold);

        let err = build_record("x", "t", &json!({"main": {}}), &thresholds).unwrap_err();
        assert!(matches!(err, WeatherError::InvalidMessage(_)));
    }

    #[tokio::test]
    async fn test_process_valid_message() {
        let f = fixture();
        let body = serde_json::to_string(&SnapshotMessage::new("london", "London,GB", owm_data(12.5))).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 13, 45, 0).unwrap();

        let outcome = f.consumer.process_message_at(&message("r1", body), now).await;
        assert_eq!(outcome, ProcessOutcome::Stored { archived: true, recorded: true });

        let obj = f.store.get("weather_data/london/2024-06-01-13.json").unwrap();
        assert_eq!(obj.content_type, "application/json");
        let archived: Value = serde_json::from_slice(&obj.body).unwrap();
        assert_eq!(archived, owm_data(12.5));

        let row = f.table.get("london", "2024-06-01-13").unwrap();
        assert_eq!(row.temp, 12.5);
        assert_eq!(row.alert_level, AlertLevel::Normal);
    }

    #[tokio::test]
    async fn test_process_malformed_and_incomplete() {
        let f = fixture();

        let outcome = f.consumer.process_message(&message("r1", "{not json".into())).await;
        assert!(matches!(outcome, ProcessOutcome::Skipped(_)));

        let incomplete = json!({"city_key": "london", "data": {}}).to_string();
        let outcome = f.consumer.process_message(&message("r2", incomplete)).await;
        assert!(matches!(outcome, ProcessOutcome::Skipped(_)));

        assert!(f.store.is_empty());
        assert!(f.table.is_empty());
    }

    #[tokio::test]
    async fn test_archive_failure_still_records_row() {
        let table = Arc::new(MemorySnapshotTable::new());
        let consumer = SnapshotConsumer::new(
            Arc::new(MemoryQueue::new()),
            Arc::new(FailingStore),
            table.clone(),
            TemperatureThresholds::default(),
        );
        let body = serde_json::to_string(&SnapshotMessage::new("oslo", "Oslo,NO", owm_data(-2.0))).unwrap();

        let outcome = consumer.process_message(&message("r1", body)).await;
        assert_eq!(outcome, ProcessOutcome::Stored { archived: false, recorded: true });
        assert_eq!(table.all()[0].alert_level, AlertLevel::Cold);
    }

    #[tokio::test]
    async fn test_row_failure_still_archives() {
        let f = fixture();
        let data = json!({"main": {"temp": 10.0}});
        let body = serde_json::to_string(&SnapshotMessage::new("lima", "Lima,PE", data)).unwrap();

        let outcome = f.consumer.process_message(&message("r1", body)).await;
        assert_eq!(outcome, ProcessOutcome::Stored { archived: true, recorded: false });
        assert_eq!(f.store.len(), 1);
        assert!(f.table.is_empty());
    }

    #[tokio::test]
    async fn test_poll_once_deletes_every_message() {
        let f = fixture();
        let good = serde_json::to_string(&SnapshotMessage::new("london", "London,GB", owm_data(15.0))).unwrap();
        f.queue.send(good).await.unwrap();
        f.queue.send("garbage".into()).await.unwrap();

        let report = f.consumer.poll_once().await.unwrap();
        assert_eq!(
            report,
            PollReport {
                received: 2,
                stored: 1,
                skipped: 1,
                deleted: 2,
            }
        );
        assert_eq!(f.queue.pending_len(), 0);
        assert_eq!(f.queue.in_flight_len(), 0);
        assert_eq!(f.table.len(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let f = fixture();
        let body = serde_json::to_string(&SnapshotMessage::new("london", "London,GB", owm_data(15.0))).unwrap();
        f.queue.send(body).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let consumer = Arc::new(f.consumer);
        let handle = {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move { consumer.run(rx).await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(f.table.len(), 1);
        assert_eq!(f.queue.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_mid_batch_finishes_batch() {
        let queue = Arc::new(MemoryQueue::new());
        let store = Arc::new(SlowStore {
            inner: MemoryObjectStore::new(),
            delay: Duration::from_millis(200),
        });
        let table = Arc::new(MemorySnapshotTable::new());
        let consumer = Arc::new(
            SnapshotConsumer::new(queue.clone(), store.clone(), table.clone(), TemperatureThresholds::default())
                .with_config(ConsumerConfig {
                    max_messages: 5,
                    wait: Duration::ZERO,
                    idle: Duration::from_millis(5),
                }),
        );

        let body = serde_json::to_string(&SnapshotMessage::new("london", "London,GB", owm_data(15.0))).unwrap();
        queue.send(body).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = {
            let consumer = Arc::clone(&consumer);
            tokio::spawn(async move { consumer.run(rx).await })
        };

        // Signal while the archive write is still sleeping.
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.in_flight_len(), 0);
        assert_eq!(store.inner.len(), 1);
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_long_poll_wait() {
        let queue = Arc::new(MemoryQueue::new());
        let consumer = SnapshotConsumer::new(
            queue.clone(),
            Arc::new(MemoryObjectStore::new()),
            Arc::new(MemorySnapshotTable::new()),
            TemperatureThresholds::default(),
        );

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move { consumer.run(rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(true).unwrap();

        // Default config waits 20 s per receive; shutdown must not wait it out.
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(queue.in_flight_len(), 0);
    }
}
