//! In-memory queue and storage backends.
//!
//! Thread-safe and suitable for tests and single-process runs where the
//! producer and consumer share one queue handle.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, instrument};
use uuid::Uuid;

use weather_core::error::{Result, WeatherError};
use weather_core::traits::{ObjectStore, SnapshotQueue, SnapshotTable};
use weather_core::types::{QueuedMessage, SnapshotRecord};

// ═══════════════════════════════════════════════════════════════════════════════
// QUEUE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory at-least-once queue.
///
/// A received message moves to the in-flight set under a fresh receipt
/// handle and stays there until deleted. There is no visibility timeout;
/// undeleted messages can be returned to the queue with [`Self::requeue_in_flight`].
#[derive(Debug, Default)]
pub struct MemoryQueue {
    /// Messages waiting to be received
    pending: Mutex<VecDeque<String>>,
    /// Receipt handle → body of received, unacknowledged messages
    in_flight: DashMap<String, String>,
    /// Wakes long-polling receivers
    arrivals: Notify,
}

impl MemoryQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages waiting to be received.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of received messages not yet deleted.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Moves every in-flight message back to the front of the queue.
    pub fn requeue_in_flight(&self) -> usize {
        let handles: Vec<String> = self.in_flight.iter().map(|e| e.key().clone()).collect();
        let bodies: Vec<String> = handles
            .iter()
            .filter_map(|h| self.in_flight.remove(h).map(|(_, body)| body))
            .collect();

        let count = bodies.len();
        let mut pending = self.pending.lock();
        for body in bodies.into_iter().rev() {
            pending.push_front(body);
        }
        drop(pending);

        if count > 0 {
            self.arrivals.notify_one();
        }
        count
    }

    fn take(&self, max_messages: usize) -> Vec<QueuedMessage> {
        let mut pending = self.pending.lock();
        let n = max_messages.min(pending.len());
        pending
            .drain(..n)
            .map(|body| {
                let receipt_handle = Uuid::new_v4().to_string();
                self.in_flight.insert(receipt_handle.clone(), body.clone());
                QueuedMessage { receipt_handle, body }
            })
            .collect()
    }
}

#[async_trait]
impl SnapshotQueue for MemoryQueue {
    async fn send(&self, body: String) -> Result<()> {
        self.pending.lock().push_back(body);
        self.arrivals.notify_one();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<QueuedMessage>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let batch = self.take(max_messages);
            if !batch.is_empty() || max_messages == 0 {
                debug!(count = batch.len(), "Received messages");
                return Ok(batch);
            }

            // A send between `take` and here leaves a stored permit, so this
            // cannot miss a wakeup.
            if tokio::time::timeout_at(deadline, self.arrivals.notified()).await.is_err() {
                return Ok(self.take(max_messages));
            }
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.in_flight
            .remove(receipt_handle)
            .map(|_| ())
            .ok_or_else(|| WeatherError::QueueError(format!("unknown receipt handle: {}", receipt_handle)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OBJECT STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// An object held by [`MemoryObjectStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Object payload
    pub body: Bytes,
    /// MIME type given at upload
    pub content_type: String,
}

/// In-memory object store.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
}

impl MemoryObjectStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object stored under `key`.
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.get(key).map(|o| o.value().clone())
    }

    /// Returns all keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Returns the number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                body: Bytes::from(body),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TABLE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory snapshot table keyed by `(city, timestamp)`.
#[derive(Debug, Default)]
pub struct MemorySnapshotTable {
    rows: DashMap<(String, String), SnapshotRecord>,
}

impl MemorySnapshotTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the row for a city and hour bucket.
    pub fn get(&self, city: &str, timestamp: &str) -> Option<SnapshotRecord> {
        self.rows
            .get(&(city.to_string(), timestamp.to_string()))
            .map(|r| r.value().clone())
    }

    /// Returns all rows ordered by city, then timestamp.
    pub fn all(&self) -> Vec<SnapshotRecord> {
        let mut rows: Vec<SnapshotRecord> = self.rows.iter().map(|r| r.value().clone()).collect();
        rows.sort_by(|a, b| (&a.city, &a.timestamp).cmp(&(&b.city, &b.timestamp)));
        rows
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl SnapshotTable for MemorySnapshotTable {
    async fn put_item(&self, record: SnapshotRecord) -> Result<()> {
        self.rows
            .insert((record.city.clone(), record.timestamp.clone()), record);
        Ok(())
    }
}
