//! Storage and queue seams for the snapshot pipeline.
//!
//! The pipeline only talks to these traits, so in-memory backends serve
//! tests and local runs while managed cloud services can be plugged in
//! without touching producer or consumer logic.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{QueuedMessage, SnapshotRecord};

// ═══════════════════════════════════════════════════════════════════════════════
// QUEUE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// At-least-once message queue.
///
/// Received messages stay in flight until deleted by receipt handle.
#[async_trait]
pub trait SnapshotQueue: Send + Sync {
    /// Enqueues a message body.
    async fn send(&self, body: String) -> Result<()>;

    /// Receives up to `max_messages`, waiting at most `wait` for the first one.
    ///
    /// Returns an empty list when nothing arrived in time. Dropping the
    /// future before it resolves must not lose messages.
    async fn receive(&self, max_messages: usize, wait: Duration) -> Result<Vec<QueuedMessage>>;

    /// Acknowledges a received message so it is never redelivered.
    async fn delete(&self, receipt_handle: &str) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE TRAITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Key/blob storage for raw snapshot payloads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `body` under `key`, replacing any existing object.
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}

/// Table storage for derived snapshot rows.
#[async_trait]
pub trait SnapshotTable: Send + Sync {
    /// Writes a record, replacing any row with the same city and timestamp.
    async fn put_item(&self, record: SnapshotRecord) -> Result<()>;
}
