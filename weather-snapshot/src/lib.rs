//! # Weather Snapshots
//!
//! Periodic capture of raw weather data for historical alerting.
//!
//! - **Producer**: fetches each configured city and enqueues a snapshot message
//! - **Consumer**: drains the queue, archives raw JSON to an object store, and
//!   writes a classified row to a table
//!
//! Backends:
//!
//! - **Memory**: queue, object store, and table for tests and local runs
//! - **File**: object store and table persisted under a directory
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use weather_snapshot::{MemoryQueue, MemoryObjectStore, MemorySnapshotTable, SnapshotConsumer, SnapshotProducer};
//!
//! let queue = Arc::new(MemoryQueue::new());
//! SnapshotProducer::new(client, queue.clone()).run_once().await?;
//!
//! let consumer = SnapshotConsumer::new(queue, store, table, thresholds);
//! let report = consumer.poll_once().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod consumer;
mod file;
mod memory;
mod producer;

pub use consumer::{build_record, object_key, ConsumerConfig, PollReport, ProcessOutcome, SnapshotConsumer};
pub use file::{FileObjectStore, FileSnapshotTable};
pub use memory::{MemoryObjectStore, MemoryQueue, MemorySnapshotTable, StoredObject};
pub use producer::{ProduceReport, SnapshotProducer};

// Re-export the seams from core
pub use weather_core::traits::{ObjectStore, SnapshotQueue, SnapshotTable};
