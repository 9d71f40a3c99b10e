//! TTL cache for weather reports.
//!
//! Single-process, in-memory cache where every entry lives for the same
//! configured duration. Reads evict expired entries lazily; a separate sweep
//! removes everything that has expired. The cache never schedules its own
//! sweeps.

mod cache;

pub use cache::{CacheConfig, CacheStats, TtlCache};
