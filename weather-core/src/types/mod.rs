//! Domain types for the weather service.
//!
//! - [`TemperatureThresholds`]: High/low alert boundaries
//! - [`CurrentWeather`]: Normalized current conditions for a city
//! - [`ForecastReport`]: Current conditions plus a multi-day summary
//! - [`SnapshotMessage`]: Queue payload produced for archival
//! - [`SnapshotRecord`]: Table row written by the consumer

mod alert;
mod report;
mod snapshot;

pub use alert::*;
pub use report::*;
pub use snapshot::*;
