//! # Weather Core
//!
//! Core types, errors, and traits shared by every weather-service crate.
//!
//! - **Types**: Weather reports, forecasts, alerts, and snapshot records
//! - **Errors**: A single error enum covering upstream, storage, and config failures
//! - **Constants**: Defaults for thresholds, TTLs, and endpoints
//! - **Traits**: Queue and storage seams for the snapshot pipeline
//!
//! ## Example
//!
//! ```rust
//! use weather_core::{AlertLevel, TemperatureThresholds};
//!
//! let thresholds = TemperatureThresholds::default();
//! assert_eq!(thresholds.alert_level(40.0), AlertLevel::Hot);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{Result, WeatherError};
pub use traits::*;
pub use types::*;
