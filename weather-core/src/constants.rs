//! Service-wide defaults.
//!
//! Every value here can be overridden through configuration; these are the
//! fallbacks used when nothing is set.

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE
// ═══════════════════════════════════════════════════════════════════════════════

/// Seconds a cached weather report stays live (10 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 600;

/// Seconds between proactive expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 300;

/// Cache key prefix for current-weather reports.
pub const CURRENT_WEATHER_KEY_PREFIX: &str = "weather_";

/// Cache key prefix for forecast reports.
pub const FORECAST_KEY_PREFIX: &str = "forecast_";

// ═══════════════════════════════════════════════════════════════════════════════
// ALERTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Temperature (°C) above which a high-temperature alert is raised.
pub const DEFAULT_HIGH_TEMP_THRESHOLD: f64 = 35.0;

/// Temperature (°C) below which a low-temperature alert is raised.
pub const DEFAULT_LOW_TEMP_THRESHOLD: f64 = 5.0;

// ═══════════════════════════════════════════════════════════════════════════════
// UPSTREAM (OpenWeatherMap)
// ═══════════════════════════════════════════════════════════════════════════════

/// OpenWeatherMap 2.5 API base URL.
pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Timeout for a single upstream request, in seconds.
pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Number of days summarized in a forecast.
pub const FORECAST_DAYS: usize = 5;

// ═══════════════════════════════════════════════════════════════════════════════
// HTTP API
// ═══════════════════════════════════════════════════════════════════════════════

/// Default listening port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default directory for the application log file.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// File name of the application log inside the log directory.
pub const LOG_FILE_NAME: &str = "app.log";

/// Number of log lines returned by the logs endpoint.
pub const RECENT_LOG_COUNT: usize = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOT PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Cities captured by the snapshot producer as `(city_key, city_query)`.
pub const SNAPSHOT_CITIES: &[(&str, &str)] = &[
    ("kathmandu", "Kathmandu,NP"),
    ("london", "London,GB"),
    ("newyork", "New York,US"),
];

/// Maximum messages taken from the queue per poll.
pub const CONSUMER_BATCH_SIZE: usize = 5;

/// Long-poll wait per receive, in seconds.
pub const CONSUMER_WAIT_SECONDS: u64 = 20;

/// Pause between polls, in seconds.
pub const CONSUMER_IDLE_SECONDS: u64 = 2;

/// Object-store prefix for archived snapshots.
pub const SNAPSHOT_OBJECT_PREFIX: &str = "weather_data";
