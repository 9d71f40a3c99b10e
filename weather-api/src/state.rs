//! App state: config, report cache, weather service.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use weather_cache::TtlCache;
use weather_client::{OpenWeatherClient, OpenWeatherConfig, ReportCache, WeatherService};
use weather_core::constants::{
    DEFAULT_CACHE_TTL_SECONDS, DEFAULT_HIGH_TEMP_THRESHOLD, DEFAULT_LOG_DIR,
    DEFAULT_LOW_TEMP_THRESHOLD, DEFAULT_SWEEP_INTERVAL_SECONDS, LOG_FILE_NAME,
    OPENWEATHER_BASE_URL,
};
use weather_core::error::{Result, WeatherError};
use weather_core::types::TemperatureThresholds;

/// Server configuration.
#[derive(Clone)]
pub struct ApiConfig {
    /// OpenWeatherMap API key
    pub api_key: String,
    /// OpenWeatherMap base URL
    pub base_url: String,
    /// Alert thresholds in °C
    pub thresholds: TemperatureThresholds,
    /// Lifetime of cached reports
    pub cache_ttl_seconds: u64,
    /// Period of the expiry sweep
    pub sweep_interval_seconds: u64,
    /// Directory holding `app.log`
    pub log_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: OPENWEATHER_BASE_URL.into(),
            thresholds: TemperatureThresholds::new(DEFAULT_HIGH_TEMP_THRESHOLD, DEFAULT_LOW_TEMP_THRESHOLD),
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("thresholds", &self.thresholds)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("sweep_interval_seconds", &self.sweep_interval_seconds)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

impl ApiConfig {
    /// Loads `.env` if present, then reads configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_key = lookup("OPENWEATHER_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(WeatherError::MissingApiKey)?;

        let config = Self {
            api_key,
            base_url: lookup("OPENWEATHER_BASE_URL").unwrap_or(defaults.base_url),
            thresholds: TemperatureThresholds::new(
                parse_or(&lookup, "HIGH_TEMP_THRESHOLD", defaults.thresholds.high)?,
                parse_or(&lookup, "LOW_TEMP_THRESHOLD", defaults.thresholds.low)?,
            ),
            cache_ttl_seconds: parse_or(&lookup, "CACHE_TTL_SECONDS", defaults.cache_ttl_seconds)?,
            sweep_interval_seconds: parse_or(
                &lookup,
                "CACHE_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_seconds,
            )?,
            log_dir: lookup("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log_dir),
        };

        if config.sweep_interval_seconds == 0 {
            return Err(WeatherError::ConfigError(
                "CACHE_SWEEP_INTERVAL_SECS must be greater than zero".into(),
            ));
        }

        Ok(config)
    }

    /// Path of the application log file.
    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE_NAME)
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WeatherError::ConfigError(format!("{} has invalid value {:?}", name, raw))),
    }
}

/// Shared state handed to every handler.
pub struct AppState {
    /// Configuration the state was built from
    pub config: ApiConfig,
    /// Report cache shared with the expiry sweeper
    pub cache: Arc<ReportCache>,
    /// Cache-aware lookups
    pub weather: WeatherService,
    /// When the state was built
    pub started_at: Instant,
}

impl AppState {
    /// Builds the client, cache, and service. Fails without an API key.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = OpenWeatherClient::with_config(
            OpenWeatherConfig::new(config.api_key.clone()).with_base_url(config.base_url.clone()),
        )?;
        let cache = Arc::new(TtlCache::new(Duration::from_secs(config.cache_ttl_seconds)));
        let weather = WeatherService::new(client, cache.clone(), config.thresholds);

        Ok(Self {
            config,
            cache,
            weather,
            started_at: Instant::now(),
        })
    }
}
