//! OpenWeatherMap HTTP client.
//!
//! Returns provider JSON untouched; normalization lives in [`crate::parse`].

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument};

use weather_core::constants::{OPENWEATHER_BASE_URL, REQUEST_TIMEOUT_SECONDS};
use weather_core::error::{Result, WeatherError};

/// Client configuration.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct OpenWeatherConfig {
    /// API key sent as `appid`
    pub api_key: String,
    /// API base URL (overridable for tests and proxies)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl OpenWeatherConfig {
    /// Creates config for the public OpenWeatherMap endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: OPENWEATHER_BASE_URL.into(),
            timeout_seconds: REQUEST_TIMEOUT_SECONDS,
        }
    }

    /// Points the client at a different base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// Hand-written so the API key never ends up in logs.
impl std::fmt::Debug for OpenWeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Client for the OpenWeatherMap current-weather and forecast endpoints.
#[derive(Clone)]
pub struct OpenWeatherClient {
    config: OpenWeatherConfig,
    http_client: reqwest::Client,
}

impl OpenWeatherClient {
    /// Creates a client with the given config.
    ///
    /// Fails with [`WeatherError::MissingApiKey`] when the key is blank.
    pub fn with_config(config: OpenWeatherConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(WeatherError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| WeatherError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &OpenWeatherConfig {
        &self.config
    }

    /// Fetches current conditions (`GET /weather`) in metric units.
    #[instrument(skip(self))]
    pub async fn fetch_current(&self, city: &str) -> Result<Value> {
        self.fetch("weather", city).await
    }

    /// Fetches the 3-hourly forecast (`GET /forecast`) in metric units.
    #[instrument(skip(self))]
    pub async fn fetch_forecast(&self, city: &str) -> Result<Value> {
        self.fetch("forecast", city).await
    }

    async fn fetch(&self, endpoint: &str, city: &str) -> Result<Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.config.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| WeatherError::HttpError(e.without_url().to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(WeatherError::CityNotFound(city.to_string()));
        }
        if !status.is_success() {
            return Err(WeatherError::UpstreamStatus(status.as_u16()));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| WeatherError::InvalidResponse(e.without_url().to_string()))?;

        debug!(endpoint, city, "Fetched from OpenWeatherMap");
        Ok(body)
    }
}
