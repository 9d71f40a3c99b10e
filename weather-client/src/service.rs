//! Cache-aware weather lookups.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use weather_cache::TtlCache;
use weather_core::constants::{CURRENT_WEATHER_KEY_PREFIX, FORECAST_DAYS, FORECAST_KEY_PREFIX};
use weather_core::error::Result;
use weather_core::types::{CurrentWeather, ForecastReport, TemperatureThresholds};

use crate::client::OpenWeatherClient;
use crate::parse::{parse_current_weather, summarize_forecast};

/// A report stored in the shared cache.
///
/// Current-weather and forecast reports share one cache; the key prefix
/// decides which variant lives under a key.
#[derive(Clone, Debug)]
pub enum CachedReport {
    /// Stored under `weather_<city>`
    Current(CurrentWeather),
    /// Stored under `forecast_<city>`
    Forecast(ForecastReport),
}

/// The cache shared between the service and the API's expiry sweeper.
pub type ReportCache = TtlCache<CachedReport>;

/// Cache key for a city's current weather.
pub fn current_weather_key(city: &str) -> String {
    format!("{}{}", CURRENT_WEATHER_KEY_PREFIX, city.to_lowercase())
}

/// Cache key for a city's forecast.
pub fn forecast_key(city: &str) -> String {
    format!("{}{}", FORECAST_KEY_PREFIX, city.to_lowercase())
}

/// Weather lookups backed by OpenWeatherMap and a TTL cache.
///
/// Lookups for the same city differing only in letter case share a cache
/// entry. Upstream failures are never cached.
pub struct WeatherService {
    client: OpenWeatherClient,
    cache: Arc<ReportCache>,
    thresholds: TemperatureThresholds,
}

impl WeatherService {
    /// Creates a service over an existing cache handle.
    pub fn new(client: OpenWeatherClient, cache: Arc<ReportCache>, thresholds: TemperatureThresholds) -> Self {
        Self {
            client,
            cache,
            thresholds,
        }
    }

    /// Returns the shared cache handle.
    pub fn cache(&self) -> &Arc<ReportCache> {
        &self.cache
    }

    /// Returns the alert thresholds.
    pub fn thresholds(&self) -> &TemperatureThresholds {
        &self.thresholds
    }

    /// Returns current conditions for `city`, from cache when fresh.
    #[instrument(skip(self))]
    pub async fn get_current_weather(&self, city: &str) -> Result<CurrentWeather> {
        let key = current_weather_key(city);
        if let Some(CachedReport::Current(report)) = self.cache.get(&key) {
            debug!(key = %key, "Cache hit");
            return Ok(report);
        }

        debug!(key = %key, "Cache miss, fetching");
        let data = self.client.fetch_current(city).await?;
        let report = parse_current_weather(&data, &self.thresholds, Utc::now())?;

        self.cache.set(key, CachedReport::Current(report.clone()));
        info!(city = %report.city, temperature = report.temperature, "Fetched current weather");
        Ok(report)
    }

    /// Returns current conditions plus a five-day summary for `city`.
    ///
    /// Current conditions come through [`Self::get_current_weather`], so they
    /// are only fetched upstream when their own cache entry is missing.
    #[instrument(skip(self))]
    pub async fn get_forecast(&self, city: &str) -> Result<ForecastReport> {
        let key = forecast_key(city);
        if let Some(CachedReport::Forecast(report)) = self.cache.get(&key) {
            debug!(key = %key, "Cache hit");
            return Ok(report);
        }

        debug!(key = %key, "Cache miss, fetching");
        let data = self.client.fetch_forecast(city).await?;
        let summary = summarize_forecast(&data, FORECAST_DAYS)?;
        let current = self.get_current_weather(city).await?;

        let report = ForecastReport {
            city: summary.city,
            country: summary.country,
            current,
            forecast: summary.days,
            timestamp: Utc::now(),
        };

        self.cache.set(key, CachedReport::Forecast(report.clone()));
        info!(city = %report.city, days = report.forecast.len(), "Fetched forecast");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::{json, Value};
    use weather_core::error::WeatherError;
    use weather_core::types::TemperatureAlert;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::client::OpenWeatherConfig;

    fn current_payload(temp: f64) -> Value {
        json!({
            "name": "London",
            "sys": {"country": "GB"},
            "main": {"temp": temp, "feels_like": temp - 1.0, "humidity": 70, "pressure": 1015},
            "weather": [{"main": "Clear", "description": "clear sky", "icon": "01d"}],
            "wind": {"speed": 2.0}
        })
    }

    fn forecast_payload() -> Value {
        let base = 1_704_067_200i64;
        let list: Vec<Value> = (0..16)
            .map(|i| {
                json!({
                    "dt": base + i * 3 * 3600,
                    "main": {"temp": 5.0 + i as f64},
                    "weather": [{"main": "Clouds", "icon": "03d"}]
                })
            })
            .collect();
        json!({"city": {"name": "London", "country": "GB"}, "list": list})
    }

    fn service_for(server: &MockServer, ttl: Duration) -> WeatherService {
        let client = OpenWeatherClient::with_config(OpenWeatherConfig::new("k").with_base_url(server.uri())).unwrap();
        WeatherService::new(client, Arc::new(TtlCache::new(ttl)), TemperatureThresholds::default())
    }

    #[tokio::test]
    async fn test_current_weather_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_payload(36.0)))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server, Duration::from_secs(60));
        let first = service.get_current_weather("London").await.unwrap();
        let second = service.get_current_weather("LONDON").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.alert, Some(TemperatureAlert::High));
        assert!(service.cache().get("weather_london").is_some());
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_payload(12.0)))
            .expect(2)
            .mount(&server)
            .await;

        let service = service_for(&server, Duration::from_millis(1));
        service.get_current_weather("London").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        service.get_current_weather("London").await.unwrap();
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(404))
            .expect(2)
            .mount(&server)
            .await;

        let service = service_for(&server, Duration::from_secs(60));
        for _ in 0..2 {
            let err = service.get_current_weather("Atlantis").await.unwrap_err();
            assert!(err.is_not_found());
        }
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_forecast_reuses_cached_current_weather() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "London"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_payload(12.0)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_payload()))
            .expect(1)
            .mount(&server)
            .await;

        let service = service_for(&server, Duration::from_secs(60));
        let current = service.get_current_weather("London").await.unwrap();
        let forecast = service.get_forecast("London").await.unwrap();
        let again = service.get_forecast("london").await.unwrap();

        assert_eq!(forecast.current, current);
        assert_eq!(forecast.city, "London");
        assert_eq!(forecast.forecast.len(), 2);
        assert_eq!(forecast.forecast[0].min_temp, 5.0);
        assert_eq!(forecast.forecast[0].max_temp, 12.0);
        assert_eq!(again, forecast);
        assert_eq!(service.cache().len(), 2);
    }

    #[tokio::test]
    async fn test_forecast_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let service = service_for(&server, Duration::from_secs(60));
        let err = service.get_forecast("London").await.unwrap_err();
        assert!(matches!(err, WeatherError::UpstreamStatus(500)));
    }

    #[test]
    fn test_cache_keys() {
        assert_eq!(current_weather_key("New York"), "weather_new york");
        assert_eq!(forecast_key("KATHMANDU"), "forecast_kathmandu");
    }
}
