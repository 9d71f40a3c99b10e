//! Weather reports served by the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TemperatureAlert;

/// Normalized current conditions for one city.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// City name as reported by the provider
    pub city: String,
    /// ISO country code
    pub country: String,
    /// Temperature in °C, one decimal
    pub temperature: f64,
    /// Perceived temperature in °C, one decimal
    pub feels_like: f64,
    /// Relative humidity (%)
    pub humidity: i64,
    /// Short condition label (e.g. "Clouds")
    pub condition: String,
    /// Long condition description (e.g. "scattered clouds")
    pub description: String,
    /// Provider icon code
    pub icon: String,
    /// Wind speed in m/s, one decimal
    pub wind_speed: f64,
    /// Atmospheric pressure (hPa)
    pub pressure: i64,
    /// When the report was fetched
    pub timestamp: DateTime<Utc>,
    /// Temperature alert, if the reading crossed a threshold
    pub alert: Option<TemperatureAlert>,
}

/// One day of a forecast summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    /// English weekday name
    pub day_name: String,
    /// Lowest temperature of the day, one decimal
    pub min_temp: f64,
    /// Highest temperature of the day, one decimal
    pub max_temp: f64,
    /// Most frequent condition of the day
    pub condition: String,
    /// Most frequent icon of the day
    pub icon: String,
}

/// Current conditions plus a multi-day forecast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    /// City name as reported by the provider
    pub city: String,
    /// ISO country code
    pub country: String,
    /// Current conditions at fetch time
    pub current: CurrentWeather,
    /// Daily summaries, ascending by date
    pub forecast: Vec<DailyForecast>,
    /// When the forecast was fetched
    pub timestamp: DateTime<Utc>,
}

/// Rounds to one decimal place, the precision used in all reports.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
