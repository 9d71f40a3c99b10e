//! OpenWeatherMap client and the cache-aware weather lookup service.
//!
//! [`OpenWeatherClient`] performs raw upstream requests; [`WeatherService`]
//! normalizes the responses and keeps them in a shared TTL cache.

mod client;
mod parse;
mod service;

pub use client::{OpenWeatherClient, OpenWeatherConfig};
pub use parse::{parse_current_weather, summarize_forecast, ForecastSummary};
pub use service::{current_weather_key, forecast_key, CachedReport, ReportCache, WeatherService};
