//! Normalization of OpenWeatherMap payloads into report types.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use weather_core::error::{Result, WeatherError};
use weather_core::types::{round_one_decimal, CurrentWeather, DailyForecast, TemperatureThresholds};

fn missing(pointer: &str) -> WeatherError {
    WeatherError::InvalidResponse(format!("missing or mistyped field `{}`", pointer))
}

fn f64_at(data: &Value, pointer: &str) -> Result<f64> {
    data.pointer(pointer).and_then(Value::as_f64).ok_or_else(|| missing(pointer))
}

fn i64_at(data: &Value, pointer: &str) -> Result<i64> {
    data.pointer(pointer)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
        .ok_or_else(|| missing(pointer))
}

fn str_at(data: &Value, pointer: &str) -> Result<String> {
    data.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing(pointer))
}

/// Builds a [`CurrentWeather`] from a `/weather` response.
pub fn parse_current_weather(
    data: &Value,
    thresholds: &TemperatureThresholds,
    fetched_at: DateTime<Utc>,
) -> Result<CurrentWeather> {
    let temp = f64_at(data, "/main/temp")?;

    Ok(CurrentWeather {
        city: str_at(data, "/name")?,
        country: str_at(data, "/sys/country")?,
        temperature: round_one_decimal(temp),
        feels_like: round_one_decimal(f64_at(data, "/main/feels_like")?),
        humidity: i64_at(data, "/main/humidity")?,
        condition: str_at(data, "/weather/0/main")?,
        description: str_at(data, "/weather/0/description")?,
        icon: str_at(data, "/weather/0/icon")?,
        wind_speed: round_one_decimal(f64_at(data, "/wind/speed")?),
        pressure: i64_at(data, "/main/pressure")?,
        timestamp: fetched_at,
        alert: thresholds.check_alert(temp),
    })
}

/// City metadata and daily summaries extracted from a `/forecast` response.
#[derive(Clone, Debug, PartialEq)]
pub struct ForecastSummary {
    /// City name
    pub city: String,
    /// ISO country code
    pub country: String,
    /// Daily summaries, ascending by date
    pub days: Vec<DailyForecast>,
}

#[derive(Default)]
struct DayReadings {
    temps: Vec<f64>,
    conditions: Vec<String>,
    icons: Vec<String>,
}

/// Groups 3-hourly forecast items by UTC calendar date and summarizes the
/// first `max_days` dates.
pub fn summarize_forecast(data: &Value, max_days: usize) -> Result<ForecastSummary> {
    let items = data
        .pointer("/list")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("/list"))?;

    let mut by_date: BTreeMap<NaiveDate, DayReadings> = BTreeMap::new();
    for item in items {
        let dt = i64_at(item, "/dt")?;
        let date = DateTime::from_timestamp(dt, 0)
            .ok_or_else(|| WeatherError::InvalidResponse(format!("timestamp out of range: {}", dt)))?
            .date_naive();

        let day = by_date.entry(date).or_default();
        day.temps.push(f64_at(item, "/main/temp")?);
        day.conditions.push(str_at(item, "/weather/0/main")?);
        day.icons.push(str_at(item, "/weather/0/icon")?);
    }

    let days = by_date
        .into_iter()
        .take(max_days)
        .map(|(date, day)| DailyForecast {
            date: date.format("%Y-%m-%d").to_string(),
            day_name: date.format("%A").to_string(),
            min_temp: round_one_decimal(day.temps.iter().copied().fold(f64::INFINITY, f64::min)),
            max_temp: round_one_decimal(day.temps.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            condition: most_common(&day.conditions),
            icon: most_common(&day.icons),
        })
        .collect();

    Ok(ForecastSummary {
        city: str_at(data, "/city/name")?,
        country: str_at(data, "/city/country")?,
        days,
    })
}

/// Most frequent value; ties go to the value seen first.
fn most_common(values: &[String]) -> String {
    let mut best: Option<(&String, usize)> = None;
    for (i, value) in values.iter().enumerate() {
        if values[..i].contains(value) {
            continue;
        }
        let count = values.iter().filter(|v| *v == value).count();
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.clone()).unwrap_or_default()
}
