//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::{error, info, warn};

use weather_cache::CacheStats;
use weather_core::constants::RECENT_LOG_COUNT;
use weather_core::types::{CurrentWeather, ForecastReport};

use crate::dto::*;
use crate::error::ApiError;
use crate::logs::recent_log_lines;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

const CITY_REQUIRED: &str = "City parameter is required";

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════
// Weather Handlers
// ═══════════════════════════════════════════════════════════════════════════

/// GET /weather?city=
pub async fn get_weather(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CityQuery>,
) -> Result<Json<CurrentWeather>> {
    let city = query.city().ok_or_else(|| ApiError::bad_request(CITY_REQUIRED))?;
    info!(city = %city, "Weather request");

    let report = state
        .weather
        .get_current_weather(city)
        .await
        .map_err(|e| ApiError::from_lookup(e, "Failed to fetch weather data"))?;

    if let Some(alert) = &report.alert {
        warn!(city = %report.city, temperature = report.temperature, "{}", alert);
    }

    Ok(Json(report))
}

/// GET /forecast?city=
pub async fn get_forecast(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CityQuery>,
) -> Result<Json<ForecastReport>> {
    let city = query.city().ok_or_else(|| ApiError::bad_request(CITY_REQUIRED))?;
    info!(city = %city, "Forecast request");

    let report = state
        .weather
        .get_forecast(city)
        .await
        .map_err(|e| ApiError::from_lookup(e, "Failed to fetch forecast data"))?;

    if let Some(alert) = &report.current.alert {
        warn!(city = %report.city, temperature = report.current.temperature, "{}", alert);
    }

    Ok(Json(report))
}

/// GET /logs
pub async fn get_logs(State(state): State<Arc<AppState>>) -> Result<Json<LogsResponse>> {
    let path = state.config.log_path();
    let logs = recent_log_lines(&path, RECENT_LOG_COUNT).await.map_err(|e| {
        error!(path = ?path, error = %e, "Failed to read log file");
        ApiError::internal("Failed to fetch logs")
    })?;

    Ok(Json(LogsResponse { logs }))
}

// ═══════════════════════════════════════════════════════════════════════════
// Admin Handlers
// ═══════════════════════════════════════════════════════════════════════════

/// POST /admin/cache/clear
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<ClearCacheResponse> {
    state.cache.clear();
    info!("Cache cleared");
    Json(ClearCacheResponse { cleared: true })
}

/// GET /admin/cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.cache.stats())
}

/// Any unmatched path.
pub async fn fallback() -> ApiError {
    ApiError::not_found("Endpoint not found")
}
