//! # Weather API Server
//!
//! REST API over the cache-aware weather service.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /weather?city=` - Current conditions for a city
//! - `GET /forecast?city=` - Current conditions plus a five-day summary
//! - `GET /logs` - Most recent application log lines, newest first
//! - `GET /admin/cache/stats` - Cache occupancy
//! - `POST /admin/cache/clear` - Drop every cached report
//!
//! ## Example
//!
//! ```rust,ignore
//! use weather_api::{ApiServer, ApiConfig};
//!
//! let config = ApiConfig::from_env()?;
//! let server = ApiServer::new(config)?;
//! server.run(([0, 0, 0, 0], 5000)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod logs;
mod routes;
mod state;

pub use error::ApiError;
pub use logs::recent_log_lines;
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use weather_cache::TtlCache;
use weather_core::error::Result;

/// API server for the weather service.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a new API server with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self {
            state: Arc::new(AppState::new(config)?),
        })
    }

    /// Returns the shared application state.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Creates the router with all routes and middleware configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address until Ctrl-C.
    ///
    /// Also starts the periodic cache sweep for the lifetime of the server.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        let sweeper = spawn_expiry_sweeper(
            self.state.cache.clone(),
            Duration::from_secs(self.state.config.sweep_interval_seconds),
        );

        info!("Weather API server listening on {}", addr);

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.abort();
        info!("Weather API server stopped");
        result
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
}

/// Spawns a task that removes expired cache entries every `interval`.
///
/// The cache stays passive; this task is its only scheduler. Abort the
/// returned handle to stop sweeping.
pub fn spawn_expiry_sweeper<V>(cache: Arc<TtlCache<V>>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    let interval = interval.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = cache.remove_expired();
            if removed > 0 {
                debug!(removed, remaining = cache.len(), "Swept expired cache entries");
            }
        }
    })
}
