//! Weather CLI
//!
//! Runs the HTTP API, performs one-off lookups, and captures city snapshots.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use weather_api::{ApiConfig, ApiServer, AppState};
use weather_client::{OpenWeatherClient, OpenWeatherConfig};
use weather_core::constants::{DEFAULT_LOG_DIR, DEFAULT_PORT, LOG_FILE_NAME};
use weather_core::types::{CurrentWeather, ForecastReport};
use weather_snapshot::{
    ConsumerConfig, FileObjectStore, FileSnapshotTable, MemoryQueue, SnapshotConsumer,
    SnapshotProducer,
};

/// Weather service with cached OpenWeatherMap lookups
#[derive(Parser)]
#[command(name = "weather")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory for the application log file
    #[arg(long, global = true, env = "LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Show current conditions for a city
    Current {
        /// City name, optionally with country code (e.g. "London,GB")
        city: String,
        /// Print the raw report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a five-day forecast for a city
    Forecast {
        /// City name, optionally with country code
        city: String,
        /// Print the raw report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Capture one snapshot of every tracked city to disk
    Snapshot {
        /// Directory receiving archived payloads and the snapshot table
        #[arg(short, long, default_value = "snapshots")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let _log_guard = init_logging(cli.verbose, &cli.log_dir)?;

    match cli.command {
        Commands::Serve { port, bind } => cmd_serve(port, &bind).await,
        Commands::Current { city, json } => cmd_current(&city, json).await,
        Commands::Forecast { city, json } => cmd_forecast(&city, json).await,
        Commands::Snapshot { output_dir } => cmd_snapshot(&output_dir).await,
    }
}

/// Installs a stderr layer and a plain-text file layer at `<log_dir>/app.log`.
fn init_logging(verbose: bool, log_dir: &Path) -> Result<WorkerGuard> {
    let filter = if verbose {
        "weather_cli=debug,weather_api=debug,weather_client=debug,weather_cache=debug,weather_snapshot=debug,info"
    } else {
        "info"
    };
    let env_filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_filter(env_filter()),
        )
        .init();

    Ok(guard)
}

fn load_state() -> Result<AppState> {
    let config = ApiConfig::from_env().context("Failed to load configuration")?;
    AppState::new(config).context("Failed to initialize weather service")
}

/// Run API server
async fn cmd_serve(port: u16, bind: &str) -> Result<()> {
    println!("{}", "🌤  Starting weather API server...".cyan().bold());
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);
    println!("\n   Press Ctrl+C to stop.\n");

    let config = ApiConfig::from_env().context("Failed to load configuration")?;
    let server = ApiServer::new(config).context("Failed to initialize server")?;

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .context("Invalid bind address")?;
    info!(%addr, "Serving weather API");
    server.run(addr).await?;

    Ok(())
}

/// Current conditions
async fn cmd_current(city: &str, json: bool) -> Result<()> {
    let state = load_state()?;
    let report = state
        .weather
        .get_current_weather(city)
        .await
        .with_context(|| format!("Failed to fetch weather for {}", city))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_current(&report);
    }
    Ok(())
}

/// Forecast
async fn cmd_forecast(city: &str, json: bool) -> Result<()> {
    let state = load_state()?;
    let report = state
        .weather
        .get_forecast(city)
        .await
        .with_context(|| format!("Failed to fetch forecast for {}", city))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_forecast(&report);
    }
    Ok(())
}

/// Produce one snapshot per tracked city and drain it to disk
async fn cmd_snapshot(output_dir: &Path) -> Result<()> {
    println!("{}", "📸 Capturing weather snapshots...".cyan().bold());

    let config = ApiConfig::from_env().context("Failed to load configuration")?;
    let client = OpenWeatherClient::with_config(
        OpenWeatherConfig::new(config.api_key.clone()).with_base_url(config.base_url.clone()),
    )?;

    let queue = Arc::new(MemoryQueue::new());
    let store = Arc::new(FileObjectStore::new(output_dir));
    let table = Arc::new(FileSnapshotTable::new(output_dir.join("snapshots.jsonl")));

    let produced = SnapshotProducer::new(client, queue.clone())
        .run_once()
        .await
        .context("Failed to enqueue snapshots")?;
    info!(sent = produced.sent.len(), failed = produced.failed.len(), "Snapshots enqueued");
    for city in &produced.failed {
        warn!(city = %city, "Snapshot fetch failed");
        println!("   {} {}", "✗ fetch failed:".red(), city);
    }

    // Everything is already enqueued, so never wait on an empty queue.
    let consumer = SnapshotConsumer::new(queue.clone(), store, table.clone(), config.thresholds)
        .with_config(ConsumerConfig {
            wait: Duration::ZERO,
            ..ConsumerConfig::default()
        });

    let mut stored = 0;
    loop {
        let report = consumer.poll_once().await.context("Failed to consume snapshots")?;
        if report.received == 0 {
            break;
        }
        stored += report.stored;
    }
    info!(stored, output_dir = %output_dir.display(), "Snapshots stored");

    println!(
        "\n{} {} of {} snapshot(s) stored",
        "✅".green(),
        stored,
        produced.sent.len() + produced.failed.len()
    );
    println!("   {} {}", "Objects:".dimmed(), output_dir.display());
    println!("   {} {}", "Table:".dimmed(), table.path().display());

    Ok(())
}

fn print_current(report: &CurrentWeather) {
    println!(
        "\n{} {}, {}",
        "📍".cyan(),
        report.city.bold(),
        report.country
    );
    println!(
        "   {} {}°C (feels like {}°C)",
        "Temperature:".yellow(),
        report.temperature,
        report.feels_like
    );
    println!("   {} {} ({})", "Conditions:".yellow(), report.condition, report.description);
    println!("   {} {}%", "Humidity:".dimmed(), report.humidity);
    println!("   {} {} hPa", "Pressure:".dimmed(), report.pressure);
    println!("   {} {} m/s", "Wind:".dimmed(), report.wind_speed);
    if let Some(alert) = &report.alert {
        println!("\n   {}", format!("⚠️  {}", alert).red().bold());
    }
}

fn print_forecast(report: &ForecastReport) {
    print_current(&report.current);
    println!("\n{}", "📅 Forecast:".green().bold());
    for day in &report.forecast {
        println!(
            "   {:<10} {}  {:>5}°C / {:>5}°C  {}",
            day.day_name,
            day.date.dimmed(),
            day.min_temp,
            day.max_temp,
            day.condition
        );
    }
}
