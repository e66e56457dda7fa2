//! SensorHub GW - Rust implementation
//!
//! Mirrors the JSON state files the firmware drops into a watched directory
//! into an in-memory store and serves them to the web dashboard.

use anyhow::Result;
use clap::Parser;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sensorhub_gw::api::{self, ApiState};
use sensorhub_gw::config::AppConfig;
use sensorhub_gw::pipeline::{watcher::DirWatcher, UpdatePipeline};
use sensorhub_gw::state::StateStore;

/// SensorHub Gateway - serve firmware JSON state files to the dashboard
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting SensorHub GW...");
    info!("Configuration file: {}", args.config);

    let config = AppConfig::load(&args.config).await?;

    run_app(config, shutdown_signal()).await?;

    info!("SensorHub GW shutdown complete");
    Ok(())
}

async fn run_app(config: AppConfig, shutdown: impl Future<Output = ()>) -> Result<()> {
    // Fail fast on a half-configured deployment: both directories and both
    // ports must be usable before any events are accepted.
    anyhow::ensure!(
        config.http.static_dir.is_dir(),
        "static assets directory does not exist: {}",
        config.http.static_dir.display()
    );
    let watcher = DirWatcher::new(&config.watch.dir)?;

    let store = StateStore::new();
    // Slow push clients skip ahead rather than backing up the pipeline.
    let (updates_tx, _) = broadcast::channel(64);

    let api_state = Arc::new(ApiState {
        store: store.clone(),
        updates: updates_tx.clone(),
    });

    let http_listener = api::bind(config.http.port).await?;
    let mut servers = vec![tokio::spawn(api::serve_http(
        http_listener,
        api_state.clone(),
        config.http.static_dir.clone(),
    ))];

    if let Some(push) = &config.push {
        let push_listener = api::bind(push.port).await?;
        servers.push(tokio::spawn(api::serve_push(push_listener, api_state)));
    }

    // The pipeline is the foreground loop; it drains in-flight work before
    // returning once the shutdown future resolves.
    let pipeline = UpdatePipeline::new(&config.watch, store, updates_tx);
    pipeline.run(watcher, shutdown).await;

    info!("Shutting down...");
    for server in servers {
        server.abort();
    }

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
