//! Health manager: periodically probes eligible accounts and applies the
//! ok/rate-limit/auth/network transition, independent of the orchestrator's
//! worker processes. Never acquires a lease.

mod config;
mod metrics;
mod probe;

use std::sync::Arc;
use std::time::Duration;

use account_pool::AccountPool;
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use rate_limiter::RateLimiter;
use scrape_provider::{NullScraper, ScrapeCollaborator};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::probe::ProbeConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting health-manager");

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("config/health-manager.toml"));

    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let pool = Arc::new(
        AccountPool::connect(
            &config.accounts_db_url,
            config.proxies_json.clone(),
            Duration::from_secs(60),
        )
        .await
        .context("failed to open account pool store")?,
    );

    let limiter = RateLimiter::connect(&config.rate_db_url)
        .await
        .context("failed to open rate limiter store")?;
    limiter
        .ensure_bucket(
            &config.rate_bucket_name,
            config.rate_bucket_capacity,
            config.rate_bucket_refill,
        )
        .await
        .context("failed to seed rate bucket")?;

    let scraper: Arc<dyn ScrapeCollaborator> = Arc::new(NullScraper);

    let prom_handle = metrics::install_recorder();
    let metrics_app = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prom_handle);

    let listener = TcpListener::bind(("0.0.0.0", config.prom_port))
        .await
        .with_context(|| format!("failed to bind metrics port {}", config.prom_port))?;
    info!(port = config.prom_port, "metrics endpoint listening");

    let metrics_server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, metrics_app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            tracing::error!(error = %e, "metrics server error");
        }
    });

    let probe_config = ProbeConfig {
        cooldown_bad_secs: config.cooldown_bad_secs,
        cooldown_rate_secs: config.cooldown_rate_secs,
        quarantine_fails: config.quarantine_fails,
    };
    let interval = Duration::from_secs(config.interval_secs);

    let probe_loop = async {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let now = common::now_secs();
            if let Err(e) = probe::run_cycle(&pool, &scraper, &probe_config, now).await {
                tracing::warn!(error = %e, "probe cycle failed");
            }
        }
    };

    tokio::select! {
        _ = probe_loop => {}
        _ = shutdown_signal() => info!("shutting down"),
    }

    metrics_server.abort();
    info!("shutdown complete");
    Ok(())
}

async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}
