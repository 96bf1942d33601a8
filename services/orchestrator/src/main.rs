//! Orchestrator: the autoscaling worker fleet that binds ready jobs to
//! leased accounts and drives the external scraping collaborator (C5).

mod config;
mod metrics;
mod supervisor;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use account_pool::AccountPool;
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use job_scheduler::{CatalogCache, CooldownRange, JobCheckpointStore, JobStateStore};
use metrics_exporter_prometheus::PrometheusHandle;
use rate_limiter::RateLimiter;
use scrape_provider::{NullScraper, ScrapeCollaborator};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::worker::{WorkerConfig, WorkerDeps};

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

    info!("starting orchestrator");

    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("config/orchestrator.toml"));

    info!(path = %config_path.display(), "loading configuration");
    let config =
        Config::load(&config_path).with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let pool = Arc::new(
        AccountPool::connect(&config.accounts_db_url, config.proxies_json.clone(), Duration::from_secs(60))
            .await
            .context("failed to open account pool store")?,
    );

    let limiter = RateLimiter::connect(&config.rate_db_url)
        .await
        .context("failed to open rate limiter store")?;
    limiter
        .ensure_bucket(&config.rate_bucket_name, config.rate_bucket_capacity, config.rate_bucket_refill)
        .await
        .context("failed to seed rate bucket")?;
    // The bucket is provisioned here so it exists before any collaborator
    // needs it; a real collaborator implementation opens its own handle to
    // the same database and acquires tokens per outbound request.
    drop(limiter);

    // Bootstraps the checkpoint schema; a real collaborator owns its own
    // handle (constructor-injected) and writes to it per job run, since the
    // `ScrapeCollaborator` trait has no per-call checkpoint parameter.
    let _job_checkpoints = JobCheckpointStore::connect(&config.job_checkpoints_db_url)
        .await
        .context("failed to open job checkpoint store")?;

    let catalog = Arc::new(CatalogCache::new(config.catalog_path.clone(), Duration::from_secs(config.poll_seconds)));
    let job_state = Arc::new(JobStateStore::new(
        config.job_state_path.clone(),
        CooldownRange {
            min_secs: config.job_cooldown_min_secs,
            max_secs: config.job_cooldown_max_secs,
        },
    ));

    let scraper: Arc<dyn ScrapeCollaborator> = Arc::new(NullScraper);

    let worker_deps = Arc::new(WorkerDeps {
        pool: Arc::clone(&pool),
        catalog,
        job_state,
        scraper,
        scraper_target: config.scraper_target.clone(),
        config: WorkerConfig {
            idle_sleep: Duration::from_secs(config.idle_sleep_secs),
            entity_limit: config.entity_limit,
            rate_limit_cooldown_secs: config.rate_limit_cooldown_secs,
        },
    });

    let prom_handle = metrics::install_recorder();
    let metrics_app = Router::new().route("/metrics", get(metrics_handler)).with_state(prom_handle);
    let listener = TcpListener::bind(("0.0.0.0", config.prom_port))
        .await
        .with_context(|| format!("failed to bind metrics port {}", config.prom_port))?;
    info!(port = config.prom_port, "metrics endpoint listening");

    let shutdown = CancellationToken::new();

    let metrics_shutdown = shutdown.clone();
    let metrics_server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, metrics_app)
            .with_graceful_shutdown(async move { metrics_shutdown.cancelled().await })
            .await
        {
            tracing::error!(error = %e, "metrics server error");
        }
    });

    let supervisor_shutdown = shutdown.clone();
    let poll = Duration::from_secs(config.poll_seconds);
    let supervisor = tokio::spawn(async move {
        supervisor::run(pool, worker_deps, poll, supervisor_shutdown).await;
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    shutdown.cancel();

    let _ = supervisor.await;
    let _ = metrics_server.await;
    info!("shutdown complete");
    Ok(())
}

async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
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
