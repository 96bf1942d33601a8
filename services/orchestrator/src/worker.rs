//! Per-worker loop: pull a ready job, acquire a lease, invoke the external
//! scraping collaborator, and dispatch the outcome per §4.5/§7's shared
//! classification. Cancellation is observed only at the loop boundary —a
//! worker never holds a lease across a suspension longer than one scrape
//! call, per §5's cancellation contract.

use std::sync::Arc;
use std::time::Duration;

use account_pool::{AccountPool, Lease};
use job_scheduler::{CatalogCache, Job, JobStateStore, select_weighted};
use scrape_provider::{ErrorClass, ScrapeCollaborator, classify_message};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::metrics;

/// Tunables that shape one worker's loop; owned by the supervisor and
/// shared (read-only) across every worker it spawns.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub idle_sleep: Duration,
    pub entity_limit: u64,
    pub rate_limit_cooldown_secs: i64,
}

/// Dependencies every worker needs, shared via `Arc` across the fleet.
pub struct WorkerDeps {
    pub pool: Arc<AccountPool>,
    pub catalog: Arc<CatalogCache>,
    pub job_state: Arc<JobStateStore>,
    pub scraper: Arc<dyn ScrapeCollaborator>,
    pub scraper_target: String,
    pub config: WorkerConfig,
}

/// Run one worker's loop until `cancel` fires. Never panics on a
/// collaborator or store error — those are logged and the loop continues
/// (or backs off), matching §7's "never terminates a worker silently".
pub async fn run(worker_id: String, deps: Arc<WorkerDeps>, cancel: CancellationToken) {
    info!(worker_id, "worker starting");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let jobs = match deps
            .catalog
            .jobs_for(|id| id.starts_with(deps.scraper_target.as_str()))
            .await
        {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(worker_id, error = %e, "catalog refresh failed");
                if sleep_or_cancel(Duration::from_secs(5), &cancel).await {
                    break;
                }
                continue;
            }
        };

        let now = common::now_secs();
        let ready = match deps.job_state.ready_jobs(jobs, now).await {
            Ok(r) => r,
            Err(e) => {
                warn!(worker_id, error = %e, "job state read failed");
                if sleep_or_cancel(Duration::from_secs(5), &cancel).await {
                    break;
                }
                continue;
            }
        };

        let Some(job) = select_weighted(&ready).cloned() else {
            if sleep_or_cancel(deps.config.idle_sleep, &cancel).await {
                break;
            }
            continue;
        };

        let lease = match deps.pool.acquire().await {
            Ok(lease) => lease,
            Err(account_pool::Error::NoReadyAccount) => {
                if sleep_or_cancel(Duration::from_secs(10), &cancel).await {
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!(worker_id, error = %e, "account pool store unavailable");
                if sleep_or_cancel(Duration::from_secs(5), &cancel).await {
                    break;
                }
                continue;
            }
        };

        let subreddit = job_subreddit(&job);
        if let Err(e) = deps
            .pool
            .checkpoint_start(&worker_id, lease.account_id(), &subreddit)
            .await
        {
            warn!(worker_id, error = %e, "failed to write start checkpoint");
        }

        run_job(&worker_id, &job, &subreddit, lease, &deps).await;
    }

    info!(worker_id, "worker stopped");
}

/// Sleep for `duration`, or return early (with `true`) if cancelled first.
async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = sleep(duration) => false,
        _ = cancel.cancelled() => true,
    }
}

fn job_subreddit(job: &Job) -> String {
    job.params
        .get("subreddit")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Execute one job to completion on an already-acquired lease, then close
/// the lease via exactly one of `release`/`cooldown`/`quarantine`.
async fn run_job(worker_id: &str, job: &Job, subreddit: &str, lease: Lease, deps: &WorkerDeps) {
    let now = common::now_secs();
    let proxy_id = lease.proxy.as_ref().map(|p| p.proxy_id.clone());

    metrics::record_request(subreddit);

    match deps.scraper.scrape(job, &lease, Arc::clone(&deps.pool)).await {
        Ok(outcome) => {
            let item_count = outcome.item_count.min(deps.config.entity_limit);
            if outcome.item_count > deps.config.entity_limit {
                warn!(
                    worker_id,
                    job_id = %job.id,
                    produced = outcome.item_count,
                    limit = deps.config.entity_limit,
                    "scraper exceeded the per-run entity limit; excess not reflected in metrics"
                );
            }
            metrics::record_items("item", subreddit, item_count);

            let last_post_id = outcome.item_ids.iter().rev().find(|id| id.starts_with("t3_")).cloned();
            let last_comment_id = outcome.item_ids.iter().rev().find(|id| id.starts_with("t1_")).cloned();

            if let Err(e) = deps.job_state.mark_run(&job.id, now).await {
                warn!(worker_id, job_id = %job.id, error = %e, "failed to record job cooldown");
            }
            if let Err(e) = deps
                .pool
                .checkpoint_success(worker_id, last_post_id.as_deref(), last_comment_id.as_deref())
                .await
            {
                warn!(worker_id, job_id = %job.id, error = %e, "failed to write success checkpoint");
            }
            if let Some(proxy_id) = &proxy_id {
                deps.pool.note_proxy_outcome(proxy_id, true).await;
            }
            if let Err(e) = deps.pool.release(&lease, true).await {
                warn!(worker_id, error = %e, "failed to release lease");
            }
            info!(worker_id, job_id = %job.id, items = item_count, "job completed");
        }
        Err(e) => {
            let class = classify_message(&e.message);
            metrics::record_account_error(match class {
                ErrorClass::RateLimit => "rate-limit",
                ErrorClass::Auth => "auth",
                ErrorClass::Network | ErrorClass::Ok => "network",
            });

            if let Err(err) = deps.job_state.mark_run(&job.id, now).await {
                warn!(worker_id, job_id = %job.id, error = %err, "failed to record job cooldown after error");
            }

            let close_result = match class {
                ErrorClass::RateLimit => {
                    deps.pool
                        .cooldown(&lease, deps.config.rate_limit_cooldown_secs, "rate-limit")
                        .await
                }
                ErrorClass::Auth => deps.pool.quarantine(&lease, "auth").await,
                ErrorClass::Network | ErrorClass::Ok => deps.pool.release(&lease, false).await,
            };
            if let Err(err) = close_result {
                warn!(worker_id, error = %err, "failed to close lease after error");
            }
            if let Some(proxy_id) = &proxy_id {
                deps.pool.note_proxy_outcome(proxy_id, false).await;
            }
            if let Err(err) = deps.pool.checkpoint_error(worker_id).await {
                warn!(worker_id, job_id = %job.id, error = %err, "failed to write error checkpoint");
            }
            warn!(worker_id, job_id = %job.id, message = %e.message, "job failed");
            sleep(Duration::from_secs(10)).await;
        }
    }
}
