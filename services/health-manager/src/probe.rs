//! One health-probe cycle: snapshot accounts, probe every eligible one under
//! a fanout limit, and classify each outcome into the ok/rate-limit/auth/
//! network transition it applies. Never acquires a lease — every mutation is
//! guarded by `status='ready'` at the store layer, so a probe racing an
//! `acquire()` is a no-op rather than clobbering a fresh lease.

use std::sync::Arc;

use account_pool::AccountPool;
use scrape_provider::{ErrorClass, ProbeAccount, ScrapeCollaborator, classify_message};
use tokio::sync::Semaphore;
use tracing::warn;

use crate::metrics;

/// Concurrent-probe ceiling for one cycle.
const FANOUT_LIMIT: usize = 10;

pub struct ProbeConfig {
    pub cooldown_bad_secs: i64,
    pub cooldown_rate_secs: i64,
    pub quarantine_fails: i64,
}

/// Run one complete probe cycle over every currently-eligible account.
pub async fn run_cycle(
    pool: &Arc<AccountPool>,
    scraper: &Arc<dyn ScrapeCollaborator>,
    config: &ProbeConfig,
    now: i64,
) -> account_pool::Result<()> {
    let accounts = pool.list_accounts().await?;
    let counts = pool.health_report().await?;
    metrics::record_health_counts(&counts);

    let candidates: Vec<_> = accounts.into_iter().filter(|a| a.is_eligible(now)).collect();
    let semaphore = Arc::new(Semaphore::new(FANOUT_LIMIT));
    let mut handles = Vec::with_capacity(candidates.len());

    for account in candidates {
        let pool = Arc::clone(pool);
        let scraper = Arc::clone(scraper);
        let semaphore = Arc::clone(&semaphore);
        let cooldown_bad_secs = config.cooldown_bad_secs;
        let cooldown_rate_secs = config.cooldown_rate_secs;
        let quarantine_fails = config.quarantine_fails;

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            probe_one(
                &pool,
                scraper.as_ref(),
                &account.account_id,
                &account.username,
                account.proxy_id.as_deref(),
                cooldown_bad_secs,
                cooldown_rate_secs,
                quarantine_fails,
            )
            .await;
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "probe task panicked");
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn probe_one(
    pool: &AccountPool,
    scraper: &dyn ScrapeCollaborator,
    account_id: &str,
    username: &str,
    proxy_http: Option<&str>,
    cooldown_bad_secs: i64,
    cooldown_rate_secs: i64,
    quarantine_fails: i64,
) {
    let probe_account = ProbeAccount {
        account_id: account_id.to_string(),
        username: username.to_string(),
        proxy_http: proxy_http.map(str::to_string),
    };

    let result = match scraper.probe(&probe_account).await {
        Ok(()) => {
            metrics::record_probe_outcome("ok");
            pool.probe_recover(account_id).await.map(|_| ())
        }
        Err(e) => match classify_message(&e.message) {
            ErrorClass::RateLimit => {
                metrics::record_probe_outcome("rate-limit");
                pool.probe_cooldown(account_id, cooldown_rate_secs, "rate-limit")
                    .await
                    .map(|_| ())
            }
            ErrorClass::Auth => {
                metrics::record_probe_outcome("auth");
                pool.probe_quarantine(account_id, "auth").await.map(|_| ())
            }
            ErrorClass::Network | ErrorClass::Ok => {
                metrics::record_probe_outcome("network");
                pool.probe_network_fail(account_id, cooldown_bad_secs, quarantine_fails, "network")
                    .await
                    .map(|_| ())
            }
        },
    };

    if let Err(e) = result {
        warn!(account_id, error = %e, "failed to persist probe outcome");
    }
}
