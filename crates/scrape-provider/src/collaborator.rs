//! The seam at which a real scraping engine plugs in.
//!
//! No concrete implementation lives in this crate; `NullScraper` exists only
//! so tests elsewhere in the workspace can exercise the orchestrator and
//! health manager without a real remote client.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use account_pool::{AccountPool, Lease};
use job_scheduler::Job;

use crate::error::{Result, ScrapeError};

/// Items produced by one worker iteration, used to derive the next worker
/// checkpoint (`t3_`/`t1_` prefix matching happens at the call site).
#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    pub item_ids: Vec<String>,
    pub item_count: u64,
}

/// The account handed to a health-manager probe. Narrower than `Lease`
/// because a probe never holds an actual lease on the account.
#[derive(Debug, Clone)]
pub struct ProbeAccount {
    pub account_id: String,
    pub username: String,
    pub proxy_http: Option<String>,
}

/// External scraping engine, invoked by each orchestrator worker and by the
/// health manager's probe loop.
///
/// Uses `Pin<Box<dyn Future>>` return types so the trait stays
/// dyn-compatible (`Arc<dyn ScrapeCollaborator>`).
pub trait ScrapeCollaborator: Send + Sync {
    /// Run one job to completion using the given lease, returning the
    /// produced item ids for checkpoint derivation.
    fn scrape<'a>(
        &'a self,
        job: &'a Job,
        lease: &'a Lease,
        pool: Arc<AccountPool>,
    ) -> Pin<Box<dyn Future<Output = Result<ScrapeOutcome>> + Send + 'a>>;

    /// Issue the cheapest possible request against `account`, used by the
    /// health manager to decide ok/rate-limit/auth/network.
    fn probe<'a>(
        &'a self,
        account: &'a ProbeAccount,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Test double that always succeeds with no items, and always probes clean.
pub struct NullScraper;

impl ScrapeCollaborator for NullScraper {
    fn scrape<'a>(
        &'a self,
        _job: &'a Job,
        _lease: &'a Lease,
        _pool: Arc<AccountPool>,
    ) -> Pin<Box<dyn Future<Output = Result<ScrapeOutcome>> + Send + 'a>> {
        Box::pin(async { Ok(ScrapeOutcome::default()) })
    }

    fn probe<'a>(
        &'a self,
        _account: &'a ProbeAccount,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }
}

/// A `ScrapeCollaborator` whose every call fails, for exercising worker and
/// probe error-dispatch paths.
pub struct FailingScraper {
    pub message: String,
}

impl ScrapeCollaborator for FailingScraper {
    fn scrape<'a>(
        &'a self,
        _job: &'a Job,
        _lease: &'a Lease,
        _pool: Arc<AccountPool>,
    ) -> Pin<Box<dyn Future<Output = Result<ScrapeOutcome>> + Send + 'a>> {
        Box::pin(async move { Err(ScrapeError::new(self.message.clone())) })
    }

    fn probe<'a>(
        &'a self,
        _account: &'a ProbeAccount,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move { Err(ScrapeError::new(self.message.clone())) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use account_pool::{AccountCredentials, Lease};
    use common::Secret;
    use job_scheduler::Job;
    use serde_json::json;

    fn test_job() -> Job {
        Job {
            id: "job-1".into(),
            weight: 1.0,
            params: json!({}),
        }
    }

    fn test_lease() -> Lease {
        Lease::new(
            AccountCredentials {
                account_id: "acct-1".into(),
                client_id: "client".into(),
                client_secret: Secret::new("secret".into()),
                username: "dummy_user".into(),
                password: Secret::new("pw".into()),
            },
            None,
        )
    }

    #[tokio::test]
    async fn null_scraper_always_succeeds() {
        let scraper = NullScraper;
        let job = test_job();
        let lease = test_lease();
        let outcome = scraper
            .scrape(&job, &lease, Arc::new(test_pool().await))
            .await
            .unwrap();
        assert_eq!(outcome.item_count, 0);
    }

    #[tokio::test]
    async fn failing_scraper_surfaces_its_message() {
        let scraper = FailingScraper {
            message: "too many requests".into(),
        };
        let account = ProbeAccount {
            account_id: "acct-1".into(),
            username: "dummy_user".into(),
            proxy_http: None,
        };
        let err = scraper.probe(&account).await.unwrap_err();
        assert_eq!(err.message, "too many requests");
    }

    async fn test_pool() -> AccountPool {
        AccountPool::connect("sqlite::memory:", None, std::time::Duration::from_secs(60))
            .await
            .unwrap()
    }
}
