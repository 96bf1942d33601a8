//! Durable account/proxy registry and lease state machine.

use std::path::PathBuf;
use std::time::Duration;

use common::{Secret, now_secs};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::lease::Lease;
use crate::models::{
    Account, AccountCredentials, AccountSeed, AccountStatus, HealthCounts, ProbeFailOutcome, Proxy,
    WorkerCheckpoint,
};
use crate::proxies::ProxyRotation;

/// Default per-account cooldown base used by `release`/`cooldown` when the
/// caller doesn't override it.
const DEFAULT_COOLDOWN_BASE: Duration = Duration::from_secs(60);

/// Durable account/proxy registry with a lease/cooldown/quarantine state
/// machine. One process-local mutex serializes the write-then-commit
/// critical section of every mutation; it is never held across remote I/O.
pub struct AccountPool {
    pool: SqlitePool,
    write_lock: Mutex<()>,
    proxies: ProxyRotation,
    cooldown_base: Duration,
}

impl AccountPool {
    /// Open (or create) the accounts/proxies/worker-checkpoints database.
    pub async fn connect(
        database_url: &str,
        proxies_json_path: Option<PathBuf>,
        cooldown_base: Duration,
    ) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                account_id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL,
                client_secret TEXT NOT NULL,
                username TEXT NOT NULL,
                password TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'ready',
                cooldown_until INTEGER NOT NULL DEFAULT 0,
                fail_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                proxy_id TEXT
            )
            "#,
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS proxies (
                proxy_id TEXT PRIMARY KEY,
                http TEXT NOT NULL,
                https TEXT NOT NULL,
                tag TEXT,
                provider TEXT
            )
            "#,
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                worker_id TEXT PRIMARY KEY,
                account_id TEXT,
                last_subreddit TEXT,
                last_post_id TEXT,
                last_comment_id TEXT,
                updated_at REAL NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!(url = database_url, "account pool store ready");
        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
            proxies: ProxyRotation::new(proxies_json_path),
            cooldown_base,
        })
    }

    pub fn with_default_cooldown(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
            proxies: ProxyRotation::new(None),
            cooldown_base: DEFAULT_COOLDOWN_BASE,
        }
    }

    /// Idempotent insert: a second call with the same `account_id` leaves
    /// `status`/`cooldown_until`/`fail_count`/`last_error`/`proxy_id`
    /// untouched.
    pub async fn add_account(&self, seed: AccountSeed) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        sqlx::query(
            "INSERT INTO accounts (account_id, client_id, client_secret, username, password, status, cooldown_until, fail_count, proxy_id) \
             VALUES (?, ?, ?, ?, ?, 'ready', 0, 0, ?) \
             ON CONFLICT(account_id) DO UPDATE SET \
                client_id = excluded.client_id, \
                client_secret = excluded.client_secret, \
                username = excluded.username, \
                password = excluded.password",
        )
        .bind(&seed.account_id)
        .bind(&seed.client_id)
        .bind(&seed.client_secret)
        .bind(&seed.username)
        .bind(&seed.password)
        .bind(&seed.proxy_id)
        .execute(&self.pool)
        .await?;
        info!(account_id = %seed.account_id, "account registered");
        metrics::counter!("account_pool_add_account_total").increment(1);
        Ok(())
    }

    /// Idempotent insert into the durable proxy registry.
    pub async fn add_proxy(&self, proxy: Proxy) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        sqlx::query(
            "INSERT INTO proxies (proxy_id, http, https, tag, provider) VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(proxy_id) DO UPDATE SET \
                http = excluded.http, https = excluded.https, tag = excluded.tag, provider = excluded.provider",
        )
        .bind(&proxy.proxy_id)
        .bind(&proxy.http)
        .bind(&proxy.https)
        .bind(&proxy.tag)
        .bind(&proxy.provider)
        .execute(&self.pool)
        .await?;
        info!(proxy_id = %proxy.proxy_id, "proxy registered");
        Ok(())
    }

    /// Acquire exclusive use of the least-recently-failed eligible account.
    /// Retries once after a ~1s backoff before giving up with
    /// [`Error::NoReadyAccount`].
    pub async fn acquire(&self) -> Result<Lease> {
        if let Some(lease) = self.try_acquire_once().await? {
            return Ok(lease);
        }
        sleep(Duration::from_secs(1)).await;
        match self.try_acquire_once().await? {
            Some(lease) => Ok(lease),
            None => {
                warn!("no ready account after retry");
                metrics::counter!("account_pool_no_ready_account_total").increment(1);
                Err(Error::NoReadyAccount)
            }
        }
    }

    async fn try_acquire_once(&self) -> Result<Option<Lease>> {
        let _guard = self.write_lock.lock().await;
        let now = now_secs();

        let row = sqlx::query(
            "SELECT account_id, client_id, client_secret, username, password, proxy_id \
             FROM accounts WHERE status = 'ready' AND cooldown_until <= ? \
             ORDER BY fail_count ASC LIMIT 1",
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let account_id: String = row.get("account_id");
        let result = sqlx::query("UPDATE accounts SET status = 'leased' WHERE account_id = ? AND status = 'ready'")
            .bind(&account_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            // Lost the race to another acquirer between SELECT and UPDATE.
            return Ok(None);
        }

        let credentials = AccountCredentials {
            account_id: account_id.clone(),
            client_id: row.get("client_id"),
            client_secret: Secret::new(row.get::<String, _>("client_secret")),
            username: row.get("username"),
            password: Secret::new(row.get::<String, _>("password")),
        };
        let proxy = self.proxies.next_proxy().await;

        info!(account_id = %account_id, "account leased");
        metrics::counter!("account_pool_acquire_total").increment(1);
        Ok(Some(Lease::new(credentials, proxy)))
    }

    /// Close a lease after a successful or failed scrape.
    pub async fn release(&self, lease: &Lease, success: bool) -> Result<()> {
        if !lease.close() {
            debug!(account_id = lease.account_id(), "release on already-closed lease, ignoring");
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        let now = now_secs();
        if success {
            let cooldown = (self.cooldown_base.as_secs() / 4) as i64;
            sqlx::query(
                "UPDATE accounts SET status = 'ready', cooldown_until = ?, fail_count = MAX(0, fail_count - 1) WHERE account_id = ?",
            )
            .bind(now + cooldown)
            .bind(lease.account_id())
            .execute(&self.pool)
            .await?;
        } else {
            let cooldown = self.cooldown_base.as_secs() as i64;
            sqlx::query(
                "UPDATE accounts SET status = 'ready', cooldown_until = ?, fail_count = fail_count + 1 WHERE account_id = ?",
            )
            .bind(now + cooldown)
            .bind(lease.account_id())
            .execute(&self.pool)
            .await?;
        }
        info!(account_id = lease.account_id(), success, "lease released");
        metrics::counter!("account_pool_release_total", "success" => success.to_string()).increment(1);
        Ok(())
    }

    /// Close a lease with an explicit cooldown window (e.g. rate limited).
    pub async fn cooldown(&self, lease: &Lease, seconds: i64, reason: &str) -> Result<()> {
        if !lease.close() {
            debug!(account_id = lease.account_id(), "cooldown on already-closed lease, ignoring");
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        let now = now_secs();
        sqlx::query("UPDATE accounts SET status = 'ready', cooldown_until = ?, last_error = ? WHERE account_id = ?")
            .bind(now + seconds)
            .bind(reason)
            .bind(lease.account_id())
            .execute(&self.pool)
            .await?;
        info!(account_id = lease.account_id(), seconds, reason, "lease cooled down");
        metrics::counter!("account_pool_cooldown_total").increment(1);
        Ok(())
    }

    /// Close a lease by quarantining the account.
    pub async fn quarantine(&self, lease: &Lease, reason: &str) -> Result<()> {
        if !lease.close() {
            debug!(account_id = lease.account_id(), "quarantine on already-closed lease, ignoring");
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        sqlx::query("UPDATE accounts SET status = 'quarantine', last_error = ? WHERE account_id = ?")
            .bind(reason)
            .bind(lease.account_id())
            .execute(&self.pool)
            .await?;
        warn!(account_id = lease.account_id(), reason, "account quarantined");
        metrics::counter!("account_pool_quarantine_total").increment(1);
        Ok(())
    }

    /// Group accounts by status for the health endpoint / autoscaler.
    pub async fn health_report(&self) -> Result<HealthCounts> {
        let accounts = self.list_accounts().await?;
        let now = now_secs();
        let mut counts = HealthCounts::default();
        for account in &accounts {
            match account.status {
                AccountStatus::Leased => counts.leased += 1,
                AccountStatus::Quarantine => counts.quarantine += 1,
                AccountStatus::Ready if account.cooldown_until > now => counts.cooling += 1,
                AccountStatus::Ready => counts.ready += 1,
            }
        }
        Ok(counts)
    }

    /// Full account snapshot, used by the health manager's probing loop.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            "SELECT account_id, username, status, cooldown_until, fail_count, last_error, proxy_id FROM accounts",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Account {
                account_id: row.get("account_id"),
                username: row.get("username"),
                status: AccountStatus::from(row.get::<String, _>("status").as_str()),
                cooldown_until: row.get("cooldown_until"),
                fail_count: row.get("fail_count"),
                last_error: row.get("last_error"),
                proxy_id: row.get("proxy_id"),
            })
            .collect())
    }

    /// Health-manager "ok" transition on a currently-`ready` account: clamp
    /// the cooldown down and decrement the fail count. Guarded by
    /// `status='ready'` so it never clobbers a lease acquired mid-cycle.
    pub async fn probe_recover(&self, account_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let now = now_secs();
        let result = sqlx::query(
            "UPDATE accounts SET fail_count = MAX(0, fail_count - 1), \
             cooldown_until = MIN(cooldown_until, ?) WHERE account_id = ? AND status = 'ready'",
        )
        .bind(now)
        .bind(account_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Health-manager rate-limit/auth-style cooldown on a `ready` account
    /// (no lease involved).
    pub async fn probe_cooldown(&self, account_id: &str, seconds: i64, reason: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let now = now_secs();
        let result = sqlx::query(
            "UPDATE accounts SET cooldown_until = ?, last_error = ? WHERE account_id = ? AND status = 'ready'",
        )
        .bind(now + seconds)
        .bind(reason)
        .bind(account_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Health-manager immediate quarantine on a `ready` account.
    pub async fn probe_quarantine(&self, account_id: &str, reason: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query(
            "UPDATE accounts SET status = 'quarantine', last_error = ? WHERE account_id = ? AND status = 'ready'",
        )
        .bind(reason)
        .bind(account_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Health-manager "network" failure transition: increment `fail_count`
    /// and either cooldown or quarantine depending on the threshold.
    pub async fn probe_network_fail(
        &self,
        account_id: &str,
        cooldown_bad_secs: i64,
        quarantine_fails: i64,
        reason: &str,
    ) -> Result<ProbeFailOutcome> {
        let _guard = self.write_lock.lock().await;
        let row = sqlx::query("SELECT fail_count FROM accounts WHERE account_id = ? AND status = 'ready'")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(ProbeFailOutcome::NotApplicable);
        };
        let new_fail_count: i64 = row.get::<i64, _>("fail_count") + 1;

        if new_fail_count >= quarantine_fails {
            sqlx::query(
                "UPDATE accounts SET status = 'quarantine', fail_count = ?, last_error = ? WHERE account_id = ? AND status = 'ready'",
            )
            .bind(new_fail_count)
            .bind(reason)
            .bind(account_id)
            .execute(&self.pool)
            .await?;
            Ok(ProbeFailOutcome::Quarantined {
                fail_count: new_fail_count,
            })
        } else {
            let now = now_secs();
            sqlx::query(
                "UPDATE accounts SET fail_count = ?, cooldown_until = ?, last_error = ? WHERE account_id = ? AND status = 'ready'",
            )
            .bind(new_fail_count)
            .bind(now + cooldown_bad_secs)
            .bind(reason)
            .bind(account_id)
            .execute(&self.pool)
            .await?;
            Ok(ProbeFailOutcome::Cooldown {
                fail_count: new_fail_count,
            })
        }
    }

    /// Record the start of a job on a worker: account known, item ids not
    /// yet produced. Must be written before any end/error checkpoint for
    /// the same worker.
    pub async fn checkpoint_start(&self, worker_id: &str, account_id: &str, subreddit: &str) -> Result<()> {
        let now = now_secs() as f64;
        sqlx::query(
            "INSERT INTO checkpoints (worker_id, account_id, last_subreddit, last_post_id, last_comment_id, updated_at) \
             VALUES (?, ?, ?, NULL, NULL, ?) \
             ON CONFLICT(worker_id) DO UPDATE SET \
                account_id = excluded.account_id, last_subreddit = excluded.last_subreddit, \
                last_post_id = NULL, last_comment_id = NULL, updated_at = excluded.updated_at",
        )
        .bind(worker_id)
        .bind(account_id)
        .bind(subreddit)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a successful run's best-effort resume ids.
    pub async fn checkpoint_success(
        &self,
        worker_id: &str,
        last_post_id: Option<&str>,
        last_comment_id: Option<&str>,
    ) -> Result<()> {
        let now = now_secs() as f64;
        sqlx::query(
            "UPDATE checkpoints SET last_post_id = ?, last_comment_id = ?, updated_at = ? WHERE worker_id = ?",
        )
        .bind(last_post_id)
        .bind(last_comment_id)
        .bind(now)
        .bind(worker_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record a failed run: resume ids are reset to null since the worker
    /// has no confident position to resume from.
    pub async fn checkpoint_error(&self, worker_id: &str) -> Result<()> {
        let now = now_secs() as f64;
        sqlx::query("UPDATE checkpoints SET last_post_id = NULL, last_comment_id = NULL, updated_at = ? WHERE worker_id = ?")
            .bind(now)
            .bind(worker_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record a scrape/probe outcome against the proxy a lease carried, for
    /// the in-memory fail-counter-with-decay described in §4.2. Reserved for
    /// a future unhealthy-skipping policy; does not affect rotation today.
    pub async fn note_proxy_outcome(&self, proxy_id: &str, success: bool) {
        self.proxies.record_outcome(proxy_id, success).await;
        if !success {
            metrics::counter!("account_pool_proxy_fail_total").increment(1);
        }
    }

    pub async fn proxy_fail_count(&self, proxy_id: &str) -> u32 {
        self.proxies.fail_count(proxy_id).await
    }

    pub async fn get_checkpoint(&self, worker_id: &str) -> Result<Option<WorkerCheckpoint>> {
        let row = sqlx::query(
            "SELECT worker_id, account_id, last_subreddit, last_post_id, last_comment_id, updated_at \
             FROM checkpoints WHERE worker_id = ?",
        )
        .bind(worker_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| WorkerCheckpoint {
            worker_id: row.get("worker_id"),
            account_id: row.get("account_id"),
            last_subreddit: row.get("last_subreddit"),
            last_post_id: row.get("last_post_id"),
            last_comment_id: row.get("last_comment_id"),
            updated_at: row.get("updated_at"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> AccountPool {
        AccountPool::connect("sqlite::memory:", None, DEFAULT_COOLDOWN_BASE)
            .await
            .unwrap()
    }

    fn seed(id: &str) -> AccountSeed {
        AccountSeed {
            account_id: id.into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            username: "dummy_user".into(),
            password: "pw".into(),
            proxy_id: None,
        }
    }

    /// S1: seed one account, one proxy, acquire returns it with the right
    /// username and a non-null proxy; release(true) leaves ready/fail=0.
    #[tokio::test]
    async fn s1_seeding_and_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let proxies_path = dir.path().join("proxies.json");
        common::json_file::write_atomic(
            &proxies_path,
            &vec![Proxy {
                proxy_id: "p1".into(),
                http: "http://u:p@1.2.3.4:8080".into(),
                https: "http://u:p@1.2.3.4:8080".into(),
                tag: None,
                provider: None,
            }],
        )
        .await
        .unwrap();

        let pool = AccountPool::connect("sqlite::memory:", Some(proxies_path), DEFAULT_COOLDOWN_BASE)
            .await
            .unwrap();
        pool.add_account(seed("acct-1")).await.unwrap();

        let lease = pool.acquire().await.unwrap();
        assert_eq!(lease.account.username, "dummy_user");
        assert!(lease.proxy.is_some());

        pool.release(&lease, true).await.unwrap();
        let accounts = pool.list_accounts().await.unwrap();
        let account = accounts.iter().find(|a| a.account_id == "acct-1").unwrap();
        assert_eq!(account.status, AccountStatus::Ready);
        assert_eq!(account.fail_count, 0);
    }

    /// S2: quarantine on auth error; a single-account pool raises
    /// NoReadyAccount after one retry.
    #[tokio::test]
    async fn s2_quarantine_on_auth() {
        let pool = test_pool().await;
        pool.add_account(seed("acct-1")).await.unwrap();

        let lease = pool.acquire().await.unwrap();
        pool.quarantine(&lease, "auth").await.unwrap();

        let accounts = pool.list_accounts().await.unwrap();
        let account = accounts.iter().find(|a| a.account_id == "acct-1").unwrap();
        assert_eq!(account.status, AccountStatus::Quarantine);
        assert_eq!(account.last_error.as_deref(), Some("auth"));

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, Error::NoReadyAccount));
    }

    #[tokio::test]
    async fn acquire_prefers_lowest_fail_count() {
        let pool = test_pool().await;
        pool.add_account(seed("high")).await.unwrap();
        pool.add_account(seed("low")).await.unwrap();

        // Bump "high"'s fail count via a failed release cycle.
        let lease = pool.acquire().await.unwrap();
        let first = lease.account_id().to_string();
        pool.release(&lease, false).await.unwrap();
        // Clear its cooldown so it's eligible again for the assertion below.
        sqlx::query("UPDATE accounts SET cooldown_until = 0 WHERE account_id = ?")
            .bind(&first)
            .execute(&pool.pool)
            .await
            .unwrap();

        let second = pool.acquire().await.unwrap();
        assert_ne!(second.account_id(), first, "must prefer the account with fewer failures");
    }

    #[tokio::test]
    async fn release_success_clamps_fail_count_at_zero() {
        let pool = test_pool().await;
        pool.add_account(seed("acct-1")).await.unwrap();

        let lease = pool.acquire().await.unwrap();
        pool.release(&lease, true).await.unwrap();

        let accounts = pool.list_accounts().await.unwrap();
        assert_eq!(accounts[0].fail_count, 0);
    }

    #[tokio::test]
    async fn double_release_is_a_no_op() {
        let pool = test_pool().await;
        pool.add_account(seed("acct-1")).await.unwrap();
        let lease = pool.acquire().await.unwrap();

        pool.release(&lease, true).await.unwrap();
        let after_first = pool.list_accounts().await.unwrap()[0].fail_count;
        pool.release(&lease, false).await.unwrap();
        let after_second = pool.list_accounts().await.unwrap()[0].fail_count;

        assert_eq!(after_first, after_second, "second release must be a no-op");
    }

    #[tokio::test]
    async fn add_account_twice_is_idempotent() {
        let pool = test_pool().await;
        pool.add_account(seed("acct-1")).await.unwrap();
        let lease = pool.acquire().await.unwrap();
        pool.cooldown(&lease, 500, "manual").await.unwrap();

        // Re-seeding must not reset status/cooldown/fail_count/last_error.
        pool.add_account(seed("acct-1")).await.unwrap();

        let accounts = pool.list_accounts().await.unwrap();
        let account = &accounts[0];
        assert_eq!(account.last_error.as_deref(), Some("manual"));
        assert!(account.cooldown_until > 0);
    }

    #[tokio::test]
    async fn health_report_distinguishes_cooling_from_ready() {
        let pool = test_pool().await;
        pool.add_account(seed("a")).await.unwrap();
        pool.add_account(seed("b")).await.unwrap();

        let lease = pool.acquire().await.unwrap();
        pool.cooldown(&lease, 3600, "rate-limit").await.unwrap();

        let counts = pool.health_report().await.unwrap();
        assert_eq!(counts.cooling, 1);
        assert_eq!(counts.ready, 1);
        assert_eq!(counts.leased, 0);
    }

    #[tokio::test]
    async fn probe_network_fail_quarantines_at_threshold() {
        let pool = test_pool().await;
        pool.add_account(seed("acct-1")).await.unwrap();

        for _ in 0..4 {
            let outcome = pool
                .probe_network_fail("acct-1", 60, 5, "network")
                .await
                .unwrap();
            assert!(matches!(outcome, ProbeFailOutcome::Cooldown { .. }));
        }
        let final_outcome = pool.probe_network_fail("acct-1", 60, 5, "network").await.unwrap();
        assert!(matches!(final_outcome, ProbeFailOutcome::Quarantined { fail_count: 5 }));

        let accounts = pool.list_accounts().await.unwrap();
        assert_eq!(accounts[0].status, AccountStatus::Quarantine);
    }

    #[tokio::test]
    async fn probe_does_not_clobber_a_just_started_lease() {
        let pool = test_pool().await;
        pool.add_account(seed("acct-1")).await.unwrap();
        let _lease = pool.acquire().await.unwrap();

        // Account is now `leased`; a probe racing against it must be a no-op.
        let applied = pool.probe_cooldown("acct-1", 60, "rate-limit").await.unwrap();
        assert!(!applied);

        let accounts = pool.list_accounts().await.unwrap();
        assert_eq!(accounts[0].status, AccountStatus::Leased);
    }

    #[tokio::test]
    async fn empty_pool_raises_no_ready_account() {
        let pool = test_pool().await;
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, Error::NoReadyAccount));
    }

    #[tokio::test]
    async fn checkpoint_start_strictly_precedes_success() {
        let pool = test_pool().await;
        pool.checkpoint_start("worker-1", "acct-1", "rust").await.unwrap();
        let mid = pool.get_checkpoint("worker-1").await.unwrap().unwrap();
        assert_eq!(mid.last_post_id, None);

        pool.checkpoint_success("worker-1", Some("t3_abc"), Some("t1_def"))
            .await
            .unwrap();
        let after = pool.get_checkpoint("worker-1").await.unwrap().unwrap();
        assert_eq!(after.last_post_id.as_deref(), Some("t3_abc"));
        assert_eq!(after.last_comment_id.as_deref(), Some("t1_def"));
    }

    #[tokio::test]
    async fn checkpoint_error_resets_ids_to_null() {
        let pool = test_pool().await;
        pool.checkpoint_start("worker-1", "acct-1", "rust").await.unwrap();
        pool.checkpoint_success("worker-1", Some("t3_abc"), None).await.unwrap();
        pool.checkpoint_error("worker-1").await.unwrap();

        let checkpoint = pool.get_checkpoint("worker-1").await.unwrap().unwrap();
        assert_eq!(checkpoint.last_post_id, None);
        assert_eq!(checkpoint.last_comment_id, None);
    }

    #[tokio::test]
    async fn proxy_outcome_tracks_a_decaying_fail_count() {
        let pool = test_pool().await;
        pool.note_proxy_outcome("p1", false).await;
        pool.note_proxy_outcome("p1", false).await;
        assert_eq!(pool.proxy_fail_count("p1").await, 2);
        pool.note_proxy_outcome("p1", true).await;
        assert_eq!(pool.proxy_fail_count("p1").await, 1);
    }
}
