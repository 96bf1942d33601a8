//! Data model for the account/proxy registry.

use common::Secret;
use serde::{Deserialize, Serialize};

/// Runtime status of a pool account.
///
/// An account is *eligible* for `acquire` iff `status == Ready` and its
/// cooldown has expired; `Leased` and `Quarantine` are never eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Ready,
    Leased,
    Quarantine,
}

impl AccountStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountStatus::Ready => "ready",
            AccountStatus::Leased => "leased",
            AccountStatus::Quarantine => "quarantine",
        }
    }
}

impl From<&str> for AccountStatus {
    fn from(s: &str) -> Self {
        match s {
            "leased" => AccountStatus::Leased,
            "quarantine" => AccountStatus::Quarantine,
            _ => AccountStatus::Ready,
        }
    }
}

/// Durable account row, minus secrets. Used for health snapshots and the
/// health manager's probe candidate scan.
#[derive(Debug, Clone)]
pub struct Account {
    pub account_id: String,
    pub username: String,
    pub status: AccountStatus,
    pub cooldown_until: i64,
    pub fail_count: i64,
    pub last_error: Option<String>,
    pub proxy_id: Option<String>,
}

impl Account {
    pub fn is_eligible(&self, now: i64) -> bool {
        self.status == AccountStatus::Ready && self.cooldown_until <= now
    }

    pub fn is_cooling(&self, now: i64) -> bool {
        self.status == AccountStatus::Ready && self.cooldown_until > now
    }
}

/// Identity fields supplied to `add_account`. Mutable state (status,
/// cooldown, fail count, last error, proxy assignment) is owned by the pool
/// from the first insert onward and is never reset by a later seed call.
#[derive(Debug, Clone)]
pub struct AccountSeed {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub proxy_id: Option<String>,
}

/// Durable proxy registry row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Proxy {
    pub proxy_id: String,
    pub http: String,
    pub https: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Credentials handed to a lease holder so it can construct its own remote
/// client. Secret fields are wrapped so a stray `{:?}` never leaks them.
#[derive(Debug)]
pub struct AccountCredentials {
    pub account_id: String,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub username: String,
    pub password: Secret<String>,
}

/// Per-status counts for the health endpoint and the autoscaler.
///
/// `cooling` is the subset of `ready` (by raw `status` column) whose
/// cooldown has not yet expired; `ready` here means *eligible*, matching
/// the health manager's own four-way snapshot in the spec.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HealthCounts {
    pub ready: i64,
    pub leased: i64,
    pub quarantine: i64,
    pub cooling: i64,
}

/// Outcome of a health-manager-driven "network failure" transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailOutcome {
    /// Fail count incremented and the account cooled down.
    Cooldown { fail_count: i64 },
    /// Fail count reached the quarantine threshold.
    Quarantined { fail_count: i64 },
    /// The account was no longer `ready` (already leased or quarantined);
    /// no transition was applied.
    NotApplicable,
}

/// Best-effort, non-transactional resume hint for one worker.
#[derive(Debug, Clone, Default)]
pub struct WorkerCheckpoint {
    pub worker_id: String,
    pub account_id: Option<String>,
    pub last_subreddit: Option<String>,
    pub last_post_id: Option<String>,
    pub last_comment_id: Option<String>,
    pub updated_at: f64,
}
