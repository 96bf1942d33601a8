//! Lease/cooldown/quarantine state machine for a pool of scraping accounts.

mod error;
mod lease;
mod models;
mod proxies;
mod store;

pub use error::{Error, Result};
pub use lease::Lease;
pub use models::{
    Account, AccountCredentials, AccountSeed, AccountStatus, HealthCounts, ProbeFailOutcome, Proxy,
    WorkerCheckpoint,
};
pub use store::AccountPool;
