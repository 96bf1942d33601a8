//! TOML-file-for-paths, environment-for-knobs configuration, per the
//! worker-orchestration substrate's `os.environ.get(NAME, default)` pattern.

use std::path::{Path, PathBuf};

use common::{Result, env_or, load_toml};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    accounts_db_url: Option<String>,
    #[serde(default)]
    rate_db_url: Option<String>,
    #[serde(default)]
    proxies_json: Option<PathBuf>,
}

/// Resolved health-manager configuration: static paths from a TOML file,
/// tunable knobs from the environment (falling back to the spec's defaults).
#[derive(Debug, Clone)]
pub struct Config {
    pub accounts_db_url: String,
    pub rate_db_url: String,
    pub proxies_json: Option<PathBuf>,
    pub interval_secs: u64,
    pub cooldown_bad_secs: i64,
    pub cooldown_rate_secs: i64,
    pub quarantine_fails: i64,
    pub rate_bucket_name: String,
    pub rate_bucket_capacity: f64,
    pub rate_bucket_refill: f64,
    pub prom_port: u16,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file: FileConfig = load_toml(path)?;
        let rate_bucket_name = match std::env::var("RATE_BUCKET_NAME") {
            Ok(v) => v,
            Err(std::env::VarError::NotPresent) => "replace_more".to_string(),
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(common::Error::Env {
                    name: "RATE_BUCKET_NAME".to_string(),
                    value: "<non-unicode>".to_string(),
                });
            }
        };

        Ok(Self {
            accounts_db_url: file
                .accounts_db_url
                .unwrap_or_else(|| "sqlite://storage/reddit/accounts.db?mode=rwc".to_string()),
            rate_db_url: file
                .rate_db_url
                .unwrap_or_else(|| "sqlite://storage/reddit/ratelimiter.db?mode=rwc".to_string()),
            proxies_json: file.proxies_json,
            interval_secs: env_or("ACCOUNT_MANAGER_INTERVAL", 60)?,
            cooldown_bad_secs: env_or("ACCOUNT_MANAGER_COOLDOWN_BAD", 60)?,
            cooldown_rate_secs: env_or("ACCOUNT_MANAGER_COOLDOWN_RATE", 120)?,
            quarantine_fails: env_or("ACCOUNT_MANAGER_QUARANTINE_FAILS", 5)?,
            rate_bucket_name,
            rate_bucket_capacity: env_or("RATE_BUCKET_CAPACITY", 5.0)?,
            rate_bucket_refill: env_or("RATE_BUCKET_REFILL", 2.0)?,
            prom_port: env_or("PROM_PORT", 9108)?,
        })
    }
}
