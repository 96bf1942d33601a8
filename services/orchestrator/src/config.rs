//! TOML-file-for-paths, environment-for-knobs configuration, matching the
//! health manager's `Config::load` shape.

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
    job_checkpoints_db_url: Option<String>,
    #[serde(default)]
    proxies_json: Option<PathBuf>,
    #[serde(default)]
    catalog_path: Option<PathBuf>,
    #[serde(default)]
    job_state_path: Option<PathBuf>,
    #[serde(default)]
    job_queue_path: Option<PathBuf>,
    #[serde(default)]
    scraper_target: Option<String>,
}

/// Resolved orchestrator configuration: static paths from a TOML file,
/// tunable knobs from the environment, falling back to the spec's defaults
/// when neither is set.
#[derive(Debug, Clone)]
pub struct Config {
    pub accounts_db_url: String,
    pub rate_db_url: String,
    pub job_checkpoints_db_url: String,
    pub proxies_json: Option<PathBuf>,
    pub catalog_path: PathBuf,
    pub job_state_path: PathBuf,
    pub job_queue_path: PathBuf,
    /// Prefix the configured core target is matched against in the catalog
    /// (`scraper_id.starts_with(scraper_target)`).
    pub scraper_target: String,
    pub poll_seconds: u64,
    pub idle_sleep_secs: u64,
    pub job_cooldown_min_secs: i64,
    pub job_cooldown_max_secs: i64,
    pub entity_limit: u64,
    /// Cooldown applied to a lease on a rate-limited scrape error. Shares
    /// the health manager's env knob since §7 requires identical
    /// classification/propagation constants across C3 and C5.
    pub rate_limit_cooldown_secs: i64,
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
            job_checkpoints_db_url: file
                .job_checkpoints_db_url
                .unwrap_or_else(|| "sqlite://storage/reddit/job_checkpoints.db?mode=rwc".to_string()),
            proxies_json: file.proxies_json,
            catalog_path: file
                .catalog_path
                .unwrap_or_else(|| PathBuf::from("storage/reddit/scraping_config.json")),
            job_state_path: file
                .job_state_path
                .unwrap_or_else(|| PathBuf::from("storage/reddit/job_state.json")),
            job_queue_path: file
                .job_queue_path
                .unwrap_or_else(|| PathBuf::from("storage/reddit/jobs.json")),
            scraper_target: file.scraper_target.unwrap_or_else(|| "reddit".to_string()),
            poll_seconds: env_or("ORCH_POLL_SECONDS", 60)?,
            idle_sleep_secs: env_or("ORCH_IDLE_SLEEP", 300)?,
            job_cooldown_min_secs: env_or("ORCH_JOB_COOLDOWN_MIN", 1200)?,
            job_cooldown_max_secs: env_or("ORCH_JOB_COOLDOWN_MAX", 1800)?,
            entity_limit: env_or("ORCH_ENTITY_LIMIT", 200)?,
            rate_limit_cooldown_secs: env_or("ACCOUNT_MANAGER_COOLDOWN_RATE", 120)?,
            rate_bucket_name,
            rate_bucket_capacity: env_or("RATE_BUCKET_CAPACITY", 5.0)?,
            rate_bucket_refill: env_or("RATE_BUCKET_REFILL", 2.0)?,
            prom_port: env_or("PROM_PORT", 9108)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_file_missing_and_env_unset() {
        let config = Config::load(Path::new("/nonexistent/orchestrator.toml")).unwrap();
        assert_eq!(config.poll_seconds, 60);
        assert_eq!(config.idle_sleep_secs, 300);
        assert_eq!(config.job_cooldown_min_secs, 1200);
        assert_eq!(config.job_cooldown_max_secs, 1800);
        assert_eq!(config.entity_limit, 200);
        assert_eq!(config.prom_port, 9108);
    }

    #[test]
    fn env_override_takes_precedence_over_default() {
        unsafe {
            std::env::set_var("ORCHESTRATOR_TEST_IDLE_OVERRIDE", "1");
            std::env::set_var("ORCH_IDLE_SLEEP", "42");
        }
        let config = Config::load(Path::new("/nonexistent/orchestrator.toml")).unwrap();
        assert_eq!(config.idle_sleep_secs, 42);
        unsafe {
            std::env::remove_var("ORCH_IDLE_SLEEP");
            std::env::remove_var("ORCHESTRATOR_TEST_IDLE_OVERRIDE");
        }
    }

    #[test]
    fn file_value_is_used_when_env_has_no_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orchestrator.toml");
        std::fs::write(&path, "scraper_target = \"reddit.rust\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.scraper_target, "reddit.rust");
    }
}
